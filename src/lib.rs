extern crate cgmath;
extern crate num_traits;
extern crate rustc_hash;
extern crate smallvec;

#[macro_use]
extern crate log;

mod geom;
mod grid;
mod store;
mod traits;

pub use crate::geom::Bounds;
pub use crate::grid::{CellIter, Grid, GridBuilder};
pub use crate::store::{Handle, SlotStore};
pub use crate::traits::{GridMeta, GridObject};
