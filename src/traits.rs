use cgmath::{Point2, Vector2};

use super::store::Handle;

/// Relocation bookkeeping embedded in every grid object.
///
/// The grid writes this field while compacting its entity store. Callers
/// only provide the storage and must leave the contents alone; `Default`
/// yields the required initial state.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GridMeta {
    pub(crate) relocated: Option<Handle>,
}

/// [`Grid`]: struct.Grid.html
/// [`GridMeta`]: struct.GridMeta.html

/// Capability contract for objects stored in a [`Grid`]
///
/// Implemented by composition: report the bounding box as center plus
/// half-extent, and embed a [`GridMeta`] for the grid's own use. Objects
/// are cloned when the backing stores are compacted.
pub trait GridObject: Clone {
    type Scalar: cgmath::BaseFloat;

    /// Center of the object's bounding box
    fn position(&self) -> Point2<Self::Scalar>;

    /// Half-width and half-height of the bounding box
    fn extent(&self) -> Vector2<Self::Scalar>;

    fn grid_meta(&self) -> &GridMeta;
    fn grid_meta_mut(&mut self) -> &mut GridMeta;
}
