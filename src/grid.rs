use super::geom::Bounds;
use super::store::{Handle, SlotStore};
use super::traits::GridObject;

use cgmath::{Point2, Vector2};
use num_traits::{Float, One, ToPrimitive, Zero};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// One node of a cell's singly linked membership list.
///
/// An object overlapping K cells owns K of these, one enqueued per cell.
#[derive(Clone, Copy)]
struct CellLink {
    next: Option<Handle>,
    entity: Handle,
}

/// [`GridObject`]: trait.GridObject.html
/// [`tick`]: struct.Grid.html#method.tick

/// A uniform grid for broad-phase collision detection over 2D axis-aligned
/// objects
///
/// Objects implementing [`GridObject`] are linked into every cell their
/// bounding box overlaps. The driving loop inserts each object once per
/// simulation step, then calls [`tick`], which compacts both backing stores
/// into scan order and enumerates candidate collision pairs cell by cell.
pub struct Grid<T>
where
    T: GridObject,
{
    cells: Vec<Option<Handle>>,
    entities: SlotStore<T>,
    links: SlotStore<CellLink>,
    grid_cells: Vector2<u32>,
    cell_size: Vector2<T::Scalar>,
    inv_cell_size: Vector2<T::Scalar>,
    pairs: Vec<(Handle, Handle)>,
}

impl<T> Grid<T>
where
    T: GridObject,
{
    /// A grid of `grid_cells.x × grid_cells.y` cells of `cell_size` each,
    /// with default store configuration
    pub fn new(grid_cells: Vector2<u32>, cell_size: Vector2<T::Scalar>) -> Self {
        GridBuilder::new(grid_cells, cell_size).build()
    }

    /// Cell counts along each axis
    pub fn grid_cells(&self) -> Vector2<u32> {
        self.grid_cells
    }

    pub fn cell_size(&self) -> Vector2<T::Scalar> {
        self.cell_size
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over all objects and their current handles
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.entities.iter()
    }

    /// The object behind `handle`.
    ///
    /// Panics if `handle` is stale; handles are reassigned by every
    /// `optimize`/`tick`.
    pub fn get(&self, handle: Handle) -> &T {
        &self.entities[handle]
    }

    /// Iterate over the handles linked into one cell's membership list
    ///
    /// This is primarily intended for visualization + debugging
    pub fn cell(&self, cell: Point2<u32>) -> CellIter<'_, T> {
        CellIter {
            grid: self,
            cursor: self.cells[self.cell_index(cell)],
        }
    }

    /// Map a position to the cell containing it.
    ///
    /// Positions outside the grid are clamped: negative coordinates map to
    /// cell 0 and coordinates on or past the far edge map to the last cell,
    /// so the result is always in bounds.
    pub fn pos_to_cell(&self, pos: Point2<T::Scalar>) -> Point2<u32> {
        let zero = T::Scalar::zero();
        let x = (pos.x.max(zero) * self.inv_cell_size.x).to_u32().unwrap_or(u32::MAX);
        let y = (pos.y.max(zero) * self.inv_cell_size.y).to_u32().unwrap_or(u32::MAX);
        Point2::new(
            std::cmp::min(self.grid_cells.x - 1, x),
            std::cmp::min(self.grid_cells.y - 1, y),
        )
    }

    /// The inclusive rectangle of cells overlapped by `bounds`
    pub fn cells_overlapping(&self, bounds: Bounds<Point2<T::Scalar>>) -> SmallVec<[Point2<u32>; 4]> {
        let start = self.pos_to_cell(bounds.min);
        let end = self.pos_to_cell(bounds.max);

        let mut cells: SmallVec<[Point2<u32>; 4]> = SmallVec::new();
        for x in start.x..=end.x {
            for y in start.y..=end.y {
                cells.push(Point2::new(x, y));
            }
        }

        if cells.len() > 4 {
            warn!("cells_overlapping generated more than 4 cells; enlarge cells or split large objects to avoid heap allocations");
        }

        cells
    }

    /// Store `object` and link it into every cell its bounding box overlaps.
    ///
    /// The membership lists are prepend-only; an object spanning K cells
    /// receives one link per cell. The returned handle stays valid until the
    /// next `optimize`/`tick` reassigns handles.
    pub fn insert(&mut self, mut object: T) -> Handle {
        let bounds = Bounds::around(object.position(), object.extent());
        object.grid_meta_mut().relocated = None;

        let entity = self.entities.insert(object);
        for cell in self.cells_overlapping(bounds) {
            let slot = self.cell_index(cell);
            let link = self.links.insert(CellLink {
                next: self.cells[slot],
                entity,
            });
            self.cells[slot] = Some(link);
        }
        entity
    }

    /// Rebuild both backing stores in a single walk over every cell's list,
    /// in cell order then list order.
    ///
    /// Each object is relocated on first encounter and every (cell, object)
    /// link is reissued against the fresh stores, so entities and links end
    /// up contiguous in scan order while cell membership and list order are
    /// preserved exactly. Handles are reassigned; old ones become stale.
    /// Both generations of storage are held until the walk completes.
    pub fn optimize(&mut self) {
        let mut entities = self.entities.for_rebuild();
        let mut links = self.links.for_rebuild();

        for cell in &mut self.cells {
            let mut cursor = cell.take();
            let mut tail = None;
            while let Some(index) = cursor {
                let link = self.links[index];
                cursor = link.next;

                let entity = match self.entities[link.entity].grid_meta().relocated {
                    Some(relocated) => relocated,
                    None => {
                        let relocated = entities.insert(self.entities[link.entity].clone());
                        self.entities[link.entity].grid_meta_mut().relocated = Some(relocated);
                        relocated
                    }
                };

                let fresh = links.insert(CellLink { next: None, entity });
                match tail {
                    Some(previous) => links[previous].next = Some(fresh),
                    None => *cell = Some(fresh),
                }
                tail = Some(fresh);
            }
        }

        self.entities = entities;
        self.links = links;
    }

    /// Compact storage, then count candidate collision pairs.
    ///
    /// Equivalent to [`tick_with`] with an empty callback.
    ///
    /// [`tick_with`]: struct.Grid.html#method.tick_with
    pub fn tick(&mut self) -> usize {
        self.tick_with(|_, _| {})
    }

    /// Compact storage, then report candidate collision pairs through
    /// `report` and return their count.
    ///
    /// The pass approximates "each co-located pair once" without tracking a
    /// pair set: compaction reassigns handles in scan order, and a running
    /// maximum of the handles seen in previous cells stands in for "already
    /// accounted for there". Only objects above that mark open a scan of the
    /// remainder of their cell's list. Pairs sharing several cells may still
    /// be reported more than once, or not at all when their cells interleave
    /// unfavorably in scan order; [`tick_exact`] trades speed for an exact
    /// enumeration.
    ///
    /// [`tick_exact`]: struct.Grid.html#method.tick_exact
    pub fn tick_with<F>(&mut self, mut report: F) -> usize
    where
        F: FnMut(Handle, Handle),
    {
        self.optimize();

        let mut high_water = 0u32;
        let mut candidates = 0usize;

        for &head in &self.cells {
            let mut local_max = 0u32;

            let mut cursor = head;
            while let Some(index) = cursor {
                let link = self.links[index];
                cursor = link.next;
                local_max = std::cmp::max(local_max, link.entity.get());

                if link.entity.get() <= high_water {
                    continue;
                }

                let mut rest = cursor;
                while let Some(other_index) = rest {
                    let other = self.links[other_index];
                    rest = other.next;

                    if other.entity.get() < high_water {
                        continue;
                    }

                    candidates += 1;
                    report(link.entity, other.entity);
                }
            }

            high_water = std::cmp::max(high_water, local_max);
        }

        debug!("{} broad-phase candidate pairs", candidates);
        candidates
    }

    /// Compact storage, then enumerate every candidate pair exactly once.
    ///
    /// Pairs are deduplicated through a set keyed by the unordered handle
    /// pair, which costs a hash insert per co-location that the counting
    /// pass avoids. The returned slice is sorted.
    pub fn tick_exact(&mut self) -> &[(Handle, Handle)] {
        self.optimize();

        self.pairs.clear();
        let mut seen: FxHashSet<(Handle, Handle)> = FxHashSet::default();

        for &head in &self.cells {
            let mut cursor = head;
            while let Some(index) = cursor {
                let link = self.links[index];
                cursor = link.next;

                let mut rest = cursor;
                while let Some(other_index) = rest {
                    let other = self.links[other_index];
                    rest = other.next;

                    if link.entity == other.entity {
                        continue;
                    }
                    let pair = if link.entity < other.entity {
                        (link.entity, other.entity)
                    } else {
                        (other.entity, link.entity)
                    };
                    if seen.insert(pair) {
                        self.pairs.push(pair);
                    }
                }
            }
        }

        self.pairs.sort_unstable();
        &self.pairs
    }

    fn cell_index(&self, cell: Point2<u32>) -> usize {
        cell.x as usize * self.grid_cells.y as usize + cell.y as usize
    }
}

/// Iterator over the entity handles in one cell's membership list
pub struct CellIter<'a, T>
where
    T: GridObject,
{
    grid: &'a Grid<T>,
    cursor: Option<Handle>,
}

impl<'a, T> Iterator for CellIter<'a, T>
where
    T: GridObject,
{
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let index = self.cursor?;
        let link = self.grid.links[index];
        self.cursor = link.next;
        Some(link.entity)
    }
}

/// A builder for `Grid`s
pub struct GridBuilder<S> {
    grid_cells: Vector2<u32>,
    cell_size: Vector2<S>,
    entity_capacity: Option<usize>,
    link_capacity: Option<usize>,
}

impl<S> GridBuilder<S>
where
    S: cgmath::BaseFloat,
{
    pub fn new(grid_cells: Vector2<u32>, cell_size: Vector2<S>) -> Self {
        assert!(
            grid_cells.x > 0 && grid_cells.y > 0,
            "grid must have at least one cell per axis"
        );
        assert!(
            cell_size.x > S::zero() && cell_size.y > S::zero(),
            "cell dimensions must be positive"
        );
        Self {
            grid_cells,
            cell_size,
            entity_capacity: None,
            link_capacity: None,
        }
    }

    /// Pre-size the entity store
    pub fn with_entity_capacity(&mut self, capacity: usize) -> &mut Self {
        self.entity_capacity = Some(capacity);
        self
    }

    /// Pre-size the link store
    pub fn with_link_capacity(&mut self, capacity: usize) -> &mut Self {
        self.link_capacity = Some(capacity);
        self
    }

    pub fn build<T>(&self) -> Grid<T>
    where
        T: GridObject<Scalar = S>,
    {
        let cell_count = self.grid_cells.x as usize * self.grid_cells.y as usize;
        Grid {
            cells: vec![None; cell_count],
            entities: match self.entity_capacity {
                Some(capacity) => SlotStore::with_capacity(capacity),
                None => SlotStore::new(),
            },
            links: match self.link_capacity {
                Some(capacity) => SlotStore::with_capacity(capacity),
                None => SlotStore::new(),
            },
            grid_cells: self.grid_cells,
            cell_size: self.cell_size,
            inv_cell_size: Vector2::new(
                S::one() / self.cell_size.x,
                S::one() / self.cell_size.y,
            ),
            pairs: Vec::new(),
        }
    }
}
