//! Uniform grid for neighborhood queries.
//!
//! Units are bucketed by `floor(pos / cell_size)` on both axes. A query visits
//! the 3×3 block of cells around the query point, so with a cell size larger
//! than the query radius every candidate within that radius is returned.
//!
//! # Example
//!
//! ```
//! use skirmish_core::entity::{GridPos, UnitId};
//! use skirmish_core::spatial::SpatialGrid;
//!
//! let mut grid = SpatialGrid::new(10);
//! grid.insert(UnitId::new(1), GridPos::new(3, 3));
//! grid.insert(UnitId::new(2), GridPos::new(12, 4));
//! grid.insert(UnitId::new(3), GridPos::new(40, 40));
//!
//! let near = grid.neighborhood(GridPos::new(9, 9));
//! assert_eq!(near, vec![UnitId::new(1), UnitId::new(2)]);
//! ```

use std::collections::HashMap;

use crate::entity::{GridPos, UnitId};

// =============================================================================
// Spatial Grid
// =============================================================================

/// Cell coordinates.
type CellKey = (i32, i32);

/// Grid-hash of unit positions.
///
/// # Note on `HashMap` Usage
///
/// Cells are only looked up by key, never iterated, and query results are
/// sorted before they are returned, so lookup order cannot leak into
/// decisions.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: i32,
    cells: HashMap<CellKey, Vec<(UnitId, GridPos)>>,
    len: usize,
}

impl SpatialGrid {
    /// Creates an empty grid. A `cell_size` below 1 is treated as 1.
    #[must_use]
    pub fn new(cell_size: u32) -> Self {
        Self {
            cell_size: i32::try_from(cell_size.max(1)).unwrap_or(i32::MAX),
            cells: HashMap::new(),
            len: 0,
        }
    }

    /// Builds a grid over the given units.
    #[must_use]
    pub fn build<I>(cell_size: u32, units: I) -> Self
    where
        I: IntoIterator<Item = (UnitId, GridPos)>,
    {
        let mut grid = Self::new(cell_size);
        for (id, pos) in units {
            grid.insert(id, pos);
        }
        grid
    }

    /// Adds a unit. Inserting the same id twice stores it twice; the grid is
    /// rebuilt from scratch each tick so callers never need to move entries.
    pub fn insert(&mut self, id: UnitId, pos: GridPos) {
        let key = self.cell_of(pos);
        self.cells.entry(key).or_default().push((id, pos));
        self.len += 1;
    }

    /// Ids in the 3×3 block of cells around `pos`, sorted by id.
    #[must_use]
    pub fn neighborhood(&self, pos: GridPos) -> Vec<UnitId> {
        let mut out: Vec<UnitId> = self
            .neighborhood_entries(pos)
            .map(|(id, _)| id)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Entries in the neighborhood whose Manhattan distance to `pos` is
    /// strictly below `radius`, sorted by id.
    #[must_use]
    pub fn within(&self, pos: GridPos, radius: u32) -> Vec<(UnitId, GridPos)> {
        let mut out: Vec<(UnitId, GridPos)> = self
            .neighborhood_entries(pos)
            .filter(|(_, other)| pos.manhattan(*other) < radius)
            .collect();
        out.sort_unstable_by_key(|(id, _)| *id);
        out.dedup_by_key(|(id, _)| *id);
        out
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn neighborhood_entries(&self, pos: GridPos) -> impl Iterator<Item = (UnitId, GridPos)> + '_ {
        let (cx, cy) = self.cell_of(pos);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx.saturating_add(dx), cy.saturating_add(dy))))
            .filter_map(|key| self.cells.get(&key))
            .flatten()
            .copied()
    }

    fn cell_of(&self, pos: GridPos) -> CellKey {
        (pos.x.div_euclid(self.cell_size), pos.y.div_euclid(self.cell_size))
    }
}
