//! The occupancy index and dirty set.
//!
//! The index is the single source of truth for which actors overlap which
//! cell, for both collision lookups and draw-time occlusion. Each cell holds
//! a list of `(z, id)` entries kept sorted ascending, so the last entry is
//! the topmost actor.
//!
//! Cells are marked dirty whenever an entry is inserted or removed, which is
//! exactly when some actor's contribution to the cell may have changed.

use std::collections::HashSet;

use crate::actor::ActorId;
use crate::geo::Point;
use crate::geo::Rect;
use crate::geo::RectVec;

pub(crate) struct OccupancyIndex {
  cells: RectVec<Vec<(i32, ActorId)>>,
  dirty: HashSet<Point<i64>>,
}

impl OccupancyIndex {
  pub fn new(bounds: Rect) -> Self {
    Self {
      cells: RectVec::new(bounds, Vec::new()),
      dirty: HashSet::new(),
    }
  }

  pub fn bounds(&self) -> Rect {
    self.cells.dims()
  }

  /// Returns the `(z, id)` entries overlapping `p`, bottom-most first.
  ///
  /// Out-of-grid cells are empty.
  pub fn cell(&self, p: Point<i64>) -> &[(i32, ActorId)] {
    self.cells.get(p).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Inserts an entry at `p`, keeping the cell's `(z, id)` order.
  ///
  /// Inserting an entry that is already present is a no-op: the cell is not
  /// duplicated and not re-dirtied. Out-of-grid cells are ignored.
  pub fn insert(&mut self, p: Point<i64>, z: i32, id: ActorId) {
    let list = match self.cells.get_mut(p) {
      Some(list) => list,
      None => return,
    };
    if let Err(i) = list.binary_search(&(z, id)) {
      list.insert(i, (z, id));
      self.dirty.insert(p);
    }
  }

  /// Removes an entry at `p`.
  ///
  /// Removing an absent entry is a no-op, and does not dirty the cell.
  pub fn remove(&mut self, p: Point<i64>, z: i32, id: ActorId) {
    let list = match self.cells.get_mut(p) {
      Some(list) => list,
      None => return,
    };
    if let Ok(i) = list.binary_search(&(z, id)) {
      list.remove(i);
      self.dirty.insert(p);
    }
  }

  /// Marks `p` dirty without touching its occupancy (appearance-only
  /// changes). Out-of-grid cells are ignored.
  pub fn mark_dirty(&mut self, p: Point<i64>) {
    if self.cells.dims().contains(p) {
      self.dirty.insert(p);
    }
  }

  /// Marks the whole grid dirty.
  pub fn invalidate_all(&mut self) {
    for p in self.cells.dims().points() {
      self.dirty.insert(p);
    }
  }

  pub fn dirty_contains(&self, p: Point<i64>) -> bool {
    self.dirty.contains(&p)
  }

  /// Returns the dirty cells in row-major order.
  pub fn dirty_sorted(&self) -> Vec<Point<i64>> {
    let mut cells: Vec<_> = self.dirty.iter().copied().collect();
    cells.sort_by_key(|p| (p.y(), p.x()));
    cells
  }

  /// Forgets all dirty cells. Called only after a complete flush pass.
  pub fn clear_dirty(&mut self) {
    self.dirty.clear();
  }

  /// Replaces the grid, dropping all occupancy, and marks everything dirty.
  ///
  /// The caller re-registers live actors afterwards.
  pub fn resize(&mut self, bounds: Rect) {
    self.cells = RectVec::new(bounds, Vec::new());
    self.dirty.clear();
    self.invalidate_all();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn index() -> OccupancyIndex {
    let mut ix = OccupancyIndex::new(Rect::with_dims(4, 4));
    ix.clear_dirty();
    ix
  }

  #[test]
  fn insert_keeps_z_then_id_order() {
    let mut ix = index();
    let p = Point::new(1, 1);
    ix.insert(p, 1, ActorId(9));
    ix.insert(p, 0, ActorId(5));
    ix.insert(p, 1, ActorId(2));
    assert_eq!(
      ix.cell(p),
      &[(0, ActorId(5)), (1, ActorId(2)), (1, ActorId(9))]
    );
  }

  #[test]
  fn insert_is_idempotent() {
    let mut ix = index();
    let p = Point::new(0, 0);
    ix.insert(p, 0, ActorId(1));
    ix.clear_dirty();
    ix.insert(p, 0, ActorId(1));
    assert_eq!(ix.cell(p).len(), 1);
    assert!(!ix.dirty_contains(p));
  }

  #[test]
  fn remove_of_absent_entry_is_a_no_op() {
    let mut ix = index();
    let p = Point::new(2, 2);
    ix.remove(p, 0, ActorId(1));
    assert!(!ix.dirty_contains(p));
  }

  #[test]
  fn mutations_mark_dirty() {
    let mut ix = index();
    let p = Point::new(3, 0);
    ix.insert(p, 0, ActorId(1));
    assert!(ix.dirty_contains(p));
    ix.clear_dirty();
    ix.remove(p, 0, ActorId(1));
    assert!(ix.dirty_contains(p));
  }

  #[test]
  fn out_of_grid_cells_are_clipped() {
    let mut ix = index();
    let p = Point::new(7, 7);
    ix.insert(p, 0, ActorId(1));
    assert_eq!(ix.cell(p), &[]);
    assert!(!ix.dirty_contains(p));
  }
}
