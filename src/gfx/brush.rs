//! The brush pool.
//!
//! Terminals support a small, fixed number of color-pair slots, but a scene
//! can reference an unbounded set of logical (foreground, background) pairs.
//! [`BrushCache`] hands out pooled [`BrushId`]s for pairs, and when the pool
//! runs dry it sweeps pairs that are no longer visible anywhere on screen
//! back into the free set.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

use crate::gfx::curses::Backend;
use crate::Error;
use crate::Result;

/// A pooled color-pair handle, as accepted by [`Backend::draw()`].
///
/// Id 0 is always the default pair.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct BrushId(u16);

impl BrushId {
  /// Returns this id as a table index.
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for BrushId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A pool of color-pair brushes.
///
/// Many actors may share one brush; the cache is keyed by the pair, not by
/// who asked for it.
pub struct BrushCache {
  free: BTreeSet<u16>,
  pairs: HashMap<(u8, u8), BrushId>,
  default_pair: (u8, u8),
}

impl BrushCache {
  /// Creates a new cache over `backend`'s brush table, binding brush 0 to the
  /// default pair.
  pub fn new<B: Backend>(
    default_fg: u8,
    default_bg: u8,
    backend: &mut B,
  ) -> Self {
    let count = backend.brush_count().min(u16::MAX as usize) as u16;
    backend.define_brush(BrushId(0), default_fg, default_bg);

    let mut pairs = HashMap::new();
    pairs.insert((default_fg, default_bg), BrushId(0));

    Self {
      free: (1..count).collect(),
      pairs,
      default_pair: (default_fg, default_bg),
    }
  }

  /// Returns the brush for the default pair.
  #[inline]
  pub fn default_brush(&self) -> BrushId {
    BrushId(0)
  }

  /// Returns the brush for `(fg, bg)`, allocating one if needed.
  ///
  /// On pool exhaustion, `in_use` must produce the set of pairs currently
  /// visible on screen; every allocated pair outside that set is swept back
  /// into the pool and the allocation is retried once. If the pool is still
  /// empty the call fails with [`Error::OutOfBrushes`].
  pub fn acquire<B: Backend>(
    &mut self,
    fg: u8,
    bg: u8,
    backend: &mut B,
    in_use: impl FnOnce() -> HashSet<(u8, u8)>,
  ) -> Result<BrushId> {
    if let Some(&id) = self.pairs.get(&(fg, bg)) {
      return Ok(id);
    }

    let id = match self.pop_free() {
      Some(id) => id,
      None => {
        self.sweep(&in_use());
        self.pop_free().ok_or(Error::OutOfBrushes)?
      }
    };

    backend.define_brush(id, fg, bg);
    self.pairs.insert((fg, bg), id);
    Ok(id)
  }

  /// Returns every allocated-but-unused pair's id to the pool.
  ///
  /// `used` is the set of pairs that must stay allocated. The default pair
  /// always survives a sweep.
  pub fn sweep(&mut self, used: &HashSet<(u8, u8)>) {
    let free = &mut self.free;
    let default_pair = self.default_pair;
    let before = self.pairs.len();

    self.pairs.retain(|pair, id| {
      if *pair == default_pair || used.contains(pair) {
        return true;
      }
      free.insert(id.0);
      false
    });

    log::debug!(
      "brush sweep: {} released, {} free",
      before - self.pairs.len(),
      self.free.len()
    );
  }

  /// Returns how many pairs are currently allocated.
  pub fn allocated(&self) -> usize {
    self.pairs.len()
  }

  fn pop_free(&mut self) -> Option<BrushId> {
    let id = *self.free.iter().next()?;
    self.free.remove(&id);
    Some(BrushId(id))
  }
}
