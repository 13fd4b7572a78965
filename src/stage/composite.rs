//! Cell resolution for the compositor.
//!
//! A dirty cell's visible contents come from scanning its occupancy list
//! from the topmost actor downward. The first non-transparent actor with a
//! non-blank glyph supplies the character; the first actor to supply a
//! foreground (or background) supplies that color, with inverted texels
//! swapping their contribution first. The scan stops as soon as all three
//! are known.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::mem;

use crate::actor::Actor;
use crate::actor::ActorId;
use crate::geo::Point;
use crate::geo::Rect;
use crate::stage::index::OccupancyIndex;

/// What to paint where no actor supplies a value.
#[derive(Copy, Clone)]
pub(crate) struct Fallback {
  pub bg_char: char,
  pub fg: u8,
  pub bg: u8,
  pub border: bool,
}

/// Resolves the visible `(glyph, fg, bg)` at `p`.
pub(crate) fn resolve(
  actors: &BTreeMap<ActorId, Actor>,
  index: &OccupancyIndex,
  fallback: Fallback,
  p: Point<i64>,
) -> (char, u8, u8) {
  let mut ch = None;
  let mut fg = None;
  let mut bg = None;

  for &(_, id) in index.cell(p).iter().rev() {
    let actor = match actors.get(&id) {
      Some(actor) => actor,
      None => continue,
    };
    let t = actor.glyph_under(p);

    let (mut tfg, mut tbg) = (t.fg(), t.bg());
    if t.inverted() {
      mem::swap(&mut tfg, &mut tbg);
    }

    if ch.is_none() && !t.is_blank() && !actor.transparent() {
      ch = t.glyph();
    }
    if fg.is_none() {
      fg = tfg;
    }
    if bg.is_none() {
      bg = tbg;
    }
    if ch.is_some() && fg.is_some() && bg.is_some() {
      break;
    }
  }

  let ch = ch.unwrap_or_else(|| {
    if fallback.border && index.bounds().boundary_contains(p) {
      border_glyph(index.bounds(), p)
    } else {
      fallback.bg_char
    }
  });
  (ch, fg.unwrap_or(fallback.fg), bg.unwrap_or(fallback.bg))
}

/// Returns every color pair currently visible anywhere on the grid.
///
/// This is the brush pool's eviction scan; it costs a full-grid resolve, but
/// only runs when the pool is exhausted.
pub(crate) fn used_pairs(
  actors: &BTreeMap<ActorId, Actor>,
  index: &OccupancyIndex,
  fallback: Fallback,
) -> HashSet<(u8, u8)> {
  index
    .bounds()
    .points()
    .map(|p| {
      let (_, fg, bg) = resolve(actors, index, fallback, p);
      (fg, bg)
    })
    .collect()
}

fn border_glyph(bounds: Rect, p: Point<i64>) -> char {
  let left = p.x() == bounds.upper_left().x();
  let right = p.x() == bounds.lower_right().x() - 1;
  let top = p.y() == bounds.upper_left().y();
  let bottom = p.y() == bounds.lower_right().y() - 1;

  match (left, right, top, bottom) {
    (true, _, true, _) => '┌',
    (_, true, true, _) => '┐',
    (true, _, _, true) => '└',
    (_, true, _, true) => '┘',
    (_, _, true, _) | (_, _, _, true) => '─',
    _ => '│',
  }
}
