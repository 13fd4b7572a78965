//! The stage, where actors live.
//!
//! A [`Stage`] owns the actor registry, the occupancy index, the dirty set,
//! and the brush pool. Every mutation of a registered actor funnels through
//! one of four notification points (created, moving/moved,
//! animating/animated, destroyed), so the index is never queried
//! mid-transition and dirty cells are marked exactly once per integer-cell
//! change.
//!
//! Hosts refer to actors by [`ActorId`]; mutators on ids whose actor has
//! been destroyed are no-ops, so a stale handle is harmless.

use std::collections::BTreeMap;

use crate::actor::parse_glyphs;
use crate::actor::Actor;
use crate::actor::ActorId;
use crate::actor::ActorSpec;
use crate::actor::Frame;
use crate::geo::Point;
use crate::geo::Rect;
use crate::gfx::brush::BrushCache;
use crate::gfx::curses::Backend;
use crate::gfx::curses::DrawCall;
use crate::stage::index::OccupancyIndex;
use crate::Result;

mod composite;
mod index;
mod physics;

pub use physics::Verdict;

/// Engine configuration, fixed at construction.
#[derive(Copy, Clone, Debug)]
pub struct Config {
  /// Foreground palette index used where nothing supplies one.
  pub default_fg: u8,
  /// Background palette index used where nothing supplies one.
  pub default_bg: u8,
  /// Character painted on cells no actor covers.
  pub bg_char: char,
  /// How far the playable bounds shrink from the grid edge while the border
  /// is enabled.
  pub border_margin: i64,
  /// Whether border crossings bounce (elastic) or merely clamp.
  pub elastic: bool,
  /// Target frames per second for the main loop.
  pub fps: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      default_fg: 4,
      default_bg: 16,
      bg_char: ' ',
      border_margin: 1,
      elastic: true,
      fps: 60,
    }
  }
}

/// A collision-resolution strategy.
///
/// Called once per colliding pair with the mover, the other actor, and the
/// intersecting cells. The hook may mutate the stage (destroy actors, flip
/// velocities, award points) before returning its verdict.
pub type CollisionHook =
  Box<dyn FnMut(&mut Stage, ActorId, ActorId, &[Point<i64>]) -> Verdict>;

/// The engine: a registry of actors on a character grid.
pub struct Stage {
  config: Config,
  bounds: Rect,
  border: bool,
  actors: BTreeMap<ActorId, Actor>,
  next_id: u64,
  index: OccupancyIndex,
  brushes: BrushCache,
  hook: Option<CollisionHook>,
  paused: bool,
  exiting: bool,
}

impl Stage {
  /// Creates a stage covering `backend`'s current grid.
  ///
  /// The whole grid starts dirty, so the first flush paints the background.
  pub fn new<B: Backend>(config: Config, backend: &mut B) -> Self {
    let (rows, cols) = backend.dims();
    let bounds = Rect::with_dims(cols as i64, rows as i64);
    let mut index = OccupancyIndex::new(bounds);
    index.invalidate_all();
    let brushes =
      BrushCache::new(config.default_fg, config.default_bg, backend);

    Self {
      config,
      bounds,
      border: false,
      actors: BTreeMap::new(),
      next_id: 1,
      index,
      brushes,
      hook: None,
      paused: false,
      exiting: false,
    }
  }

  /// Returns the full grid bounds.
  pub fn bounds(&self) -> Rect {
    self.bounds
  }

  /// Returns the playable bounds: the grid, shrunk by the border margin
  /// while the border is enabled.
  pub fn playable(&self) -> Rect {
    if self.border {
      self.bounds.shrink(self.config.border_margin)
    } else {
      self.bounds
    }
  }

  /// Enables or disables the border.
  pub fn set_border(&mut self, on: bool) {
    if self.border != on {
      self.border = on;
      self.index.invalidate_all();
    }
  }

  /// Returns whether the border is enabled.
  pub fn border(&self) -> bool {
    self.border
  }

  /// Suspends ticking. Input and redraw keep running.
  pub fn pause(&mut self) {
    self.paused = true;
  }

  /// Resumes ticking.
  pub fn resume(&mut self) {
    self.paused = false;
  }

  /// Returns whether ticking is suspended.
  pub fn paused(&self) -> bool {
    self.paused
  }

  /// Asks the main loop to terminate at the end of the current pass.
  pub fn exit(&mut self) {
    self.exiting = true;
  }

  /// Returns whether termination has been requested.
  pub fn exiting(&self) -> bool {
    self.exiting
  }

  /// Installs the collision-resolution hook.
  ///
  /// Without one, every collision between two `collides` actors blocks the
  /// move.
  pub fn collision_hook(
    &mut self,
    hook: impl FnMut(&mut Stage, ActorId, ActorId, &[Point<i64>]) -> Verdict
      + 'static,
  ) {
    self.hook = Some(Box::new(hook));
  }

  /// Removes the collision hook, restoring the default blocking policy.
  pub fn clear_collision_hook(&mut self) {
    self.hook = None;
  }

  // ---- Registry ----

  /// Spawns a new actor and registers its footprint.
  pub fn spawn(&mut self, spec: ActorSpec) -> Result<ActorId> {
    let id = ActorId(self.next_id);
    let actor = Actor::new(id, spec)?;
    self.next_id += 1;
    self.actors.insert(id, actor);
    self.note_created(id);
    Ok(id)
  }

  /// Destroys an actor, removing every index and dirty-set reference to it
  /// before the slot is dropped. Destroying a dead id is a no-op.
  pub fn destroy(&mut self, id: ActorId) {
    if self.actors.contains_key(&id) {
      self.note_destroyed(id);
      self.actors.remove(&id);
    }
  }

  /// Returns the actor behind `id`, if it is still alive.
  pub fn actor(&self, id: ActorId) -> Option<&Actor> {
    self.actors.get(&id)
  }

  /// Returns all live actors in id order.
  pub fn actors(&self) -> impl Iterator<Item = &Actor> {
    self.actors.values()
  }

  /// Returns the ids overlapping cell `p`, bottom-most first.
  pub fn occupants(&self, p: Point<i64>) -> Vec<ActorId> {
    self.index.cell(p).iter().map(|&(_, id)| id).collect()
  }

  /// Returns whether `p` is waiting to be repainted.
  pub fn is_dirty(&self, p: Point<i64>) -> bool {
    self.index.dirty_contains(p)
  }

  // ---- Mutators ----
  //
  // Everything that can change an actor's footprint or appearance lives
  // here, not on `Actor`, so the call site shows the index side effect.

  /// Moves an actor to `(x, y)`, subject to border physics and collision
  /// resolution. The accepted position may differ from the request.
  pub fn move_to(&mut self, id: ActorId, x: f64, y: f64) {
    self.move_actor(id, Point::new(x, y));
  }

  /// Sets an actor's velocity in cells per second.
  pub fn set_velocity(&mut self, id: ActorId, xvel: f64, yvel: f64) {
    if let Some(a) = self.actors.get_mut(&id) {
      a.vel = Point::new(xvel, yvel);
    }
  }

  /// Sets an actor's animation rate in frames per second.
  pub fn set_frame_rate(&mut self, id: ActorId, rate: f64) {
    if let Some(a) = self.actors.get_mut(&id) {
      a.frame_rate = rate;
    }
  }

  /// Shows or hides an actor, registering or clearing its footprint.
  pub fn set_visible(&mut self, id: ActorId, visible: bool) {
    match self.actors.get_mut(&id) {
      Some(a) if a.visible != visible => {
        if visible {
          a.visible = true;
          self.register(id);
        } else {
          self.unregister(id);
          if let Some(a) = self.actors.get_mut(&id) {
            a.visible = false;
          }
        }
      }
      _ => {}
    }
  }

  /// Changes an actor's paint order.
  pub fn set_z(&mut self, id: ActorId, z: i32) {
    match self.actors.get(&id) {
      Some(a) if a.z != z => {
        self.unregister(id);
        if let Some(a) = self.actors.get_mut(&id) {
          a.z = z;
        }
        self.register(id);
      }
      _ => {}
    }
  }

  /// Sets the colors an actor lends to cells that don't carry their own.
  pub fn set_colors(&mut self, id: ActorId, fg: Option<u8>, bg: Option<u8>) {
    if let Some(a) = self.actors.get_mut(&id) {
      a.fg = fg;
      a.bg = bg;
      self.touch(id);
    }
  }

  /// Makes an actor transparent (reveal what is beneath) or opaque.
  pub fn set_transparent(&mut self, id: ActorId, transparent: bool) {
    if let Some(a) = self.actors.get_mut(&id) {
      a.transparent = transparent;
      self.touch(id);
    }
  }

  /// Sets whether an actor swaps fg/bg when drawn.
  pub fn set_inverted(&mut self, id: ActorId, inverted: bool) {
    if let Some(a) = self.actors.get_mut(&id) {
      a.inverted = inverted;
      self.touch(id);
    }
  }

  /// Sets whether an actor is subject to boundary physics.
  pub fn set_bordered(&mut self, id: ActorId, bordered: bool) {
    if let Some(a) = self.actors.get_mut(&id) {
      a.bordered = bordered;
    }
  }

  /// Sets whether an actor participates in collision tests.
  pub fn set_collides(&mut self, id: ActorId, collides: bool) {
    if let Some(a) = self.actors.get_mut(&id) {
      a.collides = collides;
    }
  }

  /// Replaces an actor's animation frames with parsed text blocks.
  ///
  /// A bad spec fails before anything is touched; the actor and the index
  /// are left as they were.
  pub fn set_glyphs<S: AsRef<str>>(
    &mut self,
    id: ActorId,
    blocks: &[S],
  ) -> Result<()> {
    self.set_frames(id, parse_glyphs(blocks)?)
  }

  /// Replaces an actor's animation frames with pre-built texel frames.
  pub fn set_frames(&mut self, id: ActorId, frames: Vec<Frame>) -> Result<()> {
    crate::actor::check_frames(&frames)?;
    if !self.actors.contains_key(&id) {
      return Ok(());
    }
    self.unregister(id);
    if let Some(a) = self.actors.get_mut(&id) {
      a.commit_frames(frames);
    }
    self.register(id);
    Ok(())
  }

  /// Jumps an actor's animation to `frame` (fractional, wrapped modulo the
  /// frame count).
  pub fn set_frame(&mut self, id: ActorId, frame: f64) {
    let (old, count) = match self.actors.get(&id) {
      Some(a) => (a.frame(), a.frame_count()),
      None => return,
    };
    let frame = frame.rem_euclid(count as f64);
    if frame as usize != old {
      self.animate(id, frame);
    } else if let Some(a) = self.actors.get_mut(&id) {
      a.frame = frame;
    }
  }

  // ---- Simulation ----

  /// Advances every live actor by `delta` seconds of animation and motion.
  ///
  /// Actors destroyed mid-tick (by a collision hook) are skipped for the
  /// rest of the pass.
  pub fn tick(&mut self, delta: f64) {
    let ids: Vec<ActorId> = self.actors.keys().copied().collect();
    for id in ids {
      self.tick_actor(id, delta);
    }
  }

  fn tick_actor(&mut self, id: ActorId, delta: f64) {
    // Animation first, as a single conceptual update with the motion below.
    let (old, count, frac, rate) = match self.actors.get(&id) {
      Some(a) => (a.frame(), a.frame_count(), a.frame, a.frame_rate),
      None => return,
    };
    if count > 1 && rate != 0.0 {
      let frame = (frac + delta * rate).rem_euclid(count as f64);
      if frame as usize != old {
        self.animate(id, frame);
      } else if let Some(a) = self.actors.get_mut(&id) {
        a.frame = frame;
      }
    }

    let (cell, pos, vel) = match self.actors.get(&id) {
      Some(a) => (a.cell(), a.pos, a.vel),
      None => return,
    };
    if vel == Point::zero() {
      return;
    }
    let candidate = pos + vel * delta;
    if candidate.floor_cell() != cell {
      self.move_actor(id, candidate);
    } else if let Some(a) = self.actors.get_mut(&id) {
      // Sub-cell drift: track it, but leave the index alone.
      a.pos = candidate;
    }
  }

  fn animate(&mut self, id: ActorId, frame: f64) {
    self.note_animating(id);
    if let Some(a) = self.actors.get_mut(&id) {
      a.frame = frame;
    }
    self.note_animated(id);
  }

  fn move_actor(&mut self, id: ActorId, candidate: Point<f64>) {
    let accepted = self.attempt_move(id, candidate);

    // The collision hook may have destroyed the mover.
    let cell = match self.actors.get(&id) {
      Some(a) => a.cell(),
      None => return,
    };
    if accepted.floor_cell() != cell {
      self.note_moving(id);
      if let Some(a) = self.actors.get_mut(&id) {
        a.pos = accepted;
      }
      self.note_moved(id);
    } else if let Some(a) = self.actors.get_mut(&id) {
      a.pos = accepted;
    }
  }

  /// Resolves a candidate position for `id` against border physics and other
  /// actors, returning the accepted position.
  ///
  /// Border reflection happens first and may flip the actor's velocity;
  /// object collisions are then offered to the hook per colliding actor, in
  /// `(z, id)` order. Any blocking verdict keeps the mover at its last
  /// accepted position.
  pub fn attempt_move(
    &mut self,
    id: ActorId,
    candidate: Point<f64>,
  ) -> Point<f64> {
    let (bordered, collides, hsize, vsize) = match self.actors.get(&id) {
      Some(a) => (a.bordered, a.collides, a.hsize, a.vsize),
      None => return candidate,
    };

    let mut cand = candidate;
    if bordered {
      let play = self.playable();
      let (mut xvel, mut yvel) = match self.actors.get(&id) {
        Some(a) => (a.vel.x(), a.vel.y()),
        None => return candidate,
      };
      let x = physics::bounce(
        cand.x(),
        play.upper_left().x() as f64,
        (play.lower_right().x() - hsize as i64) as f64,
        &mut xvel,
        self.config.elastic,
      );
      let y = physics::bounce(
        cand.y(),
        play.upper_left().y() as f64,
        (play.lower_right().y() - vsize as i64) as f64,
        &mut yvel,
        self.config.elastic,
      );
      cand = Point::new(x, y);
      if let Some(a) = self.actors.get_mut(&id) {
        a.vel = Point::new(xvel, yvel);
      }
    }

    if collides {
      let groups = self.collision_groups(id, cand.floor_cell());
      for ((_, other), cells) in groups {
        if !self.actors.contains_key(&id) {
          // A previous hook destroyed the mover; the move is moot.
          return cand;
        }
        if !self.actors.contains_key(&other) {
          continue;
        }
        match self.run_hook(id, other, &cells) {
          Verdict::Pass => continue,
          Verdict::Block => {
            return match self.actors.get(&id) {
              Some(a) => a.pos,
              None => cand,
            };
          }
        }
      }
    }

    cand
  }

  /// Groups the cells of `id`'s footprint at `at` by the other `collides`
  /// actors already occupying them, keyed by their `(z, id)` order.
  fn collision_groups(
    &self,
    id: ActorId,
    at: Point<i64>,
  ) -> BTreeMap<(i32, ActorId), Vec<Point<i64>>> {
    let mut groups: BTreeMap<(i32, ActorId), Vec<Point<i64>>> =
      BTreeMap::new();
    let actor = match self.actors.get(&id) {
      Some(a) => a,
      None => return groups,
    };
    for p in actor.footprint_at(at) {
      for &(z, other) in self.index.cell(p) {
        if other == id {
          continue;
        }
        if !self.actors.get(&other).map_or(false, |o| o.collides) {
          continue;
        }
        groups.entry((z, other)).or_default().push(p);
      }
    }
    groups
  }

  fn run_hook(
    &mut self,
    mover: ActorId,
    other: ActorId,
    cells: &[Point<i64>],
  ) -> Verdict {
    match self.hook.take() {
      Some(mut hook) => {
        let verdict = hook(self, mover, other, cells);
        if self.hook.is_none() {
          self.hook = Some(hook);
        }
        verdict
      }
      None => Verdict::Block,
    }
  }

  // ---- Notifications ----
  //
  // The only places the index is ever written. "Moving"/"animating" fire
  // before the actor's state changes (clearing the old footprint);
  // "moved"/"animated" fire after (registering the new one).

  fn note_created(&mut self, id: ActorId) {
    log::debug!("actor {} created", id);
    self.register(id);
  }

  fn note_destroyed(&mut self, id: ActorId) {
    self.unregister(id);
    log::debug!("actor {} destroyed", id);
  }

  fn note_moving(&mut self, id: ActorId) {
    self.unregister(id);
  }

  fn note_moved(&mut self, id: ActorId) {
    self.register(id);
  }

  fn note_animating(&mut self, id: ActorId) {
    self.unregister(id);
  }

  fn note_animated(&mut self, id: ActorId) {
    self.register(id);
  }

  fn register(&mut self, id: ActorId) {
    let (z, cells) = match self.actors.get(&id) {
      Some(a) if a.visible => (a.z, a.footprint()),
      _ => return,
    };
    for p in cells {
      self.index.insert(p, z, id);
    }
  }

  fn unregister(&mut self, id: ActorId) {
    let (z, cells) = match self.actors.get(&id) {
      Some(a) if a.visible => (a.z, a.footprint()),
      _ => return,
    };
    for p in cells {
      self.index.remove(p, z, id);
    }
  }

  fn touch(&mut self, id: ActorId) {
    let cells = match self.actors.get(&id) {
      Some(a) if a.visible => a.footprint(),
      _ => return,
    };
    for p in cells {
      self.index.mark_dirty(p);
    }
  }

  // ---- Compositing ----

  /// Repaints every dirty cell through `backend` and clears the dirty set.
  ///
  /// On brush exhaustion the pass stops; what was already composited is
  /// flushed, and the remaining cells stay dirty so the next frame can
  /// retry after other pairs free up.
  pub fn flush<B: Backend>(&mut self, backend: &mut B) -> Result<()> {
    let dirty = self.index.dirty_sorted();
    if dirty.is_empty() {
      return Ok(());
    }

    let fallback = composite::Fallback {
      bg_char: self.config.bg_char,
      fg: self.config.default_fg,
      bg: self.config.default_bg,
      border: self.border,
    };
    let actors = &self.actors;
    let index = &self.index;
    let brushes = &mut self.brushes;

    for &p in &dirty {
      let (glyph, fg, bg) = composite::resolve(actors, index, fallback, p);
      let brush = match brushes.acquire(fg, bg, backend, || {
        composite::used_pairs(actors, index, fallback)
      }) {
        Ok(brush) => brush,
        Err(e) => {
          backend.flush();
          return Err(e);
        }
      };
      backend.draw(DrawCall {
        row: p.y() as usize,
        col: p.x() as usize,
        glyph,
        brush,
      });
    }
    backend.flush();

    log::trace!("flushed {} cells", dirty.len());
    self.index.clear_dirty();
    Ok(())
  }

  /// Adapts the stage to a new grid size, re-registering every live actor
  /// and repainting everything.
  pub fn resize(&mut self, rows: usize, cols: usize) {
    self.bounds = Rect::with_dims(cols as i64, rows as i64);
    self.index.resize(self.bounds);
    let ids: Vec<ActorId> = self.actors.keys().copied().collect();
    for id in ids {
      self.register(id);
    }
    log::debug!("stage resized to {}x{}", rows, cols);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::collections::HashSet;
  use std::rc::Rc;

  use proptest::prelude::*;

  use crate::actor::ActorSpec;
  use crate::gfx::brush::BrushId;
  use crate::gfx::curses::Event;

  struct TestBackend {
    rows: usize,
    cols: usize,
    draws: Vec<DrawCall>,
  }

  impl TestBackend {
    fn new(rows: usize, cols: usize) -> Self {
      Self {
        rows,
        cols,
        draws: Vec::new(),
      }
    }
  }

  impl Backend for TestBackend {
    fn dims(&self) -> (usize, usize) {
      (self.rows, self.cols)
    }
    fn brush_count(&self) -> usize {
      16
    }
    fn poll(&mut self) -> Option<Event> {
      None
    }
    fn define_brush(&mut self, _: BrushId, _: u8, _: u8) {}
    fn draw(&mut self, call: DrawCall) {
      self.draws.push(call)
    }
    fn flush(&mut self) {}
  }

  // A stage with the initial full-grid repaint already flushed away.
  fn new_stage(rows: usize, cols: usize) -> (Stage, TestBackend) {
    let mut backend = TestBackend::new(rows, cols);
    let mut stage = Stage::new(Config::default(), &mut backend);
    stage.flush(&mut backend).unwrap();
    backend.draws.clear();
    (stage, backend)
  }

  fn at(x: f64, y: f64, glyphs: &str) -> ActorSpec {
    let mut spec = ActorSpec::of(glyphs);
    spec.pos = (x, y);
    spec
  }

  #[test]
  fn spawn_registers_nonblank_cells() {
    let (mut stage, _b) = new_stage(6, 10);
    let id = stage.spawn(at(2.0, 1.0, "ab\nc\0")).unwrap();

    assert_eq!(stage.occupants(Point::new(2, 1)), vec![id]);
    assert_eq!(stage.occupants(Point::new(3, 1)), vec![id]);
    assert_eq!(stage.occupants(Point::new(2, 2)), vec![id]);
    // The hole claims nothing.
    assert_eq!(stage.occupants(Point::new(3, 2)), vec![]);

    assert!(stage.is_dirty(Point::new(2, 1)));
    assert!(!stage.is_dirty(Point::new(3, 2)));
  }

  #[test]
  fn out_of_grid_footprint_is_clipped() {
    let (mut stage, _b) = new_stage(6, 10);
    let id = stage.spawn(at(-1.0, 0.0, "ab")).unwrap();
    // Only the 'b' lands on the grid.
    assert_eq!(stage.occupants(Point::new(0, 0)), vec![id]);
  }

  #[test]
  fn sub_cell_motion_is_silent() {
    let (mut stage, mut b) = new_stage(6, 10);
    let mut spec = at(0.0, 0.0, "o");
    spec.vel = (0.4, 0.0);
    let id = stage.spawn(spec).unwrap();
    stage.flush(&mut b).unwrap();

    stage.tick(1.0);
    assert_eq!(stage.actor(id).unwrap().pos().x(), 0.4);
    assert!(!stage.is_dirty(Point::new(0, 0)));

    // Crossing the cell boundary dirties both old and new cells.
    stage.tick(2.0);
    assert_eq!(stage.actor(id).unwrap().cell(), Point::new(1, 0));
    assert!(stage.is_dirty(Point::new(0, 0)));
    assert!(stage.is_dirty(Point::new(1, 0)));
  }

  #[test]
  fn sub_frame_animation_is_silent() {
    let (mut stage, mut b) = new_stage(6, 10);
    let mut spec = ActorSpec::animated(&["a", "b"]);
    spec.frame_rate = 1.0;
    let id = stage.spawn(spec).unwrap();
    stage.flush(&mut b).unwrap();

    stage.tick(0.4);
    assert_eq!(stage.actor(id).unwrap().frame(), 0);
    assert!(!stage.is_dirty(Point::new(0, 0)));

    stage.tick(0.7);
    assert_eq!(stage.actor(id).unwrap().frame(), 1);
    assert!(stage.is_dirty(Point::new(0, 0)));
  }

  #[test]
  fn frame_index_wraps() {
    let (mut stage, _b) = new_stage(6, 10);
    let mut spec = ActorSpec::animated(&["a", "b", "c"]);
    spec.frame_rate = 1.0;
    let id = stage.spawn(spec).unwrap();

    stage.set_frame(id, 2.0);
    assert_eq!(stage.actor(id).unwrap().frame(), 2);
    stage.tick(1.5);
    assert_eq!(stage.actor(id).unwrap().frame(), 0);
  }

  #[test]
  fn border_bounce_is_elastic() {
    let (mut stage, _b) = new_stage(4, 10);
    let mut spec = at(9.0, 0.0, "o");
    spec.vel = (1.0, 0.0);
    spec.bordered = true;
    let id = stage.spawn(spec).unwrap();

    // Candidate 10.5 crosses the playable limit 9 by 1.5 and reflects.
    stage.tick(1.5);
    let a = stage.actor(id).unwrap();
    assert_eq!(a.pos().x(), 7.5);
    assert_eq!(a.vel().x(), -1.0);
  }

  #[test]
  fn zero_velocity_clamps_without_flip() {
    let (mut stage, _b) = new_stage(4, 10);
    let mut spec = at(0.0, 0.0, "o");
    spec.bordered = true;
    let id = stage.spawn(spec).unwrap();

    stage.move_to(id, 12.0, 0.0);
    let a = stage.actor(id).unwrap();
    assert_eq!(a.pos().x(), 9.0);
    assert_eq!(a.vel().x(), 0.0);
  }

  #[test]
  fn border_margin_shrinks_playable_bounds() {
    let (mut stage, _b) = new_stage(6, 10);
    stage.set_border(true);
    let mut spec = at(2.0, 2.0, "o");
    spec.bordered = true;
    let id = stage.spawn(spec).unwrap();

    stage.move_to(id, 30.0, 0.0);
    let a = stage.actor(id).unwrap();
    // Playable x range is [1, 8]; clamped, since velocity is zero.
    assert_eq!(a.pos().x(), 8.0);
    assert_eq!(a.pos().y(), 1.0);
  }

  #[test]
  fn collision_default_policy_blocks() {
    let (mut stage, _b) = new_stage(4, 10);
    let first = stage.spawn(at(0.0, 0.0, "A")).unwrap();
    stage.spawn(at(1.0, 0.0, "B")).unwrap();

    stage.move_to(first, 1.0, 0.0);
    assert_eq!(stage.actor(first).unwrap().pos(), Point::new(0.0, 0.0));
    assert_eq!(stage.occupants(Point::new(0, 0)), vec![first]);
  }

  #[test]
  fn blocked_moves_do_not_dirty() {
    let (mut stage, mut b) = new_stage(4, 10);
    let first = stage.spawn(at(0.0, 0.0, "A")).unwrap();
    stage.spawn(at(1.0, 0.0, "B")).unwrap();
    stage.flush(&mut b).unwrap();

    stage.move_to(first, 1.0, 0.0);
    assert!(!stage.is_dirty(Point::new(0, 0)));
    assert!(!stage.is_dirty(Point::new(1, 0)));
  }

  #[test]
  fn non_colliding_actors_pass_through() {
    let (mut stage, _b) = new_stage(4, 10);
    let mut ghost = at(0.0, 0.0, "g");
    ghost.collides = false;
    let ghost = stage.spawn(ghost).unwrap();
    stage.spawn(at(1.0, 0.0, "B")).unwrap();

    stage.move_to(ghost, 1.0, 0.0);
    assert_eq!(stage.actor(ghost).unwrap().cell(), Point::new(1, 0));
  }

  #[test]
  fn hook_pass_allows_the_move() {
    let (mut stage, _b) = new_stage(4, 10);
    let first = stage.spawn(at(0.0, 0.0, "A")).unwrap();
    stage.spawn(at(1.0, 0.0, "B")).unwrap();

    stage.collision_hook(|_, _, _, _| Verdict::Pass);
    stage.move_to(first, 1.0, 0.0);
    assert_eq!(stage.actor(first).unwrap().cell(), Point::new(1, 0));
  }

  #[test]
  fn hook_can_destroy_the_other_actor() {
    let (mut stage, _b) = new_stage(4, 10);
    let first = stage.spawn(at(0.0, 0.0, "A")).unwrap();
    let second = stage.spawn(at(1.0, 0.0, "B")).unwrap();

    stage.collision_hook(move |stage, _mover, other, _cells| {
      stage.destroy(other);
      Verdict::Pass
    });
    stage.move_to(first, 1.0, 0.0);

    assert!(stage.actor(second).is_none());
    assert_eq!(stage.occupants(Point::new(1, 0)), vec![first]);
  }

  #[test]
  fn hook_sees_colliders_in_z_then_id_order() {
    let (mut stage, _b) = new_stage(4, 10);
    let mover = stage.spawn(at(0.0, 0.0, "M")).unwrap();
    let mut high = at(1.0, 0.0, "H");
    high.z = 1;
    let high = stage.spawn(high).unwrap();
    let low = stage.spawn(at(1.0, 0.0, "L")).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    stage.collision_hook(move |_, _, other, _| {
      log.borrow_mut().push(other);
      Verdict::Pass
    });
    stage.move_to(mover, 1.0, 0.0);

    // z 0 before z 1, despite `low` having the larger id.
    assert_eq!(*seen.borrow(), vec![low, high]);
  }

  #[test]
  fn hook_receives_the_intersecting_cells() {
    let (mut stage, _b) = new_stage(4, 10);
    let mover = stage.spawn(at(0.0, 0.0, "MM")).unwrap();
    stage.spawn(at(2.0, 0.0, "BB")).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    stage.collision_hook(move |_, _, _, cells| {
      log.borrow_mut().extend_from_slice(cells);
      Verdict::Block
    });
    // Candidate footprint {1,2} x {0}; only (2, 0) overlaps the blocker.
    stage.move_to(mover, 1.0, 0.0);

    assert_eq!(*seen.borrow(), vec![Point::new(2, 0)]);
    assert_eq!(stage.actor(mover).unwrap().cell(), Point::new(0, 0));
  }

  #[test]
  fn set_visible_toggles_registration() {
    let (mut stage, mut b) = new_stage(4, 10);
    let id = stage.spawn(at(2.0, 2.0, "x")).unwrap();
    stage.flush(&mut b).unwrap();

    stage.set_visible(id, false);
    assert_eq!(stage.occupants(Point::new(2, 2)), vec![]);
    assert!(stage.is_dirty(Point::new(2, 2)));

    stage.flush(&mut b).unwrap();
    stage.set_visible(id, true);
    assert_eq!(stage.occupants(Point::new(2, 2)), vec![id]);
    assert!(stage.is_dirty(Point::new(2, 2)));

    // Re-setting the current value is a no-op.
    stage.flush(&mut b).unwrap();
    stage.set_visible(id, true);
    assert!(!stage.is_dirty(Point::new(2, 2)));
  }

  #[test]
  fn appearance_mutators_dirty_without_reindexing() {
    let (mut stage, mut b) = new_stage(4, 10);
    let id = stage.spawn(at(2.0, 1.0, "x")).unwrap();
    stage.flush(&mut b).unwrap();

    stage.set_colors(id, Some(9), None);
    assert_eq!(stage.occupants(Point::new(2, 1)), vec![id]);
    assert!(stage.is_dirty(Point::new(2, 1)));

    stage.flush(&mut b).unwrap();
    stage.set_inverted(id, true);
    assert!(stage.is_dirty(Point::new(2, 1)));

    stage.flush(&mut b).unwrap();
    stage.set_transparent(id, true);
    assert!(stage.is_dirty(Point::new(2, 1)));
  }

  #[test]
  fn set_z_reorders_the_cell_stack() {
    let (mut stage, _b) = new_stage(4, 10);
    let a = stage.spawn(at(0.0, 0.0, "a")).unwrap();
    let b = stage.spawn(at(0.0, 0.0, "b")).unwrap();
    assert_eq!(stage.occupants(Point::new(0, 0)), vec![a, b]);

    stage.set_z(a, 5);
    assert_eq!(stage.occupants(Point::new(0, 0)), vec![b, a]);
  }

  #[test]
  fn destroy_removes_every_reference() {
    let (mut stage, mut b) = new_stage(4, 10);
    let id = stage.spawn(at(1.0, 1.0, "xx")).unwrap();
    stage.flush(&mut b).unwrap();

    stage.destroy(id);
    assert!(stage.actor(id).is_none());
    assert_eq!(stage.occupants(Point::new(1, 1)), vec![]);
    assert_eq!(stage.occupants(Point::new(2, 1)), vec![]);
    assert!(stage.is_dirty(Point::new(1, 1)));

    // Stale handles are harmless.
    stage.destroy(id);
    stage.move_to(id, 3.0, 3.0);
    stage.set_visible(id, true);
  }

  #[test]
  fn set_glyphs_swaps_the_footprint() {
    let (mut stage, _b) = new_stage(4, 10);
    let id = stage.spawn(at(0.0, 0.0, "ab")).unwrap();

    stage.set_glyphs(id, &["x\ny"]).unwrap();
    assert_eq!(stage.occupants(Point::new(1, 0)), vec![]);
    assert_eq!(stage.occupants(Point::new(0, 1)), vec![id]);
    assert_eq!(stage.actor(id).unwrap().hsize(), 1);
    assert_eq!(stage.actor(id).unwrap().vsize(), 2);
  }

  #[test]
  fn bad_glyphs_leave_the_actor_untouched() {
    let (mut stage, mut b) = new_stage(4, 10);
    let id = stage.spawn(at(0.0, 0.0, "ab")).unwrap();
    stage.flush(&mut b).unwrap();

    let err = stage.set_glyphs::<&str>(id, &[]).unwrap_err();
    assert!(matches!(err, crate::Error::BadGlyphs { .. }));
    assert_eq!(stage.occupants(Point::new(0, 0)), vec![id]);
    assert_eq!(stage.occupants(Point::new(1, 0)), vec![id]);
    assert!(!stage.is_dirty(Point::new(0, 0)));
  }

  #[test]
  fn flush_paints_dirty_cells_once() {
    let (mut stage, mut b) = new_stage(4, 10);
    let mut spec = at(3.0, 1.0, "@");
    spec.fg = Some(2);
    stage.spawn(spec).unwrap();

    stage.flush(&mut b).unwrap();
    assert_eq!(b.draws.len(), 1);
    assert_eq!(b.draws[0].row, 1);
    assert_eq!(b.draws[0].col, 3);
    assert_eq!(b.draws[0].glyph, '@');

    // Nothing changed; nothing to paint.
    b.draws.clear();
    stage.flush(&mut b).unwrap();
    assert!(b.draws.is_empty());
  }

  #[test]
  fn resize_reregisters_live_actors() {
    let (mut stage, _b) = new_stage(4, 10);
    let id = stage.spawn(at(2.0, 2.0, "x")).unwrap();

    stage.resize(8, 20);
    assert_eq!(stage.bounds(), Rect::with_dims(20, 8));
    assert_eq!(stage.occupants(Point::new(2, 2)), vec![id]);
    assert!(stage.is_dirty(Point::new(19, 7)));
  }

  #[test]
  fn pause_and_exit_flags() {
    let (mut stage, _b) = new_stage(4, 10);
    assert!(!stage.paused());
    stage.pause();
    assert!(stage.paused());
    stage.resume();
    assert!(!stage.paused());

    assert!(!stage.exiting());
    stage.exit();
    assert!(stage.exiting());
  }

  // ---- Property tests ----

  fn check_index(stage: &Stage) {
    // Every live, visible actor is registered on exactly its footprint.
    for a in stage.actors() {
      let expect: HashSet<Point<i64>> = if a.visible() {
        a.footprint()
          .into_iter()
          .filter(|&p| stage.bounds().contains(p))
          .collect()
      } else {
        HashSet::new()
      };
      for p in stage.bounds().points() {
        assert_eq!(
          stage.occupants(p).contains(&a.id()),
          expect.contains(&p),
          "index mismatch for actor {} at {:?}",
          a.id(),
          p,
        );
      }
    }
    // And nothing in the index refers to a dead actor.
    for p in stage.bounds().points() {
      for id in stage.occupants(p) {
        assert!(stage.actor(id).is_some(), "stale id {} at {:?}", id, p);
      }
    }
  }

  #[derive(Copy, Clone, Debug)]
  enum Op {
    MoveTo(usize, f64, f64),
    SetVisible(usize, bool),
    SetZ(usize, i32),
    SetGlyphs(usize, u8),
    Tick(f64),
    Destroy(usize),
  }

  fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
      (0..3usize, -4.0..16.0f64, -4.0..10.0f64)
        .prop_map(|(i, x, y)| Op::MoveTo(i, x, y)),
      (0..3usize, any::<bool>()).prop_map(|(i, v)| Op::SetVisible(i, v)),
      (0..3usize, -2..3i32).prop_map(|(i, z)| Op::SetZ(i, z)),
      (0..3usize, 0..3u8).prop_map(|(i, g)| Op::SetGlyphs(i, g)),
      (0.0..0.8f64).prop_map(Op::Tick),
      (0..3usize).prop_map(Op::Destroy),
    ]
  }

  proptest! {
    #[test]
    fn index_matches_footprints_under_any_mutations(
      ops in proptest::collection::vec(arb_op(), 1..40),
    ) {
      let (mut stage, _b) = new_stage(8, 12);

      let mut ids = Vec::new();
      for (i, glyphs) in ["@", "ab\ncd", "o\0o"].iter().enumerate() {
        let mut spec = at(i as f64 * 3.0, 1.0, glyphs);
        spec.vel = (0.9 * i as f64, 0.4);
        spec.bordered = i == 0;
        spec.collides = i != 2;
        ids.push(stage.spawn(spec).unwrap());
      }
      check_index(&stage);

      const GLYPHS: [&str; 3] = ["x", "xy\nzw", "ab\0cd"];
      for op in ops {
        match op {
          Op::MoveTo(i, x, y) => stage.move_to(ids[i], x, y),
          Op::SetVisible(i, v) => stage.set_visible(ids[i], v),
          Op::SetZ(i, z) => stage.set_z(ids[i], z),
          Op::SetGlyphs(i, g) => {
            stage.set_glyphs(ids[i], &[GLYPHS[g as usize]]).unwrap()
          }
          Op::Tick(delta) => stage.tick(delta),
          Op::Destroy(i) => stage.destroy(ids[i]),
        }
        check_index(&stage);
      }
    }
  }
}
