//! Actors, the engine's sprites.
//!
//! An [`Actor`] is a rectangular glyph grid with a sub-cell position, a
//! velocity, animation frames, and rendering attributes. Actors are owned by
//! the [`crate::stage::Stage`]; hosts refer to them by [`ActorId`] and mutate
//! them through the stage's methods, which keep the spatial index and dirty
//! set consistent.

use std::convert::TryFrom;
use std::fmt;

use crate::geo::Point;
use crate::gfx::texel::Texel;
use crate::Error;
use crate::Result;

/// A stable actor identity.
///
/// Ids are allocated monotonically by the stage and never reused, so the
/// `(z, id)` pair gives a total order over actors: draw occlusion and
/// per-cell occupancy lists both use it, with higher values painted on top.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct ActorId(pub(crate) u64);

impl fmt::Display for ActorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// One animation frame: rows of texels, possibly ragged.
pub type Frame = Vec<Vec<Texel>>;

/// Everything needed to spawn an actor.
///
/// `glyphs` holds one multi-line text block per animation frame; the NUL
/// character marks a transparent hole that neither draws nor occupies its
/// cell. Build one with [`ActorSpec::of()`] or [`ActorSpec::animated()`] and
/// adjust fields as needed.
#[derive(Clone, Debug)]
pub struct ActorSpec {
  /// Initial position.
  pub pos: (f64, f64),
  /// Animation frames as text blocks.
  pub glyphs: Vec<String>,
  /// Paint order; lower is painted first.
  pub z: i32,
  /// Initial velocity in cells per second.
  pub vel: (f64, f64),
  /// Animation rate in frames per second.
  pub frame_rate: f64,
  /// Foreground for cells that don't set their own.
  pub fg: Option<u8>,
  /// Background for cells that don't set their own.
  pub bg: Option<u8>,
  /// Swap fg/bg when drawing.
  pub inverted: bool,
  /// Reveal what is beneath instead of drawing glyphs.
  pub transparent: bool,
  /// Bounce or clamp at the playable bounds.
  pub bordered: bool,
  /// Participate in collision tests.
  pub collides: bool,
  /// Drawn and registered in the spatial index.
  pub visible: bool,
}

impl ActorSpec {
  /// Creates a spec for a static, single-frame sprite.
  pub fn of(glyphs: impl Into<String>) -> Self {
    Self {
      glyphs: vec![glyphs.into()],
      ..Self::default()
    }
  }

  /// Creates a spec for an animated sprite, one text block per frame.
  pub fn animated(frames: &[&str]) -> Self {
    Self {
      glyphs: frames.iter().map(|f| (*f).to_string()).collect(),
      ..Self::default()
    }
  }
}

impl Default for ActorSpec {
  fn default() -> Self {
    Self {
      pos: (0.0, 0.0),
      glyphs: Vec::new(),
      z: 0,
      vel: (0.0, 0.0),
      frame_rate: 30.0,
      fg: None,
      bg: None,
      inverted: false,
      transparent: false,
      bordered: false,
      collides: true,
      visible: true,
    }
  }
}

/// A sprite on the stage.
///
/// The exposed cell position is the floor of the floating-point position;
/// motion and animation accumulate fractionally and only disturb the spatial
/// index when an integer cell or frame index actually changes.
pub struct Actor {
  pub(crate) id: ActorId,
  pub(crate) z: i32,
  pub(crate) pos: Point<f64>,
  pub(crate) vel: Point<f64>,
  pub(crate) frame: f64,
  pub(crate) frame_rate: f64,
  pub(crate) frames: Vec<Frame>,
  pub(crate) hsize: usize,
  pub(crate) vsize: usize,
  pub(crate) fg: Option<u8>,
  pub(crate) bg: Option<u8>,
  pub(crate) inverted: bool,
  pub(crate) transparent: bool,
  pub(crate) bordered: bool,
  pub(crate) collides: bool,
  pub(crate) visible: bool,
}

impl Actor {
  pub(crate) fn new(id: ActorId, spec: ActorSpec) -> Result<Self> {
    let frames = parse_glyphs(&spec.glyphs)?;
    let (hsize, vsize) = measure(&frames);

    Ok(Self {
      id,
      z: spec.z,
      pos: Point::new(spec.pos.0, spec.pos.1),
      vel: Point::new(spec.vel.0, spec.vel.1),
      frame: 0.0,
      frame_rate: spec.frame_rate,
      frames,
      hsize,
      vsize,
      fg: spec.fg,
      bg: spec.bg,
      inverted: spec.inverted,
      transparent: spec.transparent,
      bordered: spec.bordered,
      collides: spec.collides,
      visible: spec.visible,
    })
  }

  /// Returns this actor's id.
  #[inline]
  pub fn id(&self) -> ActorId {
    self.id
  }

  /// Returns this actor's paint order.
  #[inline]
  pub fn z(&self) -> i32 {
    self.z
  }

  /// Returns the `(z, id)` key that totally orders actors.
  #[inline]
  pub fn ord_key(&self) -> (i32, ActorId) {
    (self.z, self.id)
  }

  /// Returns this actor's exact position.
  #[inline]
  pub fn pos(&self) -> Point<f64> {
    self.pos
  }

  /// Returns the cell containing this actor's upper-left corner.
  #[inline]
  pub fn cell(&self) -> Point<i64> {
    self.pos.floor_cell()
  }

  /// Returns this actor's velocity in cells per second.
  #[inline]
  pub fn vel(&self) -> Point<f64> {
    self.vel
  }

  /// Returns this actor's bounding-box width in cells.
  #[inline]
  pub fn hsize(&self) -> usize {
    self.hsize
  }

  /// Returns this actor's bounding-box height in cells.
  #[inline]
  pub fn vsize(&self) -> usize {
    self.vsize
  }

  /// Returns the number of animation frames.
  #[inline]
  pub fn frame_count(&self) -> usize {
    self.frames.len()
  }

  /// Returns the current (integer) animation frame.
  #[inline]
  pub fn frame(&self) -> usize {
    (self.frame as usize) % self.frames.len().max(1)
  }

  /// Returns whether this actor is visible.
  #[inline]
  pub fn visible(&self) -> bool {
    self.visible
  }

  /// Returns whether this actor reveals what is beneath it.
  #[inline]
  pub fn transparent(&self) -> bool {
    self.transparent
  }

  /// Returns whether this actor is subject to boundary physics.
  #[inline]
  pub fn bordered(&self) -> bool {
    self.bordered
  }

  /// Returns whether this actor participates in collision tests.
  #[inline]
  pub fn collides(&self) -> bool {
    self.collides
  }

  /// Returns the texel of the current frame at the given offset.
  ///
  /// Out-of-bounds offsets are not an error; they return the blank texel,
  /// which callers rely on to never occupy a cell. Cells that don't carry
  /// their own colors inherit the actor's, and the actor's invert setting
  /// applies on top of the cell's.
  pub fn glyph_at(&self, col: i64, row: i64) -> Texel {
    let t = usize::try_from(col)
      .ok()
      .zip(usize::try_from(row).ok())
      .and_then(|(c, r)| self.frames.get(self.frame())?.get(r)?.get(c))
      .copied()
      .unwrap_or_else(Texel::blank);

    if t.is_blank() {
      return t;
    }

    let t = match (t.fg(), self.fg) {
      (None, Some(fg)) => t.with_fg(fg),
      _ => t,
    };
    let t = match (t.bg(), self.bg) {
      (None, Some(bg)) => t.with_bg(bg),
      _ => t,
    };
    t.with_invert(t.inverted() || self.inverted)
  }

  /// Returns the texel under the absolute cell `p`, given the actor's
  /// current position.
  #[inline]
  pub fn glyph_under(&self, p: Point<i64>) -> Texel {
    let rel = p - self.cell();
    self.glyph_at(rel.x(), rel.y())
  }

  /// Returns the absolute cells this actor's non-blank glyphs would cover if
  /// its upper-left corner were in cell `at`.
  ///
  /// Holes in the sprite (blank texels) claim nothing.
  pub fn footprint_at(&self, at: Point<i64>) -> Vec<Point<i64>> {
    let mut cells = Vec::with_capacity(self.hsize * self.vsize);
    for row in 0..self.vsize as i64 {
      for col in 0..self.hsize as i64 {
        if !self.glyph_at(col, row).is_blank() {
          cells.push(at + Point::new(col, row));
        }
      }
    }
    cells
  }

  /// Returns the absolute cells this actor's non-blank glyphs currently
  /// cover.
  #[inline]
  pub fn footprint(&self) -> Vec<Point<i64>> {
    self.footprint_at(self.cell())
  }

  // The caller validates with `check_frames` first.
  pub(crate) fn commit_frames(&mut self, frames: Vec<Frame>) {
    let (hsize, vsize) = measure(&frames);
    self.frames = frames;
    self.hsize = hsize;
    self.vsize = vsize;
    self.frame = 0.0;
  }
}

/// Parses text blocks into texel frames.
///
/// Every character becomes a colorless texel; NUL characters become blank
/// texels (holes). Rows may be ragged, and a trailing newline produces a
/// final empty row, matching how sprites are usually written as raw string
/// literals.
pub(crate) fn parse_glyphs<S: AsRef<str>>(blocks: &[S]) -> Result<Vec<Frame>> {
  let frames = blocks
    .iter()
    .map(|block| {
      block
        .as_ref()
        .split('\n')
        .map(|line| {
          line
            .chars()
            .map(|c| if c == '\0' { Texel::blank() } else { Texel::new(c) })
            .collect()
        })
        .collect()
    })
    .collect::<Vec<Frame>>();

  check_frames(&frames)?;
  Ok(frames)
}

pub(crate) fn check_frames(frames: &[Frame]) -> Result<()> {
  if frames.is_empty() {
    return Err(Error::BadGlyphs {
      reason: "no frames".into(),
    });
  }
  for (i, frame) in frames.iter().enumerate() {
    if frame.is_empty() {
      return Err(Error::BadGlyphs {
        reason: format!("frame {} has no rows", i),
      });
    }
  }
  if frames[0].iter().all(|row| row.is_empty()) {
    return Err(Error::BadGlyphs {
      reason: "frame 0 is empty".into(),
    });
  }
  Ok(())
}

fn measure(frames: &[Frame]) -> (usize, usize) {
  let hsize = frames[0].iter().map(Vec::len).max().unwrap_or(0);
  let vsize = frames[0].len();
  (hsize, vsize)
}
