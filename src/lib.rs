//! Caper, a sprite engine for teletype terminals.
//!
//! Caper simulates a cast of [`actor::Actor`]s on a character grid: sprites
//! with sub-cell positions and velocities, animation frames, colors, and
//! collision behavior. Each frame, the [`stage::Stage`] advances every actor,
//! resolves collisions, and repaints only the cells whose contents changed.
//!
//! A host builds an [`app::App`] around a [`gfx::curses::Backend`], registers
//! key handlers and (optionally) a collision hook, spawns actors, and calls
//! [`app::App::run()`].

#![deny(unused)]

pub mod actor;
pub mod app;
pub mod geo;
pub mod gfx;
pub mod stage;
pub mod timing;

use std::error;
use std::fmt;

/// Errors produced by the engine.
///
/// Backend I/O errors are not represented here; they panic inside the
/// backend, since a broken terminal is unrecoverable anyway (see
/// [`gfx::curses`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
  /// Every color-pair id is in use, even after sweeping unused pairs back
  /// into the pool. Fatal to the draw call that needed the pair, not to the
  /// engine; the dirty cells stay dirty and the next flush retries.
  OutOfBrushes,

  /// A glyph spec could not be turned into animation frames: the frame list
  /// was empty, or a frame contained no rows.
  BadGlyphs {
    /// What was wrong with the spec.
    reason: String,
  },
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::OutOfBrushes => write!(f, "out of color-pair ids"),
      Self::BadGlyphs { reason } => write!(f, "bad glyph spec: {}", reason),
    }
  }
}

impl error::Error for Error {}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
