//! Texels, terminal elements.
//!
//! A *texel* is one cell of a sprite frame: a glyph plus optional foreground
//! and background colors and an invert flag. Colors are 8-bit terminal
//! palette indices; see [`crate::gfx::color`] for mapping RGB values onto
//! them.
//!
//! A texel with no glyph is *blank*: it never occupies a cell in the spatial
//! index, and it is the sentinel value returned for out-of-bounds glyph
//! lookups. A texel with no foreground (or background) inherits that color
//! from whatever lies beneath it when composited.

/// A terminal element, analogous to a pixel.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Texel {
  glyph: Option<char>,
  fg: u8,
  bg: u8,
  meta: Meta,
}

bitflags::bitflags! {
  struct Meta: u8 {
    const FG_SET = 1 << 0;
    const BG_SET = 1 << 1;
    const INVERT = 1 << 2;
  }
}

impl Texel {
  /// Creates a new blank texel.
  #[inline]
  pub fn blank() -> Self {
    Self {
      glyph: None,
      fg: 0,
      bg: 0,
      meta: Meta::empty(),
    }
  }

  /// Creates a new colorless texel with the given glyph.
  #[inline]
  pub fn new(glyph: char) -> Self {
    Self {
      glyph: Some(glyph),
      fg: 0,
      bg: 0,
      meta: Meta::empty(),
    }
  }

  /// Returns this texel's glyph, if it has one.
  #[inline]
  pub fn glyph(self) -> Option<char> {
    self.glyph
  }

  /// Returns whether this texel is blank.
  #[inline]
  pub fn is_blank(self) -> bool {
    self.glyph.is_none()
  }

  /// Returns this texel's foreground color index.
  #[inline]
  pub fn fg(self) -> Option<u8> {
    if self.meta.contains(Meta::FG_SET) {
      Some(self.fg)
    } else {
      None
    }
  }

  /// Returns a copy of this texel with the given foreground color.
  ///
  /// `None` makes the foreground inherit from the layer beneath.
  #[inline]
  pub fn with_fg(mut self, color: impl Into<Option<u8>>) -> Self {
    match color.into() {
      Some(c) => {
        self.fg = c;
        self.meta |= Meta::FG_SET;
      }
      None => {
        self.fg = 0;
        self.meta.remove(Meta::FG_SET);
      }
    }
    self
  }

  /// Returns this texel's background color index.
  #[inline]
  pub fn bg(self) -> Option<u8> {
    if self.meta.contains(Meta::BG_SET) {
      Some(self.bg)
    } else {
      None
    }
  }

  /// Returns a copy of this texel with the given background color.
  ///
  /// `None` makes the background inherit from the layer beneath.
  #[inline]
  pub fn with_bg(mut self, color: impl Into<Option<u8>>) -> Self {
    match color.into() {
      Some(c) => {
        self.bg = c;
        self.meta |= Meta::BG_SET;
      }
      None => {
        self.bg = 0;
        self.meta.remove(Meta::BG_SET);
      }
    }
    self
  }

  /// Returns whether this texel swaps its fg/bg contribution when drawn.
  #[inline]
  pub fn inverted(self) -> bool {
    self.meta.contains(Meta::INVERT)
  }

  /// Returns a copy of this texel with the given invert setting.
  #[inline]
  pub fn with_invert(mut self, invert: bool) -> Self {
    if invert {
      self.meta |= Meta::INVERT;
    } else {
      self.meta.remove(Meta::INVERT);
    }
    self
  }
}
