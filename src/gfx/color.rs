//! 256-color palette utilities.
//!
//! The engine addresses colors by 8-bit terminal palette index. Indices 16
//! through 231 form a 6x6x6 RGB cube and 232 through 255 a 24-step greyscale
//! ramp; these helpers map between indices and RGB without any further
//! color-space machinery.

pub use palette::named as colors;

/// An RGB value, as used by hosts picking colors.
pub type Rgb = palette::Srgb<u8>;

/// Returns the palette index for the given RGB-cube components.
///
/// Components range over `0..=5`.
pub fn rgb_to_index(red: u8, green: u8, blue: u8) -> u8 {
  16 + red * 36 + green * 6 + blue
}

/// Returns the RGB-cube components `[red, green, blue]` of a cube index.
///
/// Indices outside the cube (below 16 or in the greyscale ramp) come back as
/// black.
pub fn index_to_rgb(index: u8) -> [u8; 3] {
  if !(16..232).contains(&index) {
    return [0, 0, 0];
  }
  let c = index - 16;
  [c / 36, c / 6 % 6, c % 6]
}

/// Returns the palette index for a greyscale ramp level.
///
/// Levels range over `0..=23`, darkest first.
pub fn grey_to_index(level: u8) -> u8 {
  232 + level.min(23)
}

/// Returns the greyscale ramp level of an index, if it is in the ramp.
pub fn index_to_grey(index: u8) -> Option<u8> {
  index.checked_sub(232)
}

// Channel values used by the cube (0, 95, 135, 175, 215, 255) and the
// greyscale ramp (8, 18, .. 238).
fn cube_value(level: u8) -> i32 {
  if level == 0 {
    0
  } else {
    55 + 40 * level as i32
  }
}

fn cube_level(channel: u8) -> u8 {
  if channel < 48 {
    0
  } else if channel < 115 {
    1
  } else {
    ((channel as i32 - 35) / 40) as u8
  }
}

/// Returns the palette index closest to the given RGB value.
///
/// Both the RGB cube and the greyscale ramp are considered; whichever is
/// nearer in channel space wins.
pub fn nearest(rgb: Rgb) -> u8 {
  let (r, g, b) = (rgb.red, rgb.green, rgb.blue);

  let (rl, gl, bl) = (cube_level(r), cube_level(g), cube_level(b));
  let cube_err = dist(r, cube_value(rl))
    + dist(g, cube_value(gl))
    + dist(b, cube_value(bl));

  let avg = (r as i32 + g as i32 + b as i32) / 3;
  let grey_level = ((avg - 8).max(0) / 10).min(23) as u8;
  let grey_channel = 8 + 10 * grey_level as i32;
  let grey_err =
    dist(r, grey_channel) + dist(g, grey_channel) + dist(b, grey_channel);

  if grey_err < cube_err {
    grey_to_index(grey_level)
  } else {
    rgb_to_index(rl, gl, bl)
  }
}

fn dist(channel: u8, value: i32) -> i64 {
  let d = channel as i64 - value as i64;
  d * d
}
