//! Graphics: texels, colors, brushes, and the render boundary.

pub mod brush;
pub mod color;
pub mod curses;
pub mod texel;

pub use brush::BrushCache;
pub use curses::Backend;
pub use curses::Curses;
pub use texel::Texel;
