//! The render boundary, `curses`-style.
//!
//! The engine draws through the [`Backend`] trait: a character grid with a
//! small table of color-pair *brushes*, a per-cell draw call, and a
//! non-blocking input poll. [`Curses`] is the real implementation; it doesn't
//! *actually* use `libcurses`, and merely emulates its behavior at a high
//! level in terms of another library.
//!
//! All errors from the terminal will panic, since those errors are
//! effectively unrecoverable.

use std::io;
use std::time::Duration;

use crate::gfx::brush::BrushId;

pub use crossterm::event::KeyCode;
pub use crossterm::event::KeyModifiers;

/// A single input event from the terminal.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Event {
  /// A key press.
  Key(KeyCode),
  /// The terminal was resized to `(rows, cols)`.
  Resize(usize, usize),
}

/// Arguments for a draw call.
///
/// See [`Backend::draw()`].
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DrawCall {
  pub row: usize,
  pub col: usize,
  pub glyph: char,
  pub brush: BrushId,
}

/// What the engine needs from a terminal.
///
/// Colors only cross this boundary as brushes: the engine defines a brush id
/// as a (foreground, background) palette-index pair once, then draws cells
/// by brush id, mirroring how `curses` color pairs work. Implementations
/// hold at most [`brush_count()`](Backend::brush_count) definitions.
pub trait Backend {
  /// Returns the current grid size as `(rows, cols)`.
  fn dims(&self) -> (usize, usize);

  /// Returns how many brush ids this terminal supports.
  fn brush_count(&self) -> usize;

  /// Polls for a pending input event without blocking.
  fn poll(&mut self) -> Option<Event>;

  /// Binds `brush` to the given palette-index pair.
  fn define_brush(&mut self, brush: BrushId, fg: u8, bg: u8);

  /// Draws one cell. Calls may be buffered until [`flush()`](Backend::flush).
  fn draw(&mut self, call: DrawCall);

  /// Makes all buffered draw calls visible.
  fn flush(&mut self);
}

/// A low-level terminal context over an arbitrary writer.
pub struct Curses<W: io::Write = io::Stdout> {
  w: W,
  brushes: Vec<(u8, u8)>,
}

impl Curses {
  /// Initializes the terminal environment on stdout.
  pub fn init() -> Curses {
    Curses::with(io::stdout())
  }
}

impl<W: io::Write> Curses<W> {
  /// Initializes the terminal environment for `w`.
  pub fn with(mut w: W) -> Curses<W> {
    crossterm::execute!(
      w,
      crossterm::terminal::EnterAlternateScreen,
      crossterm::cursor::Hide,
      crossterm::terminal::DisableLineWrap,
    )
    .unwrap();
    crossterm::terminal::enable_raw_mode().unwrap();

    Curses {
      w,
      brushes: vec![(0, 0); 256],
    }
  }

  /// Clean up whatever mess the terminal made.
  fn cleanup(&mut self) {
    crossterm::execute!(
      self.w,
      crossterm::terminal::LeaveAlternateScreen,
      crossterm::cursor::Show,
      crossterm::terminal::EnableLineWrap,
    )
    .unwrap();
    crossterm::terminal::disable_raw_mode().unwrap();
    self.w.flush().unwrap();
  }
}

impl<W: io::Write> Backend for Curses<W> {
  fn dims(&self) -> (usize, usize) {
    let (cols, rows) = crossterm::terminal::size().unwrap();
    (rows as usize, cols as usize)
  }

  fn brush_count(&self) -> usize {
    self.brushes.len()
  }

  fn poll(&mut self) -> Option<Event> {
    use crossterm::event;

    while event::poll(Duration::default()).unwrap() {
      match event::read().unwrap() {
        event::Event::Key(e) => return Some(Event::Key(e.code)),
        event::Event::Resize(cols, rows) => {
          return Some(Event::Resize(rows as usize, cols as usize))
        }
        _ => continue,
      }
    }
    None
  }

  fn define_brush(&mut self, brush: BrushId, fg: u8, bg: u8) {
    if let Some(pair) = self.brushes.get_mut(brush.index()) {
      *pair = (fg, bg);
    }
  }

  fn draw(&mut self, call: DrawCall) {
    use crossterm::style::Color;
    use crossterm::style::Colors;

    let (fg, bg) = self.brushes[call.brush.index()];
    crossterm::queue!(
      self.w,
      crossterm::cursor::MoveTo(call.col as u16, call.row as u16),
      crossterm::style::SetColors(Colors {
        foreground: Some(Color::AnsiValue(fg)),
        background: Some(Color::AnsiValue(bg)),
      }),
      crossterm::style::Print(call.glyph),
    )
    .unwrap();
  }

  fn flush(&mut self) {
    self.w.flush().unwrap();
  }
}

impl<W: io::Write> Drop for Curses<W> {
  fn drop(&mut self) {
    self.cleanup();
  }
}
