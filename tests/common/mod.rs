//! A scripted fake terminal for end-to-end tests.

use std::collections::VecDeque;

use caper::gfx::brush::BrushId;
use caper::gfx::curses::Backend;
use caper::gfx::curses::DrawCall;
use caper::gfx::curses::Event;
use caper::gfx::curses::KeyCode;

pub struct ScriptBackend {
  rows: usize,
  cols: usize,
  brushes: usize,
  pub events: VecDeque<Event>,
  pub draws: Vec<DrawCall>,
  pub defined: Vec<(BrushId, u8, u8)>,
  pub flushes: usize,
}

impl ScriptBackend {
  pub fn new(rows: usize, cols: usize) -> Self {
    Self::with_brushes(rows, cols, 64)
  }

  pub fn with_brushes(rows: usize, cols: usize, brushes: usize) -> Self {
    Self {
      rows,
      cols,
      brushes,
      events: VecDeque::new(),
      draws: Vec::new(),
      defined: Vec::new(),
      flushes: 0,
    }
  }

  /// Queues a key press for the main loop to poll.
  pub fn press(&mut self, code: KeyCode) {
    self.events.push_back(Event::Key(code));
  }

  /// Returns the glyphs drawn at the given cell, in draw order.
  pub fn glyphs_at(&self, row: usize, col: usize) -> Vec<char> {
    self
      .draws
      .iter()
      .filter(|d| d.row == row && d.col == col)
      .map(|d| d.glyph)
      .collect()
  }
}

impl Backend for ScriptBackend {
  fn dims(&self) -> (usize, usize) {
    (self.rows, self.cols)
  }

  fn brush_count(&self) -> usize {
    self.brushes
  }

  fn poll(&mut self) -> Option<Event> {
    self.events.pop_front()
  }

  fn define_brush(&mut self, brush: BrushId, fg: u8, bg: u8) {
    self.defined.push((brush, fg, bg));
  }

  fn draw(&mut self, call: DrawCall) {
    self.draws.push(call);
  }

  fn flush(&mut self) {
    self.flushes += 1;
  }
}
