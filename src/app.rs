//! The main loop.
//!
//! [`App`] ties a [`Stage`] to a [`Backend`] and runs the frame loop: poll
//! one input event, dispatch it to a registered key handler, advance every
//! actor by the elapsed wall clock (unless paused), repaint the dirty cells,
//! and sleep off the rest of the frame. Everything happens on the calling
//! thread; input never blocks, so latency is bounded by per-frame work.

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use crate::gfx::curses::Backend;
use crate::gfx::curses::Event;
use crate::gfx::curses::KeyCode;
use crate::stage::Config;
use crate::stage::Stage;
use crate::timing::FrameTimer;
use crate::timing::PhaseTimer;
use crate::Result;

/// What a key handler tells the loop to do next.
///
/// Termination is ordinary control flow, not an error: returning
/// [`Flow::Exit`] flushes whatever was already composited and unwinds the
/// loop cleanly.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Flow {
  /// Keep looping.
  Continue,
  /// Terminate after flushing.
  Exit,
}

/// A registered key handler.
pub type KeyHandler = Box<dyn FnMut(&mut Stage) -> Result<Flow>>;

/// An interactive application: a stage, a backend, and a dispatch table.
pub struct App<B: Backend> {
  backend: B,
  stage: Stage,
  handlers: HashMap<KeyCode, KeyHandler>,
  frames: FrameTimer,
  phases: PhaseTimer,
  fps: u32,
}

impl<B: Backend> App<B> {
  /// Creates an application over `backend`.
  pub fn new(mut backend: B, config: Config) -> Self {
    let fps = config.fps;
    let stage = Stage::new(config, &mut backend);
    Self {
      backend,
      stage,
      handlers: HashMap::new(),
      frames: FrameTimer::new(),
      phases: PhaseTimer::new(),
      fps,
    }
  }

  /// Returns the stage.
  pub fn stage(&self) -> &Stage {
    &self.stage
  }

  /// Returns the stage, for spawning and mutating actors between frames.
  pub fn stage_mut(&mut self) -> &mut Stage {
    &mut self.stage
  }

  /// Returns the backend.
  pub fn backend(&self) -> &B {
    &self.backend
  }

  /// Registers `handler` to run whenever `code` is pressed.
  ///
  /// One handler per key code; registering again replaces the old one.
  pub fn on_key(
    &mut self,
    code: KeyCode,
    handler: impl FnMut(&mut Stage) -> Result<Flow> + 'static,
  ) {
    self.handlers.insert(code, Box::new(handler));
  }

  /// Runs the frame loop until a handler returns [`Flow::Exit`], the stage
  /// requests termination, or an error propagates out.
  pub fn run(&mut self) -> Result<()> {
    let mut last_tick = Instant::now();
    loop {
      let t = Instant::now();
      match self.backend.poll() {
        Some(Event::Key(code)) => {
          if let Some(handler) = self.handlers.get_mut(&code) {
            if handler(&mut self.stage)? == Flow::Exit {
              self.stage.flush(&mut self.backend)?;
              return Ok(());
            }
          }
        }
        Some(Event::Resize(rows, cols)) => self.stage.resize(rows, cols),
        None => {}
      }
      self.phases.record("input", t.elapsed());

      if !self.stage.paused() {
        let t = Instant::now();
        let delta = last_tick.elapsed().as_secs_f64();
        last_tick = Instant::now();
        self.stage.tick(delta);
        self.phases.record("tick", t.elapsed());
      }

      let t = Instant::now();
      self.stage.flush(&mut self.backend)?;
      self.phases.record("flush", t.elapsed());

      if self.stage.exiting() {
        return Ok(());
      }

      self.frames.end_frame(self.fps);
      self.phases.maybe_report(Duration::from_millis(500));
      log::trace!(
        "fps: {:.2}",
        self.frames.measure_fps(Duration::from_millis(500))
      );
    }
  }
}
