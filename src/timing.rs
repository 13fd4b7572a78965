//! Timing primitives.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use std::time::Instant;

/// A timer for maintaining a stable FPS.
pub struct FrameTimer {
  frame_count: u64,
  last_frame: Instant,

  fps: f64,
  last_measurement: Instant,
  last_measurement_frame: u64,
}

impl FrameTimer {
  /// Creates a new `FrameTimer`.
  pub fn new() -> FrameTimer {
    FrameTimer {
      frame_count: 0,
      last_frame: Instant::now(),
      fps: 0.0,
      last_measurement: Instant::now(),
      last_measurement_frame: 0,
    }
  }

  /// Returns the number of frames timed so far.
  pub fn frame_count(&self) -> u64 {
    self.frame_count
  }

  /// Measures the frames per second at the given measurement interval.
  ///
  /// This function should be called once per frame; once the given interval
  /// has elapsed, the FPS will be computed as the average frame time since the
  /// measurement occured. This function caches the framerate between
  /// measurements.
  pub fn measure_fps(&mut self, measurement_interval: Duration) -> f64 {
    if self.last_measurement.elapsed() < measurement_interval {
      return self.fps;
    }

    let frames = (self.frame_count - self.last_measurement_frame) as f64;
    let fps = frames / self.last_measurement.elapsed().as_secs_f64();

    self.fps = fps;
    self.last_measurement = Instant::now();
    self.last_measurement_frame = self.frame_count;

    self.fps
  }

  /// Ends a frame, blocking until the minimum frame length for the given FPS
  /// is reached.
  ///
  /// This function should be called once per frame.
  pub fn end_frame(&mut self, target_fps: u32) {
    let frame_time = Duration::from_secs(1) / target_fps;
    if let Some(time_left) = frame_time.checked_sub(self.last_frame.elapsed()) {
      thread::sleep(time_left);
    }
    self.last_frame = Instant::now();
    self.frame_count += 1;
  }
}

impl Default for FrameTimer {
  fn default() -> Self {
    Self::new()
  }
}

/// A timer for measuring the average time spent in each phase of the frame
/// loop, reported through the `log` facade.
///
/// Phases are tracked by a string tag, such as `"tick"`.
pub struct PhaseTimer {
  table: HashMap<&'static str, PhaseInner>,
  last_report: Instant,
}

struct PhaseInner {
  total: Duration,
  samples: u32,
}

impl PhaseTimer {
  /// Creates a new `PhaseTimer`.
  pub fn new() -> Self {
    Self {
      table: HashMap::new(),
      last_report: Instant::now(),
    }
  }

  /// Adds one measurement for `phase`.
  pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
    let inner = self.table.entry(phase).or_insert(PhaseInner {
      total: Duration::default(),
      samples: 0,
    });
    inner.total += elapsed;
    inner.samples += 1;
  }

  /// Logs the average time per phase once `interval` has elapsed since the
  /// last report, then starts a fresh measurement window.
  pub fn maybe_report(&mut self, interval: Duration) {
    if self.last_report.elapsed() < interval || self.table.is_empty() {
      return;
    }

    let mut phases: Vec<_> = self.table.iter().collect();
    phases.sort_by_key(|(tag, _)| *tag);
    for (tag, inner) in phases {
      if inner.samples == 0 {
        continue;
      }
      log::debug!(
        "{}: {:.4}ms avg over {} samples",
        tag,
        (inner.total / inner.samples).as_secs_f64() * 1000.0,
        inner.samples,
      );
    }

    self.table.clear();
    self.last_report = Instant::now();
  }
}

impl Default for PhaseTimer {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn frame_counter_advances() {
    let mut timer = FrameTimer::new();
    assert_eq!(timer.frame_count(), 0);
    timer.end_frame(1000);
    timer.end_frame(1000);
    assert_eq!(timer.frame_count(), 2);
  }

  #[test]
  fn phases_accumulate() {
    let mut timer = PhaseTimer::new();
    timer.record("tick", Duration::from_millis(2));
    timer.record("tick", Duration::from_millis(4));
    let inner = &timer.table["tick"];
    assert_eq!(inner.samples, 2);
    assert_eq!(inner.total, Duration::from_millis(6));
  }
}
