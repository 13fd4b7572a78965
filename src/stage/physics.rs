//! Boundary physics.
//!
//! Border bounce is a physical constant of the stage, deliberately separate
//! from actor-vs-actor collision policy, which is a pluggable decision (see
//! [`crate::stage::Stage::collision_hook()`]).

/// What a collision hook decides about a proposed move.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Verdict {
  /// Reject the move; the mover keeps its last accepted position.
  Block,
  /// Allow the move, at least as far as this collision is concerned.
  Pass,
}

/// Resolves one axis of a candidate position against the playable range
/// `[lo, hi]`.
///
/// A candidate crossing a bound with nonzero velocity is reflected back
/// inside by its overshoot and the velocity component is negated (an elastic
/// bounce). With zero velocity, or with elastic bounce disabled, the
/// candidate is clamped to the bound instead. The result is always within
/// `[lo, hi]`, even for overshoots wider than the range itself.
pub(crate) fn bounce(
  candidate: f64,
  lo: f64,
  hi: f64,
  vel: &mut f64,
  elastic: bool,
) -> f64 {
  if lo >= hi {
    // Degenerate playable span: nowhere to go.
    return lo;
  }

  let mut c = candidate;
  if c < lo {
    if elastic && *vel != 0.0 {
      c = 2.0 * lo - c;
      *vel = -*vel;
    } else {
      c = lo;
    }
  } else if c > hi {
    if elastic && *vel != 0.0 {
      c = 2.0 * hi - c;
      *vel = -*vel;
    } else {
      c = hi;
    }
  }
  c.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn inside_the_range_is_untouched() {
    let mut vel = 2.0;
    assert_eq!(bounce(3.5, 0.0, 9.0, &mut vel, true), 3.5);
    assert_eq!(vel, 2.0);
  }

  #[test]
  fn elastic_bounce_reflects_and_flips() {
    let mut vel = 1.0;
    assert_eq!(bounce(10.5, 0.0, 9.0, &mut vel, true), 7.5);
    assert_eq!(vel, -1.0);

    let mut vel = -3.0;
    assert_eq!(bounce(-0.25, 0.0, 9.0, &mut vel, true), 0.25);
    assert_eq!(vel, 3.0);
  }

  #[test]
  fn zero_velocity_clamps_without_flip() {
    let mut vel = 0.0;
    assert_eq!(bounce(12.0, 0.0, 9.0, &mut vel, true), 9.0);
    assert_eq!(vel, 0.0);
  }

  #[test]
  fn inelastic_mode_clamps() {
    let mut vel = 1.0;
    assert_eq!(bounce(10.5, 0.0, 9.0, &mut vel, false), 9.0);
    assert_eq!(vel, 1.0);
  }

  #[test]
  fn huge_overshoot_stays_in_range() {
    let mut vel = 5.0;
    let c = bounce(100.0, 0.0, 9.0, &mut vel, true);
    assert!((0.0..=9.0).contains(&c));
    assert_eq!(vel, -5.0);
  }

  #[test]
  fn degenerate_range_pins_to_lo() {
    let mut vel = 1.0;
    assert_eq!(bounce(4.0, 2.0, 1.0, &mut vel, true), 2.0);
  }
}
