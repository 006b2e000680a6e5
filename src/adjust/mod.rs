//! Bounded step adjustment for range-limited integer quantities.
//!
//! Every media key press becomes one stateless computation
//! `(current, min, max, direction) -> next`.  The result always stays inside
//! `[min, max]`; arithmetic is widened to `i64` so even the full `i32` range
//! cannot overflow.
//!
//! # Step sizing
//!
//! ```text
//!  min                                                          max
//!   |--fine--|----------------- coarse (5%) ----------|--fine---|
//!   <-2 steps->                                        <-2 steps->
//! ```
//!
//! The coarse step is 5% of the range.  Within two coarse steps of either
//! end the step shrinks to 0.5%, so the last few presses near silence or
//! full brightness are fine-grained.  Both steps are at least 1.
//!
//! # Example
//!
//! ```
//! use media_keysd::adjust::adjust_five_percent;
//!
//! assert_eq!(adjust_five_percent(50, 0, 100, true), 55);
//! assert_eq!(adjust_five_percent(98, 0, 100, true), 99);
//! assert_eq!(adjust_five_percent(1, 0, 100, false), 0);
//! ```

pub mod quantity;

pub use quantity::{nudge, Nudge, Quantity, QuantitySet, Reading, Toggle};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way a key press moves a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn from_increase(increase: bool) -> Self {
        if increase {
            Self::Increase
        } else {
            Self::Decrease
        }
    }
}

// ---------------------------------------------------------------------------
// step
// ---------------------------------------------------------------------------

/// Move `current` by `step`, stopping at `min` or `max` instead of crossing
/// them.
///
/// Positive `step` increases, negative decreases, zero returns `current`.
///
/// The caller must ensure `min <= current <= max`; the result for inputs
/// that violate this is unspecified (but never panics).
pub fn step(current: i32, min: i32, max: i32, step: i32) -> i32 {
    clamp_step(current, min, max, i64::from(step))
}

fn clamp_step(current: i32, min: i32, max: i32, step: i64) -> i32 {
    let (cur, lo, hi) = (i64::from(current), i64::from(min), i64::from(max));

    if step > 0 && hi - cur < step {
        return max;
    }
    if step < 0 && cur - lo < -step {
        return min;
    }
    // cur + step lies within [lo, hi] here, so it fits in i32.
    (cur + step) as i32
}

// ---------------------------------------------------------------------------
// adjust_five_percent
// ---------------------------------------------------------------------------

/// Move `current` by roughly 5% of `max - min`, or 0.5% when within two
/// coarse steps of either end of the range.
///
/// Equivalent to `StepPolicy::default().adjust(..)`.
pub fn adjust_five_percent(current: i32, min: i32, max: i32, increase: bool) -> i32 {
    StepPolicy::default().adjust(current, min, max, Direction::from_increase(increase))
}

// ---------------------------------------------------------------------------
// StepPolicy
// ---------------------------------------------------------------------------

/// Step ratios used by [`StepPolicy::adjust`].
///
/// The defaults (`20`, `200`, `2`) give the 5% / 0.5% / two-step behaviour.
/// Divisors must be non-zero; [`crate::config::AppConfig::validate`] rejects
/// zero before a policy ever reaches the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepPolicy {
    /// The coarse step is `range / coarse_divisor`.
    pub coarse_divisor: u32,
    /// The fine step near the ends is `range / fine_divisor`.
    pub fine_divisor: u32,
    /// How many coarse steps from either end switch to the fine step.
    pub proximity_steps: u32,
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self {
            coarse_divisor: 20,
            fine_divisor: 200,
            proximity_steps: 2,
        }
    }
}

impl StepPolicy {
    /// Unsigned step size for the range `[min, max]` at `current`.
    pub fn step_size(&self, current: i32, min: i32, max: i32) -> i64 {
        let (cur, lo, hi) = (i64::from(current), i64::from(min), i64::from(max));
        let range = hi - lo;

        let coarse = divide_at_least_one(range, self.coarse_divisor);
        let margin = coarse.saturating_mul(i64::from(self.proximity_steps));

        // Checked against both ends regardless of direction.
        if hi - cur <= margin || cur - lo <= margin {
            divide_at_least_one(range, self.fine_divisor)
        } else {
            coarse
        }
    }

    /// Compute the next value for a key press in `direction`.
    pub fn adjust(&self, current: i32, min: i32, max: i32, direction: Direction) -> i32 {
        let size = self.step_size(current, min, max);
        let signed = match direction {
            Direction::Increase => size,
            Direction::Decrease => -size,
        };
        clamp_step(current, min, max, signed)
    }
}

fn divide_at_least_one(range: i64, divisor: u32) -> i64 {
    (range / i64::from(divisor.max(1))).max(1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_zero_is_identity() {
        assert_eq!(step(42, 0, 100, 0), 42);
        assert_eq!(step(0, 0, 0, 0), 0);
        assert_eq!(step(-7, -10, 10, 0), -7);
    }

    #[test]
    fn step_clamps_at_ceiling() {
        assert_eq!(step(100, 0, 100, 5), 100);
        assert_eq!(step(97, 0, 100, 5), 100);
        assert_eq!(step(95, 0, 100, 5), 100);
        assert_eq!(step(94, 0, 100, 5), 99);
    }

    #[test]
    fn step_clamps_at_floor() {
        assert_eq!(step(0, 0, 100, -5), 0);
        assert_eq!(step(3, 0, 100, -5), 0);
        assert_eq!(step(6, 0, 100, -5), 1);
    }

    #[test]
    fn step_handles_negative_ranges() {
        // ALSA dB ranges are commonly negative millibel values.
        assert_eq!(step(-6000, -9999, 0, 500), -5500);
        assert_eq!(step(-200, -9999, 0, 500), 0);
        assert_eq!(step(-9800, -9999, 0, -500), -9999);
    }

    #[test]
    fn step_never_overflows_at_i32_extremes() {
        assert_eq!(step(i32::MAX - 1, i32::MIN, i32::MAX, i32::MAX), i32::MAX);
        assert_eq!(step(i32::MIN + 1, i32::MIN, i32::MAX, i32::MIN), i32::MIN);
        assert_eq!(step(0, i32::MIN, i32::MAX, i32::MAX), i32::MAX);
        assert_eq!(step(-1, i32::MIN, i32::MAX, i32::MIN), i32::MIN);
        assert_eq!(step(0, i32::MIN, i32::MAX, i32::MIN), i32::MIN);
    }

    #[test]
    fn step_stays_in_range_for_all_small_inputs() {
        for min in -6..=6 {
            for max in min..=6 {
                for cur in min..=max {
                    for s in -15..=15 {
                        let next = step(cur, min, max, s);
                        assert!(
                            (min..=max).contains(&next),
                            "step({cur}, {min}, {max}, {s}) = {next}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn five_percent_mid_range() {
        assert_eq!(adjust_five_percent(50, 0, 100, true), 55);
        assert_eq!(adjust_five_percent(50, 0, 100, false), 45);
    }

    #[test]
    fn five_percent_fine_near_ceiling() {
        assert_eq!(adjust_five_percent(98, 0, 100, true), 99);
        // 90 is exactly two coarse steps from max.
        assert_eq!(adjust_five_percent(90, 0, 100, true), 91);
        assert_eq!(adjust_five_percent(89, 0, 100, true), 94);
    }

    #[test]
    fn five_percent_fine_near_floor() {
        assert_eq!(adjust_five_percent(1, 0, 100, false), 0);
        assert_eq!(adjust_five_percent(0, 0, 100, false), 0);
        // Proximity is symmetric: near the floor, increasing is fine-grained too.
        assert_eq!(adjust_five_percent(5, 0, 100, true), 6);
    }

    #[test]
    fn five_percent_large_range() {
        // Typical backlight: 0..=4882
        assert_eq!(adjust_five_percent(2000, 0, 4882, true), 2244);
        assert_eq!(adjust_five_percent(4800, 0, 4882, true), 4824);
        assert_eq!(adjust_five_percent(4870, 0, 4882, true), 4882);
    }

    #[test]
    fn five_percent_degenerate_ranges() {
        assert_eq!(adjust_five_percent(0, 0, 1, true), 1);
        assert_eq!(adjust_five_percent(1, 0, 1, true), 1);
        assert_eq!(adjust_five_percent(1, 0, 1, false), 0);
        assert_eq!(adjust_five_percent(7, 7, 7, true), 7);
        assert_eq!(adjust_five_percent(7, 7, 7, false), 7);
    }

    #[test]
    fn five_percent_full_i32_range() {
        let next = adjust_five_percent(0, i32::MIN, i32::MAX, true);
        assert_eq!(i64::from(next), (i64::from(i32::MAX) - i64::from(i32::MIN)) / 20);
        assert_eq!(adjust_five_percent(i32::MAX, i32::MIN, i32::MAX, true), i32::MAX);
        assert_eq!(adjust_five_percent(i32::MIN, i32::MIN, i32::MAX, false), i32::MIN);
    }

    #[test]
    fn five_percent_always_in_range() {
        for (min, max) in [(0, 1), (0, 10), (0, 100), (-64, 0), (-9999, 0), (0, 4882)] {
            for cur in min..=max {
                for increase in [true, false] {
                    let next = adjust_five_percent(cur, min, max, increase);
                    assert!((min..=max).contains(&next));
                }
            }
        }
    }

    #[test]
    fn repeated_increase_reaches_max() {
        for (min, max) in [(0, 1), (0, 100), (-9999, 0), (0, 4882), (0, 65536)] {
            let mut cur = min;
            let mut presses = 0;
            while cur < max {
                let next = adjust_five_percent(cur, min, max, true);
                assert!(next > cur, "stalled at {cur} in [{min}, {max}]");
                cur = next;
                presses += 1;
                assert!(presses <= 1000, "too many presses for [{min}, {max}]");
            }
            assert_eq!(cur, max);
        }
    }

    #[test]
    fn repeated_decrease_reaches_min() {
        let (min, max) = (0, 100);
        let mut cur = max;
        let mut presses = 0;
        while cur > min {
            cur = adjust_five_percent(cur, min, max, false);
            presses += 1;
        }
        assert!(presses < 50, "{presses} presses");
    }

    #[test]
    fn default_policy_matches_five_percent() {
        let policy = StepPolicy::default();
        for cur in 0..=200 {
            for increase in [true, false] {
                assert_eq!(
                    policy.adjust(cur, 0, 200, Direction::from_increase(increase)),
                    adjust_five_percent(cur, 0, 200, increase)
                );
            }
        }
    }

    #[test]
    fn custom_policy_changes_step_sizes() {
        let policy = StepPolicy {
            coarse_divisor: 10,
            fine_divisor: 100,
            proximity_steps: 1,
        };
        assert_eq!(policy.adjust(50, 0, 100, Direction::Increase), 60);
        assert_eq!(policy.adjust(90, 0, 100, Direction::Increase), 91);
        assert_eq!(policy.adjust(89, 0, 100, Direction::Increase), 99);
    }

    #[test]
    fn zero_proximity_disables_fine_steps_except_at_the_ends() {
        let policy = StepPolicy {
            proximity_steps: 0,
            ..StepPolicy::default()
        };
        assert_eq!(policy.adjust(98, 0, 100, Direction::Increase), 100);
        assert_eq!(policy.adjust(100, 0, 100, Direction::Decrease), 99);
    }
}
