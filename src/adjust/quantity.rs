//! The read/write capability every controlled device exposes.
//!
//! A [`Quantity`] is anything with a current integer value inside a known
//! range: the ALSA master volume, or the backlight property of one RandR
//! output.  [`nudge`] performs the single read-compute-write that a key
//! press maps to.

use super::{Direction, StepPolicy};

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A freshly queried `(current, min, max)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub current: i32,
    pub min: i32,
    pub max: i32,
}

impl Reading {
    pub fn new(current: i32, min: i32, max: i32) -> Self {
        Self { current, min, max }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// A range-bounded integer that can be read and written.
///
/// Implementations must return readings with `min <= current <= max`.
pub trait Quantity {
    type Error;

    fn read(&mut self) -> Result<Reading, Self::Error>;

    fn write(&mut self, value: i32) -> Result<(), Self::Error>;
}

/// A device that exposes several independent quantities, re-enumerated on
/// every key press (RandR outputs can come and go).
pub trait QuantitySet {
    type Item: Quantity<Error = Self::Error>;
    type Error;

    fn quantities(&mut self) -> Result<Vec<Self::Item>, Self::Error>;
}

/// An on/off switch that can be flipped.  Returns the new state.
pub trait Toggle {
    type Error;

    fn toggle(&mut self) -> Result<bool, Self::Error>;
}

// ---------------------------------------------------------------------------
// nudge
// ---------------------------------------------------------------------------

/// The outcome of one [`nudge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nudge {
    pub from: i32,
    pub to: i32,
}

impl Nudge {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Read `quantity`, compute the next value with `policy` and write it back.
///
/// Nothing is written when the value is already at the limit in the
/// requested direction.
pub fn nudge<Q: Quantity>(
    quantity: &mut Q,
    policy: &StepPolicy,
    direction: Direction,
) -> Result<Nudge, Q::Error> {
    let Reading { current, min, max } = quantity.read()?;
    let next = policy.adjust(current, min, max, direction);

    if next != current {
        quantity.write(next)?;
    }

    Ok(Nudge {
        from: current,
        to: next,
    })
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// In-memory quantity.  Clones share state so tests can inspect a value
    /// after handing the quantity to the daemon.
    #[derive(Debug, Clone)]
    pub struct FakeQuantity {
        pub inner: Rc<RefCell<FakeState>>,
    }

    #[derive(Debug, Default)]
    pub struct FakeState {
        pub current: i32,
        pub min: i32,
        pub max: i32,
        pub writes: usize,
        pub muted: bool,
        pub fail: bool,
    }

    impl FakeQuantity {
        pub fn new(current: i32, min: i32, max: i32) -> Self {
            Self {
                inner: Rc::new(RefCell::new(FakeState {
                    current,
                    min,
                    max,
                    ..FakeState::default()
                })),
            }
        }

        pub fn current(&self) -> i32 {
            self.inner.borrow().current
        }

        pub fn writes(&self) -> usize {
            self.inner.borrow().writes
        }

        pub fn set_failing(&self, fail: bool) {
            self.inner.borrow_mut().fail = fail;
        }
    }

    impl Quantity for FakeQuantity {
        type Error = String;

        fn read(&mut self) -> Result<Reading, String> {
            let s = self.inner.borrow();
            if s.fail {
                return Err("device unavailable".into());
            }
            Ok(Reading::new(s.current, s.min, s.max))
        }

        fn write(&mut self, value: i32) -> Result<(), String> {
            let mut s = self.inner.borrow_mut();
            s.current = value;
            s.writes += 1;
            Ok(())
        }
    }

    impl Toggle for FakeQuantity {
        type Error = String;

        fn toggle(&mut self) -> Result<bool, String> {
            let mut s = self.inner.borrow_mut();
            if s.fail {
                return Err("device unavailable".into());
            }
            s.muted = !s.muted;
            Ok(s.muted)
        }
    }

    /// A set of fake outputs.
    #[derive(Debug, Clone, Default)]
    pub struct FakeSet {
        pub outputs: Vec<FakeQuantity>,
    }

    impl QuantitySet for FakeSet {
        type Item = FakeQuantity;
        type Error = String;

        fn quantities(&mut self) -> Result<Vec<FakeQuantity>, String> {
            Ok(self.outputs.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::fake::FakeQuantity;
    use super::*;

    #[test]
    fn nudge_writes_new_value() {
        let mut q = FakeQuantity::new(50, 0, 100);
        let n = nudge(&mut q, &StepPolicy::default(), Direction::Increase).unwrap();

        assert_eq!(n, Nudge { from: 50, to: 55 });
        assert!(n.changed());
        assert_eq!(q.current(), 55);
        assert_eq!(q.writes(), 1);
    }

    #[test]
    fn nudge_at_limit_skips_write() {
        let mut q = FakeQuantity::new(100, 0, 100);
        let n = nudge(&mut q, &StepPolicy::default(), Direction::Increase).unwrap();

        assert!(!n.changed());
        assert_eq!(q.writes(), 0);

        let mut q = FakeQuantity::new(0, 0, 100);
        let n = nudge(&mut q, &StepPolicy::default(), Direction::Decrease).unwrap();
        assert!(!n.changed());
        assert_eq!(q.writes(), 0);
    }

    #[test]
    fn nudge_propagates_read_errors() {
        let mut q = FakeQuantity::new(50, 0, 100);
        q.set_failing(true);

        let err = nudge(&mut q, &StepPolicy::default(), Direction::Increase).unwrap_err();
        assert_eq!(err, "device unavailable");
        assert_eq!(q.writes(), 0);
    }

    #[test]
    fn nudge_uses_policy() {
        let policy = StepPolicy {
            coarse_divisor: 4,
            fine_divisor: 4,
            proximity_steps: 0,
        };
        let mut q = FakeQuantity::new(0, 0, 100);
        nudge(&mut q, &policy, Direction::Increase).unwrap();
        assert_eq!(q.current(), 25);
    }
}
