//! Single-flight gate shared by both views.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::composer::Composer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
}

/// In-flight flag plus the input buffer it clears on completion.
#[derive(Debug, Default)]
pub struct Flight {
    in_flight: AtomicBool,
    input: Mutex<Composer>,
}

impl Flight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.in_flight.load(Ordering::Acquire) {
            Phase::Pending
        } else {
            Phase::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase() == Phase::Pending
    }

    /// Idle -> Pending. Returns `None` if a request is already pending.
    pub(crate) fn try_begin(&self) -> Option<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        Some(FlightGuard { flight: self })
    }

    pub fn input(&self) -> Composer {
        self.lock_input().clone()
    }

    /// Edit the input buffer. Ignored while a request is pending.
    pub fn edit_input(&self, f: impl FnOnce(&mut Composer)) -> bool {
        if self.is_in_flight() {
            return false;
        }
        f(&mut self.lock_input());
        true
    }

    fn lock_input(&self) -> std::sync::MutexGuard<'_, Composer> {
        // a panic while editing leaves a usable buffer behind
        self.input.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Pending -> Idle on drop, on every exit path including a dropped future.
pub(crate) struct FlightGuard<'a> {
    flight: &'a Flight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.lock_input().clear();
        self.flight.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_refused() {
        let flight = Flight::new();
        let guard = flight.try_begin();
        assert!(guard.is_some());
        assert_eq!(flight.phase(), Phase::Pending);
        assert!(flight.try_begin().is_none());

        drop(guard);
        assert_eq!(flight.phase(), Phase::Idle);
        assert!(flight.try_begin().is_some());
    }

    #[test]
    fn test_guard_drop_clears_input() {
        let flight = Flight::new();
        flight.edit_input(|c| *c = Composer::from("draft"));
        let guard = flight.try_begin().unwrap();

        assert!(!flight.edit_input(|c| c.insert('x')));
        assert_eq!(flight.input().text(), "draft");

        drop(guard);
        assert_eq!(flight.input().text(), "");
    }

    #[test]
    fn test_guard_released_on_panic() {
        let flight = Flight::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = flight.try_begin().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!flight.is_in_flight());
    }
}
