//! Wrapping Tick Counter

use std::sync::atomic::{AtomicU16, Ordering};

/// Default timer interrupt rate (4 ms per tick)
pub const DEFAULT_TICK_HZ: u32 = 250;

/// 16-bit counter advanced by the periodic timer interrupt.
///
/// All differences are wrapping subtractions, so comparisons stay correct
/// when the counter rolls over.
#[derive(Debug, Default)]
pub struct TickCounter {
    ticks: AtomicU16,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter preloaded with `tick`, mostly useful to exercise rollover
    pub const fn starting_at(tick: u16) -> Self {
        Self {
            ticks: AtomicU16::new(tick),
        }
    }

    pub fn now(&self) -> u16 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Advance by one tick and return the new value
    pub fn advance(&self) -> u16 {
        self.ticks.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    /// Ticks elapsed since `earlier`
    pub fn elapsed_since(&self, earlier: u16) -> u16 {
        elapsed(self.now(), earlier)
    }
}

/// Wrapping distance from `earlier` to `now`
pub fn elapsed(now: u16, earlier: u16) -> u16 {
    now.wrapping_sub(earlier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_returns_new_value() {
        let clock = TickCounter::new();
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn test_elapsed_across_rollover() {
        let clock = TickCounter::starting_at(u16::MAX - 1);
        let armed = clock.now();
        for _ in 0..4 {
            clock.advance();
        }
        assert_eq!(clock.now(), 2);
        assert_eq!(clock.elapsed_since(armed), 4);
        assert_eq!(elapsed(3, u16::MAX), 4);
    }
}
