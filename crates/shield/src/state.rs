//! State Shared Between the Main Loop and the Timer Interrupt

use crate::aggregator::VelocityAccumulator;
use crate::clock::TickCounter;
use critical_section::Mutex;
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};

/// Everything the main loop and the interrupt handlers both touch.
///
/// Single-word flags are atomics. The byte-wait marker and the velocity
/// accumulator span several words and are only updated inside
/// `critical_section::with`.
pub struct SharedState {
    clock: TickCounter,
    last_byte_tick: AtomicU16,
    waiting_for_byte: AtomicBool,
    velocity: Mutex<Cell<VelocityAccumulator>>,
    committed_velocity: AtomicU16,
    velocity_commits: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self::with_clock(0)
    }

    /// State whose clock starts at `tick`
    pub fn with_clock(tick: u16) -> Self {
        Self {
            clock: TickCounter::starting_at(tick),
            last_byte_tick: AtomicU16::new(tick),
            waiting_for_byte: AtomicBool::new(false),
            velocity: Mutex::new(Cell::new(VelocityAccumulator::default())),
            committed_velocity: AtomicU16::new(0),
            velocity_commits: AtomicU64::new(0),
        }
    }

    pub fn clock(&self) -> &TickCounter {
        &self.clock
    }

    /// Mark "now" as the last byte seen and start waiting for the next one.
    /// Returns the tick the wait was armed at.
    pub fn arm_byte_wait(&self) -> u16 {
        critical_section::with(|_| {
            let now = self.clock.now();
            self.last_byte_tick.store(now, Ordering::Release);
            self.waiting_for_byte.store(true, Ordering::Release);
            now
        })
    }

    /// Whether the timer gave up on the pending byte
    pub fn byte_wait_expired(&self) -> bool {
        !self.waiting_for_byte.load(Ordering::Acquire)
    }

    /// Timer side of the byte wait: give up once `limit` ticks passed
    ///
    /// Reads the marker and clears the flag in one critical section, so a
    /// wait re-armed by the main loop is never expired against the old tick.
    pub(crate) fn expire_stale_wait(&self, now: u16, limit: u16) -> bool {
        critical_section::with(|_| {
            let since = now.wrapping_sub(self.last_byte_tick.load(Ordering::Acquire));
            since >= limit && self.waiting_for_byte.swap(false, Ordering::AcqRel)
        })
    }

    /// Add one per-frame velocity sample to the running window
    pub fn add_velocity_sample(&self, sample: u8) {
        critical_section::with(|cs| {
            let cell = self.velocity.borrow(cs);
            let mut acc = cell.get();
            acc.add(sample);
            cell.set(acc);
        });
    }

    /// Timer side of the velocity window; returns the committed sum, if any
    pub(crate) fn tick_velocity_window(&self, window: u16) -> Option<u16> {
        critical_section::with(|cs| {
            let cell = self.velocity.borrow(cs);
            let mut acc = cell.get();
            let committed = acc.tick(window);
            cell.set(acc);
            if let Some(sum) = committed {
                self.committed_velocity.store(sum, Ordering::Release);
                self.velocity_commits.fetch_add(1, Ordering::Relaxed);
            }
            committed
        })
    }

    /// Sum published by the last completed aggregation window
    pub fn committed_velocity(&self) -> u16 {
        self.committed_velocity.load(Ordering::Acquire)
    }

    /// Accumulator as it stands mid-window
    pub fn pending_velocity(&self) -> VelocityAccumulator {
        critical_section::with(|cs| self.velocity.borrow(cs).get())
    }

    /// Completed aggregation windows
    pub fn velocity_commits(&self) -> u64 {
        self.velocity_commits.load(Ordering::Relaxed)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("tick", &self.clock.now())
            .field("waiting_for_byte", &!self.byte_wait_expired())
            .field("committed_velocity", &self.committed_velocity())
            .finish()
    }
}
