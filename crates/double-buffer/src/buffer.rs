//! Critical-Section Guarded Double Buffer

use crate::PublishError;
use critical_section::Mutex;
use std::cell::RefCell;
use tracing::debug;

/// Where the buffer pair is in its publish/drain cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Writer owns the write slot, no transfer in flight
    Filling,
    /// Index flip in progress (only ever inside the critical section)
    Swapping,
    /// Transfer interrupt is shifting out the committed slot
    Draining,
}

struct Slots<const N: usize> {
    buffers: [[u8; N]; 2],
    /// Index of the write target; the transfer reads `current ^ 1`
    current: usize,
    /// Set while a frame is partially shifted out
    busy: bool,
    /// Next byte of the committed slot to load into the data register
    cursor: usize,
    /// Byte the transfer hardware shifts out next
    register: u8,
    phase: Phase,
    swaps: u64,
}

impl<const N: usize> Slots<N> {
    fn committed(&self) -> &[u8; N] {
        &self.buffers[self.current ^ 1]
    }
}

/// Two fixed byte slots: one written by the main loop, one drained by the
/// transfer interrupt.
///
/// Every access to the index, busy flag and cursor runs inside
/// `critical_section::with`, so the interrupt never observes a half-done swap.
/// The slots are allocated once and only their contents change.
pub struct DoubleBuffer<const N: usize> {
    slots: Mutex<RefCell<Slots<N>>>,
}

impl<const N: usize> DoubleBuffer<N> {
    /// Both slots start out holding `initial`; byte 0 is primed for transfer
    pub const fn new(initial: [u8; N]) -> Self {
        Self {
            slots: Mutex::new(RefCell::new(Slots {
                buffers: [initial; 2],
                current: 0,
                busy: false,
                cursor: 1,
                register: initial[0],
                phase: Phase::Filling,
                swaps: 0,
            })),
        }
    }

    /// Mutate the write slot in place
    pub fn fill<F>(&self, f: F)
    where
        F: FnOnce(&mut [u8; N]),
    {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            let current = slots.current;
            f(&mut slots.buffers[current]);
        })
    }

    /// Flip the slots if no transfer is in flight and load the first byte of
    /// the newly committed snapshot into the data register.
    pub fn try_swap(&self) -> Result<(), PublishError> {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            if slots.busy {
                return Err(PublishError::TransferInFlight);
            }

            slots.phase = Phase::Swapping;
            slots.current ^= 1;
            slots.cursor = 1;
            slots.swaps += 1;
            slots.register = slots.committed()[0];
            slots.phase = Phase::Filling;
            Ok(())
        })
    }

    /// Write `snapshot` into the write slot and try to commit it.
    ///
    /// On [`PublishError::TransferInFlight`] the snapshot stays in the write
    /// slot; a later [`Self::try_swap`] or publish commits it.
    pub fn try_publish(&self, snapshot: [u8; N]) -> Result<(), PublishError> {
        self.fill(|slot| *slot = snapshot);
        self.try_swap().map_err(|err| {
            debug!("Snapshot publication deferred: {}", err);
            err
        })
    }

    /// Like [`Self::try_publish`] but spins until the in-flight transfer ends.
    ///
    /// Only use this when the transfer interrupt runs on another context;
    /// a single-threaded caller would spin forever.
    pub fn publish(&self, snapshot: [u8; N]) {
        self.fill(|slot| *slot = snapshot);
        while self.try_swap().is_err() {
            std::hint::spin_loop();
        }
    }

    /// Transfer-complete interrupt body.
    ///
    /// Returns the byte that just left the data register and loads the next
    /// one. After the last byte of a snapshot the busy flag drops and byte 0
    /// of the committed slot is primed again.
    pub fn shift_out(&self) -> u8 {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            let sent = slots.register;
            if slots.cursor >= N {
                slots.cursor = 1;
                slots.busy = false;
                slots.phase = Phase::Filling;
                slots.register = slots.committed()[0];
            } else {
                slots.register = slots.committed()[slots.cursor];
                slots.cursor += 1;
                slots.busy = true;
                slots.phase = Phase::Draining;
            }
            sent
        })
    }

    /// Copy of the last committed snapshot
    pub fn committed(&self) -> [u8; N] {
        critical_section::with(|cs| *self.slots.borrow_ref(cs).committed())
    }

    /// Whether a transfer is midway through the committed snapshot
    pub fn is_busy(&self) -> bool {
        critical_section::with(|cs| self.slots.borrow_ref(cs).busy)
    }

    pub fn phase(&self) -> Phase {
        critical_section::with(|cs| self.slots.borrow_ref(cs).phase)
    }

    /// Total successful swaps
    pub fn swaps(&self) -> u64 {
        critical_section::with(|cs| self.slots.borrow_ref(cs).swaps)
    }
}
