//! Circular Frame Window and Single-Byte Resynchronization

use crate::checksum::FrameLayout;
use tracing::debug;

/// Fixed-capacity circular window over the last `N` bytes of a stream.
///
/// Once full, every push overwrites the oldest byte and advances `start`,
/// which rotates the logical frame by one byte.
#[derive(Debug, Clone)]
pub struct FrameWindow<const N: usize> {
    buffer: [u8; N],
    start: usize,
    size: usize,
}

impl<const N: usize> FrameWindow<N> {
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            start: 0,
            size: 0,
        }
    }

    /// Append a byte, discarding the oldest one when the window is full
    pub fn push(&mut self, byte: u8) {
        if self.size < N {
            self.buffer[(self.start + self.size) % N] = byte;
            self.size += 1;
        } else {
            self.buffer[self.start] = byte;
            self.start = (self.start + 1) % N;
        }
    }

    /// Byte at logical offset `index` (0 is the oldest byte)
    pub fn get(&self, index: usize) -> Option<u8> {
        (index < self.size).then(|| self.buffer[(self.start + index) % N])
    }

    /// Bytes in logical order; slots not yet filled read as zero
    pub fn to_array(&self) -> [u8; N] {
        let mut out = [0u8; N];
        for (i, slot) in out.iter_mut().enumerate().take(self.size) {
            *slot = self.buffer[(self.start + i) % N];
        }
        out
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// A window only represents a frame once all `N` bytes are present
    pub fn is_complete(&self) -> bool {
        self.size == N
    }

    /// Physical offset of the oldest byte
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.size = 0;
    }
}

impl<const N: usize> Default for FrameWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A checksum-valid frame located by [`FrameResynchronizer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncedFrame<const N: usize> {
    /// Frame bytes in wire order, command byte first
    pub bytes: [u8; N],
    /// Single-byte rotations spent before the window lined up
    pub rotations: usize,
    /// Windows that began with the command byte but failed the checksum
    pub false_locks: usize,
}

/// Finds frame boundaries in a stream that carries no delimiter.
///
/// Every byte is pushed into a [`FrameWindow`]. When the full window fails
/// validation the next byte rotates it by one position, so a misaligned stream
/// locks after at most `N - 1` rotations.
#[derive(Debug, Clone)]
pub struct FrameResynchronizer<const N: usize> {
    layout: &'static FrameLayout,
    window: FrameWindow<N>,
    rotations: usize,
    false_locks: usize,
}

impl<const N: usize> FrameResynchronizer<N> {
    /// Create a resynchronizer for `layout`
    ///
    /// # Panics
    /// If `N` differs from `layout.len`.
    pub fn new(layout: &'static FrameLayout) -> Self {
        assert_eq!(layout.len, N, "window size must match the {} frame length", layout.name);
        Self {
            layout,
            window: FrameWindow::new(),
            rotations: 0,
            false_locks: 0,
        }
    }

    /// Feed one byte; returns the frame once the window holds a valid one.
    ///
    /// After a lock the window is emptied, so the next frame is assembled from
    /// fresh bytes.
    pub fn push(&mut self, byte: u8) -> Option<SyncedFrame<N>> {
        if self.window.is_complete() {
            self.rotations += 1;
        }
        self.window.push(byte);

        if !self.window.is_complete() {
            return None;
        }

        let bytes = self.window.to_array();
        if self.layout.validate(&bytes) {
            let frame = SyncedFrame {
                bytes,
                rotations: self.rotations,
                false_locks: self.false_locks,
            };
            if frame.rotations > 0 {
                debug!(
                    "{} link resynchronized after {} rotations ({} false locks)",
                    self.layout.name, frame.rotations, frame.false_locks
                );
            }
            self.reset();
            return Some(frame);
        }

        if bytes[0] == self.layout.command_byte {
            self.false_locks += 1;
            debug!("{} link: checksum rejected candidate frame {:02X?}", self.layout.name, bytes);
        }
        None
    }

    /// Drop any partial window and counters
    pub fn reset(&mut self) {
        self.window.clear();
        self.rotations = 0;
        self.false_locks = 0;
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.window.len()
    }

    /// Rotations performed since the last lock or reset
    pub fn rotations(&self) -> usize {
        self.rotations
    }

    pub fn layout(&self) -> &'static FrameLayout {
        self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{ECU_LAYOUT, SHIELD_UART_LAYOUT};
    use proptest::prelude::*;

    fn ecu_frame(rpm: u8, velocity: u8, temp: u8) -> [u8; 6] {
        let mut frame = [0x01, rpm, velocity, 0x00, temp, 0x00];
        ECU_LAYOUT.seal(&mut frame);
        frame
    }

    fn feed<const N: usize>(
        resync: &mut FrameResynchronizer<N>,
        bytes: &[u8],
    ) -> Vec<SyncedFrame<N>> {
        bytes.iter().filter_map(|&b| resync.push(b)).collect()
    }

    #[test]
    fn test_window_rotates_when_full() {
        let mut window = FrameWindow::<3>::new();
        for b in [1, 2, 3, 4] {
            window.push(b);
        }
        assert!(window.is_complete());
        assert_eq!(window.to_array(), [2, 3, 4]);
        assert_eq!(window.start(), 1);
        assert_eq!(window.get(0), Some(2));
        assert_eq!(window.get(3), None);
    }

    #[test]
    fn test_partial_window_is_incomplete() {
        let mut window = FrameWindow::<4>::new();
        window.push(9);
        assert!(!window.is_complete());
        assert_eq!(window.to_array(), [9, 0, 0, 0]);
        window.clear();
        assert!(window.is_empty());
    }

    #[test]
    fn test_aligned_frame_needs_no_rotation() {
        let mut resync = FrameResynchronizer::<6>::new(&ECU_LAYOUT);
        let frames = feed(&mut resync, &[0x01, 0x28, 0x0A, 0x00, 0x3E, 0x70]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].rotations, 0);
        assert_eq!(resync.buffered(), 0);
    }

    #[test]
    fn test_stray_command_byte_false_locks_once() {
        let mut resync = FrameResynchronizer::<6>::new(&ECU_LAYOUT);
        let frames = feed(&mut resync, &[0x01, 0x01, 0x28, 0x0A, 0x00, 0x3E, 0x70]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bytes, [0x01, 0x28, 0x0A, 0x00, 0x3E, 0x70]);
        assert_eq!(frames[0].rotations, 1);
        assert_eq!(frames[0].false_locks, 1);
    }

    #[test]
    fn test_stray_byte_between_frames_loses_nothing() {
        let a = ecu_frame(0x20, 0x10, 0x50);
        let b = ecu_frame(0x21, 0x11, 0x51);
        let mut stream = a.to_vec();
        stream.push(0xEE);
        stream.extend_from_slice(&b);

        let mut resync = FrameResynchronizer::<6>::new(&ECU_LAYOUT);
        let frames = feed(&mut resync, &stream);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].bytes, b);
        assert_eq!(frames[1].rotations, 1);
    }

    #[test]
    #[should_panic]
    fn test_window_size_must_match_layout() {
        let _ = FrameResynchronizer::<6>::new(&SHIELD_UART_LAYOUT);
    }

    fn arb_ecu_frame() -> impl Strategy<Value = [u8; 6]> {
        // Payload bytes above the command value keep false locks out of the
        // rotation bound being measured.
        (2u8..=0xFF, 2u8..=0xFF, 2u8..=0xFF, 2u8..=0xFF)
            .prop_map(|(a, b, c, d)| {
                let mut frame = [0x01, a, b, c, d, 0x00];
                ECU_LAYOUT.seal(&mut frame);
                frame
            })
            .prop_filter("checksum must not look like a command byte", |f| f[5] != 0x01)
    }

    proptest! {
        #[test]
        fn test_misaligned_stream_locks_within_n_minus_one_rotations(
            frames in proptest::collection::vec(arb_ecu_frame(), 3..6),
            offset in 1usize..6,
        ) {
            let stream: Vec<u8> = frames.iter().flatten().copied().skip(offset).collect();
            let mut resync = FrameResynchronizer::<6>::new(&ECU_LAYOUT);
            let locked = feed(&mut resync, &stream);

            prop_assert!(!locked.is_empty());
            prop_assert!(locked[0].rotations <= 5);
            prop_assert_eq!(locked[0].bytes, frames[1]);
            for (got, want) in locked.iter().zip(frames.iter().skip(1)) {
                prop_assert_eq!(got.bytes, *want);
            }
        }

        #[test]
        fn test_single_injected_byte_costs_one_rotation(
            frames in proptest::collection::vec(arb_ecu_frame(), 2..5),
            junk in 2u8..=0xFF,
            at in 1usize..4,
        ) {
            let at = at.min(frames.len() - 1);
            let mut stream = Vec::new();
            for (i, frame) in frames.iter().enumerate() {
                if i == at {
                    stream.push(junk);
                }
                stream.extend_from_slice(frame);
            }

            let mut resync = FrameResynchronizer::<6>::new(&ECU_LAYOUT);
            let locked = feed(&mut resync, &stream);
            prop_assert_eq!(locked.len(), frames.len());
            prop_assert_eq!(locked[at].rotations, 1);
            prop_assert!(locked.iter().all(|f| f.rotations <= 5));
        }
    }
}
