//! Bench ECU Emulator

use crate::framer::ByteSink;
use crate::source::Step;
use frame_protocol::{EcuFrame, LinkError, ECU_FRAME_LEN};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// Sample the emulator repeats: RPM 0x56, velocity 0x05, engine temp 0x77
pub const EMULATED_FRAME: EcuFrame = EcuFrame {
    rpm: 0x56,
    velocity: 0x05,
    engine_temp: 0x77,
};

/// Silence after each byte of a frame, in milliseconds; the last entry is the
/// pause between frames
pub const BYTE_GAPS_MS: [u64; ECU_FRAME_LEN] = [2, 1, 1, 1, 1, 8];

/// Replays one ECU frame forever with the real ECU's byte timing
#[derive(Debug, Clone)]
pub struct EcuEmulator {
    frame: EcuFrame,
}

impl Default for EcuEmulator {
    fn default() -> Self {
        Self::new(EMULATED_FRAME)
    }
}

impl EcuEmulator {
    pub fn new(frame: EcuFrame) -> Self {
        Self { frame }
    }

    pub fn bytes(&self) -> [u8; ECU_FRAME_LEN] {
        self.frame.to_bytes()
    }

    /// Each byte paired with the silence that follows it
    pub fn schedule(&self) -> impl Iterator<Item = (u8, Duration)> {
        self.bytes()
            .into_iter()
            .zip(BYTE_GAPS_MS)
            .map(|(byte, gap)| (byte, Duration::from_millis(gap)))
    }

    /// `frames` frames as a script, gaps rounded down to whole ticks
    pub fn script(&self, frames: usize, tick: Duration) -> Vec<Step> {
        let tick_us = tick.as_micros().max(1);
        let mut steps = Vec::with_capacity(frames * ECU_FRAME_LEN * 2);
        for _ in 0..frames {
            for (byte, gap) in self.schedule() {
                steps.push(Step::Byte(byte));
                let ticks = u16::try_from(gap.as_micros() / tick_us).unwrap_or(u16::MAX);
                if ticks > 0 {
                    steps.push(Step::Gap(ticks));
                }
            }
        }
        steps
    }

    /// Stream frames into `sink` in real time until `running` drops
    pub fn run<K: ByteSink>(&self, sink: &mut K, running: &AtomicBool) -> Result<u64, LinkError> {
        info!("ECU emulator streaming {:02X?}", self.bytes());
        let mut frames = 0u64;
        while running.load(Ordering::Relaxed) {
            for (byte, gap) in self.schedule() {
                while !sink.transmit_ready()? {
                    std::hint::spin_loop();
                }
                sink.write_byte(byte)?;
                std::thread::sleep(gap);
            }
            frames += 1;
        }
        Ok(frames)
    }
}
