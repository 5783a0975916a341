//! ECU Frame Acquisition
//!
//! Hunts for the command byte, fills a frame behind it and rotates byte by
//! byte until the checksum holds. A byte that arrives too late means sampling
//! started mid-frame, so the attempt is dropped and the next call starts over.

use crate::source::ByteSource;
use crate::state::SharedState;
use frame_protocol::{EcuFrame, FrameResynchronizer, LinkError, ECU_FRAME_LEN, ECU_LAYOUT};
use metrics::counter;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    Frame(EcuFrame),
    /// Byte-delay timeout hit; nothing was committed
    Aborted,
}

/// Polls a [`ByteSource`] under the byte-delay timeout kept in [`SharedState`]
pub struct SourceFrameAcquirer {
    state: Arc<SharedState>,
    resync: FrameResynchronizer<ECU_FRAME_LEN>,
    frames: u64,
    aborts: u64,
}

impl SourceFrameAcquirer {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self {
            state,
            resync: FrameResynchronizer::new(&ECU_LAYOUT),
            frames: 0,
            aborts: 0,
        }
    }

    /// Block until a checksum-valid frame arrives or the link goes quiet.
    ///
    /// Only a failing byte source is an error.
    pub fn acquire<S: ByteSource>(&mut self, source: &mut S) -> Result<Acquisition, LinkError> {
        self.resync.reset();

        loop {
            match self.next_byte(source)? {
                Some(byte) if byte == ECU_LAYOUT.command_byte => break,
                Some(_) => continue,
                None => return Ok(self.abort("hunting for command byte")),
            }
        }

        // Possibly a 0x01 inside a payload; the checksum sorts that out
        self.resync.push(ECU_LAYOUT.command_byte);
        let synced = loop {
            match self.next_byte(source)? {
                Some(byte) => {
                    if let Some(synced) = self.resync.push(byte) {
                        break synced;
                    }
                }
                None => return Ok(self.abort("mid-frame")),
            }
        };

        let frame = EcuFrame::from_bytes(&synced.bytes);
        self.frames += 1;
        counter!("shield_frames_acquired_total").increment(1);
        if synced.rotations > 0 {
            debug!("ECU frame locked after {} rotations", synced.rotations);
        }
        Ok(Acquisition::Frame(frame))
    }

    /// Poll one byte; `None` when the timer expired the wait first
    fn next_byte<S: ByteSource>(&self, source: &mut S) -> Result<Option<u8>, LinkError> {
        self.state.arm_byte_wait();
        loop {
            if let Some(byte) = source.poll_byte()? {
                return Ok(Some(byte));
            }
            if self.state.byte_wait_expired() {
                return Ok(None);
            }
            std::hint::spin_loop();
        }
    }

    fn abort(&mut self, phase: &str) -> Acquisition {
        self.aborts += 1;
        counter!("shield_acquisitions_aborted_total").increment(1);
        debug!(
            "ECU acquisition aborted {} ({} bytes buffered)",
            phase,
            self.resync.buffered()
        );
        self.resync.reset();
        Acquisition::Aborted
    }

    /// Frames acquired so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Attempts dropped on the byte-delay timeout
    pub fn aborts(&self) -> u64 {
        self.aborts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ScriptedSource, Step};
    use crate::timer::TimerTask;
    use frame_protocol::Scaling;

    const REFERENCE: [u8; 6] = [0x01, 0x28, 0x0A, 0x00, 0x3E, 0x70];

    fn setup(steps: Vec<Step>) -> (SourceFrameAcquirer, ScriptedSource) {
        let state = Arc::new(SharedState::new());
        let timer = TimerTask::new(Arc::clone(&state), 5, 125);
        (SourceFrameAcquirer::new(state), ScriptedSource::new(timer, steps))
    }

    fn bytes(frame: &[u8]) -> Vec<Step> {
        frame.iter().map(|&b| Step::Byte(b)).collect()
    }

    #[test]
    fn test_reference_frame_decodes() {
        let (mut acquirer, mut source) = setup(bytes(&REFERENCE));
        let Acquisition::Frame(frame) = acquirer.acquire(&mut source).unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(frame, EcuFrame { rpm: 0x28, velocity: 0x0A, engine_temp: 0x3E });

        let scaling = Scaling::default();
        assert!((frame.rpm as f32 * scaling.rpm_factor - 2000.0).abs() < 0.01);
        assert!((frame.velocity as f32 * scaling.velocity_factor - 4.0).abs() < 0.001);
        assert!((scaling.engine_temp(frame.engine_temp) - 33.4953).abs() < 0.001);
    }

    #[test]
    fn test_leading_garbage_is_skipped() {
        let mut steps = bytes(&[0xAA, 0x55, 0x6C]);
        steps.extend(bytes(&REFERENCE));
        let (mut acquirer, mut source) = setup(steps);
        assert!(matches!(acquirer.acquire(&mut source).unwrap(), Acquisition::Frame(_)));
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_stray_command_byte_recovers() {
        let mut steps = bytes(&[0x01]);
        steps.extend(bytes(&REFERENCE));
        let (mut acquirer, mut source) = setup(steps);
        let acquired = acquirer.acquire(&mut source).unwrap();
        assert_eq!(acquired, Acquisition::Frame(EcuFrame::from_bytes(&REFERENCE)));
        assert_eq!(acquirer.frames(), 1);
        assert_eq!(acquirer.aborts(), 0);
    }

    #[test]
    fn test_late_byte_aborts_and_next_call_starts_fresh() {
        let second = EcuFrame { rpm: 0x30, velocity: 0x0B, engine_temp: 0x40 };
        let mut steps = bytes(&REFERENCE[..4]);
        steps.push(Step::Gap(6));
        steps.extend(bytes(&REFERENCE[4..]));
        steps.extend(bytes(&second.to_bytes()));
        let (mut acquirer, mut source) = setup(steps);

        assert_eq!(acquirer.acquire(&mut source).unwrap(), Acquisition::Aborted);
        assert_eq!(acquirer.aborts(), 1);

        // The stale tail of the first frame is not stitched back on
        assert_eq!(acquirer.acquire(&mut source).unwrap(), Acquisition::Frame(second));
    }

    #[test]
    fn test_short_gap_is_tolerated() {
        let mut steps = bytes(&REFERENCE[..4]);
        steps.push(Step::Gap(4));
        steps.extend(bytes(&REFERENCE[4..]));
        let (mut acquirer, mut source) = setup(steps);
        assert!(matches!(acquirer.acquire(&mut source).unwrap(), Acquisition::Frame(_)));
    }

    #[test]
    fn test_silent_link_aborts_hunt() {
        let (mut acquirer, mut source) = setup(vec![Step::Gap(10), Step::Byte(0x01)]);
        assert_eq!(acquirer.acquire(&mut source).unwrap(), Acquisition::Aborted);
    }

    #[test]
    fn test_closed_source_is_an_error() {
        let (mut acquirer, mut source) = setup(bytes(&REFERENCE[..3]));
        assert!(matches!(acquirer.acquire(&mut source), Err(LinkError::Closed)));
    }
}
