//! Host Frame Decoder
//!
//! Reads shield frames from an async byte stream. Corrupt or misaligned bytes
//! are rotated through a fresh window on every read until a frame checks out;
//! only a failing or closed link is reported.

use frame_protocol::{
    FrameResynchronizer, LinkError, RawTelemetry, Scaling, ShieldLink, TelemetryRecord, SHIELD_FRAME_LEN,
};
use metrics::counter;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::debug;

/// Decodes [`TelemetryRecord`]s from a shield link
pub struct HostFrameDecoder<R> {
    reader: BufReader<R>,
    link: ShieldLink,
    scaling: Scaling,
    frames: u64,
    rotations: u64,
}

impl<R: AsyncRead + Unpin> HostFrameDecoder<R> {
    pub fn new(reader: R, link: ShieldLink, scaling: Scaling) -> Self {
        Self {
            reader: BufReader::new(reader),
            link,
            scaling,
            frames: 0,
            rotations: 0,
        }
    }

    /// Wait for the next checksum-valid frame and decode it
    pub async fn read(&mut self) -> Result<TelemetryRecord, LinkError> {
        let raw = self.read_raw().await?;
        Ok(self.scaling.decode(&raw))
    }

    /// Like [`Self::read`] without applying scaling
    pub async fn read_raw(&mut self) -> Result<RawTelemetry, LinkError> {
        let mut resync = FrameResynchronizer::<SHIELD_FRAME_LEN>::new(self.link.layout());
        loop {
            let byte = self.reader.read_u8().await?;
            let Some(synced) = resync.push(byte) else {
                continue;
            };

            self.frames += 1;
            counter!("host_frames_decoded_total").increment(1);
            if synced.rotations > 0 {
                self.rotations += synced.rotations as u64;
                counter!("host_resync_rotations_total").increment(synced.rotations as u64);
                debug!(
                    "Host link resynchronized: {} rotations, {} rejected candidates",
                    synced.rotations, synced.false_locks
                );
            }
            return Ok(self.link.decode(&synced.bytes));
        }
    }

    /// Frames decoded so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Rotations spent resynchronizing across all reads
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    pub fn scaling(&self) -> &Scaling {
        &self.scaling
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}
