//! SPI Slave Transfer Drain

use double_buffer::DoubleBuffer;
use frame_protocol::SHIELD_FRAME_LEN;
use std::sync::Arc;

/// Body of the SPI transfer-complete interrupt.
///
/// Every clocked byte takes the next byte of the committed snapshot; the main
/// loop's swaps wait until a whole frame has gone out.
#[derive(Clone)]
pub struct SpiTransfer {
    buffer: Arc<DoubleBuffer<SHIELD_FRAME_LEN>>,
}

impl SpiTransfer {
    pub fn new(buffer: Arc<DoubleBuffer<SHIELD_FRAME_LEN>>) -> Self {
        Self { buffer }
    }

    /// The master clocked a byte out; returns the byte it received
    pub fn on_transfer_complete(&self) -> u8 {
        self.buffer.shift_out()
    }

    /// Clock out a whole frame's worth of bytes
    pub fn clock_frame(&self) -> [u8; SHIELD_FRAME_LEN] {
        let mut frame = [0u8; SHIELD_FRAME_LEN];
        for byte in frame.iter_mut() {
            *byte = self.on_transfer_complete();
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_protocol::{RawTelemetry, ShieldLink, SHIELD_SPI_LAYOUT};

    #[test]
    fn test_master_reads_sealed_spi_frame() {
        let buffer = Arc::new(DoubleBuffer::new([0u8; SHIELD_FRAME_LEN]));
        let spi = SpiTransfer::new(Arc::clone(&buffer));
        let raw = RawTelemetry {
            velocity: 0x21,
            rpm: 0x30,
            engine_temp: 0x50,
            air_temp: 0x0123,
            ..Default::default()
        };
        buffer.try_publish(ShieldLink::Spi.encode(&raw)).unwrap();

        let frame = spi.clock_frame();
        assert!(SHIELD_SPI_LAYOUT.validate(&frame));
        assert_eq!(ShieldLink::Spi.decode(&frame), raw);
        assert!(!buffer.is_busy());
    }
}
