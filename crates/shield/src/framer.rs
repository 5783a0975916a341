//! Outgoing Framer
//!
//! Seals snapshots into shield frames and drives them onto the host link one
//! byte at a time, waiting for the transmitter before each byte.

use frame_protocol::{LinkError, RawTelemetry, Scaling, ShieldLink, TelemetryRecord, SHIELD_FRAME_LEN};
use std::io::Write;
use std::sync::mpsc::Sender;
use tokio_serial::SerialPort;
use tracing::trace;

/// Output link with a transmit-ready condition
pub trait ByteSink {
    /// Whether the transmitter can take another byte
    fn transmit_ready(&mut self) -> Result<bool, LinkError> {
        Ok(true)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), LinkError>;
}

impl<K: ByteSink + ?Sized> ByteSink for Box<K> {
    fn transmit_ready(&mut self) -> Result<bool, LinkError> {
        (**self).transmit_ready()
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), LinkError> {
        (**self).write_byte(byte)
    }
}

/// Captures everything written, for tests and loopback
impl ByteSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> Result<(), LinkError> {
        self.push(byte);
        Ok(())
    }
}

impl ByteSink for Sender<u8> {
    fn write_byte(&mut self, byte: u8) -> Result<(), LinkError> {
        self.send(byte).map_err(|_| LinkError::Closed)
    }
}

/// Discards output; the SPI variant is drained by the transfer interrupt instead
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ByteSink for NullSink {
    fn write_byte(&mut self, _byte: u8) -> Result<(), LinkError> {
        Ok(())
    }
}

/// Serial output; ready once the driver's transmit queue has drained
pub struct SerialSink {
    port: Box<dyn SerialPort>,
}

impl SerialSink {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl ByteSink for SerialSink {
    fn transmit_ready(&mut self) -> Result<bool, LinkError> {
        let queued = self
            .port
            .bytes_to_write()
            .map_err(|e| LinkError::Io(e.into()))?;
        Ok(queued == 0)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), LinkError> {
        self.port.write_all(&[byte])?;
        Ok(())
    }
}

/// Writes frames as space separated hex, one frame per line
pub struct HexSink<W: Write> {
    out: W,
    column: usize,
}

impl<W: Write> HexSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, column: 0 }
    }
}

impl<W: Write> ByteSink for HexSink<W> {
    fn write_byte(&mut self, byte: u8) -> Result<(), LinkError> {
        if self.column > 0 {
            write!(self.out, " ")?;
        }
        write!(self.out, "{:02X}", byte)?;
        self.column += 1;
        if self.column == SHIELD_FRAME_LEN {
            writeln!(self.out)?;
            self.out.flush()?;
            self.column = 0;
        }
        Ok(())
    }
}

/// Serializes snapshots for one host link variant
#[derive(Debug, Clone)]
pub struct OutgoingFramer {
    link: ShieldLink,
    frames_sent: u64,
}

impl OutgoingFramer {
    pub fn new(link: ShieldLink) -> Self {
        Self { link, frames_sent: 0 }
    }

    pub fn link(&self) -> ShieldLink {
        self.link
    }

    /// Command byte, payload in field order, trailing checksum
    pub fn frame(&self, raw: &RawTelemetry) -> [u8; SHIELD_FRAME_LEN] {
        self.link.encode(raw)
    }

    /// Transmit a complete frame. Bytes go out in order and all of them go out.
    pub fn send<K: ByteSink>(&mut self, sink: &mut K, frame: &[u8; SHIELD_FRAME_LEN]) -> Result<(), LinkError> {
        for &byte in frame {
            while !sink.transmit_ready()? {
                std::hint::spin_loop();
            }
            sink.write_byte(byte)?;
        }
        self.frames_sent += 1;
        trace!("Sent frame {:02X?}", frame);
        Ok(())
    }

    /// Quantize a decoded record with `scaling`, then frame and send it
    pub fn send_record<K: ByteSink>(
        &mut self,
        sink: &mut K,
        record: &TelemetryRecord,
        scaling: &Scaling,
    ) -> Result<(), LinkError> {
        let frame = self.frame(&scaling.encode(record));
        self.send(sink, &frame)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_protocol::{GpioFlags, SHIELD_UART_LAYOUT};

    /// Reports busy a fixed number of times before every byte
    struct SlowSink {
        busy_polls: usize,
        pending: usize,
        polls: usize,
        written: Vec<u8>,
    }

    impl ByteSink for SlowSink {
        fn transmit_ready(&mut self) -> Result<bool, LinkError> {
            self.polls += 1;
            if self.pending == 0 {
                return Ok(true);
            }
            self.pending -= 1;
            Ok(false)
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), LinkError> {
            assert_eq!(self.pending, 0, "byte written while transmitter busy");
            self.written.push(byte);
            self.pending = self.busy_polls;
            Ok(())
        }
    }

    fn snapshot() -> RawTelemetry {
        RawTelemetry {
            velocity: 0x0102,
            rpm: 0x28,
            engine_temp: 0x3E,
            flags: GpioFlags::from_byte(0b0_0101),
            air_temp: 0x19,
        }
    }

    #[test]
    fn test_send_waits_for_transmitter() {
        let mut sink = SlowSink {
            busy_polls: 3,
            pending: 3,
            polls: 0,
            written: Vec::new(),
        };
        let mut framer = OutgoingFramer::new(ShieldLink::Uart);
        let frame = framer.frame(&snapshot());
        framer.send(&mut sink, &frame).unwrap();

        assert_eq!(sink.written, frame.to_vec());
        assert_eq!(sink.polls, SHIELD_FRAME_LEN * 4);
        assert_eq!(framer.frames_sent(), 1);
    }

    #[test]
    fn test_frame_is_sealed() {
        let framer = OutgoingFramer::new(ShieldLink::Uart);
        let frame = framer.frame(&snapshot());
        assert_eq!(frame[0], 0x01);
        assert!(SHIELD_UART_LAYOUT.validate(&frame));
    }

    #[test]
    fn test_hex_sink_breaks_lines_per_frame() {
        let mut out = Vec::new();
        {
            let mut sink = HexSink::new(&mut out);
            let mut framer = OutgoingFramer::new(ShieldLink::Uart);
            let frame = framer.frame(&snapshot());
            framer.send(&mut sink, &frame).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("01 01 02 28 3E"));
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_closed_channel_is_a_link_error() {
        let (tx, rx) = std::sync::mpsc::channel::<u8>();
        drop(rx);
        let mut tx = tx;
        assert!(matches!(tx.write_byte(1), Err(LinkError::Closed)));
    }
}
