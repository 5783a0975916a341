//! Additive Checksum and Frame Layouts
//!
//! Both the ECU link and the shield link carry fixed-length frames with no
//! delimiter: a command byte, a payload and a one-byte additive checksum.

use std::ops::Range;

/// Modulo-256 additive sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &x| acc.wrapping_add(x))
}

/// Fixed geometry of one frame type on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    /// Human readable link name, used in logs
    pub name: &'static str,
    /// Total frame length including command and checksum bytes
    pub len: usize,
    /// Value expected at offset 0
    pub command_byte: u8,
    /// Offsets covered by the checksum
    pub payload: Range<usize>,
    /// Offset of the checksum byte
    pub checksum_at: usize,
}

/// ECU → shield: `[cmd, rpm, velocity, reserved, engine_temp, checksum]`
pub const ECU_LAYOUT: FrameLayout = FrameLayout {
    name: "ecu",
    len: 6,
    command_byte: 0x01,
    payload: 1..5,
    checksum_at: 5,
};

/// Shield → host over UART:
/// `[cmd, vel_msb, vel_lsb, rpm, engine_temp, gpio, air_temp, checksum]`
pub const SHIELD_UART_LAYOUT: FrameLayout = FrameLayout {
    name: "shield-uart",
    len: 8,
    command_byte: 0x01,
    payload: 1..7,
    checksum_at: 7,
};

/// Shield → host over SPI, marker byte followed by
/// `[velocity, rpm, engine_temp, gpio, air_lsb, air_msb, checksum]`
pub const SHIELD_SPI_LAYOUT: FrameLayout = FrameLayout {
    name: "shield-spi",
    len: 8,
    command_byte: 0x00,
    payload: 1..7,
    checksum_at: 7,
};

impl FrameLayout {
    /// Checksum of the payload range of `frame`.
    ///
    /// `frame` must be at least `self.len` bytes long.
    pub fn payload_checksum(&self, frame: &[u8]) -> u8 {
        checksum(&frame[self.payload.clone()])
    }

    /// True iff `frame` is complete, starts with the command byte and carries
    /// a matching checksum. Each condition is evaluated on its own.
    pub fn validate(&self, frame: &[u8]) -> bool {
        let complete = frame.len() == self.len;
        if !complete {
            return false;
        }

        let command_ok = frame[0] == self.command_byte;
        let checksum_ok = self.payload_checksum(frame) == frame[self.checksum_at];
        command_ok && checksum_ok
    }

    /// Write the command byte and checksum around an already filled payload.
    pub fn seal(&self, frame: &mut [u8]) {
        frame[0] = self.command_byte;
        frame[self.checksum_at] = self.payload_checksum(frame);
    }
}
