//! GPIO Bitfield
//!
//! Five independent lamp/brake signals packed into one byte. Encoding and
//! decoding both walk [`GPIO_BITS`], so the bit assignment lives in one place.

use serde::{Deserialize, Serialize};

/// Digital signals sampled by the shield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpioSignal {
    LeftTurn,
    RightTurn,
    FrontBrake,
    RearBrake,
    ParkingLight,
}

/// Bit position of each signal in the wire GPIO byte
pub const GPIO_BITS: [(GpioSignal, u8); 5] = [
    (GpioSignal::LeftTurn, 0),
    (GpioSignal::RightTurn, 1),
    (GpioSignal::FrontBrake, 2),
    (GpioSignal::RearBrake, 3),
    (GpioSignal::ParkingLight, 4),
];

/// Decoded GPIO byte. Any combination of flags is legal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioFlags {
    pub left_turn: bool,
    pub right_turn: bool,
    pub front_brake: bool,
    pub rear_brake: bool,
    pub parking_light: bool,
}

impl GpioFlags {
    /// Decode a byte using `table` (bits not listed are ignored)
    pub fn from_bits_with(byte: u8, table: &[(GpioSignal, u8)]) -> Self {
        let mut flags = Self::default();
        for &(signal, bit) in table {
            flags.set(signal, byte & (1 << bit) != 0);
        }
        flags
    }

    /// Encode into a byte using `table`
    pub fn to_bits_with(&self, table: &[(GpioSignal, u8)]) -> u8 {
        table
            .iter()
            .filter(|(signal, _)| self.get(*signal))
            .fold(0u8, |acc, (_, bit)| acc | (1 << bit))
    }

    /// Decode the wire GPIO byte
    pub fn from_byte(byte: u8) -> Self {
        Self::from_bits_with(byte, &GPIO_BITS)
    }

    /// Encode to the wire GPIO byte
    pub fn to_byte(&self) -> u8 {
        self.to_bits_with(&GPIO_BITS)
    }

    pub fn get(&self, signal: GpioSignal) -> bool {
        match signal {
            GpioSignal::LeftTurn => self.left_turn,
            GpioSignal::RightTurn => self.right_turn,
            GpioSignal::FrontBrake => self.front_brake,
            GpioSignal::RearBrake => self.rear_brake,
            GpioSignal::ParkingLight => self.parking_light,
        }
    }

    pub fn set(&mut self, signal: GpioSignal, on: bool) {
        match signal {
            GpioSignal::LeftTurn => self.left_turn = on,
            GpioSignal::RightTurn => self.right_turn = on,
            GpioSignal::FrontBrake => self.front_brake = on,
            GpioSignal::RearBrake => self.rear_brake = on,
            GpioSignal::ParkingLight => self.parking_light = on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_bit_positions() {
        let flags = GpioFlags::from_byte(0b0000_0101);
        assert!(flags.left_turn);
        assert!(flags.front_brake);
        assert!(!flags.right_turn);
        assert!(!flags.rear_brake);
        assert!(!flags.parking_light);
    }

    #[test]
    fn test_every_byte_pattern_is_legal() {
        for byte in 0u8..32 {
            assert_eq!(GpioFlags::from_byte(byte).to_byte(), byte);
        }
    }

    #[test]
    fn test_unmapped_bits_ignored() {
        assert_eq!(GpioFlags::from_byte(0xE0), GpioFlags::default());
    }

    #[test]
    fn test_custom_pin_table() {
        let pins = [(GpioSignal::ParkingLight, 7), (GpioSignal::LeftTurn, 6)];
        let flags = GpioFlags::from_bits_with(0x80, &pins);
        assert!(flags.parking_light);
        assert!(!flags.left_turn);
        assert_eq!(flags.to_byte(), 0b0001_0000);
    }
}
