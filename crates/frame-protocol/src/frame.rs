//! Wire Codecs for the ECU and Shield Links

use crate::checksum::{FrameLayout, ECU_LAYOUT, SHIELD_SPI_LAYOUT, SHIELD_UART_LAYOUT};
use crate::gpio::GpioFlags;
use crate::record::RawTelemetry;
use serde::{Deserialize, Serialize};

/// ECU frame length in bytes
pub const ECU_FRAME_LEN: usize = 6;

/// Shield → host frame length in bytes (both variants)
pub const SHIELD_FRAME_LEN: usize = 8;

/// ECU field offsets
pub mod ecu_offset {
    pub const RPM: usize = 1;
    pub const VELOCITY: usize = 2;
    pub const RESERVED: usize = 3;
    pub const ENGINE_TEMP: usize = 4;
}

/// Validated ECU sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcuFrame {
    pub rpm: u8,
    /// Instantaneous velocity sample
    pub velocity: u8,
    pub engine_temp: u8,
}

impl EcuFrame {
    /// Pick fields out of a frame already accepted by [`ECU_LAYOUT`]
    pub fn from_bytes(bytes: &[u8; ECU_FRAME_LEN]) -> Self {
        Self {
            rpm: bytes[ecu_offset::RPM],
            velocity: bytes[ecu_offset::VELOCITY],
            engine_temp: bytes[ecu_offset::ENGINE_TEMP],
        }
    }

    /// Serialize with command byte and checksum, as the ECU sends it
    pub fn to_bytes(&self) -> [u8; ECU_FRAME_LEN] {
        let mut bytes = [0u8; ECU_FRAME_LEN];
        bytes[ecu_offset::RPM] = self.rpm;
        bytes[ecu_offset::VELOCITY] = self.velocity;
        bytes[ecu_offset::RESERVED] = 0x00;
        bytes[ecu_offset::ENGINE_TEMP] = self.engine_temp;
        ECU_LAYOUT.seal(&mut bytes);
        bytes
    }
}

/// Physical variant of the shield → host link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShieldLink {
    /// UART: 16-bit aggregated velocity, 8-bit air temperature
    #[default]
    Uart,
    /// SPI slave drained by the transfer interrupt: 8-bit velocity,
    /// 16-bit little-endian air temperature
    Spi,
}

mod uart_offset {
    pub const VELOCITY_MSB: usize = 1;
    pub const VELOCITY_LSB: usize = 2;
    pub const RPM: usize = 3;
    pub const ENGINE_TEMP: usize = 4;
    pub const GPIO: usize = 5;
    pub const AIR_TEMP: usize = 6;
}

mod spi_offset {
    pub const VELOCITY: usize = 1;
    pub const RPM: usize = 2;
    pub const ENGINE_TEMP: usize = 3;
    pub const GPIO: usize = 4;
    pub const AIR_TEMP_LSB: usize = 5;
    pub const AIR_TEMP_MSB: usize = 6;
}

impl ShieldLink {
    pub fn layout(&self) -> &'static FrameLayout {
        match self {
            ShieldLink::Uart => &SHIELD_UART_LAYOUT,
            ShieldLink::Spi => &SHIELD_SPI_LAYOUT,
        }
    }

    /// Serialize a snapshot into a sealed frame.
    ///
    /// Fields wider than the variant allows saturate.
    pub fn encode(&self, raw: &RawTelemetry) -> [u8; SHIELD_FRAME_LEN] {
        let mut frame = [0u8; SHIELD_FRAME_LEN];
        match self {
            ShieldLink::Uart => {
                let [msb, lsb] = raw.velocity.to_be_bytes();
                frame[uart_offset::VELOCITY_MSB] = msb;
                frame[uart_offset::VELOCITY_LSB] = lsb;
                frame[uart_offset::RPM] = raw.rpm;
                frame[uart_offset::ENGINE_TEMP] = raw.engine_temp;
                frame[uart_offset::GPIO] = raw.flags.to_byte();
                frame[uart_offset::AIR_TEMP] = saturate_u8(raw.air_temp);
            }
            ShieldLink::Spi => {
                let [lsb, msb] = raw.air_temp.to_le_bytes();
                frame[spi_offset::VELOCITY] = saturate_u8(raw.velocity);
                frame[spi_offset::RPM] = raw.rpm;
                frame[spi_offset::ENGINE_TEMP] = raw.engine_temp;
                frame[spi_offset::GPIO] = raw.flags.to_byte();
                frame[spi_offset::AIR_TEMP_LSB] = lsb;
                frame[spi_offset::AIR_TEMP_MSB] = msb;
            }
        }
        self.layout().seal(&mut frame);
        frame
    }

    /// Extract fields from a frame already accepted by [`Self::layout`]
    pub fn decode(&self, frame: &[u8; SHIELD_FRAME_LEN]) -> RawTelemetry {
        match self {
            ShieldLink::Uart => RawTelemetry {
                velocity: u16::from_be_bytes([
                    frame[uart_offset::VELOCITY_MSB],
                    frame[uart_offset::VELOCITY_LSB],
                ]),
                rpm: frame[uart_offset::RPM],
                engine_temp: frame[uart_offset::ENGINE_TEMP],
                flags: GpioFlags::from_byte(frame[uart_offset::GPIO]),
                air_temp: frame[uart_offset::AIR_TEMP] as u16,
            },
            ShieldLink::Spi => RawTelemetry {
                velocity: frame[spi_offset::VELOCITY] as u16,
                rpm: frame[spi_offset::RPM],
                engine_temp: frame[spi_offset::ENGINE_TEMP],
                flags: GpioFlags::from_byte(frame[spi_offset::GPIO]),
                air_temp: u16::from_le_bytes([
                    frame[spi_offset::AIR_TEMP_LSB],
                    frame[spi_offset::AIR_TEMP_MSB],
                ]),
            },
        }
    }
}

fn saturate_u8(value: u16) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawTelemetry {
        RawTelemetry {
            velocity: 0x0123,
            rpm: 0x28,
            engine_temp: 0x3E,
            flags: GpioFlags::from_byte(0b1_0010),
            air_temp: 0x15,
        }
    }

    #[test]
    fn test_ecu_frame_fields() {
        let frame = EcuFrame::from_bytes(&[0x01, 0x28, 0x0A, 0x00, 0x3E, 0x70]);
        assert_eq!(frame.rpm, 0x28);
        assert_eq!(frame.velocity, 0x0A);
        assert_eq!(frame.engine_temp, 0x3E);
        assert_eq!(frame.to_bytes(), [0x01, 0x28, 0x0A, 0x00, 0x3E, 0x70]);
    }

    #[test]
    fn test_uart_layout_is_big_endian() {
        let frame = ShieldLink::Uart.encode(&sample());
        assert_eq!(frame, [0x01, 0x01, 0x23, 0x28, 0x3E, 0x12, 0x15, 0xB1]);
        assert!(SHIELD_UART_LAYOUT.validate(&frame));
        assert_eq!(ShieldLink::Uart.decode(&frame), sample());
    }

    #[test]
    fn test_spi_layout_marker_and_le_air_temp() {
        let raw = RawTelemetry {
            velocity: 0x40,
            air_temp: 0x0191,
            ..sample()
        };
        let frame = ShieldLink::Spi.encode(&raw);
        assert_eq!(frame[0], 0x00);
        assert_eq!(frame[5..7], [0x91, 0x01]);
        assert!(SHIELD_SPI_LAYOUT.validate(&frame));
        assert_eq!(ShieldLink::Spi.decode(&frame), raw);
    }

    #[test]
    fn test_narrow_fields_saturate() {
        let raw = RawTelemetry {
            velocity: 0x0400,
            air_temp: 0x0300,
            ..sample()
        };
        assert_eq!(ShieldLink::Spi.encode(&raw)[1], 0xFF);
        assert_eq!(ShieldLink::Uart.encode(&raw)[6], 0xFF);
    }
}
