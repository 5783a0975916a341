//! Telemetry Records and Scaling
//!
//! [`RawTelemetry`] is what travels on the wire; [`TelemetryRecord`] is what
//! consumers see. [`Scaling`] converts between the two.

use crate::gpio::GpioFlags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Undecoded snapshot assembled by the shield
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTelemetry {
    /// Velocity samples summed over one aggregation window
    pub velocity: u16,
    pub rpm: u8,
    pub engine_temp: u8,
    pub flags: GpioFlags,
    /// Air temperature ADC/sensor reading
    pub air_temp: u16,
}

/// Decoded telemetry handed to consumers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// km/h
    pub velocity: f32,
    pub rpm: f32,
    /// °C
    pub engine_temp: f32,
    /// °C
    pub air_temp: f32,
    pub flags: GpioFlags,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SPEED={:.1} km/h, RPM={:.0} rpm, ENGINE={:.1} \u{2103}, AIR={:.1} \u{2103}, \
             FB={}, RB={}, LEFT={}, RIGHT={}, PARKL={}",
            self.velocity,
            self.rpm,
            self.engine_temp,
            self.air_temp,
            u8::from(self.flags.front_brake),
            u8::from(self.flags.rear_brake),
            u8::from(self.flags.left_turn),
            u8::from(self.flags.right_turn),
            u8::from(self.flags.parking_light),
        )
    }
}

/// Linear calibration from raw bytes to engineering units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scaling {
    /// km/h per aggregated velocity count (found empirically)
    pub velocity_factor: f32,
    /// RPM per raw count
    pub rpm_factor: f32,
    /// Empirical linear fit for the engine temperature sensor
    pub engine_temp_gain: f32,
    pub engine_temp_offset: f32,
    /// Air temperature is passed through unless calibrated
    pub air_temp_gain: f32,
    pub air_temp_offset: f32,
}

impl Default for Scaling {
    fn default() -> Self {
        Self {
            velocity_factor: 0.4,
            rpm_factor: 50.0,
            engine_temp_gain: 0.95515,
            engine_temp_offset: -25.724,
            air_temp_gain: 1.0,
            air_temp_offset: 0.0,
        }
    }
}

impl Scaling {
    pub fn decode(&self, raw: &RawTelemetry) -> TelemetryRecord {
        TelemetryRecord {
            velocity: raw.velocity as f32 * self.velocity_factor,
            rpm: raw.rpm as f32 * self.rpm_factor,
            engine_temp: self.engine_temp(raw.engine_temp),
            air_temp: raw.air_temp as f32 * self.air_temp_gain + self.air_temp_offset,
            flags: raw.flags,
        }
    }

    /// Nearest raw representation of `record`, saturating at the field width
    pub fn encode(&self, record: &TelemetryRecord) -> RawTelemetry {
        RawTelemetry {
            velocity: quantize(record.velocity / self.velocity_factor, u16::MAX as f32) as u16,
            rpm: quantize(record.rpm / self.rpm_factor, u8::MAX as f32) as u8,
            engine_temp: quantize(
                (record.engine_temp - self.engine_temp_offset) / self.engine_temp_gain,
                u8::MAX as f32,
            ) as u8,
            air_temp: quantize(
                (record.air_temp - self.air_temp_offset) / self.air_temp_gain,
                u16::MAX as f32,
            ) as u16,
            flags: record.flags,
        }
    }

    pub fn engine_temp(&self, raw: u8) -> f32 {
        self.engine_temp_gain * raw as f32 + self.engine_temp_offset
    }
}

fn quantize(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.round().clamp(0.0, max)
}
