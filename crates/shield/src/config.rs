//! Shield configuration

use crate::aggregator::DEFAULT_VELOCITY_WINDOW;
use crate::clock::DEFAULT_TICK_HZ;
use crate::error::ShieldError;
use ::config::{Config, Environment, File};
use frame_protocol::{baud, ShieldLink};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Firmware constants plus the simulator's device wiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    /// Ticks without an ECU byte before the frame is abandoned
    pub byte_delay_cancel: u16,

    /// Velocity is committed once more ticks than this have passed
    pub velocity_window: u16,

    /// Timer interrupt rate
    pub tick_hz: u32,

    /// Host link variant
    pub link: ShieldLink,

    /// ECU serial device; the built-in emulator is used when unset
    pub ecu_device: Option<String>,
    pub ecu_baud: u32,

    /// Host serial device; frames are printed as hex when unset
    pub host_device: Option<String>,
    pub host_baud: u32,

    /// Simulated GPIO port level and air temperature reading
    pub gpio_pins: u8,
    pub air_temp: u16,

    pub log_level: String,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            byte_delay_cancel: 5,
            velocity_window: DEFAULT_VELOCITY_WINDOW,
            tick_hz: DEFAULT_TICK_HZ,
            link: ShieldLink::Uart,
            ecu_device: None,
            ecu_baud: baud::ECU,
            host_device: None,
            host_baud: baud::SHIELD,
            gpio_pins: 0,
            air_temp: 20,
            log_level: "info".to_string(),
        }
    }
}

impl ShieldConfig {
    /// Defaults, overlaid by an optional file and `SHIELD_*` variables
    pub fn load(path: Option<&str>) -> Result<Self, ShieldError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let config = builder
            .add_source(Environment::with_prefix("SHIELD").try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Timer period derived from [`Self::tick_hz`]
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_hz.max(1)))
    }
}
