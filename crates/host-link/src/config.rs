//! Host configuration

use crate::HostError;
use ::config::{Config, Environment, File};
use frame_protocol::{baud, Scaling, ShieldLink};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up with any supported extension
pub const DEFAULT_CONFIG_FILE: &str = "moto-telemetry";

/// How decoded records are presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One redrawn status line with a spinner
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// Host decoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Serial device the shield is attached to
    pub device: String,
    pub baud_rate: u32,
    pub link: ShieldLink,
    pub output: OutputFormat,
    pub log_level: String,
    /// Must match the calibration the shield was built with
    pub scaling: Scaling,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyAMA0".to_string(),
            baud_rate: baud::SHIELD,
            link: ShieldLink::Uart,
            output: OutputFormat::Console,
            log_level: "info".to_string(),
            scaling: Scaling::default(),
        }
    }
}

impl HostConfig {
    /// Defaults, overlaid by an optional file and `MOTO_*` variables.
    ///
    /// Nested keys use a double underscore, e.g. `MOTO_SCALING__RPM_FACTOR`.
    pub fn load(path: Option<&str>) -> Result<Self, HostError> {
        let config = Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(false))
            .add_source(
                Environment::with_prefix("MOTO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
