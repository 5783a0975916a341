//! Host Link
//!
//! Receiving end of the telemetry shield: opens the serial link, decodes
//! frames with the same resynchronization scheme the shield uses on the ECU
//! side and hands each record to a [`TelemetryConsumer`].

mod config;
mod consumer;
mod decoder;
mod serial;

pub use self::config::{HostConfig, OutputFormat, DEFAULT_CONFIG_FILE};
pub use consumer::{ConsoleConsumer, JsonConsumer, TelemetryConsumer};
pub use decoder::HostFrameDecoder;
pub use serial::open_serial;

pub use frame_protocol::init_logging;

use frame_protocol::LinkError;
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::info;

/// Errors that stop the host
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Feed every decoded record to `consumer` until the link fails
pub async fn relay<R, C>(decoder: &mut HostFrameDecoder<R>, consumer: &mut C) -> Result<(), LinkError>
where
    R: AsyncRead + Unpin,
    C: TelemetryConsumer + ?Sized,
{
    loop {
        let record = decoder.read().await?;
        consumer.consume(&record);
    }
}

/// Open the configured device and relay records into `consumer`
pub async fn run<C>(config: &HostConfig, consumer: &mut C) -> Result<(), HostError>
where
    C: TelemetryConsumer + ?Sized,
{
    let stream = open_serial(&config.device, config.baud_rate)?;
    let mut decoder = HostFrameDecoder::new(stream, config.link, config.scaling);
    info!("Decoding {:?} frames from {}", config.link, config.device);

    let result = relay(&mut decoder, consumer).await;
    info!(
        "Link stopped after {} frames ({} resync rotations)",
        decoder.frames(),
        decoder.rotations()
    );
    result.map_err(HostError::from)
}
