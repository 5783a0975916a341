//! Serial Port Setup

use frame_protocol::LinkError;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{error, info};

/// Open the shield link at 8N1 without flow control
pub fn open_serial(device: &str, baud_rate: u32) -> Result<SerialStream, LinkError> {
    let stream = tokio_serial::new(device, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| {
            error!("Failed to open {}: {}", device, e);
            LinkError::Open {
                device: device.to_string(),
                reason: e.to_string(),
            }
        })?;

    info!("Opened shield link on {} at {} baud", device, baud_rate);
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_device_is_open_error() {
        let err = open_serial("/dev/does-not-exist-moto", 38400).unwrap_err();
        match err {
            LinkError::Open { device, .. } => assert_eq!(device, "/dev/does-not-exist-moto"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
