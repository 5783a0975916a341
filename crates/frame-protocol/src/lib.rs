//! Shield Telemetry Frame Protocol
//!
//! Fixed-length, delimiter-less frames shared by the ECU → shield and
//! shield → host serial links: additive checksum, single-byte
//! resynchronization, GPIO bit table and raw ↔ engineering-unit scaling.

mod checksum;
mod error;
mod frame;
mod gpio;
mod logging;
mod record;
mod window;

pub use checksum::{checksum, FrameLayout, ECU_LAYOUT, SHIELD_SPI_LAYOUT, SHIELD_UART_LAYOUT};
pub use error::LinkError;
pub use frame::{ecu_offset, EcuFrame, ShieldLink, ECU_FRAME_LEN, SHIELD_FRAME_LEN};
pub use gpio::{GpioFlags, GpioSignal, GPIO_BITS};
pub use logging::init_logging;
pub use record::{RawTelemetry, Scaling, TelemetryRecord};
pub use window::{FrameResynchronizer, FrameWindow, SyncedFrame};

/// Line settings of both serial links (8 data bits, no parity, 1 stop bit)
pub mod baud {
    /// ECU diagnostic line
    pub const ECU: u32 = 16064;
    /// Shield → host UART
    pub const SHIELD: u32 = 38400;
}
