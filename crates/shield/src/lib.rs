//! Telemetry Shield
//!
//! Host-side model of the shield microcontroller. It acquires ECU frames from
//! a delimiter-less serial stream, aggregates them with local sensor readings
//! and relays sealed frames to the host over UART or SPI.
//!
//! Interrupt handlers are plain methods ([`TimerTask::on_tick`],
//! [`SpiTransfer::on_transfer_complete`]) so tests can drive them directly.

mod acquirer;
mod aggregator;
mod clock;
mod config;
mod emulator;
mod error;
mod framer;
mod sensors;
mod shield;
mod source;
mod spi;
mod state;
mod timer;

pub use acquirer::{Acquisition, SourceFrameAcquirer};
pub use aggregator::{TelemetryAggregator, VelocityAccumulator, DEFAULT_VELOCITY_WINDOW};
pub use clock::{elapsed, TickCounter, DEFAULT_TICK_HZ};
pub use config::ShieldConfig;
pub use emulator::{EcuEmulator, BYTE_GAPS_MS, EMULATED_FRAME};
pub use error::ShieldError;
pub use framer::{ByteSink, HexSink, NullSink, OutgoingFramer, SerialSink};
pub use sensors::{FixedSensors, Sensors, PIN_MAP};
pub use shield::{CycleReport, Shield};
pub use source::{open_serial, ByteSource, ScriptedSource, SerialSource, Step};
pub use spi::SpiTransfer;
pub use state::SharedState;
pub use timer::TimerTask;

pub use frame_protocol::init_logging;
