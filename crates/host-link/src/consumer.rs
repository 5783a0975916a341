//! Telemetry Consumers
//!
//! Whatever sits downstream of the decoder (console, log, video overlay)
//! receives each decoded record through [`TelemetryConsumer`].

use frame_protocol::TelemetryRecord;
use std::io::Write;
use tracing::warn;

/// Receives every successfully decoded record
pub trait TelemetryConsumer {
    fn consume(&mut self, record: &TelemetryRecord);
}

impl TelemetryConsumer for Vec<TelemetryRecord> {
    fn consume(&mut self, record: &TelemetryRecord) {
        self.push(*record);
    }
}

impl<C: TelemetryConsumer + ?Sized> TelemetryConsumer for Box<C> {
    fn consume(&mut self, record: &TelemetryRecord) {
        (**self).consume(record)
    }
}

const SPINNER: [char; 4] = ['/', '-', '\\', '|'];

/// Redraws a single status line per record, followed by a spinner
pub struct ConsoleConsumer<W: Write> {
    out: W,
    count: usize,
}

impl<W: Write> ConsoleConsumer<W> {
    pub fn new(out: W) -> Self {
        Self { out, count: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TelemetryConsumer for ConsoleConsumer<W> {
    fn consume(&mut self, record: &TelemetryRecord) {
        self.count += 1;
        let mark = SPINNER[self.count % SPINNER.len()];
        if let Err(e) = writeln!(self.out, "\x1b[A\x1b[2K{} [{}]", record, mark) {
            warn!("Console output failed: {}", e);
        }
    }
}

/// Writes one JSON object per record
pub struct JsonConsumer<W: Write> {
    out: W,
}

impl<W: Write> JsonConsumer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TelemetryConsumer for JsonConsumer<W> {
    fn consume(&mut self, record: &TelemetryRecord) {
        let written = serde_json::to_writer(&mut self.out, record)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out));
        if let Err(e) = written {
            warn!("JSON output failed: {}", e);
        }
    }
}
