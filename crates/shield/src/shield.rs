//! Shield Main Loop

use crate::acquirer::{Acquisition, SourceFrameAcquirer};
use crate::aggregator::TelemetryAggregator;
use crate::config::ShieldConfig;
use crate::framer::{ByteSink, OutgoingFramer};
use crate::sensors::Sensors;
use crate::source::ByteSource;
use crate::spi::SpiTransfer;
use crate::state::SharedState;
use crate::timer::TimerTask;
use double_buffer::DoubleBuffer;
use frame_protocol::{LinkError, RawTelemetry, ShieldLink, SHIELD_FRAME_LEN};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info};

/// What one pass of the main loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub acquisition: Acquisition,
    /// Whether a new snapshot was committed for transfer
    pub published: bool,
}

/// The producing microcontroller: acquire, aggregate, publish, send.
///
/// Owns the polling side; the timer and SPI interrupt bodies are handed out
/// through [`Shield::timer`] and [`Shield::spi_transfer`].
pub struct Shield<S, E, K> {
    state: Arc<SharedState>,
    timer: TimerTask,
    acquirer: SourceFrameAcquirer,
    aggregator: TelemetryAggregator,
    framer: OutgoingFramer,
    publisher: Arc<DoubleBuffer<SHIELD_FRAME_LEN>>,
    source: S,
    sensors: E,
    sink: K,
    cycles: u64,
}

impl<S, E, K> Shield<S, E, K>
where
    S: ByteSource,
    E: Sensors,
    K: ByteSink,
{
    /// Wire up a shield. With [`ShieldLink::Spi`] the sink is never written;
    /// frames leave through [`Shield::spi_transfer`].
    pub fn new(config: &ShieldConfig, source: S, sensors: E, sink: K) -> Self {
        let state = Arc::new(SharedState::new());
        Self::with_state(config, state, source, sensors, sink)
    }

    /// Like [`Shield::new`] around existing shared state, e.g. one a scripted
    /// source already ticks
    pub fn with_state(config: &ShieldConfig, state: Arc<SharedState>, source: S, sensors: E, sink: K) -> Self {
        let timer = TimerTask::new(Arc::clone(&state), config.byte_delay_cancel, config.velocity_window);
        let framer = OutgoingFramer::new(config.link);
        let idle = framer.frame(&RawTelemetry::default());

        info!(
            "Shield ready: {:?} host link, byte timeout {} ticks, velocity window {} ticks",
            config.link, config.byte_delay_cancel, config.velocity_window
        );

        Self {
            acquirer: SourceFrameAcquirer::new(Arc::clone(&state)),
            aggregator: TelemetryAggregator::new(Arc::clone(&state)),
            publisher: Arc::new(DoubleBuffer::new(idle)),
            state,
            timer,
            framer,
            source,
            sensors,
            sink,
            cycles: 0,
        }
    }

    /// One pass of the firmware loop.
    ///
    /// An aborted acquisition publishes nothing; consumers keep the previous
    /// record. A deferred swap leaves the snapshot in the write slot for the
    /// next cycle to retry.
    pub fn run_cycle(&mut self) -> Result<CycleReport, LinkError> {
        self.cycles += 1;
        let acquisition = self.acquirer.acquire(&mut self.source)?;
        let Acquisition::Frame(frame) = acquisition else {
            return Ok(CycleReport {
                acquisition,
                published: false,
            });
        };

        self.aggregator.commit_ecu(&frame);
        self.aggregator.sample_sensors(&mut self.sensors);
        let outgoing = self.framer.frame(&self.aggregator.snapshot());

        let published = match self.publisher.try_publish(outgoing) {
            Ok(()) => true,
            Err(_) => {
                counter!("shield_swaps_deferred_total").increment(1);
                false
            }
        };

        if self.framer.link() == ShieldLink::Uart {
            let committed = self.publisher.committed();
            self.framer.send(&mut self.sink, &committed)?;
        }

        Ok(CycleReport {
            acquisition,
            published,
        })
    }

    /// Loop until the input link fails
    pub fn run(&mut self) -> Result<(), LinkError> {
        info!("Shield main loop started");
        loop {
            let report = self.run_cycle()?;
            if self.cycles % 1000 == 0 {
                debug!(
                    "{} cycles: {} frames, {} aborts, last {:?}",
                    self.cycles,
                    self.acquirer.frames(),
                    self.acquirer.aborts(),
                    report.acquisition
                );
            }
        }
    }

    /// Timer interrupt handle sharing this shield's state
    pub fn timer(&self) -> TimerTask {
        self.timer.clone()
    }

    /// SPI transfer-complete interrupt handle
    pub fn spi_transfer(&self) -> SpiTransfer {
        SpiTransfer::new(Arc::clone(&self.publisher))
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn snapshot(&self) -> RawTelemetry {
        self.aggregator.snapshot()
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
