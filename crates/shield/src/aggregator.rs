//! Telemetry Aggregation
//!
//! Folds validated ECU frames and sensor samples into the snapshot that the
//! shield publishes. Velocity arrives faster than the output cadence, so it is
//! summed over a tick window instead of being forwarded per frame.

use crate::sensors::{Sensors, PIN_MAP};
use crate::state::SharedState;
use frame_protocol::{EcuFrame, GpioFlags, GpioSignal, RawTelemetry, Scaling, TelemetryRecord};
use std::sync::Arc;

/// Default aggregation window: commit once more than this many ticks passed
pub const DEFAULT_VELOCITY_WINDOW: u16 = 125;

/// Running velocity sum plus the ticks spent in the current window.
///
/// The sum wraps modulo 2^16 like the wire field it lands in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VelocityAccumulator {
    sum: u16,
    ticks: u16,
}

impl VelocityAccumulator {
    pub fn add(&mut self, sample: u8) {
        self.sum = self.sum.wrapping_add(sample as u16);
    }

    /// Count one tick; once more than `window` ticks have passed, return the
    /// sum and start over from zero.
    pub fn tick(&mut self, window: u16) -> Option<u16> {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks > window {
            let sum = self.sum;
            *self = Self::default();
            Some(sum)
        } else {
            None
        }
    }

    pub fn sum(&self) -> u16 {
        self.sum
    }

    pub fn ticks(&self) -> u16 {
        self.ticks
    }
}

/// Builds the outgoing snapshot from ECU frames and local sensors
pub struct TelemetryAggregator {
    state: Arc<SharedState>,
    snapshot: RawTelemetry,
    pin_map: &'static [(GpioSignal, u8)],
}

impl TelemetryAggregator {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self::with_pin_map(state, &PIN_MAP)
    }

    pub fn with_pin_map(state: Arc<SharedState>, pin_map: &'static [(GpioSignal, u8)]) -> Self {
        Self {
            state,
            snapshot: RawTelemetry::default(),
            pin_map,
        }
    }

    /// Take RPM and engine temperature as-is, feed velocity into the window
    pub fn commit_ecu(&mut self, frame: &EcuFrame) {
        self.state.add_velocity_sample(frame.velocity);
        self.snapshot.rpm = frame.rpm;
        self.snapshot.engine_temp = frame.engine_temp;
    }

    /// Read air temperature and the GPIO port
    pub fn sample_sensors<E: Sensors>(&mut self, sensors: &mut E) {
        self.snapshot.air_temp = sensors.air_temp();
        self.snapshot.flags = GpioFlags::from_bits_with(sensors.gpio_pins(), self.pin_map);
    }

    /// Current snapshot carrying the last committed velocity window
    pub fn snapshot(&self) -> RawTelemetry {
        RawTelemetry {
            velocity: self.state.committed_velocity(),
            ..self.snapshot
        }
    }

    pub fn record(&self, scaling: &Scaling) -> TelemetryRecord {
        scaling.decode(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::FixedSensors;
    use crate::timer::TimerTask;
    use proptest::prelude::*;

    #[test]
    fn test_accumulator_wraps() {
        let mut acc = VelocityAccumulator::default();
        for _ in 0..257 {
            acc.add(0xFF);
        }
        assert_eq!(acc.sum(), (257u32 * 0xFF % 65536) as u16);
    }

    #[test]
    fn test_commit_keeps_last_window_velocity() {
        let state = Arc::new(SharedState::new());
        let timer = TimerTask::new(Arc::clone(&state), 5, 3);
        let mut agg = TelemetryAggregator::new(Arc::clone(&state));

        agg.commit_ecu(&EcuFrame { rpm: 0x28, velocity: 7, engine_temp: 0x3E });
        assert_eq!(agg.snapshot().velocity, 0);
        assert_eq!(agg.snapshot().rpm, 0x28);

        timer.advance(4);
        assert_eq!(agg.snapshot().velocity, 7);

        // A new window starts from zero but the published value stays
        agg.commit_ecu(&EcuFrame { rpm: 0x29, velocity: 9, engine_temp: 0x3E });
        assert_eq!(agg.snapshot().velocity, 7);
        timer.advance(4);
        assert_eq!(agg.snapshot().velocity, 9);
    }

    #[test]
    fn test_sensors_map_through_pin_table() {
        let state = Arc::new(SharedState::new());
        let mut agg = TelemetryAggregator::new(state);
        let mut sensors = FixedSensors { pins: 0b0001_1100, air_temp: 21 };
        agg.sample_sensors(&mut sensors);

        let snapshot = agg.snapshot();
        assert_eq!(snapshot.air_temp, 21);
        assert!(snapshot.flags.front_brake);
        assert!(snapshot.flags.rear_brake);
        assert!(snapshot.flags.parking_light);
        assert!(!snapshot.flags.left_turn);

        let record = agg.record(&Scaling::default());
        assert!((record.air_temp - 21.0).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn test_window_sum_is_exact_and_resets(
            samples in proptest::collection::vec(any::<u8>(), 1..=257),
        ) {
            let state = Arc::new(SharedState::new());
            let window = 125;
            let timer = TimerTask::new(Arc::clone(&state), 5, window);
            let mut agg = TelemetryAggregator::new(Arc::clone(&state));

            for &velocity in &samples {
                agg.commit_ecu(&EcuFrame { rpm: 0, velocity, engine_temp: 0 });
            }
            timer.advance(window + 1);

            let expected: u32 = samples.iter().map(|&s| s as u32).sum();
            prop_assert_eq!(agg.snapshot().velocity as u32, expected);
            prop_assert_eq!(state.pending_velocity(), VelocityAccumulator::default());
        }
    }
}
