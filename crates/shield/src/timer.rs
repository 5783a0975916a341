//! Periodic Timer Task

use crate::state::SharedState;
use std::sync::Arc;
use tracing::{debug, trace};

/// Body of the periodic timer interrupt.
///
/// Each tick advances the clock, abandons a byte wait that went stale and
/// closes the velocity aggregation window when it runs out. Tests call
/// [`TimerTask::on_tick`] directly; the simulator calls it from a ticker thread.
#[derive(Debug, Clone)]
pub struct TimerTask {
    state: Arc<SharedState>,
    byte_delay_cancel: u16,
    velocity_window: u16,
}

impl TimerTask {
    /// # Arguments
    /// * `byte_delay_cancel` - ticks without a byte before acquisition aborts
    /// * `velocity_window` - the window closes once more ticks than this pass
    pub fn new(state: Arc<SharedState>, byte_delay_cancel: u16, velocity_window: u16) -> Self {
        Self {
            state,
            byte_delay_cancel,
            velocity_window,
        }
    }

    pub fn on_tick(&self) {
        let now = self.state.clock().advance();

        if self.state.expire_stale_wait(now, self.byte_delay_cancel) {
            trace!("Byte wait expired at tick {}", now);
        }

        if let Some(sum) = self.state.tick_velocity_window(self.velocity_window) {
            debug!("Velocity window closed at tick {}: sum {}", now, sum);
        }
    }

    /// Run `n` ticks back to back
    pub fn advance(&self, n: u16) {
        for _ in 0..n {
            self.on_tick();
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_expires_after_cancel_ticks() {
        let state = Arc::new(SharedState::new());
        let timer = TimerTask::new(Arc::clone(&state), 5, 125);

        state.arm_byte_wait();
        timer.advance(4);
        assert!(!state.byte_wait_expired());
        timer.on_tick();
        assert!(state.byte_wait_expired());
    }

    #[test]
    fn test_rearm_restarts_the_wait() {
        let state = Arc::new(SharedState::new());
        let timer = TimerTask::new(Arc::clone(&state), 5, 125);

        state.arm_byte_wait();
        timer.advance(4);
        state.arm_byte_wait();
        timer.advance(4);
        assert!(!state.byte_wait_expired());
    }

    #[test]
    fn test_wait_expiry_survives_clock_rollover() {
        let state = Arc::new(SharedState::with_clock(u16::MAX - 2));
        let timer = TimerTask::new(Arc::clone(&state), 5, 125);

        state.arm_byte_wait();
        timer.advance(4);
        assert!(!state.byte_wait_expired());
        timer.on_tick();
        assert!(state.byte_wait_expired());
        assert_eq!(state.clock().now(), 2);
    }

    #[test]
    fn test_velocity_window_commits_after_window() {
        let state = Arc::new(SharedState::new());
        let timer = TimerTask::new(Arc::clone(&state), 5, 125);

        state.add_velocity_sample(10);
        state.add_velocity_sample(20);
        timer.advance(125);
        assert_eq!(state.velocity_commits(), 0);
        assert_eq!(state.committed_velocity(), 0);

        timer.on_tick();
        assert_eq!(state.velocity_commits(), 1);
        assert_eq!(state.committed_velocity(), 30);
        assert_eq!(state.pending_velocity().sum(), 0);
    }
}
