//! Telemetry collection primitives for scheduling decisions.

use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct TelemetryState {
    admitted: u64,
    promoted: u64,
    evicted: u64,
    queued: u64,
    dequeued: u64,
    play_started: u64,
    play_failed: u64,
    peak_active: usize,
}

/// Snapshot of telemetry suitable for assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub admitted: u64,
    pub promoted: u64,
    pub evicted: u64,
    pub queued: u64,
    pub dequeued: u64,
    pub play_started: u64,
    pub play_failed: u64,
    pub peak_active: usize,
}

/// Shared sink capturing scheduler events.
#[derive(Clone, Default)]
pub struct TelemetrySink {
    state: Arc<Mutex<TelemetryState>>,
}

impl TelemetrySink {
    pub fn record_admitted(&self, active: usize) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        state.admitted += 1;
        state.peak_active = state.peak_active.max(active);
    }

    pub fn record_promoted(&self, active: usize) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        state.promoted += 1;
        state.peak_active = state.peak_active.max(active);
    }

    pub fn record_evicted(&self) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        state.evicted += 1;
    }

    pub fn record_queued(&self) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        state.queued += 1;
    }

    pub fn record_dequeued(&self) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        state.dequeued += 1;
    }

    /// Records the settlement of a `play` request.
    pub fn record_play(&self, succeeded: bool) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        if succeeded {
            state.play_started += 1;
        } else {
            state.play_failed += 1;
        }
    }

    /// Exposes a snapshot for diagnostics and testing.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let state = self.state.lock().expect("telemetry mutex poisoned");
        TelemetrySnapshot {
            admitted: state.admitted,
            promoted: state.promoted,
            evicted: state.evicted,
            queued: state.queued,
            dequeued: state.dequeued,
            play_started: state.play_started,
            play_failed: state.play_failed,
            peak_active: state.peak_active,
        }
    }
}
