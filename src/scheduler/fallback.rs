//! Handling of settled `play` requests.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{HandleId, PlaybackError};

use super::telemetry::TelemetrySink;

/// Settlement of one `play` request issued by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub handle: HandleId,
    pub result: Result<(), PlaybackError>,
}

/// Absorbs playback refusals without touching admission state.
///
/// A handle whose `play` failed keeps its slot. The policy only logs the
/// refusal and tracks how many consecutive refusals each handle has had.
pub struct FallbackPolicy {
    telemetry: TelemetrySink,
    streaks: HashMap<HandleId, u32>,
}

impl FallbackPolicy {
    pub fn new(telemetry: TelemetrySink) -> Self {
        Self {
            telemetry,
            streaks: HashMap::new(),
        }
    }

    pub fn record(&mut self, outcome: PlayOutcome) {
        match outcome.result {
            Ok(()) => {
                self.streaks.remove(&outcome.handle);
                self.telemetry.record_play(true);
                debug!(target = "scheduler", handle = %outcome.handle, "playback started");
            }
            Err(error) => {
                let streak = self.streaks.entry(outcome.handle).or_insert(0);
                *streak += 1;
                self.telemetry.record_play(false);
                warn!(
                    target = "scheduler",
                    handle = %outcome.handle,
                    consecutive = *streak,
                    error = %error,
                    "video play failed"
                );
            }
        }
    }

    /// Consecutive refusals for `handle` since its last successful start.
    pub fn failure_streak(&self, handle: HandleId) -> u32 {
        self.streaks.get(&handle).copied().unwrap_or(0)
    }

    pub fn forget(&mut self, handle: HandleId) {
        self.streaks.remove(&handle);
    }

    pub fn clear(&mut self) {
        self.streaks.clear();
    }
}
