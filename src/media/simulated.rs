//! In-process stand-in for a plain file-backed video element.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use super::{MediaHandle, PlaybackError};

/// Autoplay restrictions the simulated platform enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoplayPolicy {
    #[default]
    Allowed,
    /// Only muted elements may start without a user gesture.
    MutedOnly,
    Blocked,
}

#[derive(Debug, Default)]
struct VideoState {
    resolved_src: Option<String>,
    wants_play: bool,
    playing: bool,
    load_calls: u32,
    play_calls: u32,
    pause_calls: u32,
}

/// Video element with a lazily resolved source.
///
/// The source stays unresolved until the first [`MediaHandle::load`]. With
/// [`SimulatedVideo::manual_load`] the load only completes when
/// [`SimulatedVideo::finish_load`] is called, and pending `play` calls wait
/// for it.
pub struct SimulatedVideo {
    lazy_src: String,
    priority: i32,
    muted: bool,
    autoplay: AutoplayPolicy,
    manual_load: bool,
    state: Mutex<VideoState>,
    loaded: watch::Sender<bool>,
}

impl SimulatedVideo {
    pub fn new(lazy_src: impl Into<String>) -> Self {
        Self {
            lazy_src: lazy_src.into(),
            priority: 0,
            muted: true,
            autoplay: AutoplayPolicy::default(),
            manual_load: false,
            state: Mutex::new(VideoState::default()),
            loaded: watch::Sender::new(false),
        }
    }

    pub fn with_autoplay(mut self, autoplay: AutoplayPolicy) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn manual_load(mut self) -> Self {
        self.manual_load = true;
        self
    }

    /// Completes an outstanding manual load. Ignored if `load` was never called.
    pub fn finish_load(&self) {
        let resolved = self.lock().resolved_src.is_some();
        if resolved {
            self.loaded.send_replace(true);
        }
    }

    /// Source assigned to the element, `None` until the first load.
    pub fn resolved_src(&self) -> Option<String> {
        self.lock().resolved_src.clone()
    }

    pub fn load_calls(&self) -> u32 {
        self.lock().load_calls
    }

    pub fn play_calls(&self) -> u32 {
        self.lock().play_calls
    }

    pub fn pause_calls(&self) -> u32 {
        self.lock().pause_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VideoState> {
        self.state.lock().expect("video state mutex poisoned")
    }

    fn check_autoplay(&self) -> Result<(), PlaybackError> {
        match self.autoplay {
            AutoplayPolicy::Allowed => Ok(()),
            AutoplayPolicy::MutedOnly if self.muted => Ok(()),
            AutoplayPolicy::MutedOnly => Err(PlaybackError::Denied(
                "unmuted autoplay is not allowed".to_string(),
            )),
            AutoplayPolicy::Blocked => Err(PlaybackError::Denied(
                "playback requires a user gesture".to_string(),
            )),
        }
    }
}

#[async_trait]
impl MediaHandle for SimulatedVideo {
    fn load(&self) {
        let mut state = self.lock();
        if state.resolved_src.is_some() {
            return;
        }
        state.resolved_src = Some(self.lazy_src.clone());
        state.load_calls += 1;
        drop(state);
        if !self.manual_load {
            self.loaded.send_replace(true);
        }
    }

    async fn play(&self) -> Result<(), PlaybackError> {
        {
            let mut state = self.lock();
            state.play_calls += 1;
            state.wants_play = true;
        }
        self.check_autoplay()?;

        let mut loaded = self.loaded.subscribe();
        loaded
            .wait_for(|loaded| *loaded)
            .await
            .map_err(|_| PlaybackError::Detached)?;

        let mut state = self.lock();
        // A pause issued while the load was pending cancels the deferred start.
        if !state.wants_play {
            return Err(PlaybackError::Cancelled);
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.lock();
        state.pause_calls += 1;
        state.wants_play = false;
        state.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }

    fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    fn source_uri(&self) -> &str {
        &self.lazy_src
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
