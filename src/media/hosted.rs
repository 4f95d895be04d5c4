//! Adapter for third-party embeddable players.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{MediaHandle, PlaybackError};

/// Command channel into an embedded player (iframe messaging, SDK bindings).
#[async_trait]
pub trait PlayerApi: Send + Sync {
    /// Asks the player to fetch the given video without starting it.
    fn cue(&self, video_id: &str);
    async fn play(&self) -> Result<(), PlaybackError>;
    fn pause(&self);
}

/// [`MediaHandle`] over a hosted-video player.
pub struct HostedPlayer<A> {
    api: A,
    video_id: String,
    embed_url: String,
    priority: i32,
    cued: AtomicBool,
    wants_play: AtomicBool,
    playing: AtomicBool,
}

impl<A: PlayerApi> HostedPlayer<A> {
    pub fn new(api: A, video_id: impl Into<String>, embed_url: impl Into<String>) -> Self {
        Self {
            api,
            video_id: video_id.into(),
            embed_url: embed_url.into(),
            priority: 0,
            cued: AtomicBool::new(false),
            wants_play: AtomicBool::new(false),
            playing: AtomicBool::new(false),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: PlayerApi> MediaHandle for HostedPlayer<A> {
    fn load(&self) {
        if !self.cued.swap(true, Ordering::AcqRel) {
            self.api.cue(&self.video_id);
        }
    }

    async fn play(&self) -> Result<(), PlaybackError> {
        // The player queues play behind its own cue, so cue first if needed.
        self.wants_play.store(true, Ordering::Release);
        self.load();
        self.api.play().await?;
        // A pause issued while the player was starting wins.
        if !self.wants_play.load(Ordering::Acquire) {
            self.api.pause();
            return Err(PlaybackError::Cancelled);
        }
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&self) {
        self.wants_play.store(false, Ordering::Release);
        if self.playing.swap(false, Ordering::AcqRel) {
            self.api.pause();
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn is_loaded(&self) -> bool {
        self.cued.load(Ordering::Acquire)
    }

    fn source_uri(&self) -> &str {
        &self.embed_url
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
