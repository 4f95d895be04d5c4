//! Uniform control surface over playable media resources.

use async_trait::async_trait;
use thiserror::Error;

pub mod hosted;
pub mod simulated;

pub use hosted::{HostedPlayer, PlayerApi};
pub use simulated::{AutoplayPolicy, SimulatedVideo};

/// Reason a playback request was declined. Returned as a value, never raised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playback denied: {0}")]
    Denied(String),
    #[error("decode failure: {0}")]
    Decode(String),
    #[error("media element detached")]
    Detached,
    #[error("start cancelled by pause")]
    Cancelled,
}

/// Trait implemented by every media embedding style the scheduler drives.
///
/// `load` and `pause` are idempotent. `play` may be called before a load has
/// completed; implementations defer the start themselves.
#[async_trait]
pub trait MediaHandle: Send + Sync {
    /// Begins fetching the backing resource. No-op once loaded or loading.
    fn load(&self);

    /// Starts playback, settling once the platform accepted or refused it.
    async fn play(&self) -> Result<(), PlaybackError>;

    /// Stops playback. No-op when already paused.
    fn pause(&self);

    fn is_playing(&self) -> bool;

    fn is_loaded(&self) -> bool;

    /// Source the handle resolves to once loaded.
    fn source_uri(&self) -> &str;

    /// Reserved ordering hint; admission never consults it.
    fn priority(&self) -> i32 {
        0
    }
}
