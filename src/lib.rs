//! Core library for the Reelgate media scheduler.
//!
//! The crate decides, as a page scrolls, which embedded media elements may
//! fetch, decode and play. Visibility transitions flow from a
//! [`visibility::VisibilitySource`] into a bounded admission controller which
//! commands [`media::MediaHandle`] implementations. The
//! [`scheduler::facade::Scheduler`] ties the pieces together for one mounted
//! page.

pub mod config;
pub mod media;
pub mod replay;
pub mod scheduler;
pub mod visibility;

use std::fmt::Display;

use thiserror::Error;

/// Opaque identifier assigned to a handle when it is registered.
///
/// Identifiers are never reused within one [`scheduler::facade::Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Builds an identifier from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "media#{}", self.0)
    }
}

/// Errors returned by the scheduler and its configuration layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler already torn down")]
    TornDown,
    #[error("unknown handle {0}")]
    UnknownHandle(HandleId),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no tokio runtime available to drive playback")]
    NoRuntime,
    #[error("I/O failure: {0}")]
    Io(String),
}

pub use media::{MediaHandle, PlaybackError};
pub use scheduler::facade::Scheduler;
