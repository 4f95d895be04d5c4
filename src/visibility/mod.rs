//! Visibility observation primitives consumed by the scheduler.

use std::time::Instant;

use tokio::sync::mpsc;

use crate::HandleId;

pub mod always;
pub mod viewport;

pub use always::AlwaysVisible;
pub use viewport::{Rect, ViewportSource};

/// Direction of a visibility transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityKind {
    Entered,
    Exited,
}

/// A single visibility transition for one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityEvent {
    pub handle: HandleId,
    pub kind: VisibilityKind,
    pub timestamp: Instant,
}

/// Whether the source can actually observe the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Observing,
    /// Observation unavailable; every handle is reported visible.
    Degraded,
}

/// Sender half handed to a source for each observed handle.
#[derive(Debug, Clone)]
pub struct VisibilitySink {
    tx: mpsc::UnboundedSender<VisibilityEvent>,
}

/// Receiver half drained by the scheduler.
pub type VisibilityReceiver = mpsc::UnboundedReceiver<VisibilityEvent>;

/// Creates a connected sink/receiver pair.
pub fn channel() -> (VisibilitySink, VisibilityReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (VisibilitySink { tx }, rx)
}

impl VisibilitySink {
    pub fn entered(&self, handle: HandleId) {
        self.emit(handle, VisibilityKind::Entered);
    }

    pub fn exited(&self, handle: HandleId) {
        self.emit(handle, VisibilityKind::Exited);
    }

    fn emit(&self, handle: HandleId, kind: VisibilityKind) {
        let event = VisibilityEvent {
            handle,
            kind,
            timestamp: Instant::now(),
        };
        // The receiver only disappears with the scheduler itself.
        if self.tx.send(event).is_err() {
            tracing::debug!(target = "visibility", %handle, "visibility receiver dropped");
        }
    }
}

/// Trait implemented by viewport intersection providers.
///
/// A source reports `Entered` at most once per contiguous visible interval
/// and `Exited` at most once per contiguous invisible interval.
pub trait VisibilitySource {
    /// Starts observing `handle`. `bounds` is its layout box when known.
    fn observe(&mut self, handle: HandleId, bounds: Option<Rect>, sink: VisibilitySink);

    /// Stops observing `handle`. Unknown handles are ignored.
    fn unobserve(&mut self, handle: HandleId);

    /// Number of handles currently observed.
    fn observed(&self) -> usize;

    fn capability(&self) -> Capability {
        Capability::Observing
    }
}
