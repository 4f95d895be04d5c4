//! Fallback source for rendering contexts without viewport observation.

use std::collections::BTreeSet;

use crate::HandleId;

use super::{Capability, Rect, VisibilitySink, VisibilitySource};

/// Reports every observed handle as visible, once, and never as hidden.
#[derive(Debug, Default)]
pub struct AlwaysVisible {
    observed: BTreeSet<HandleId>,
}

impl AlwaysVisible {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisibilitySource for AlwaysVisible {
    fn observe(&mut self, handle: HandleId, _bounds: Option<Rect>, sink: VisibilitySink) {
        if self.observed.insert(handle) {
            sink.entered(handle);
        }
    }

    fn unobserve(&mut self, handle: HandleId) {
        self.observed.remove(&handle);
    }

    fn observed(&self) -> usize {
        self.observed.len()
    }

    fn capability(&self) -> Capability {
        Capability::Degraded
    }
}
