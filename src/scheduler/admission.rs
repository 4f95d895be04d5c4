//! Bounded admission of visible media with FIFO queueing.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::HandleId;

/// Per-handle scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unseen,
    VisibleWaiting,
    VisibleActive,
    Invisible,
}

/// Side effect requested by a transition, applied by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Handle took a free slot on becoming visible: load then play.
    Admit(HandleId),
    /// Queue head took a slot freed by an eviction: load then play.
    Promote(HandleId),
    /// Handle lost its slot: pause.
    Evict(HandleId),
    /// Handle is visible but every slot is taken.
    Enqueue(HandleId),
    /// Handle left the queue without ever being admitted.
    Dequeue(HandleId),
}

/// Admission bookkeeping for one mounted page.
///
/// Holds identifiers only; the handles themselves belong to the facade.
#[derive(Debug)]
pub struct AdmissionController {
    capacity: usize,
    active: Vec<HandleId>,
    waiting: VecDeque<HandleId>,
    seen: HashSet<HandleId>,
}

impl AdmissionController {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            active: Vec::with_capacity(capacity),
            waiting: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Active handles in admission order.
    pub fn active(&self) -> &[HandleId] {
        &self.active
    }

    /// Waiting handles, head first.
    pub fn waiting(&self) -> impl ExactSizeIterator<Item = HandleId> + '_ {
        self.waiting.iter().copied()
    }

    pub fn state(&self, handle: HandleId) -> HandleState {
        if self.active.contains(&handle) {
            HandleState::VisibleActive
        } else if self.waiting.contains(&handle) {
            HandleState::VisibleWaiting
        } else if self.seen.contains(&handle) {
            HandleState::Invisible
        } else {
            HandleState::Unseen
        }
    }

    /// Applies an `Entered` transition. Repeated entries are ignored.
    pub fn on_entered(&mut self, handle: HandleId) -> Vec<Command> {
        match self.state(handle) {
            HandleState::VisibleActive | HandleState::VisibleWaiting => Vec::new(),
            HandleState::Unseen | HandleState::Invisible => {
                self.seen.insert(handle);
                if self.active.len() < self.capacity {
                    self.active.push(handle);
                    debug!(target = "scheduler", %handle, active = self.active.len(), "admitted");
                    vec![Command::Admit(handle)]
                } else {
                    self.waiting.push_back(handle);
                    debug!(target = "scheduler", %handle, queued = self.waiting.len(), "queued");
                    vec![Command::Enqueue(handle)]
                }
            }
        }
    }

    /// Applies an `Exited` transition. Exits for hidden handles are ignored.
    pub fn on_exited(&mut self, handle: HandleId) -> Vec<Command> {
        self.release(handle)
    }

    /// Drops a handle from every set, as on unregistration.
    pub fn forget(&mut self, handle: HandleId) -> Vec<Command> {
        let commands = self.release(handle);
        self.seen.remove(&handle);
        commands
    }

    /// Empties both sets and returns the handles that were active.
    pub fn clear(&mut self) -> Vec<HandleId> {
        self.waiting.clear();
        self.seen.clear();
        std::mem::take(&mut self.active)
    }

    /// True when the capacity and exclusivity invariants hold.
    pub fn invariants_hold(&self) -> bool {
        if self.active.len() > self.capacity {
            return false;
        }
        let mut members = HashSet::with_capacity(self.active.len() + self.waiting.len());
        self.active
            .iter()
            .chain(self.waiting.iter())
            .all(|handle| members.insert(*handle))
    }

    fn release(&mut self, handle: HandleId) -> Vec<Command> {
        if let Some(position) = self.active.iter().position(|active| *active == handle) {
            self.active.remove(position);
            debug!(target = "scheduler", %handle, "evicted");
            let mut commands = vec![Command::Evict(handle)];
            if let Some(next) = self.waiting.pop_front() {
                self.active.push(next);
                debug!(target = "scheduler", handle = %next, "promoted");
                commands.push(Command::Promote(next));
            }
            return commands;
        }
        if let Some(position) = self.waiting.iter().position(|queued| *queued == handle) {
            self.waiting.remove(position);
            return vec![Command::Dequeue(handle)];
        }
        Vec::new()
    }
}
