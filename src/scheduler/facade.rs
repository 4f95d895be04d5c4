//! Per-page entry point wiring visibility, admission and playback together.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, info, instrument};

use crate::{
    HandleId, MediaHandle, SchedulerError,
    config::SchedulerConfig,
    visibility::{
        self, Capability, Rect, VisibilityEvent, VisibilityKind, VisibilityReceiver,
        VisibilitySink, VisibilitySource,
    },
};

use super::{
    admission::{AdmissionController, Command},
    fallback::{FallbackPolicy, PlayOutcome},
    telemetry::TelemetrySink,
};

/// Scope label used when a registration does not name one.
pub const DEFAULT_SCOPE: &str = "page";

/// Per-registration options.
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    /// Label grouping registrations for [`Scheduler::unregister_all`].
    pub scope: String,
    /// Layout box handed to the visibility source.
    pub bounds: Option<Rect>,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            scope: DEFAULT_SCOPE.to_string(),
            bounds: None,
        }
    }
}

impl RegisterOptions {
    pub fn in_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Media elements a page hands over when it mounts.
pub struct MediaScope {
    name: String,
    entries: Vec<(Arc<dyn MediaHandle>, Option<Rect>)>,
}

impl MediaScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, handle: Arc<dyn MediaHandle>, bounds: Option<Rect>) -> Self {
        self.entries.push((handle, bounds));
        self
    }

    pub fn push(&mut self, handle: Arc<dyn MediaHandle>, bounds: Option<Rect>) {
        self.entries.push((handle, bounds));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Point-in-time counts mirroring the page performance overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerMetrics {
    pub registered: usize,
    pub active: usize,
    pub waiting: usize,
    pub playing: usize,
    pub capability: Capability,
}

struct Registration {
    handle: Arc<dyn MediaHandle>,
    scope: String,
    /// Cleared on eviction so a play request still in flight is dropped.
    admitted: Arc<AtomicBool>,
}

impl Registration {
    fn stop(&self) {
        self.admitted.store(false, Ordering::Release);
        self.handle.pause();
    }
}

/// Media visibility scheduler for one mounted page.
///
/// Transitions are applied synchronously by [`Scheduler::pump`]; `play`
/// requests run on the tokio runtime captured at construction and report
/// back through a channel drained by the same call.
pub struct Scheduler<V: VisibilitySource> {
    config: SchedulerConfig,
    source: V,
    admission: AdmissionController,
    fallback: FallbackPolicy,
    telemetry: TelemetrySink,
    registry: BTreeMap<HandleId, Registration>,
    identities: HashMap<usize, HandleId>,
    next_id: u64,
    sink: VisibilitySink,
    events: VisibilityReceiver,
    outcome_tx: mpsc::UnboundedSender<PlayOutcome>,
    outcomes: mpsc::UnboundedReceiver<PlayOutcome>,
    runtime: Handle,
    torn_down: bool,
}

impl<V: VisibilitySource> Scheduler<V> {
    pub fn new(config: SchedulerConfig, source: V) -> Result<Self, SchedulerError> {
        Self::with_telemetry(config, source, TelemetrySink::default())
    }

    pub fn with_telemetry(
        config: SchedulerConfig,
        source: V,
        telemetry: TelemetrySink,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let (sink, events) = visibility::channel();
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        if source.capability() == Capability::Degraded {
            info!(
                target = "scheduler",
                "visibility observation unavailable, treating all media as visible"
            );
        }
        Ok(Self {
            admission: AdmissionController::new(config.capacity),
            fallback: FallbackPolicy::new(telemetry.clone()),
            config,
            source,
            telemetry,
            registry: BTreeMap::new(),
            identities: HashMap::new(),
            next_id: 0,
            sink,
            events,
            outcome_tx,
            outcomes,
            runtime,
            torn_down: false,
        })
    }

    /// Registers every media element of a freshly mounted page.
    #[instrument(skip_all, fields(scope = %scope.name, entries = scope.entries.len()))]
    pub fn mount(&mut self, scope: MediaScope) -> Result<Vec<HandleId>, SchedulerError> {
        let MediaScope { name, entries } = scope;
        let mut ids = Vec::with_capacity(entries.len());
        for (handle, bounds) in entries {
            let options = RegisterOptions {
                scope: name.clone(),
                bounds,
            };
            ids.push(self.register(handle, options)?);
        }
        Ok(ids)
    }

    /// Starts managing `handle`. Registering the same handle again returns its existing id.
    pub fn register(
        &mut self,
        handle: Arc<dyn MediaHandle>,
        options: RegisterOptions,
    ) -> Result<HandleId, SchedulerError> {
        if self.torn_down {
            return Err(SchedulerError::TornDown);
        }
        let identity = Arc::as_ptr(&handle) as *const () as usize;
        if let Some(existing) = self.identities.get(&identity) {
            debug!(target = "scheduler", handle = %existing, "duplicate registration ignored");
            return Ok(*existing);
        }

        let id = HandleId::from_raw(self.next_id);
        self.next_id += 1;
        self.identities.insert(identity, id);
        self.registry.insert(
            id,
            Registration {
                handle,
                scope: options.scope,
                admitted: Arc::new(AtomicBool::new(false)),
            },
        );
        self.source.observe(id, options.bounds, self.sink.clone());
        debug!(target = "scheduler", handle = %id, "registered");
        Ok(id)
    }

    /// Stops managing one handle, pausing it and freeing its slot if active.
    pub fn unregister(&mut self, id: HandleId) -> Result<(), SchedulerError> {
        if !self.registry.contains_key(&id) {
            return Err(SchedulerError::UnknownHandle(id));
        }
        self.remove(id);
        Ok(())
    }

    fn remove(&mut self, id: HandleId) {
        self.source.unobserve(id);
        let commands = self.admission.forget(id);
        self.apply(commands);
        self.fallback.forget(id);
        if let Some(registration) = self.registry.remove(&id) {
            let identity = Arc::as_ptr(&registration.handle) as *const () as usize;
            self.identities.remove(&identity);
        }
        debug!(target = "scheduler", handle = %id, "unregistered");
    }

    /// Unregisters every handle registered under `scope`. Returns how many were removed.
    pub fn unregister_all(&mut self, scope: &str) -> usize {
        let ids: Vec<HandleId> = self
            .registry
            .iter()
            .filter(|(_, registration)| registration.scope == scope)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.remove(*id);
        }
        ids.len()
    }

    /// Applies queued visibility events and play settlements. Returns the number of events applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.handle_event(event) {
                applied += 1;
            }
        }
        while let Ok(outcome) = self.outcomes.try_recv() {
            if self.torn_down || !self.registry.contains_key(&outcome.handle) {
                debug!(target = "scheduler", handle = %outcome.handle, "discarding stale play outcome");
                continue;
            }
            self.fallback.record(outcome);
        }
        applied
    }

    /// Applies one visibility event. Returns `false` when the event was ignored.
    pub fn handle_event(&mut self, event: VisibilityEvent) -> bool {
        if self.torn_down {
            debug!(target = "scheduler", handle = %event.handle, "event after teardown ignored");
            return false;
        }
        if !self.registry.contains_key(&event.handle) {
            debug!(target = "scheduler", handle = %event.handle, "event for unregistered handle ignored");
            return false;
        }
        let commands = match event.kind {
            VisibilityKind::Entered => self.admission.on_entered(event.handle),
            VisibilityKind::Exited => self.admission.on_exited(event.handle),
        };
        self.apply(commands);
        true
    }

    /// Tears down every registration. Later events and registrations are rejected.
    #[instrument(skip_all, fields(registered = self.registry.len()))]
    pub fn unmount(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        for (id, registration) in &self.registry {
            self.source.unobserve(*id);
            registration.admitted.store(false, Ordering::Release);
        }
        let active = self.admission.clear();
        for id in &active {
            if let Some(registration) = self.registry.get(id) {
                registration.stop();
            }
        }
        while self.events.try_recv().is_ok() {}
        self.fallback.clear();
        self.registry.clear();
        self.identities.clear();
        info!(target = "scheduler", paused = active.len(), "scheduler unmounted");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn is_registered(&self, id: HandleId) -> bool {
        self.registry.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn handle(&self, id: HandleId) -> Option<Arc<dyn MediaHandle>> {
        self.registry
            .get(&id)
            .map(|registration| Arc::clone(&registration.handle))
    }

    /// Active handles in admission order.
    pub fn active(&self) -> Vec<HandleId> {
        self.admission.active().to_vec()
    }

    /// Waiting handles, head first.
    pub fn waiting(&self) -> Vec<HandleId> {
        self.admission.waiting().collect()
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn failure_streak(&self, id: HandleId) -> u32 {
        self.fallback.failure_streak(id)
    }

    pub fn capability(&self) -> Capability {
        self.source.capability()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn source(&self) -> &V {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut V {
        &mut self.source
    }

    pub fn telemetry(&self) -> TelemetrySink {
        self.telemetry.clone()
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            registered: self.registry.len(),
            active: self.admission.active().len(),
            waiting: self.admission.waiting().len(),
            playing: self
                .registry
                .values()
                .filter(|registration| registration.handle.is_playing())
                .count(),
            capability: self.source.capability(),
        }
    }

    fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Admit(id) => {
                    self.telemetry.record_admitted(self.admission.active().len());
                    self.start(id);
                }
                Command::Promote(id) => {
                    self.telemetry.record_promoted(self.admission.active().len());
                    self.start(id);
                }
                Command::Evict(id) => {
                    self.telemetry.record_evicted();
                    if let Some(registration) = self.registry.get(&id) {
                        registration.stop();
                    }
                }
                Command::Enqueue(_) => self.telemetry.record_queued(),
                Command::Dequeue(_) => self.telemetry.record_dequeued(),
            }
        }
    }

    fn start(&self, id: HandleId) {
        let Some(registration) = self.registry.get(&id) else {
            return;
        };
        let handle = Arc::clone(&registration.handle);
        let admitted = Arc::clone(&registration.admitted);
        admitted.store(true, Ordering::Release);
        handle.load();
        let outcome_tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            if !admitted.load(Ordering::Acquire) {
                return;
            }
            let result = handle.play().await;
            if !admitted.load(Ordering::Acquire) {
                // Evicted while settling; eviction already paused it once.
                if handle.is_playing() {
                    handle.pause();
                }
                return;
            }
            // The scheduler may be gone by the time playback settles.
            let _ = outcome_tx.send(PlayOutcome { handle: id, result });
        });
    }
}

impl<V: VisibilitySource> Drop for Scheduler<V> {
    fn drop(&mut self) {
        self.unmount();
    }
}
