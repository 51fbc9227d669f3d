//! Synchronization Engine
//!
//! Context object tying focus tracking, mutation watching, and request
//! coordination to one document. One engine exists per document/frame; the
//! host feeds it DOM events and drives the shared executor.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use lens_a11y::AccessibilityInfo;
use lens_dom::{AttributeChanged, Document, MutationCallback, NodeId};
use smol::channel::{self, Sender};
use smol::{LocalExecutor, Task, Timer};

use crate::config::SyncConfig;
use crate::coordinator::RequestCoordinator;
use crate::error::SyncError;
use crate::focus::{FocusPhase, FocusState, FocusTracker, FocusTransition, KeyInput};
use crate::presenter::{FrameBroadcast, FrameId, Presenter};
use crate::provider::AccessibilityProvider;
use crate::watcher::{DebounceKey, MutationAction, MutationWatcher};

#[derive(Default)]
struct EngineTasks {
    loading: Option<Task<()>>,
    presentation: Option<Task<()>>,
    mutations: Option<Task<()>>,
}

struct EngineInner {
    frame: FrameId,
    config: SyncConfig,
    executor: Rc<LocalExecutor<'static>>,
    document: Rc<RefCell<Document>>,
    coordinator: RequestCoordinator,
    presenter: Rc<dyn Presenter>,
    broadcast: Option<Rc<dyn FrameBroadcast>>,
    tracker: RefCell<FocusTracker>,
    watcher: RefCell<MutationWatcher>,
    tasks: RefCell<EngineTasks>,
    mutation_tx: Sender<AttributeChanged>,
    enabled: Cell<bool>,
    /// Element whose snapshot the presenter currently shows
    shown: Cell<Option<NodeId>>,
}

/// Accessibility data synchronization engine
#[derive(Clone)]
pub struct SynchronizationEngine {
    inner: Rc<EngineInner>,
}

/// Builder for [`SynchronizationEngine`]
pub struct SynchronizationEngineBuilder {
    executor: Rc<LocalExecutor<'static>>,
    document: Rc<RefCell<Document>>,
    provider: Rc<dyn AccessibilityProvider>,
    presenter: Rc<dyn Presenter>,
    broadcast: Option<Rc<dyn FrameBroadcast>>,
    config: SyncConfig,
    frame: FrameId,
}

impl SynchronizationEngineBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn broadcast(mut self, broadcast: Rc<dyn FrameBroadcast>) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    pub fn frame(mut self, frame: FrameId) -> Self {
        self.frame = frame;
        self
    }

    pub fn build(self) -> SynchronizationEngine {
        let coordinator = RequestCoordinator::new(
            Rc::clone(&self.executor),
            self.provider,
            Rc::clone(&self.document),
            self.config.clone(),
        );
        let (mutation_tx, mutation_rx) = channel::unbounded::<AttributeChanged>();
        let inner = Rc::new(EngineInner {
            frame: self.frame,
            enabled: Cell::new(self.config.enabled),
            config: self.config,
            executor: self.executor,
            document: self.document,
            coordinator,
            presenter: self.presenter,
            broadcast: self.broadcast,
            tracker: RefCell::new(FocusTracker::new()),
            watcher: RefCell::new(MutationWatcher::new()),
            tasks: RefCell::new(EngineTasks::default()),
            mutation_tx,
            shown: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let listener = inner.executor.spawn(async move {
            while let Ok(record) = mutation_rx.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.on_mutation(record);
            }
        });
        inner.tasks.borrow_mut().mutations = Some(listener);

        tracing::debug!(frame = %inner.frame, enabled = inner.enabled.get(), "engine created");
        SynchronizationEngine { inner }
    }
}

impl SynchronizationEngine {
    pub fn builder(
        executor: Rc<LocalExecutor<'static>>,
        document: Rc<RefCell<Document>>,
        provider: Rc<dyn AccessibilityProvider>,
        presenter: Rc<dyn Presenter>,
    ) -> SynchronizationEngineBuilder {
        SynchronizationEngineBuilder {
            executor,
            document,
            provider,
            presenter,
            broadcast: None,
            config: SyncConfig::default(),
            frame: FrameId(0),
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Focus moved to `element`
    pub fn handle_focus_in(&self, element: NodeId) {
        if !self.inner.enabled.get() {
            return;
        }
        let surface = self.inner.presenter.surface();
        let transition = {
            let doc = self.inner.document.borrow();
            self.inner.tracker.borrow_mut().focus_in(&doc, element, surface)
        };
        self.inner.apply(transition);
    }

    /// Focus left the current element; `related` is where it went
    pub fn handle_focus_out(&self, related: Option<NodeId>) {
        if !self.inner.enabled.get() {
            return;
        }
        let previous = self.inner.tracker.borrow().inspected();
        let transition = self.inner.tracker.borrow_mut().focus_out(related);
        if let (FocusTransition::Leave, Some(previous)) = (&transition, previous) {
            self.inner.coordinator.expire(previous);
        }
        self.inner.apply(transition);
    }

    pub fn handle_key(&self, key: KeyInput) {
        if !self.inner.enabled.get() {
            return;
        }
        let surface = self.inner.presenter.surface();
        let transition = {
            let doc = self.inner.document.borrow();
            self.inner.tracker.borrow_mut().key(&doc, key, surface)
        };
        self.inner.apply(transition);
    }

    /// A sibling frame announced that it showed its tooltip
    pub fn handle_remote_shown(&self, frame: FrameId) {
        if frame == self.inner.frame {
            return;
        }
        tracing::debug!(from = %frame, frame = %self.inner.frame, "tooltip shown elsewhere; hiding");
        self.inner.cancel_presentation();
        self.inner.hide();
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Snapshot for `element`; see [`RequestCoordinator::get_accessible_info`].
    /// Never presents.
    pub async fn get_accessible_info(&self, element: NodeId, force_update: bool) -> Result<AccessibilityInfo, SyncError> {
        if !self.inner.enabled.get() {
            return Err(SyncError::Disabled);
        }
        self.inner.coordinator.get_accessible_info(element, force_update).await
    }

    /// Close the presentation and move focus back to the tracked element
    /// without reopening it. Returns the element focus was moved to; the
    /// host delivers the resulting focus-in as usual. Returns `None` when
    /// focus did not move, including when the element already has focus.
    pub fn dismiss_and_refocus(&self) -> Option<NodeId> {
        if !self.inner.enabled.get() {
            return None;
        }
        let target = self.inner.tracker.borrow().last_focused();
        self.inner.leave();
        self.inner.tracker.borrow_mut().key(&self.inner.document.borrow(), KeyInput::Escape, None);
        let target = target.filter(|&t| self.inner.document.borrow().is_connected(t))?;
        if self.inner.document.borrow().active_element() == Some(target) {
            // focus() on the active element fires no focus-in.
            return None;
        }
        // Set before moving focus: the focus-in it causes must be swallowed.
        self.inner.tracker.borrow_mut().suppress_next_focus_in();
        if let Err(err) = self.inner.document.borrow_mut().focus(target) {
            tracing::debug!(element = %target, error = %err, "refocus failed");
            return None;
        }
        Some(target)
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.inner.enabled.replace(enabled) == enabled {
            return;
        }
        if enabled {
            tracing::info!(frame = %self.inner.frame, "engine enabled");
            let active = self.inner.document.borrow().active_element();
            if let Some(active) = active {
                self.handle_focus_in(active);
            }
        } else {
            tracing::info!(frame = %self.inner.frame, "engine disabled");
            self.inner.leave();
            self.inner.coordinator.clear();
            self.inner.tracker.borrow_mut().reset();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    pub fn focus_state(&self) -> FocusState {
        self.inner.tracker.borrow().state()
    }

    pub fn phase(&self) -> FocusPhase {
        self.inner.tracker.borrow().phase()
    }

    pub fn frame(&self) -> FrameId {
        self.inner.frame
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.inner.coordinator
    }

    pub fn cached(&self, element: NodeId) -> Option<AccessibilityInfo> {
        self.inner.coordinator.cached(element)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }
}

impl EngineInner {
    fn apply(self: &Rc<Self>, transition: FocusTransition) {
        match transition {
            FocusTransition::Unchanged => {}
            FocusTransition::Leave => self.leave(),
            FocusTransition::Enter { container, target } => self.enter(container, target),
        }
    }

    fn enter(self: &Rc<Self>, container: NodeId, target: NodeId) {
        tracing::debug!(container = %container, target = %target, "inspecting");
        self.coordinator.prune_cache();

        let attached = {
            let mut doc = self.document.borrow_mut();
            self.watcher
                .borrow_mut()
                .attach(&mut doc, container, target, self.mutation_callback())
        };
        if let Err(err) = attached {
            tracing::warn!(container = %container, error = %err, "cannot observe mutations");
        }

        self.schedule_loading(target);
        self.coordinator.invalidate(target);
        self.coordinator.cancel_except(target);
        self.present(target);
    }

    fn leave(&self) {
        self.cancel_presentation();
        if let Ok(mut doc) = self.document.try_borrow_mut() {
            self.watcher.borrow_mut().detach(&mut doc);
        }
        self.hide();
    }

    fn hide(&self) {
        self.shown.set(None);
        self.presenter.hide();
    }

    fn cancel_presentation(&self) {
        let (loading, presentation) = {
            let mut tasks = self.tasks.borrow_mut();
            (tasks.loading.take(), tasks.presentation.take())
        };
        drop(loading);
        drop(presentation);
    }

    fn mutation_callback(&self) -> MutationCallback {
        let tx = self.mutation_tx.clone();
        Rc::new(move |record| {
            // Unbounded; fails only once the listener is gone.
            let _ = tx.try_send(record);
        })
    }

    fn is_current(&self, element: NodeId) -> bool {
        self.enabled.get() && self.tracker.borrow().is_current(element)
    }

    fn schedule_loading(self: &Rc<Self>, target: NodeId) {
        let weak = Rc::downgrade(self);
        let delay = self.config.loading_delay;
        let task = self.executor.spawn(async move {
            Timer::after(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.is_current(target) && inner.shown.get() != Some(target) {
                inner.shown.set(None);
                inner.presenter.show_loading(target);
            }
        });
        let previous = self.tasks.borrow_mut().loading.replace(task);
        drop(previous);
    }

    /// Forced fetch for `target`, presented if still current on arrival
    fn present(self: &Rc<Self>, target: NodeId) {
        let weak = Rc::downgrade(self);
        let coordinator = self.coordinator.clone();
        let task = self.executor.spawn(async move {
            let result = coordinator.get_accessible_info(target, true).await;
            if let Some(inner) = weak.upgrade() {
                inner.deliver(target, result);
            }
        });
        let previous = self.tasks.borrow_mut().presentation.replace(task);
        drop(previous);
    }

    fn deliver(&self, target: NodeId, result: Result<AccessibilityInfo, SyncError>) {
        if !self.is_current(target) {
            tracing::debug!(element = %target, "discarding stale result");
            return;
        }
        let loading = self.tasks.borrow_mut().loading.take();
        drop(loading);
        match result {
            Ok(info) => {
                self.presenter.show(&info, target);
                self.shown.set(Some(target));
                if let Some(broadcast) = &self.broadcast {
                    broadcast.announce_shown(self.frame);
                }
            }
            Err(err) => {
                tracing::warn!(element = %target, error = %err, "nothing to present");
                self.hide();
            }
        }
    }

    fn on_mutation(self: &Rc<Self>, record: AttributeChanged) {
        if !self.enabled.get() {
            return;
        }
        let action = self.watcher.borrow().classify(&record);
        tracing::trace!(element = %record.target, attribute = %record.attribute_name, ?action, "mutation");
        match action {
            MutationAction::Ignore => {}
            MutationAction::Redirect { container } => {
                self.debounce(
                    DebounceKey::Redirect(container),
                    self.config.active_descendant_debounce,
                    move |inner| {
                        let transition = {
                            let doc = inner.document.borrow();
                            inner.tracker.borrow_mut().redirect(&doc, container)
                        };
                        inner.apply(transition);
                    },
                );
            }
            MutationAction::Refresh { element } => {
                self.coordinator.expire(element);
                self.debounce(DebounceKey::Refresh(element), self.config.mutation_debounce, move |inner| {
                    if inner.is_current(element) {
                        tracing::debug!(element = %element, "re-fetching after mutation");
                        inner.present(element);
                    }
                });
            }
        }
    }

    fn debounce(self: &Rc<Self>, key: DebounceKey, delay: Duration, fire: impl FnOnce(&Rc<Self>) + 'static) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let task = self.executor.spawn(async move {
            Timer::after(delay).await;
            if let Some(inner) = weak.upgrade() {
                fire(&inner);
            }
        });
        self.watcher.borrow_mut().debounce(key, task);
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Ok(mut doc) = self.document.try_borrow_mut() {
            self.watcher.get_mut().detach(&mut doc);
        }
    }
}
