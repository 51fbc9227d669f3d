//! Test doubles shared by the lens-sync integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use lens_a11y::{AccessibilityInfo, ProviderResponse};
use lens_dom::{Document, NodeId};
use lens_sync::*;
use smol::{LocalExecutor, Timer};

// ============================================================================
// PROVIDER
// ============================================================================

/// Provider answering from scripted responses first, then from the DOM.
///
/// DOM answers carry `role` (attribute, else tag name) and every `aria-*`
/// attribute as read when the call completes.
pub struct TestProvider {
    document: Rc<RefCell<Document>>,
    delay: Cell<Duration>,
    script: RefCell<VecDeque<Result<ProviderResponse, ProviderError>>>,
    calls: RefCell<Vec<NodeId>>,
}

impl TestProvider {
    pub fn new(document: Rc<RefCell<Document>>) -> Self {
        Self {
            document,
            delay: Cell::new(Duration::ZERO),
            script: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay.set(delay);
    }

    pub fn push(&self, response: Result<ProviderResponse, ProviderError>) {
        self.script.borrow_mut().push_back(response);
    }

    pub fn push_repeated(&self, response: Result<ProviderResponse, ProviderError>, times: usize) {
        for _ in 0..times {
            self.push(response.clone());
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn calls_for(&self, element: NodeId) -> usize {
        self.calls.borrow().iter().filter(|&&e| e == element).count()
    }

    fn from_dom(&self, element: NodeId) -> Result<ProviderResponse, ProviderError> {
        let doc = self.document.borrow();
        let Some(tag) = doc.tag_name(element) else {
            return Ok(ProviderResponse::failure("Node not found"));
        };
        let role = doc.attribute(element, "role").unwrap_or(tag).to_string();
        let aria_properties = doc
            .attributes(element)
            .filter(|(name, _)| name.starts_with("aria-"))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Ok(ProviderResponse {
            role: Some(role),
            name: doc.attribute(element, "aria-label").map(str::to_string),
            aria_properties,
            ..Default::default()
        })
    }
}

#[async_trait(?Send)]
impl AccessibilityProvider for TestProvider {
    async fn fetch(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.borrow_mut().push(request.element);
        let delay = self.delay.get();
        if !delay.is_zero() {
            Timer::after(delay).await;
        }
        let scripted = self.script.borrow_mut().pop_front();
        match scripted {
            Some(response) => response,
            None => self.from_dom(request.element),
        }
    }
}

// ============================================================================
// PRESENTER / BROADCAST
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Loading(NodeId),
    Info(NodeId, AccessibilityInfo),
    Hide,
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub events: RefCell<Vec<Shown>>,
    pub surface: Cell<Option<NodeId>>,
}

impl RecordingPresenter {
    /// `show` calls only, in order
    pub fn shows(&self) -> Vec<(NodeId, AccessibilityInfo)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Shown::Info(target, info) => Some((*target, info.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last_show(&self) -> Option<(NodeId, AccessibilityInfo)> {
        self.shows().pop()
    }

    pub fn loadings(&self) -> usize {
        self.events.borrow().iter().filter(|e| matches!(e, Shown::Loading(_))).count()
    }

    pub fn hides(&self) -> usize {
        self.events.borrow().iter().filter(|e| matches!(e, Shown::Hide)).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Presenter for RecordingPresenter {
    fn show_loading(&self, target: NodeId) {
        self.events.borrow_mut().push(Shown::Loading(target));
    }

    fn show(&self, info: &AccessibilityInfo, target: NodeId) {
        self.events.borrow_mut().push(Shown::Info(target, info.clone()));
    }

    fn hide(&self) {
        self.events.borrow_mut().push(Shown::Hide);
    }

    fn surface(&self) -> Option<NodeId> {
        self.surface.get()
    }
}

#[derive(Default)]
pub struct RecordingBroadcast {
    pub announced: RefCell<Vec<FrameId>>,
}

impl FrameBroadcast for RecordingBroadcast {
    fn announce_shown(&self, frame: FrameId) {
        self.announced.borrow_mut().push(frame);
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Short durations so timer-driven tests stay fast
pub fn test_config() -> SyncConfig {
    SyncConfig::builder()
        .provider_timeout(Duration::from_millis(500))
        .max_attempts(3)
        .max_backoff(Duration::from_millis(2))
        .mutation_debounce(Duration::from_millis(40))
        .active_descendant_debounce(Duration::from_millis(30))
        .loading_delay(Duration::from_millis(15))
        .build()
}

pub struct Harness {
    pub executor: Rc<LocalExecutor<'static>>,
    pub document: Rc<RefCell<Document>>,
    pub provider: Rc<TestProvider>,
    pub presenter: Rc<RecordingPresenter>,
    pub broadcast: Rc<RecordingBroadcast>,
    pub engine: SynchronizationEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        let executor = Rc::new(LocalExecutor::new());
        let document = Rc::new(RefCell::new(Document::new()));
        let provider = Rc::new(TestProvider::new(Rc::clone(&document)));
        let presenter = Rc::new(RecordingPresenter::default());
        let broadcast = Rc::new(RecordingBroadcast::default());
        let engine = SynchronizationEngine::builder(
            Rc::clone(&executor),
            Rc::clone(&document),
            Rc::clone(&provider) as Rc<dyn AccessibilityProvider>,
            Rc::clone(&presenter) as Rc<dyn Presenter>,
        )
        .config(config)
        .broadcast(Rc::clone(&broadcast) as Rc<dyn FrameBroadcast>)
        .frame(FrameId(1))
        .build();
        Self {
            executor,
            document,
            provider,
            presenter,
            broadcast,
            engine,
        }
    }

    /// Append a new element under `<body>`
    pub fn element(&self, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut doc = self.document.borrow_mut();
        let body = doc.body();
        self.child_of(&mut doc, body, tag, attributes)
    }

    pub fn child(&self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut doc = self.document.borrow_mut();
        self.child_of(&mut doc, parent, tag, attributes)
    }

    fn child_of(&self, doc: &mut Document, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let element = doc.create_element(tag);
        for (name, value) in attributes {
            doc.set_attribute(element, name, value).unwrap();
        }
        doc.append_child(parent, element).unwrap();
        element
    }

    pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) {
        self.document.borrow_mut().set_attribute(element, name, value).unwrap();
    }

    /// Move DOM focus and deliver the focus-in event
    pub fn focus(&self, element: NodeId) {
        self.document.borrow_mut().focus(element).unwrap();
        self.engine.handle_focus_in(element);
    }

    /// Run the executor for `duration`
    pub fn settle(&self, duration: Duration) {
        smol::block_on(self.executor.run(Timer::after(duration)));
    }

    pub fn settle_ms(&self, ms: u64) {
        self.settle(Duration::from_millis(ms));
    }

    pub fn block_on<T>(&self, future: impl std::future::Future<Output = T>) -> T {
        smol::block_on(self.executor.run(future))
    }
}
