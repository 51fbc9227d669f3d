//! Scenario runner
//!
//! Drives a [`SynchronizationEngine`] through a scenario on a local executor
//! and records every presenter and broadcast call.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use lens_a11y::{AccessibilityInfo, ProviderResponse};
use lens_dom::{Document, NodeId};
use lens_sync::{
    AccessibilityProvider, FrameBroadcast, FrameId, KeyInput, LocalInspectionProvider, Presenter, ProviderError,
    ProviderRequest, SynchronizationEngine,
};
use serde::Serialize;
use smol::{LocalExecutor, Timer};

use crate::scenario::{BuiltDocument, KeyName, Scenario, Step, Targets};

/// Recorded engine output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ReplayEvent {
    Loading {
        at_ms: u64,
        target: String,
    },
    Show {
        at_ms: u64,
        target: String,
        info: AccessibilityInfo,
    },
    Hide {
        at_ms: u64,
    },
    Announce {
        at_ms: u64,
        frame: FrameId,
    },
    Query {
        at_ms: u64,
        target: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        info: Option<AccessibilityInfo>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[derive(Clone)]
struct ReplayLog {
    start: Instant,
    events: Rc<RefCell<Vec<ReplayEvent>>>,
    document: Rc<RefCell<Document>>,
    targets: Rc<Targets>,
}

impl ReplayLog {
    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn label(&self, id: NodeId) -> String {
        match self.document.try_borrow() {
            Ok(doc) => self.targets.label(&doc, id),
            Err(_) => id.to_string(),
        }
    }

    fn push(&self, event: ReplayEvent) {
        self.events.borrow_mut().push(event);
    }
}

struct ReplayPresenter {
    log: ReplayLog,
}

impl Presenter for ReplayPresenter {
    fn show_loading(&self, target: NodeId) {
        self.log.push(ReplayEvent::Loading {
            at_ms: self.log.elapsed_ms(),
            target: self.log.label(target),
        });
    }

    fn show(&self, info: &AccessibilityInfo, target: NodeId) {
        self.log.push(ReplayEvent::Show {
            at_ms: self.log.elapsed_ms(),
            target: self.log.label(target),
            info: info.clone(),
        });
    }

    fn hide(&self) {
        // Only record transitions to hidden.
        let already_hidden = matches!(self.log.events.borrow().last(), None | Some(ReplayEvent::Hide { .. }));
        if !already_hidden {
            self.log.push(ReplayEvent::Hide {
                at_ms: self.log.elapsed_ms(),
            });
        }
    }
}

struct ReplayBroadcast {
    log: ReplayLog,
}

impl FrameBroadcast for ReplayBroadcast {
    fn announce_shown(&self, frame: FrameId) {
        self.log.push(ReplayEvent::Announce {
            at_ms: self.log.elapsed_ms(),
            frame,
        });
    }
}

/// Local inspection behind a simulated round-trip latency
struct SimulatedProvider {
    local: LocalInspectionProvider,
    latency: Duration,
}

#[async_trait(?Send)]
impl AccessibilityProvider for SimulatedProvider {
    async fn fetch(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if !self.latency.is_zero() {
            Timer::after(self.latency).await;
        }
        self.local.fetch(request).await
    }
}

/// Scenario replay session
pub struct Replay {
    executor: Rc<LocalExecutor<'static>>,
    document: Rc<RefCell<Document>>,
    targets: Rc<Targets>,
    engine: SynchronizationEngine,
    log: ReplayLog,
}

impl Replay {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let (document, targets) = BuiltDocument::build(&scenario.document)?.into_parts();
        let document = Rc::new(RefCell::new(document));
        let targets = Rc::new(targets);
        let executor = Rc::new(LocalExecutor::new());
        let log = ReplayLog {
            start: Instant::now(),
            events: Rc::new(RefCell::new(Vec::new())),
            document: Rc::clone(&document),
            targets: Rc::clone(&targets),
        };

        let provider = SimulatedProvider {
            local: LocalInspectionProvider::new(Rc::clone(&document)),
            latency: Duration::from_millis(scenario.provider_latency_ms),
        };
        let engine = SynchronizationEngine::builder(
            Rc::clone(&executor),
            Rc::clone(&document),
            Rc::new(provider),
            Rc::new(ReplayPresenter { log: log.clone() }),
        )
        .config(scenario.config.clone())
        .broadcast(Rc::new(ReplayBroadcast { log: log.clone() }))
        .frame(FrameId(scenario.frame))
        .build();

        Ok(Self {
            executor,
            document,
            targets,
            engine,
            log,
        })
    }

    pub fn engine(&self) -> &SynchronizationEngine {
        &self.engine
    }

    /// Replay every step, then let the executor run for the trailing wait
    pub fn run(&self, scenario: &Scenario) -> Result<Vec<ReplayEvent>> {
        for (index, step) in scenario.steps.iter().enumerate() {
            tracing::debug!(step = index, ?step, "replaying step");
            self.step(step).with_context(|| format!("step {index} failed"))?;
            while self.executor.try_tick() {}
        }
        self.wait(Duration::from_millis(scenario.trailing_wait_ms));
        Ok(self.events())
    }

    pub fn events(&self) -> Vec<ReplayEvent> {
        self.log.events.borrow().clone()
    }

    fn resolve(&self, target: &str) -> Result<NodeId> {
        self.targets.resolve(&self.document.borrow(), target)
    }

    fn wait(&self, duration: Duration) {
        smol::block_on(self.executor.run(Timer::after(duration)));
    }

    pub fn step(&self, step: &Step) -> Result<()> {
        match step {
            Step::Focus { target } => {
                let id = self.resolve(target)?;
                self.document.borrow_mut().focus(id)?;
                self.engine.handle_focus_in(id);
            }
            Step::Blur { related } => match related {
                Some(related) => {
                    let id = self.resolve(related)?;
                    self.engine.handle_focus_out(Some(id));
                    self.document.borrow_mut().focus(id)?;
                    self.engine.handle_focus_in(id);
                }
                None => {
                    self.document.borrow_mut().blur();
                    self.engine.handle_focus_out(None);
                }
            },
            Step::Key { key } => {
                let key = match key {
                    KeyName::Escape => KeyInput::Escape,
                    KeyName::ShiftEscape => KeyInput::ShiftEscape,
                    KeyName::Other => KeyInput::Other,
                };
                self.engine.handle_key(key);
            }
            Step::SetAttribute { target, name, value } => {
                let id = self.resolve(target)?;
                self.document.borrow_mut().set_attribute(id, name, value)?;
            }
            Step::RemoveAttribute { target, name } => {
                let id = self.resolve(target)?;
                self.document.borrow_mut().remove_attribute(id, name)?;
            }
            Step::SetChecked { target, checked } => {
                let id = self.resolve(target)?;
                self.document.borrow_mut().set_checked(id, *checked)?;
            }
            Step::SetIndeterminate { target, indeterminate } => {
                let id = self.resolve(target)?;
                self.document.borrow_mut().set_indeterminate(id, *indeterminate)?;
            }
            Step::Remove { target } => {
                let id = self.resolve(target)?;
                self.document.borrow_mut().remove(id)?;
            }
            Step::Wait { ms } => self.wait(Duration::from_millis(*ms)),
            Step::Dismiss => {
                // The browser delivers the focus-in caused by the refocus.
                if let Some(id) = self.engine.dismiss_and_refocus() {
                    self.engine.handle_focus_in(id);
                }
            }
            Step::RemoteShown { frame } => self.engine.handle_remote_shown(FrameId(*frame)),
            Step::Enable => self.engine.set_enabled(true),
            Step::Disable => self.engine.set_enabled(false),
            Step::Query { target, force } => {
                let id = self.resolve(target)?;
                let result = smol::block_on(self.executor.run(self.engine.get_accessible_info(id, *force)));
                let (info, error) = match result {
                    Ok(info) => (Some(info), None),
                    Err(err) => (None, Some(err.to_string())),
                };
                self.log.push(ReplayEvent::Query {
                    at_ms: self.log.elapsed_ms(),
                    target: target.clone(),
                    info,
                    error,
                });
            }
        }
        Ok(())
    }
}

/// Build a session for `scenario` and replay it
pub fn run(scenario: &Scenario) -> Result<Vec<ReplayEvent>> {
    Replay::new(scenario)?.run(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shows(events: &[ReplayEvent]) -> Vec<(&str, &AccessibilityInfo)> {
        events
            .iter()
            .filter_map(|e| match e {
                ReplayEvent::Show { target, info, .. } => Some((target.as_str(), info)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_toggle_scenario() {
        let scenario = Scenario::from_json(
            r#"{
                "config": { "mutation_debounce": 20, "loading_delay": 5 },
                "document": [
                    { "tag": "button", "ref": "mute", "attributes": { "aria-pressed": "false" }, "children": ["Mute"] }
                ],
                "steps": [
                    { "type": "focus", "target": "mute" },
                    { "type": "wait", "ms": 30 },
                    { "type": "set-attribute", "target": "mute", "name": "aria-pressed", "value": "true" }
                ],
                "trailing_wait_ms": 100
            }"#,
        )
        .unwrap();
        let events = run(&scenario).unwrap();

        let shows = shows(&events);
        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].0, "mute");
        assert_eq!(shows[0].1.name, "Mute");
        assert_eq!(shows[0].1.aria_properties.get("aria-pressed").map(String::as_str), Some("false"));
        assert_eq!(shows[1].1.aria_properties.get("aria-pressed").map(String::as_str), Some("true"));
        assert!(events.iter().any(|e| matches!(e, ReplayEvent::Announce { frame: FrameId(0), .. })));
    }

    #[test]
    fn test_escape_blur_and_query() {
        let scenario = Scenario::from_json(
            r#"{
                "provider_latency_ms": 5,
                "document": [
                    { "tag": "input", "ref": "agree", "attributes": { "type": "checkbox", "aria-label": "Agree" }, "indeterminate": true }
                ],
                "steps": [
                    { "type": "focus", "target": "agree" },
                    { "type": "wait", "ms": 50 },
                    { "type": "key", "key": "Escape" },
                    { "type": "query", "target": "agree", "force": true },
                    { "type": "disable" },
                    { "type": "query", "target": "agree" }
                ],
                "trailing_wait_ms": 10
            }"#,
        )
        .unwrap();
        let events = run(&scenario).unwrap();

        assert!(matches!(events.iter().find(|e| matches!(e, ReplayEvent::Hide { .. })), Some(_)));
        let queries: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ReplayEvent::Query { info, error, .. } => Some((info.clone(), error.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(queries.len(), 2);
        let info = queries[0].0.as_ref().unwrap();
        assert_eq!(info.state("checked"), Some(lens_a11y::StateValue::Mixed));
        assert!(queries[1].1.is_some());
    }

    #[test]
    fn test_bundled_toggle_button_scenario() {
        let scenario = Scenario::from_json(include_str!("../scenarios/toggle-button.json")).unwrap();
        let events = run(&scenario).unwrap();
        let shows = shows(&events);

        let mute: Vec<_> = shows.iter().filter(|(target, _)| *target == "mute").collect();
        assert!(mute.len() >= 2);
        let pressed = |info: &AccessibilityInfo| info.aria_properties.get("aria-pressed").cloned();
        assert_eq!(pressed(mute[mute.len() - 1].1).as_deref(), Some("false"));
        assert!(
            shows
                .iter()
                .any(|(target, info)| *target == "all" && info.state("checked") == Some(lens_a11y::StateValue::Mixed))
        );
    }

    #[test]
    fn test_bundled_listbox_scenario() {
        let scenario = Scenario::from_json(include_str!("../scenarios/listbox.json")).unwrap();
        let events = run(&scenario).unwrap();

        let names: Vec<_> = shows(&events).iter().map(|(_, info)| info.name.clone()).collect();
        assert_eq!(names.first().map(String::as_str), Some("Apple"));
        assert_eq!(names.last().map(String::as_str), Some("Pear"));
        assert!(matches!(events.last(), Some(ReplayEvent::Hide { .. })));
    }

    #[test]
    fn test_unknown_target_fails_with_step_index() {
        let scenario = Scenario::from_json(
            r#"{ "document": [], "steps": [ { "type": "focus", "target": "nowhere" } ] }"#,
        )
        .unwrap();
        let err = run(&scenario).unwrap_err();
        assert!(format!("{err:#}").contains("step 0"));
    }
}
