//! Request Coordinator
//!
//! Owns the in-flight registry, the retry loop, and the fallback chain.
//!
//! Every fetch runs as its own task on the shared executor and is published
//! through a [`Shared`] handle, so concurrent callers for one element await
//! the same result and dropping a caller never cancels the fetch itself. The
//! registry entry is removed when the task settles, however it settles.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::mem;
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use lens_a11y::{inspect_element, normalize_provider_result, AccessibilityInfo, ProviderResponse};
use lens_dom::{Document, NodeId};
use smol::{LocalExecutor, Timer};

use crate::cache::AccessibilityCache;
use crate::config::SyncConfig;
use crate::error::{into_result, ProviderError, SyncError};
use crate::provider::{AccessibilityProvider, ProviderRequest};
use crate::retry::{RetryDecision, RetryPolicy};

type FetchResult = Result<AccessibilityInfo, SyncError>;

/// `None` when the fetch task was torn down before settling
type SharedFetch = Shared<LocalBoxFuture<'static, Option<FetchResult>>>;

/// Per-request flags shared between the registry and the running sequence
#[derive(Debug, Default)]
struct RequestFlags {
    /// Superseded; stop at the next attempt boundary
    cancelled: Cell<bool>,
    /// Attributes changed after the request was issued; its result is not
    /// cached and later callers wait for it to settle, then fetch again
    stale: Cell<bool>,
}

struct InflightEntry {
    id: u64,
    fetch: SharedFetch,
    flags: Rc<RequestFlags>,
}

/// What a caller awaits
enum Pending {
    Current(SharedFetch),
    /// Settle this one first, then join or start a fresh fetch
    Stale(SharedFetch),
}

struct CoordinatorInner {
    executor: Rc<LocalExecutor<'static>>,
    provider: Rc<dyn AccessibilityProvider>,
    document: Rc<RefCell<Document>>,
    config: SyncConfig,
    policy: RetryPolicy,
    cache: RefCell<AccessibilityCache>,
    inflight: RefCell<HashMap<NodeId, InflightEntry>>,
    next_request: Cell<u64>,
    /// Bumped by `clear`; results from an older epoch are never cached
    epoch: Cell<u64>,
}

/// Removes its registry entry when the fetch future is dropped
struct InflightGuard {
    coordinator: Weak<CoordinatorInner>,
    element: NodeId,
    id: u64,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let Some(inner) = self.coordinator.upgrade() else {
            return;
        };
        let removed = match inner.inflight.try_borrow_mut() {
            Ok(mut inflight) => {
                let current = inflight.get(&self.element).is_some_and(|e| e.id == self.id);
                if current { inflight.remove(&self.element) } else { None }
            }
            Err(_) => None,
        };
        drop(removed);
    }
}

/// Request coordinator
#[derive(Clone)]
pub struct RequestCoordinator {
    inner: Rc<CoordinatorInner>,
}

impl RequestCoordinator {
    pub fn new(
        executor: Rc<LocalExecutor<'static>>,
        provider: Rc<dyn AccessibilityProvider>,
        document: Rc<RefCell<Document>>,
        config: SyncConfig,
    ) -> Self {
        let policy = RetryPolicy::from_config(&config);
        Self {
            inner: Rc::new(CoordinatorInner {
                executor,
                provider,
                document,
                config,
                policy,
                cache: RefCell::new(AccessibilityCache::new()),
                inflight: RefCell::new(HashMap::new()),
                next_request: Cell::new(0),
                epoch: Cell::new(0),
            }),
        }
    }

    /// Current snapshot for `element`.
    ///
    /// Joins the in-flight fetch for `element` when there is one. Otherwise
    /// a fresh fetch starts; the cache only serves as a fallback. An expired
    /// in-flight fetch is never joined: the caller waits for it to settle and
    /// then fetches again, so one request per element runs at a time. Fails
    /// only when `element` is not a live element.
    pub async fn get_accessible_info(&self, element: NodeId, force_update: bool) -> FetchResult {
        loop {
            match self.join_or_start(element, force_update)? {
                Pending::Current(fetch) => return fetch.await.unwrap_or(Err(SyncError::Cancelled)),
                Pending::Stale(fetch) => {
                    tracing::debug!(element = %element, "waiting for expired request to settle");
                    let _ = fetch.await;
                }
            }
        }
    }

    fn join_or_start(&self, element: NodeId, force_update: bool) -> Result<Pending, SyncError> {
        check_element(&self.inner.document.borrow(), element)?;

        let mut inflight = self.inner.inflight.borrow_mut();
        // Settled entries normally remove themselves.
        if inflight.get(&element).is_some_and(|e| e.fetch.peek().is_some()) {
            let settled = inflight.remove(&element);
            drop(settled);
        }
        if let Some(entry) = inflight.get(&element) {
            if entry.flags.stale.get() {
                return Ok(Pending::Stale(entry.fetch.clone()));
            }
            entry.flags.cancelled.set(false);
            tracing::debug!(element = %element, "joining in-flight request");
            return Ok(Pending::Current(entry.fetch.clone()));
        }

        let id = self.inner.next_request.get();
        self.inner.next_request.set(id + 1);
        let flags = Rc::new(RequestFlags::default());
        let guard = InflightGuard {
            coordinator: Rc::downgrade(&self.inner),
            element,
            id,
        };
        let inner = Rc::downgrade(&self.inner);
        let sequence_flags = Rc::clone(&flags);
        let task = self.inner.executor.spawn(async move {
            let _guard = guard;
            let Some(inner) = inner.upgrade() else {
                return Err(SyncError::Cancelled);
            };
            inner.fetch_sequence(element, force_update, &sequence_flags).await
        });
        let fetch = task.fallible().boxed_local().shared();

        tracing::debug!(element = %element, request = id, force_update, "starting fetch");
        inflight.insert(
            element,
            InflightEntry {
                id,
                fetch: fetch.clone(),
                flags,
            },
        );
        Ok(Pending::Current(fetch))
    }

    /// Flag every in-flight sequence except the one for `keep` as superseded.
    /// Flagged sequences stop at their next attempt boundary.
    pub fn cancel_except(&self, keep: NodeId) {
        for (element, entry) in self.inner.inflight.borrow().iter() {
            if *element != keep && !entry.flags.cancelled.get() {
                tracing::debug!(element = %element, "superseding in-flight request");
                entry.flags.cancelled.set(true);
            }
        }
    }

    /// Drop the cache entry for `element`
    pub fn invalidate(&self, element: NodeId) {
        if self.inner.cache.borrow_mut().delete(element) {
            tracing::trace!(element = %element, "cache entry invalidated");
        }
    }

    /// Invalidate `element` and expire its in-flight fetch. The expired
    /// fetch still resolves for callers already awaiting it, but its result
    /// is not cached and the next caller fetches again once it settles.
    pub fn expire(&self, element: NodeId) {
        self.invalidate(element);
        if let Some(entry) = self.inner.inflight.borrow().get(&element) {
            if !entry.flags.stale.replace(true) {
                tracing::debug!(element = %element, "in-flight request expired");
            }
        }
    }

    /// Abort all fetches and forget every cached snapshot
    pub fn clear(&self) {
        self.inner.epoch.set(self.inner.epoch.get() + 1);
        let inflight = mem::take(&mut *self.inner.inflight.borrow_mut());
        for entry in inflight.values() {
            entry.flags.cancelled.set(true);
        }
        self.inner.cache.borrow_mut().clear();
        drop(inflight);
    }

    /// Sweep cache entries of removed elements
    pub fn prune_cache(&self) -> usize {
        let doc = self.inner.document.borrow();
        self.inner.cache.borrow_mut().prune(&doc)
    }

    pub fn cached(&self, element: NodeId) -> Option<AccessibilityInfo> {
        self.inner.cache.borrow().get(element).cloned()
    }

    /// Seed the cache, e.g. from a persisted snapshot
    pub fn insert_cached(&self, element: NodeId, info: AccessibilityInfo) {
        self.inner.cache.borrow_mut().set(element, info);
    }

    pub fn cache_len(&self) -> usize {
        self.inner.cache.borrow().len()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.inflight.borrow().len()
    }

    pub fn is_in_flight(&self, element: NodeId) -> bool {
        self.inner.inflight.borrow().contains_key(&element)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }
}

fn check_element(doc: &Document, element: NodeId) -> Result<(), SyncError> {
    if !doc.contains(element) {
        return Err(SyncError::Detached(element));
    }
    if !doc.is_element(element) {
        return Err(SyncError::NotAnElement(element));
    }
    Ok(())
}

impl CoordinatorInner {
    async fn fetch_sequence(&self, element: NodeId, force_update: bool, flags: &RequestFlags) -> FetchResult {
        let epoch = self.epoch.get();
        let (selector, in_shadow) = {
            let doc = self.document.borrow();
            check_element(&doc, element)?;
            (doc.selector_hint(element), doc.is_in_shadow_tree(element))
        };

        if in_shadow && !self.config.shadow_bridge {
            tracing::debug!(element = %element, "shadow tree target; inspecting locally");
            return self.inspect_locally(element, epoch);
        }

        let request = ProviderRequest {
            element,
            selector,
            force_update,
        };
        match self.run_attempts(&request, &flags.cancelled).await {
            Ok(response) => {
                let info = {
                    let doc = self.document.borrow();
                    check_element(&doc, element)?;
                    normalize_provider_result(&doc, element, &response)
                };
                if info.is_meaningful() {
                    if force_update && info.is_busy() {
                        tracing::debug!(element = %element, "busy snapshot not cached");
                    } else if self.epoch.get() == epoch && !flags.cancelled.get() && !flags.stale.get() {
                        self.cache.borrow_mut().set(element, info.clone());
                    }
                    return Ok(info);
                }
                match self.cache.borrow().get(element) {
                    Some(cached) => {
                        tracing::debug!(element = %element, "empty result; keeping cached snapshot");
                        Ok(cached.clone())
                    }
                    None => Ok(info),
                }
            }
            Err(ProviderError::Cancelled) => {
                tracing::debug!(element = %element, "fetch superseded");
                self.fallback(element, None)
            }
            Err(err) => {
                tracing::warn!(element = %element, error = %err, "provider failed; falling back");
                self.fallback(element, (!flags.stale.get()).then_some(epoch))
            }
        }
    }

    /// Attempt loop. Returns the first meaningful response, a terminal
    /// error, or whatever the final unconditional attempt produced.
    async fn run_attempts(
        &self,
        request: &ProviderRequest,
        cancelled: &Cell<bool>,
    ) -> Result<ProviderResponse, ProviderError> {
        let element = request.element;
        for attempt in 0..self.policy.max_attempts() {
            if cancelled.get() {
                return Err(ProviderError::Cancelled);
            }
            match self.attempt(request).await {
                Ok(response) if response.to_info().is_meaningful() => return Ok(response),
                Ok(_) => {
                    let delay = self.policy.empty_result_delay(attempt);
                    tracing::debug!(
                        element = %element,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "empty result; retrying"
                    );
                    Timer::after(delay).await;
                }
                Err(err) => match self.policy.on_error(attempt, &err) {
                    RetryDecision::Abort => {
                        tracing::warn!(element = %element, attempt, error = %err, "terminal provider error");
                        return Err(err);
                    }
                    RetryDecision::Retry(delay) => {
                        tracing::debug!(
                            element = %element,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "provider error; retrying"
                        );
                        Timer::after(delay).await;
                    }
                },
            }
        }
        if cancelled.get() {
            return Err(ProviderError::Cancelled);
        }
        tracing::debug!(element = %element, "attempt budget exhausted; final attempt");
        self.attempt(request).await
    }

    /// One provider call bounded by the configured timeout
    async fn attempt(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = async {
            let response = self.provider.fetch(request.clone()).await?;
            into_result(response)
        };
        let timeout = async {
            Timer::after(self.config.provider_timeout).await;
            Err(ProviderError::TransportTimeout)
        };
        smol::future::or(call, timeout).await
    }

    /// Cached snapshot, else local inspection. The local result is cached
    /// when it carries a role or name and `epoch` is given and still current.
    fn fallback(&self, element: NodeId, epoch: Option<u64>) -> FetchResult {
        if let Some(cached) = self.cache.borrow().get(element) {
            return Ok(cached.clone());
        }
        match epoch {
            Some(epoch) => self.inspect_locally(element, epoch),
            None => Ok(inspect_element(&self.document.borrow(), element)?),
        }
    }

    fn inspect_locally(&self, element: NodeId, epoch: u64) -> FetchResult {
        let info = inspect_element(&self.document.borrow(), element)?;
        if (info.has_role() || info.has_name()) && self.epoch.get() == epoch {
            self.cache.borrow_mut().set(element, info.clone());
        }
        Ok(info)
    }
}
