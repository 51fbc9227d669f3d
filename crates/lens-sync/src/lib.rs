//! Lens Sync - Accessibility Data Synchronization
//!
//! Decides, for a constantly changing focused element, which accessibility
//! data is currently valid and when to re-fetch it.
//!
//! Features:
//! - Focus tracking with active-descendant resolution and churn filtering
//! - Per-element request coalescing (at most one fetch in flight)
//! - Retry with empty-result and transport backoff schedules
//! - Identity-keyed cache used as a fallback only
//! - Debounced re-fetch on attribute mutations
//! - Stale-result discard before presentation
//!
//! Everything runs on one thread: the host owns a [`smol::LocalExecutor`],
//! shares it with the engine, and drives it.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod focus;
pub mod presenter;
pub mod provider;
pub mod retry;
pub mod watcher;

pub use cache::AccessibilityCache;
pub use config::{SyncConfig, SyncConfigBuilder};
pub use coordinator::RequestCoordinator;
pub use engine::{SynchronizationEngine, SynchronizationEngineBuilder};
pub use error::{ProviderError, SyncError};
pub use focus::{FocusPhase, FocusState, FocusTracker, FocusTransition, KeyInput};
pub use presenter::{FrameBroadcast, FrameId, Presenter};
pub use provider::{AccessibilityProvider, LocalInspectionProvider, ProviderRequest};
pub use retry::{RetryDecision, RetryPolicy};
pub use watcher::{DebounceKey, MutationAction, MutationWatcher};
