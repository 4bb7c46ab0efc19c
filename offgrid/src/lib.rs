#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # offgrid
//!
//! An offline request interceptor. One [`Interceptor`] is one installed
//! worker version: it owns three versioned named caches and answers every
//! same-origin request from them or from the network.
//!
//! ## Classes and strategies
//!
//! Each request is classified once ([`RequestClass`]) and the class picks
//! the strategy:
//!
//! - **Image** and **Static** requests are served cache-first.
//! - **Dynamic** requests (city pages, city images, `/api/`) are served
//!   network-first and refresh the `dynamic` cache.
//! - Everything else goes to the network and is never cached.
//!
//! When the network is gone, navigations fall back to a cached offline page
//! or site root and subresources get a small synthesized 404 or 503. A fetch
//! never fails.
//!
//! ## Lifecycle
//!
//! Versions move through [`LifecycleState`]: install stores the manifest
//! all-or-nothing, activate deletes every cache that is not current, and
//! only then are fetches intercepted. See the [`lifecycle`] module.
//!
//! ## Feature flags
//!
//! - `metrics`: counters for fetch outcomes, trim evictions, install
//!   failures and swallowed storage errors.

/// Request classification.
pub mod classify;

/// Interceptor configuration and its builder.
pub mod config;

/// Fetch outcomes and response sources.
pub mod context;

/// Error types for lifecycle and install failures.
pub mod error;

/// Host events and their outcomes.
pub mod event;

/// Host window and notification facilities.
pub mod host;

/// The interceptor itself.
pub mod interceptor;

pub mod lifecycle;

/// Control messages.
pub mod message;

/// Metrics collection.
///
/// When the `metrics` feature is disabled every recorder is a no-op.
pub mod metrics;

/// Push payloads and notifications.
pub mod push;

mod strategy;

/// Cache trimming.
pub mod trim;

pub use classify::RequestClass;
pub use context::{FetchOutcome, PassthroughReason, ResponseSource};
pub use error::InterceptError;
pub use event::{Event, Outcome};
pub use interceptor::Interceptor;
pub use lifecycle::{LifecycleEvent, LifecycleState};
pub use message::ControlMessage;
pub use trim::{TrimReport, trim_caches};
