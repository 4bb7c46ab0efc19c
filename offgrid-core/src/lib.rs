#![warn(missing_docs)]
//! # offgrid-core
//!
//! Core types shared by the offgrid offline-caching crates.
//!
//! The offline interceptor (`offgrid`) and the in-page cache layer
//! (`offgrid-page`) run in separate execution contexts and share no memory.
//! What they do share is vocabulary, and that vocabulary lives here:
//!
//! - **Model** intercepted traffic ([`Request`], [`Response`])
//! - **Name** versioned caches ([`CacheKind`], [`CacheName`], [`CacheNames`])
//! - **Expire** cached values ([`TimedEntry`], [`Clock`])
//! - **Reach** the network ([`Network`], [`NetworkError`])
//! - **Localize** cosmetic offline messaging ([`Language`])

pub mod cache_name;
pub mod clock;
pub mod entry;
pub mod language;
pub mod network;
pub mod request;
pub mod response;

pub use cache_name::{CacheKind, CacheName, CacheNames};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use entry::TimedEntry;
pub use language::Language;
pub use network::{Network, NetworkError};
pub use request::{Destination, Origin, OriginError, Request, RequestMode};
pub use response::{Headers, Response};
#[doc(hidden)]
pub use smol_str::SmolStr;

/// Raw body bytes of a response.
/// Using `Bytes` makes cloning a response a reference-count increment.
pub type Raw = bytes::Bytes;
