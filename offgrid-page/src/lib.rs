#![warn(missing_docs)]
//! In-page caching and preloading for offgrid.
//!
//! Where the `offgrid` interceptor sits between the page and the network,
//! this crate lives inside one loaded page:
//!
//! - [`MemoryCache`]: short-lived keyed values, lazily expired and swept.
//! - [`PersistentCache`]: namespaced values in durable key/value storage,
//!   with an extended-TTL offline tier and a backup tier.
//! - [`ResourcePreloader`]: deduplicated prefetch hints driven by init,
//!   hover, scroll and page-type heuristics.
//! - [`ImageValidator`]: image probes coalesced per source.
//! - [`ImageLoadRegistry`]: per-URL image load state.
//!
//! [`PageContext`] owns one of each for a page.
//!
//! ```no_run
//! use offgrid_backend::MemoryKeyValueStore;
//! use offgrid_core::Origin;
//! use offgrid_page::{ImageProbe, PageConfig, PageContextBuilder, PreloadDirective, PreloadSink};
//!
//! struct Head;
//! impl PreloadSink for Head {
//!     fn inject(&self, directive: PreloadDirective) {
//!         println!("<link rel={} href={}>", directive.rel, directive.url);
//!     }
//! }
//!
//! struct Loader;
//! #[async_trait::async_trait]
//! impl ImageProbe for Loader {
//!     async fn load(&self, _src: &str) -> bool {
//!         true
//!     }
//! }
//!
//! # #[tokio::main] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PageConfig::builder(Origin::parse("https://devcommunity.cn")?).build()?;
//! let mut page = PageContextBuilder::new(config, "/en/").build(MemoryKeyValueStore::new(), Head, Loader);
//! page.init();
//! page.memory().set("cities", serde_json::json!(["beijing"]), None);
//! # Ok(()) }
//! ```

pub mod config;
pub mod connectivity;
pub mod context;
pub mod image;
pub mod load_state;
pub mod memory;
pub mod persistent;
pub mod preload;
pub mod scroll;
mod task;

pub use config::{PageConfig, PageConfigBuilder, PageConfigError};
pub use connectivity::{Connectivity, LinkState};
pub use context::{PageContext, PageContextBuilder};
pub use image::{ImageProbe, ImageValidator};
pub use load_state::{ImageLoadRegistry, ImageLoadState};
pub use memory::{CacheStats, MemoryCache, SweeperHandle};
pub use persistent::{NoRefresh, PersistentCache, Priority, RefreshHook, SmartSetOptions};
pub use preload::{PageKind, PreloadDirective, PreloadSink, ResourcePreloader, ResourceType};
pub use scroll::{CardLayout, CityCard, ScrollWatcher, Viewport};
pub use task::TaskHandle;
