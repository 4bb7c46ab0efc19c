//! In-page scenarios: memory and persisted caches, preloading and images.

pub mod steps;
pub mod world;

pub use world::PageWorld;
