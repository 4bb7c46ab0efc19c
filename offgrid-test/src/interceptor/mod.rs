//! Interceptor scenarios: lifecycle, strategies, trimming and push.

pub mod steps;
pub mod world;

pub use world::InterceptorWorld;
