#![doc = include_str!("../README.md")]

pub mod interceptor;
pub mod mock;
pub mod page;
pub mod tracing;
