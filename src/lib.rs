//! Library surface for splus-cache: the write-behind cache engine, its
//! HTTP surface, and the ambient configuration/logging/signal wiring
//! around it. `main.rs` is a thin binary entry point over this crate so
//! that integration tests can drive the router in-process.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod http;
pub mod logging;
pub mod signals;
pub mod store;
