//! Core types and trait definitions for the seismic insight engine.
//!
//! This crate is deliberately free of database and runtime dependencies.
//! Analyzers, the engine and storage backends all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod error;
pub mod event;
pub mod insight;
pub mod lifecycle;
pub mod run;
pub mod store;

pub use error::{Error, Result};
