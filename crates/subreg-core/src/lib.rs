//! Core types and trait definitions for the subreg subject registry.
//!
//! This crate is deliberately free of HTTP, database and runtime
//! dependencies. It holds the qualified-name resolver, the schema format
//! collaborator, the catalog index, the delete state machine and the traits
//! through which the registry talks to its log and to the current leader.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod log;
pub mod qualified;
pub mod schema;

pub use error::{Error, Result};
