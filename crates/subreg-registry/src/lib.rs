//! The subreg registry service.
//!
//! [`Registry`] is the explicitly passed service handle: it owns the
//! cache-backed catalog, serves reads from it on any node, and routes writes
//! through the leader-forwarding router so the log stays totally ordered.
//! Transport, persistence and process lifecycle belong to the caller.

pub mod catalog;
pub mod config;
pub mod memory;
pub mod registry;
pub mod router;

pub use catalog::Catalog;
pub use config::{Mode, RegistryConfig};
pub use memory::MemoryLog;
pub use registry::Registry;
