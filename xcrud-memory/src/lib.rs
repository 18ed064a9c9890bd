//! In-memory session backend for xcrud.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `SessionBackend` trait. It decodes every frame a session submits and applies
//! the request to BSON documents, which makes it suitable for development and
//! for testing code built on the CRUD builders.
//!
//! # Features
//!
//! - **Wire-level recording** - Every frame and decoded request is kept for inspection
//! - **Filter evaluation** - Comparisons, `AND`/`OR`/`NOT` and named parameters
//! - **Sorting and paging** - Multi-key sort, offset and limit
//! - **Document updates** - Set, unset and array operations on nested paths
//! - **Failure injection** - Force transport or server errors, dead or stalled backends
//!
//! # Quick Start
//!
//! ```ignore
//! use xcrud_core::{session::Session, stage::ExecuteStage};
//! use xcrud_memory::InMemorySession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let memory = InMemorySession::new();
//!     let session = Session::new(memory.clone());
//!     let items = session.schema("shop").collection("items");
//!
//!     let result = items.add(r#"{"name": "lamp"}"#).execute().await?;
//!     assert_eq!(result.generated_ids().len(), 1);
//!     assert_eq!(memory.requests().await.len(), 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as xcrud_memory;

pub mod codes;
pub mod session;
mod evaluator;
mod update;

pub use session::{InMemorySession, InMemorySessionBuilder};
