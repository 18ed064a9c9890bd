//! Main xcrud crate providing stage-gated CRUD builders for document collections.
//!
//! This crate is the primary entry point for users of the xcrud framework. It
//! re-exports the core builders and types and gives access to the bundled
//! session backends.
//!
//! # Features
//!
//! - **Stage-gated builders** - Each chained call only exposes the options legal at that point
//! - **Deferred execution** - Nothing reaches the session until `execute` is awaited
//! - **Named parameters** - Filters and updates refer to `:name` bindings, checked before submission
//! - **Pluggable transports** - Any `SessionBackend` can carry the encoded requests
//!
//! # Quick Start
//!
//! ```ignore
//! use xcrud::{prelude::*, memory::InMemorySession};
//!
//! #[tokio::main]
//! async fn main() -> CrudResult<()> {
//!     let backend = InMemorySession::builder().build().await?;
//!     let session = Session::builder(backend).default_schema("shop").build()?;
//!     let items = session.default_schema()?.collection("items");
//!
//!     items
//!         .add(r#"{"name": "lamp", "price": 30}"#)
//!         .add(r#"{"name": "desk", "price": 120}"#)?
//!         .execute()
//!         .await?;
//!
//!     let mut cheap = items
//!         .find("price < :max")
//!         .sort("price DESC")?
//!         .limit(10)?
//!         .bind("max", 100)?
//!         .execute()
//!         .await?;
//!     println!("{:?}", cheap.fetch_all());
//!
//!     items.modify("name = 'lamp'").set("price", 25)?.execute().await?;
//!     items.remove("price > 100").execute().await?;
//!
//!     session.shutdown().await
//! }
//! ```
//!
//! # Rebinding
//!
//! A builder that executed successfully can only be executed again after a
//! `bind`. Each execute returns an independent result:
//!
//! ```ignore
//! let mut find = items.find("price > :min").bind("min", 10)?;
//! let first = find.execute().await?;
//!
//! let mut find = find.bind("min", 50)?;
//! let second = find.execute().await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory backend for development and testing (requires the `memory` feature)

pub mod prelude;

pub use xcrud_core::{backend, bind, collection, config, crud, error, result, session, stage, state, value, wire};

// Re-export BSON types for convenience
pub use bson;

/// In-memory session backend implementations.
///
/// This module is only available when the `memory` feature is enabled.
#[cfg(feature = "memory")]
pub mod memory {
    pub use xcrud_memory::{InMemorySession, InMemorySessionBuilder, codes};
}
