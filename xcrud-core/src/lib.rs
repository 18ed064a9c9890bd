//! Stage-gated builders for CRUD statements against a document store.
//!
//! This crate is the core of the xcrud project and provides:
//!
//! - **Payload values** ([`value`]) - Documents to insert, field paths and expression values
//! - **Stage traits** ([`stage`]) - The capabilities each builder stage exposes
//! - **Operation state** ([`state`]) - Accumulated parameters of one CRUD call
//! - **Builder facades** ([`crud`]) - `CollectionAdd`, `CollectionFind`, `CollectionRemove` and `CollectionModify`
//! - **Parameter bindings** ([`bind`]) - Named parameters resolved at execute time
//! - **Results** ([`result`]) - Counts, generated ids and fetched documents
//! - **Wire requests** ([`wire`]) - The normalized request and its BSON encoding
//! - **Sessions and collections** ([`session`], [`collection`]) - Entry points for building operations
//! - **Session backends** ([`backend`]) - Traits a transport implements to carry requests
//! - **Configuration** ([`config`]) and **errors** ([`error`])
//!
//! # Example
//!
//! ```ignore
//! use xcrud_core::{session::Session, stage::*};
//!
//! let session = Session::builder(backend).default_schema("shop").build()?;
//! let items = session.default_schema()?.collection("items");
//!
//! let mut added = items.add(r#"{"name": "lamp", "price": 30}"#)
//!     .add(r#"{"name": "desk", "price": 120}"#)?
//!     .execute()
//!     .await?;
//! assert_eq!(added.count(), 2);
//!
//! let mut found = items.find("price > :min")
//!     .sort("price DESC")?
//!     .limit(10)?
//!     .offset(0)?
//!     .bind("min", 50)?
//!     .execute()
//!     .await?;
//! let docs = found.fetch_all();
//! ```

#[allow(unused_extern_crates)]
extern crate self as xcrud_core;

pub mod backend;
pub mod bind;
pub mod collection;
pub mod config;
pub mod crud;
pub mod error;
mod executor;
pub mod result;
pub mod session;
pub mod stage;
pub mod state;
pub mod value;
pub mod wire;
