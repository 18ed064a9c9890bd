//! Convenient re-exports of commonly used types from xcrud.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use xcrud::prelude::*;
//! ```
//!
//! The stage traits are included, so builder methods such as `sort`, `limit`
//! and `execute` are in scope.

pub use xcrud_core::{
    backend::{DynSessionBackend, SessionBackend, SessionBackendBuilder},
    collection::Collection,
    config::SessionConfig,
    crud::{CollectionAdd, CollectionAddBase, CollectionFind, CollectionModify, CollectionRemove},
    error::{CrudError, CrudResult},
    result::DocResult,
    session::{Schema, Session, SessionBuilder},
    stage::{BindStage, Bound, ExecuteStage, LimitStage, Limited, OffsetStage, Open, Paged, SortStage},
    state::{SortDirection, SortKey, UpdateStep},
    value::{DocSource, ExprValue, Field, expr, param},
    wire::CrudKind,
};
