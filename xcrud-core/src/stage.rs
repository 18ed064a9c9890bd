//! Stage traits and stage markers.
//!
//! Each stage trait declares one builder operation whose return type names the
//! next legal stage. Builders carry a marker type parameter recording which
//! stage they are in, so only the operations legal at that point can be called:
//!
//! ```text
//! find:    Open --sort--> Open --limit--> Limited --offset--> Paged --bind--> Bound --execute
//! remove:  Open --sort--> Open --limit--> Limited --bind--> Bound --execute
//! modify:  Open --sort--> Open --limit--> Limited --bind--> Bound --execute
//! add:     CollectionAddBase --add--> CollectionAdd --add--> CollectionAdd --execute
//! ```
//!
//! `limit`, `offset` and `bind` may be repeated and overwrite the previous
//! value; `sort` may be repeated and appends. Every stage can execute.

use async_trait::async_trait;

use crate::{error::CrudResult, result::DocResult, state::SortSpec, value::ExprValue};

/// Initial stage: sort keys may still be added.
#[derive(Debug, Clone, Copy, Default)]
pub struct Open;

/// A limit has been set. Sorting is closed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limited;

/// An offset has been set after the limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Paged;

/// Only bindings may be added.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bound;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Open {}
    impl Sealed for super::Limited {}
    impl Sealed for super::Paged {}
    impl Sealed for super::Bound {}
}

/// Stages at which `limit` may be called.
pub trait CanLimit: sealed::Sealed {}

impl CanLimit for Open {}
impl CanLimit for Limited {}

/// Stages at which `offset` may be called. An offset always follows a limit.
pub trait CanOffset: sealed::Sealed {}

impl CanOffset for Limited {}
impl CanOffset for Paged {}

/// Appends sort keys.
pub trait SortStage: Sized {
    type Next;

    /// Appends one or more sort keys in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty or blank key and `StageMisuse`
    /// if the operation already executed.
    fn sort(self, keys: impl SortSpec) -> CrudResult<Self::Next>;
}

/// Sets the maximum number of documents returned or affected.
pub trait LimitStage: Sized {
    type Next;

    /// Sets the limit, replacing any earlier one. Zero is allowed.
    fn limit(self, rows: u64) -> CrudResult<Self::Next>;
}

/// Sets the number of documents skipped before the limit applies.
pub trait OffsetStage: Sized {
    type Next;

    /// Sets the offset, replacing any earlier one.
    fn offset(self, rows: u64) -> CrudResult<Self::Next>;
}

/// Binds a value to a named parameter.
pub trait BindStage: Sized {
    type Next;

    /// Binds `value` to `:name`, replacing any earlier value.
    ///
    /// Binding is the only mutation allowed after a successful execute, and it
    /// permits one more execute.
    fn bind(self, name: &str, value: impl Into<ExprValue>) -> CrudResult<Self::Next>;
}

/// Sends the operation to the server.
#[async_trait]
pub trait ExecuteStage {
    /// Validates the operation, submits it and waits for the result.
    ///
    /// # Errors
    ///
    /// Fails before any wire I/O with `StageMisuse`, `EmptyBatch`,
    /// `UnresolvedBinding`, `InvalidArgument` or `CollectionGone`, and after
    /// submission with `Transport`, `Server` or `Cancelled`.
    async fn execute(&mut self) -> CrudResult<DocResult>;
}
