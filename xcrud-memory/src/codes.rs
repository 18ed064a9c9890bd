//! Server error codes reported by the in-memory backend.

/// An added document reuses an `_id` already present in the collection.
pub const DUPLICATE_ID: u32 = 5116;

/// An update step tries to change a document's `_id`.
pub const FORBIDDEN_ID_UPDATE: u32 = 5053;

/// A filter, sort key or update value the evaluator cannot handle.
pub const UNSUPPORTED_EXPRESSION: u32 = 5150;
