//! Normalized CRUD requests and their wire encoding.
//!
//! The executor commits a finished operation state into a [`CrudRequest`],
//! encodes it with [`encode`] and hands the bytes to the session backend as a
//! [`Frame`]. Backends decode frames with [`decode`] and answer with a
//! [`Response`].
//!
//! Requests are encoded as BSON documents. Bindings are ordered by name, so two
//! requests built from the same inputs encode to the same bytes.

use bson::Document;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::{
    error::CrudResult,
    state::{SortKey, UpdateStep},
    value::ExprValue,
};

/// The kind of CRUD statement carried by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrudKind {
    Add,
    Find,
    Remove,
    Modify,
}

impl fmt::Display for CrudKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CrudKind::Add => "ADD",
            CrudKind::Find => "FIND",
            CrudKind::Remove => "REMOVE",
            CrudKind::Modify => "MODIFY",
        })
    }
}

/// A fully validated CRUD statement addressed to one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrudRequest {
    pub kind: CrudKind,
    pub schema: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<UpdateStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<Document>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, ExprValue>,
}

impl CrudRequest {
    /// Creates an empty request of the given kind.
    pub fn new(kind: CrudKind, schema: impl Into<String>, collection: impl Into<String>) -> Self {
        CrudRequest {
            kind,
            schema: schema.into(),
            collection: collection.into(),
            filter: None,
            updates: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            docs: Vec::new(),
            bindings: BTreeMap::new(),
        }
    }

    /// Returns `schema.collection`.
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.schema, self.collection)
    }
}

/// An encoded request as handed to a session backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position of this frame in the session's submission order.
    pub sequence: u64,
    pub kind: CrudKind,
    /// The BSON encoded [`CrudRequest`].
    pub payload: Vec<u8>,
}

impl Frame {
    /// Decodes the request carried by this frame.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Serialization`](crate::error::CrudError::Serialization)
    /// if the payload is not a valid request.
    pub fn request(&self) -> CrudResult<CrudRequest> {
        decode(&self.payload)
    }
}

/// What the server reports back for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// Number of documents inserted, removed or modified, or returned by a find.
    pub affected_items: u64,
    /// `_id` values the server generated for added documents, in insertion order.
    pub generated_ids: Vec<String>,
    /// Documents produced by a find.
    pub documents: Vec<Document>,
    pub warnings: Vec<String>,
}

/// Encodes a request into its wire form.
///
/// # Errors
///
/// Returns [`CrudError::Serialization`](crate::error::CrudError::Serialization)
/// if BSON encoding fails.
pub fn encode(request: &CrudRequest) -> CrudResult<Vec<u8>> {
    Ok(bson::serialize_to_vec(request)?)
}

/// Decodes a request from its wire form.
///
/// # Errors
///
/// Returns [`CrudError::Serialization`](crate::error::CrudError::Serialization)
/// if the bytes are not a valid request.
pub fn decode(payload: &[u8]) -> CrudResult<CrudRequest> {
    Ok(bson::deserialize_from_slice(payload)?)
}
