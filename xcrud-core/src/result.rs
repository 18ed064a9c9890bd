//! The result of one executed operation.

use bson::Document;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;

use crate::{
    error::CrudResult,
    wire::{CrudKind, Response},
};

/// Outcome of an `execute` call.
///
/// A result is independent of the builder that produced it: rebinding and
/// executing the builder again yields a new `DocResult` and leaves this one
/// untouched.
///
/// # Example
///
/// ```ignore
/// let mut result = items.find("price < 50").execute().await?;
/// while let Some(doc) = result.fetch_one() {
///     println!("{doc}");
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DocResult {
    kind: CrudKind,
    count: u64,
    generated_ids: Vec<String>,
    warnings: Vec<String>,
    documents: VecDeque<Document>,
}

impl DocResult {
    pub(crate) fn new(kind: CrudKind, response: Response) -> Self {
        let count = match kind {
            CrudKind::Find => response.documents.len() as u64,
            _ => response.affected_items,
        };

        DocResult {
            kind,
            count,
            generated_ids: response.generated_ids,
            warnings: response.warnings,
            documents: response.documents.into(),
        }
    }

    /// The kind of operation that produced this result.
    pub fn kind(&self) -> CrudKind {
        self.kind
    }

    /// Number of documents added, removed or modified; for a find, the number of documents returned.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// `_id` values generated by the server for added documents, in insertion order.
    pub fn generated_ids(&self) -> &[String] {
        &self.generated_ids
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of documents not fetched yet.
    pub fn remaining(&self) -> usize {
        self.documents.len()
    }

    /// Takes the next document, or `None` once every document was fetched.
    pub fn fetch_one(&mut self) -> Option<Document> {
        self.documents.pop_front()
    }

    /// Takes every document not fetched yet.
    pub fn fetch_all(&mut self) -> Vec<Document> {
        self.documents.drain(..).collect()
    }

    /// Takes the next document and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document does not match `T`. The document
    /// is consumed either way.
    pub fn fetch_one_as<T: DeserializeOwned>(&mut self) -> CrudResult<Option<T>> {
        match self.fetch_one() {
            Some(doc) => Ok(Some(bson::deserialize_from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Takes every remaining document and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for the first document that does not match `T`.
    pub fn fetch_all_as<T: DeserializeOwned>(&mut self) -> CrudResult<Vec<T>> {
        self.fetch_all()
            .into_iter()
            .map(|doc| Ok(bson::deserialize_from_document(doc)?))
            .collect()
    }

    /// Discards the documents not fetched yet. Counts and ids stay available.
    pub fn close(&mut self) {
        self.documents.clear();
    }
}
