//! Add builders. `CollectionAddBase` only accepts documents, so an empty add cannot execute.

use async_trait::async_trait;
use bson::Document;
use std::mem;

use crate::{
    collection::CollectionRef,
    error::{CrudError, CrudResult},
    executor::Prepare,
    result::DocResult,
    stage::ExecuteStage,
    state::AddState,
    value::DocSource,
    wire::{CrudKind, CrudRequest},
};

use super::Operation;

/// Entry point of an add operation. It only accepts documents.
#[derive(Debug)]
pub struct CollectionAddBase {
    target: CollectionRef,
}

impl CollectionAddBase {
    pub(crate) fn new(target: CollectionRef) -> Self {
        CollectionAddBase { target }
    }

    /// Adds the first document.
    pub fn add(self, doc: impl Into<DocSource>) -> CollectionAdd {
        self.add_all([doc])
    }

    /// Adds documents in iteration order.
    pub fn add_all<I, D>(self, docs: I) -> CollectionAdd
    where
        I: IntoIterator<Item = D>,
        D: Into<DocSource>,
    {
        let state = AddState {
            docs: docs.into_iter().map(Into::into).collect(),
        };

        CollectionAdd {
            op: Operation::new(self.target, state),
        }
    }
}

/// An add operation holding at least one document.
#[derive(Debug)]
pub struct CollectionAdd {
    op: Operation<AddState>,
}

impl CollectionAdd {
    /// Appends one document.
    ///
    /// # Errors
    ///
    /// Returns `StageMisuse` if the operation already executed.
    pub fn add(self, doc: impl Into<DocSource>) -> CrudResult<Self> {
        self.add_all([doc])
    }

    /// Appends documents in iteration order.
    ///
    /// # Errors
    ///
    /// Returns `StageMisuse` if the operation already executed.
    pub fn add_all<I, D>(mut self, docs: I) -> CrudResult<Self>
    where
        I: IntoIterator<Item = D>,
        D: Into<DocSource>,
    {
        self.op.ensure_mutable("add")?;
        self.op
            .state
            .docs
            .extend(docs.into_iter().map(Into::into));

        Ok(self)
    }

    pub fn state(&self) -> &AddState {
        &self.op.state
    }
}

#[async_trait]
impl ExecuteStage for CollectionAdd {
    async fn execute(&mut self) -> CrudResult<DocResult> {
        self.op.execute().await
    }
}

impl Prepare for AddState {
    const KIND: CrudKind = CrudKind::Add;

    fn referenced_params(&self) -> Vec<String> {
        Vec::new()
    }

    fn prepare(&mut self, request: &mut CrudRequest) -> CrudResult<()> {
        if self.docs.is_empty() {
            return Err(CrudError::EmptyBatch);
        }

        // Decode every JSON entry before moving anything out of the state.
        let parsed = self
            .docs
            .iter()
            .map(|source| source.parse_json().transpose())
            .collect::<CrudResult<Vec<Option<Document>>>>()?;

        request.docs = mem::take(&mut self.docs)
            .into_iter()
            .zip(parsed)
            .map(|(source, parsed)| match source {
                DocSource::Doc(doc) => doc,
                DocSource::Json(_) => parsed.unwrap_or_default(),
            })
            .collect();

        Ok(())
    }

    fn restore(&mut self, request: CrudRequest) {
        self.docs = request
            .docs
            .into_iter()
            .map(DocSource::Doc)
            .collect();
    }
}
