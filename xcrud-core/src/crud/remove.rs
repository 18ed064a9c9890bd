//! Remove builder.

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::{
    bind::BindingTable,
    collection::CollectionRef,
    error::CrudResult,
    executor::Prepare,
    result::DocResult,
    stage::{BindStage, Bound, CanLimit, ExecuteStage, Limited, LimitStage, Open, SortStage},
    state::{RemoveState, SortSpec, normalize_filter, referenced_params},
    value::ExprValue,
    wire::{CrudKind, CrudRequest},
};

use super::Operation;

/// A remove operation at stage `S`. Same stages as a find, without offset.
#[derive(Debug)]
pub struct CollectionRemove<S> {
    op: Operation<RemoveState>,
    stage: PhantomData<S>,
}

impl CollectionRemove<Open> {
    pub(crate) fn new(target: CollectionRef, filter: Option<String>) -> Self {
        CollectionRemove {
            op: Operation::new(target, RemoveState::new(filter.and_then(normalize_filter))),
            stage: PhantomData,
        }
    }
}

impl<S> CollectionRemove<S> {
    pub fn state(&self) -> &RemoveState {
        &self.op.state
    }

    pub fn bindings(&self) -> &BindingTable {
        self.op.bindings()
    }
}

impl SortStage for CollectionRemove<Open> {
    type Next = Self;

    fn sort(mut self, keys: impl SortSpec) -> CrudResult<Self> {
        self.op.ensure_mutable("sort")?;
        let keys = keys.into_sort_keys()?;
        self.op.state.sort.extend(keys);

        Ok(self)
    }
}

impl<S: CanLimit> LimitStage for CollectionRemove<S> {
    type Next = CollectionRemove<Limited>;

    fn limit(mut self, rows: u64) -> CrudResult<Self::Next> {
        self.op.ensure_mutable("limit")?;
        self.op.state.limit = Some(rows);

        Ok(CollectionRemove { op: self.op, stage: PhantomData })
    }
}

impl<S> BindStage for CollectionRemove<S> {
    type Next = CollectionRemove<Bound>;

    fn bind(self, name: &str, value: impl Into<ExprValue>) -> CrudResult<Self::Next> {
        let op = self.op.bind(name, value.into())?;

        Ok(CollectionRemove { op, stage: PhantomData })
    }
}

#[async_trait]
impl<S: Send> ExecuteStage for CollectionRemove<S> {
    async fn execute(&mut self) -> CrudResult<DocResult> {
        self.op.execute().await
    }
}

impl Prepare for RemoveState {
    const KIND: CrudKind = CrudKind::Remove;

    fn referenced_params(&self) -> Vec<String> {
        referenced_params(self.filter.as_deref(), &[])
    }

    fn prepare(&mut self, request: &mut CrudRequest) -> CrudResult<()> {
        request.filter = self.filter.clone();
        request.sort = self.sort.clone();
        request.limit = self.limit;

        Ok(())
    }
}
