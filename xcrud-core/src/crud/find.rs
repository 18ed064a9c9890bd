//! Find builder and its sort, limit, offset and bind stages.

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::{
    bind::BindingTable,
    collection::CollectionRef,
    error::CrudResult,
    executor::Prepare,
    result::DocResult,
    stage::{BindStage, Bound, CanLimit, CanOffset, ExecuteStage, Limited, LimitStage, Open, OffsetStage, Paged, SortStage},
    state::{FindState, SortSpec, normalize_filter, referenced_params},
    value::ExprValue,
    wire::{CrudKind, CrudRequest},
};

use super::Operation;

/// A find operation at stage `S`.
///
/// `sort` is available while the stage is [`Open`], `limit` until an offset is
/// set, `offset` once a limit is set, and `bind` and `execute` at every stage.
#[derive(Debug)]
pub struct CollectionFind<S> {
    op: Operation<FindState>,
    stage: PhantomData<S>,
}

impl CollectionFind<Open> {
    pub(crate) fn new(target: CollectionRef, filter: Option<String>) -> Self {
        CollectionFind {
            op: Operation::new(target, FindState::new(filter.and_then(normalize_filter))),
            stage: PhantomData,
        }
    }
}

impl<S> CollectionFind<S> {
    fn into_stage<T>(self) -> CollectionFind<T> {
        CollectionFind {
            op: self.op,
            stage: PhantomData,
        }
    }

    pub fn state(&self) -> &FindState {
        &self.op.state
    }

    pub fn bindings(&self) -> &BindingTable {
        self.op.bindings()
    }
}

impl SortStage for CollectionFind<Open> {
    type Next = Self;

    fn sort(mut self, keys: impl SortSpec) -> CrudResult<Self> {
        self.op.ensure_mutable("sort")?;
        let keys = keys.into_sort_keys()?;
        self.op.state.sort.extend(keys);

        Ok(self)
    }
}

impl<S: CanLimit> LimitStage for CollectionFind<S> {
    type Next = CollectionFind<Limited>;

    fn limit(mut self, rows: u64) -> CrudResult<Self::Next> {
        self.op.ensure_mutable("limit")?;
        self.op.state.limit = Some(rows);

        Ok(self.into_stage())
    }
}

impl<S: CanOffset> OffsetStage for CollectionFind<S> {
    type Next = CollectionFind<Paged>;

    fn offset(mut self, rows: u64) -> CrudResult<Self::Next> {
        self.op.ensure_mutable("offset")?;
        self.op.state.offset = Some(rows);

        Ok(self.into_stage())
    }
}

impl<S> BindStage for CollectionFind<S> {
    type Next = CollectionFind<Bound>;

    fn bind(self, name: &str, value: impl Into<ExprValue>) -> CrudResult<Self::Next> {
        let op = self.op.bind(name, value.into())?;

        Ok(CollectionFind { op, stage: PhantomData })
    }
}

#[async_trait]
impl<S: Send> ExecuteStage for CollectionFind<S> {
    async fn execute(&mut self) -> CrudResult<DocResult> {
        self.op.execute().await
    }
}

impl Prepare for FindState {
    const KIND: CrudKind = CrudKind::Find;

    fn referenced_params(&self) -> Vec<String> {
        referenced_params(self.filter.as_deref(), &[])
    }

    fn prepare(&mut self, request: &mut CrudRequest) -> CrudResult<()> {
        request.filter = self.filter.clone();
        request.sort = self.sort.clone();
        request.limit = self.limit;
        request.offset = self.offset;

        Ok(())
    }
}
