//! Modify builder: update steps plus sort, limit and bind stages.

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::{
    bind::BindingTable,
    collection::CollectionRef,
    error::{CrudError, CrudResult},
    executor::Prepare,
    result::DocResult,
    stage::{BindStage, Bound, CanLimit, ExecuteStage, Limited, LimitStage, Open, SortStage},
    state::{ModifyState, SortSpec, UpdateStep, normalize_filter, referenced_params},
    value::{ExprValue, Field, PathSegment},
    wire::{CrudKind, CrudRequest},
};

use super::Operation;

/// A modify operation at stage `S`.
///
/// Update steps can be declared at any stage and are sent in declaration order,
/// ahead of sort and limit. Sort, limit and bind follow the same stages as a remove.
///
/// # Example
///
/// ```ignore
/// items.modify("name = :name")
///     .set("price", 25)?
///     .unset("discount")?
///     .array_append("tags", "sale")?
///     .bind("name", "lamp")?
///     .execute()
///     .await?;
/// ```
#[derive(Debug)]
pub struct CollectionModify<S> {
    op: Operation<ModifyState>,
    stage: PhantomData<S>,
}

impl CollectionModify<Open> {
    pub(crate) fn new(target: CollectionRef, filter: String) -> Self {
        CollectionModify {
            op: Operation::new(target, ModifyState::new(filter)),
            stage: PhantomData,
        }
    }
}

impl<S> CollectionModify<S> {
    pub fn state(&self) -> &ModifyState {
        &self.op.state
    }

    pub fn bindings(&self) -> &BindingTable {
        self.op.bindings()
    }

    /// Sets the value at `path`, creating the member if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed or wildcard path and
    /// `StageMisuse` if the operation already executed.
    pub fn set(self, path: &str, value: impl Into<ExprValue>) -> CrudResult<Self> {
        let path = update_path(path)?;
        self.push(UpdateStep::Set { path, value: value.into() })
    }

    /// Removes the member at `path`.
    pub fn unset(self, path: &str) -> CrudResult<Self> {
        let path = update_path(path)?;
        self.push(UpdateStep::Unset { path })
    }

    /// Inserts `value` into an array before the element `path` points to.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `path` ends with an array subscript such as `tags[1]`.
    pub fn array_insert(self, path: &str, value: impl Into<ExprValue>) -> CrudResult<Self> {
        let path = element_path(path)?;
        self.push(UpdateStep::ArrayInsert { path, value: value.into() })
    }

    /// Appends `value` to the array at `path`.
    pub fn array_append(self, path: &str, value: impl Into<ExprValue>) -> CrudResult<Self> {
        let path = update_path(path)?;
        self.push(UpdateStep::ArrayAppend { path, value: value.into() })
    }

    /// Deletes the array element `path` points to.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `path` ends with an array subscript.
    pub fn array_delete(self, path: &str) -> CrudResult<Self> {
        let path = element_path(path)?;
        self.push(UpdateStep::ArrayDelete { path })
    }

    fn push(mut self, step: UpdateStep) -> CrudResult<Self> {
        self.op.ensure_mutable(step_name(&step))?;
        if let Some(value) = step.value() {
            value.validate_params()?;
        }
        self.op.state.updates.push(step);

        Ok(self)
    }
}

fn step_name(step: &UpdateStep) -> &'static str {
    match step {
        UpdateStep::Set { .. } => "set",
        UpdateStep::Unset { .. } => "unset",
        UpdateStep::ArrayInsert { .. } => "array_insert",
        UpdateStep::ArrayAppend { .. } => "array_append",
        UpdateStep::ArrayDelete { .. } => "array_delete",
    }
}

fn update_path(path: &str) -> CrudResult<Field> {
    let field = Field::parse(path)?;
    if field.has_wildcard() {
        return Err(CrudError::InvalidArgument(format!(
            "update path {field} must not contain wildcards"
        )));
    }

    Ok(field)
}

fn element_path(path: &str) -> CrudResult<Field> {
    let field = update_path(path)?;
    match field.segments().last() {
        Some(PathSegment::Index(_)) => Ok(field),
        _ => Err(CrudError::InvalidArgument(format!(
            "path {field} does not point to an array element"
        ))),
    }
}

impl SortStage for CollectionModify<Open> {
    type Next = Self;

    fn sort(mut self, keys: impl SortSpec) -> CrudResult<Self> {
        self.op.ensure_mutable("sort")?;
        let keys = keys.into_sort_keys()?;
        self.op.state.sort.extend(keys);

        Ok(self)
    }
}

impl<S: CanLimit> LimitStage for CollectionModify<S> {
    type Next = CollectionModify<Limited>;

    fn limit(mut self, rows: u64) -> CrudResult<Self::Next> {
        self.op.ensure_mutable("limit")?;
        self.op.state.limit = Some(rows);

        Ok(CollectionModify { op: self.op, stage: PhantomData })
    }
}

impl<S> BindStage for CollectionModify<S> {
    type Next = CollectionModify<Bound>;

    fn bind(self, name: &str, value: impl Into<ExprValue>) -> CrudResult<Self::Next> {
        let op = self.op.bind(name, value.into())?;

        Ok(CollectionModify { op, stage: PhantomData })
    }
}

#[async_trait]
impl<S: Send> ExecuteStage for CollectionModify<S> {
    async fn execute(&mut self) -> CrudResult<DocResult> {
        self.op.execute().await
    }
}

impl Prepare for ModifyState {
    const KIND: CrudKind = CrudKind::Modify;

    fn referenced_params(&self) -> Vec<String> {
        referenced_params(Some(self.filter.as_str()), &self.updates)
    }

    fn prepare(&mut self, request: &mut CrudRequest) -> CrudResult<()> {
        if self.updates.is_empty() {
            return Err(CrudError::InvalidArgument("modify operation has no update steps".into()));
        }

        request.filter = normalize_filter(self.filter.as_str());
        request.updates = self.updates.clone();
        request.sort = self.sort.clone();
        request.limit = self.limit;

        Ok(())
    }
}
