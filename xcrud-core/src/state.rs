//! Accumulated parameters of one CRUD call.
//!
//! There is one state type per operation kind. A state is owned by exactly one
//! builder, moved through every chained call and committed to a
//! [`CrudRequest`](crate::wire::CrudRequest) when the builder executes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    bind::placeholders,
    error::{CrudError, CrudResult},
    value::{DocSource, ExprValue, Field},
};

/// Sort direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// One sort key: an expression and a direction.
///
/// Parsed from text such as `"name"`, `"name ASC"` or `"price desc"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// The expression to sort by.
    pub expr: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Parses `"<expr> [ASC|DESC]"`.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] if the text is empty or blank.
    pub fn parse(text: &str) -> CrudResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CrudError::InvalidArgument("sort key is empty".into()));
        }

        let (expr, direction) = match text.rsplit_once(char::is_whitespace) {
            Some((head, tail)) if tail.eq_ignore_ascii_case("asc") => (head.trim_end(), SortDirection::Asc),
            Some((head, tail)) if tail.eq_ignore_ascii_case("desc") => (head.trim_end(), SortDirection::Desc),
            _ => (text, SortDirection::Asc),
        };

        Ok(SortKey { expr: expr.to_string(), direction })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{} ASC", self.expr),
            SortDirection::Desc => write!(f, "{} DESC", self.expr),
        }
    }
}

/// Sort keys accepted by `sort`: a single key, an array, a slice or a vector of keys.
///
/// Every element becomes its own sort key, in declaration order.
pub trait SortSpec {
    /// Parses every key.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] for the first key that fails to parse.
    fn into_sort_keys(self) -> CrudResult<Vec<SortKey>>;
}

impl SortSpec for &str {
    fn into_sort_keys(self) -> CrudResult<Vec<SortKey>> {
        Ok(vec![SortKey::parse(self)?])
    }
}

impl SortSpec for String {
    fn into_sort_keys(self) -> CrudResult<Vec<SortKey>> {
        Ok(vec![SortKey::parse(&self)?])
    }
}

impl SortSpec for SortKey {
    fn into_sort_keys(self) -> CrudResult<Vec<SortKey>> {
        Ok(vec![self])
    }
}

impl<S: AsRef<str>, const N: usize> SortSpec for [S; N] {
    fn into_sort_keys(self) -> CrudResult<Vec<SortKey>> {
        self.iter()
            .map(|key| SortKey::parse(key.as_ref()))
            .collect()
    }
}

impl<S: AsRef<str>> SortSpec for &[S] {
    fn into_sort_keys(self) -> CrudResult<Vec<SortKey>> {
        self.iter()
            .map(|key| SortKey::parse(key.as_ref()))
            .collect()
    }
}

impl<S: AsRef<str>> SortSpec for Vec<S> {
    fn into_sort_keys(self) -> CrudResult<Vec<SortKey>> {
        self.iter()
            .map(|key| SortKey::parse(key.as_ref()))
            .collect()
    }
}

/// One mutation primitive of a modify operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateStep {
    Set { path: Field, value: ExprValue },
    Unset { path: Field },
    ArrayInsert { path: Field, value: ExprValue },
    ArrayAppend { path: Field, value: ExprValue },
    ArrayDelete { path: Field },
}

impl UpdateStep {
    pub fn path(&self) -> &Field {
        match self {
            UpdateStep::Set { path, .. }
            | UpdateStep::Unset { path }
            | UpdateStep::ArrayInsert { path, .. }
            | UpdateStep::ArrayAppend { path, .. }
            | UpdateStep::ArrayDelete { path } => path,
        }
    }

    pub fn value(&self) -> Option<&ExprValue> {
        match self {
            UpdateStep::Set { value, .. }
            | UpdateStep::ArrayInsert { value, .. }
            | UpdateStep::ArrayAppend { value, .. } => Some(value),
            UpdateStep::Unset { .. } | UpdateStep::ArrayDelete { .. } => None,
        }
    }
}

/// Documents waiting to be inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddState {
    pub(crate) docs: Vec<DocSource>,
}

impl AddState {
    pub fn docs(&self) -> &[DocSource] {
        &self.docs
    }
}

/// Parameters of a find operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindState {
    pub(crate) filter: Option<String>,
    pub(crate) sort: Vec<SortKey>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
}

impl FindState {
    pub(crate) fn new(filter: Option<String>) -> Self {
        FindState { filter, ..Default::default() }
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}

/// Parameters of a remove operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoveState {
    pub(crate) filter: Option<String>,
    pub(crate) sort: Vec<SortKey>,
    pub(crate) limit: Option<u64>,
}

impl RemoveState {
    pub(crate) fn new(filter: Option<String>) -> Self {
        RemoveState { filter, ..Default::default() }
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

/// Parameters of a modify operation. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifyState {
    pub(crate) filter: String,
    pub(crate) updates: Vec<UpdateStep>,
    pub(crate) sort: Vec<SortKey>,
    pub(crate) limit: Option<u64>,
}

impl ModifyState {
    pub(crate) fn new(filter: String) -> Self {
        ModifyState { filter, ..Default::default() }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn updates(&self) -> &[UpdateStep] {
        &self.updates
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

/// Normalizes user supplied filter text. Blank text matches every document.
pub(crate) fn normalize_filter(expr: impl Into<String>) -> Option<String> {
    let expr = expr.into();
    if expr.trim().is_empty() {
        None
    } else {
        Some(expr)
    }
}

/// Parameters referenced by a filter followed by those referenced by update values.
pub(crate) fn referenced_params<'a>(
    filter: Option<&str>,
    updates: impl IntoIterator<Item = &'a UpdateStep>,
) -> Vec<String> {
    let mut names = filter.map(placeholders).unwrap_or_default();

    for name in updates
        .into_iter()
        .filter_map(UpdateStep::value)
        .flat_map(ExprValue::params)
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    names
}
