//! In-memory session backend.
//!
//! This module provides a backend that decodes every frame it receives and
//! applies the request to BSON documents held in memory behind async-aware
//! read-write locks.

use async_trait::async_trait;
use bson::{Bson, Document};
use log::{debug, trace};
use mea::rwlock::RwLock;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering as AtomicOrdering},
    },
};
use uuid::Uuid;

use xcrud_core::{
    backend::{SessionBackend, SessionBackendBuilder},
    error::{CrudError, CrudResult},
    state::{SortDirection, UpdateStep},
    value::{ExprValue, PathSegment},
    wire::{CrudKind, CrudRequest, Frame, Response},
};

use crate::{
    codes::{DUPLICATE_ID, FORBIDDEN_ID_UPDATE, UNSUPPORTED_EXPRESSION},
    evaluator::{Expr, order},
    update,
};

/// namespace (`schema.collection`) -> documents in insertion order
type StoreMap = HashMap<String, Vec<Document>>;
type Bindings = BTreeMap<String, ExprValue>;

/// Thread-safe in-memory session backend.
///
/// Clones share the same documents, recorded frames and test hooks, so a test
/// can hand one clone to a `Session` and inspect the other.
///
/// # Example
///
/// ```ignore
/// use xcrud_core::session::Session;
/// use xcrud_memory::InMemorySession;
///
/// let memory = InMemorySession::new();
/// let session = Session::new(memory.clone());
///
/// session.schema("shop").collection("items").add(r#"{"a": 1}"#).execute().await?;
/// assert_eq!(memory.documents("shop", "items").await.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct InMemorySession {
    store: Arc<RwLock<StoreMap>>,
    frames: Arc<RwLock<Vec<Frame>>>,
    requests: Arc<RwLock<Vec<CrudRequest>>>,
    failure: Arc<RwLock<Option<CrudError>>>,
    alive: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySession {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            frames: Arc::new(RwLock::new(Vec::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
            alive: Arc::new(AtomicBool::new(true)),
            stalled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a builder for a backend with pre-loaded collections.
    pub fn builder() -> InMemorySessionBuilder {
        InMemorySessionBuilder::default()
    }

    /// Returns the documents of `schema.collection` in insertion order.
    pub async fn documents(&self, schema: &str, collection: &str) -> Vec<Document> {
        self.store
            .read()
            .await
            .get(&format!("{schema}.{collection}"))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every frame received so far, in arrival order.
    pub async fn frames(&self) -> Vec<Frame> {
        self.frames.read().await.clone()
    }

    /// Returns the raw payload of every frame received so far.
    pub async fn payloads(&self) -> Vec<Vec<u8>> {
        self.frames
            .read()
            .await
            .iter()
            .map(|frame| frame.payload.clone())
            .collect()
    }

    /// Returns every decoded request received so far.
    pub async fn requests(&self) -> Vec<CrudRequest> {
        self.requests.read().await.clone()
    }

    /// Makes the next request fail with `err` after it was recorded.
    pub async fn fail_next(&self, err: CrudError) {
        *self.failure.write().await = Some(err);
    }

    /// Marks the backend as able or unable to accept requests.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, AtomicOrdering::SeqCst);
    }

    /// While stalled, recorded requests never receive a response.
    pub fn stall(&self, stalled: bool) {
        self.stalled.store(stalled, AtomicOrdering::SeqCst);
    }

    async fn apply(&self, request: CrudRequest) -> CrudResult<Response> {
        let namespace = request.namespace();

        if request.kind == CrudKind::Find {
            let store = self.store.read().await;
            let documents = store.get(&namespace).map(Vec::as_slice).unwrap_or_default();
            return find(documents, &request);
        }

        let mut store = self.store.write().await;
        let documents = store.entry(namespace).or_default();

        match request.kind {
            CrudKind::Add => add(documents, request.docs),
            CrudKind::Remove => remove(documents, &request),
            CrudKind::Modify => modify(documents, &request),
            CrudKind::Find => find(documents, &request),
        }
    }
}

#[async_trait]
impl SessionBackend for InMemorySession {
    async fn submit(&self, frame: Frame) -> CrudResult<Response> {
        let request = frame
            .request()
            .map_err(|err| CrudError::Transport(format!("malformed frame #{}: {err}", frame.sequence)))?;
        if request.kind != frame.kind {
            return Err(CrudError::Transport(format!(
                "frame #{} announces {} but carries {}",
                frame.sequence, frame.kind, request.kind
            )));
        }

        trace!("frame #{}: {} on {}", frame.sequence, request.kind, request.namespace());
        self.frames.write().await.push(frame);
        self.requests.write().await.push(request.clone());

        if self.stalled.load(AtomicOrdering::SeqCst) {
            debug!("backend stalled, {} on {} will not complete", request.kind, request.namespace());
            futures::future::pending::<()>().await;
        }

        if let Some(err) = self.failure.write().await.take() {
            return Err(err);
        }

        self.apply(request).await
    }

    fn is_alive(&self) -> bool {
        self.alive.load(AtomicOrdering::SeqCst)
    }

    async fn shutdown(self) -> CrudResult<()> {
        self.set_alive(false);
        debug!("in-memory session shut down");

        Ok(())
    }
}

fn add(documents: &mut Vec<Document>, docs: Vec<Document>) -> CrudResult<Response> {
    let mut generated_ids = Vec::new();
    let mut prepared: Vec<Document> = Vec::with_capacity(docs.len());

    for mut doc in docs {
        if !doc.contains_key("_id") {
            let id = Uuid::new_v4().simple().to_string();
            doc.insert("_id", id.clone());
            generated_ids.push(id);
        }

        let id = doc.get("_id").cloned().unwrap_or(Bson::Null);
        if documents
            .iter()
            .chain(prepared.iter())
            .any(|existing| existing.get("_id") == Some(&id))
        {
            return Err(CrudError::server(
                DUPLICATE_ID,
                format!("Document contains a field value that is not unique but required to be: _id {id}"),
            ));
        }

        prepared.push(doc);
    }

    let affected_items = prepared.len() as u64;
    documents.extend(prepared);

    Ok(Response {
        affected_items,
        generated_ids,
        ..Default::default()
    })
}

fn find(documents: &[Document], request: &CrudRequest) -> CrudResult<Response> {
    let documents: Vec<Document> = select(documents, request)?
        .into_iter()
        .map(|index| documents[index].clone())
        .collect();

    Ok(Response {
        affected_items: documents.len() as u64,
        documents,
        ..Default::default()
    })
}

fn remove(documents: &mut Vec<Document>, request: &CrudRequest) -> CrudResult<Response> {
    let mut selected = select(documents, request)?;
    selected.sort_unstable_by(|a, b| b.cmp(a));

    for index in &selected {
        documents.remove(*index);
    }

    Ok(Response {
        affected_items: selected.len() as u64,
        ..Default::default()
    })
}

fn modify(documents: &mut [Document], request: &CrudRequest) -> CrudResult<Response> {
    if let Some(step) = request
        .updates
        .iter()
        .find(|step| matches!(step.path().segments().first(), Some(PathSegment::Member(name)) if name == "_id"))
    {
        return Err(CrudError::server(
            FORBIDDEN_ID_UPDATE,
            format!("Forbidden update operation on '{}' member", step.path()),
        ));
    }

    // Updates are computed on copies so a failing step leaves every document untouched.
    let mut changed = Vec::new();
    for index in select(documents, request)? {
        let mut doc = documents[index].clone();
        for step in &request.updates {
            apply_step(&mut doc, step, &request.bindings)?;
        }
        if doc != documents[index] {
            changed.push((index, doc));
        }
    }

    let affected_items = changed.len() as u64;
    for (index, doc) in changed {
        documents[index] = doc;
    }

    Ok(Response {
        affected_items,
        ..Default::default()
    })
}

fn apply_step(doc: &mut Document, step: &UpdateStep, bindings: &Bindings) -> CrudResult<()> {
    match step {
        UpdateStep::Set { path, value } => {
            let value = resolve(value, doc, bindings)?;
            update::set(doc, path.segments(), value);
        }
        UpdateStep::Unset { path } | UpdateStep::ArrayDelete { path } => update::unset(doc, path.segments()),
        UpdateStep::ArrayInsert { path, value } => {
            let value = resolve(value, doc, bindings)?;
            update::array_insert(doc, path.segments(), value);
        }
        UpdateStep::ArrayAppend { path, value } => {
            let value = resolve(value, doc, bindings)?;
            update::array_append(doc, path.segments(), value);
        }
    }

    Ok(())
}

/// Turns an update value into BSON, looking up parameters and evaluating expressions against `doc`.
fn resolve(value: &ExprValue, doc: &Document, bindings: &Bindings) -> CrudResult<Bson> {
    match value {
        ExprValue::Param(name) => match bindings.get(name) {
            Some(ExprValue::Param(_)) | None => Err(CrudError::server(
                UNSUPPORTED_EXPRESSION,
                format!("unknown parameter :{name}"),
            )),
            Some(bound) => resolve(bound, doc, bindings),
        },
        ExprValue::Expr(text) => Expr::parse(text)?.evaluate(doc, bindings),
        ExprValue::Array(items) => items
            .iter()
            .map(|item| resolve(item, doc, bindings))
            .collect::<CrudResult<Vec<_>>>()
            .map(Bson::Array),
        literal => literal
            .to_bson()
            .ok_or_else(|| CrudError::server(UNSUPPORTED_EXPRESSION, "value has no literal form")),
    }
}

/// Indices of the documents a request applies to, after filter, sort, offset and limit.
fn select(documents: &[Document], request: &CrudRequest) -> CrudResult<Vec<usize>> {
    let filter = request
        .filter
        .as_deref()
        .map(Expr::parse)
        .transpose()?;

    let mut matched = Vec::new();
    for (index, doc) in documents.iter().enumerate() {
        let keep = match &filter {
            Some(filter) => filter.matches(doc, &request.bindings)?,
            None => true,
        };
        if keep {
            matched.push(index);
        }
    }

    if !request.sort.is_empty() {
        let keys = request
            .sort
            .iter()
            .map(|key| Ok((Expr::parse(&key.expr)?, key.direction)))
            .collect::<CrudResult<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(matched.len());
        for index in matched {
            let values = keys
                .iter()
                .map(|(expr, _)| expr.evaluate(&documents[index], &request.bindings))
                .collect::<CrudResult<Vec<_>>>()?;
            rows.push((index, values));
        }

        rows.sort_by(|(_, left), (_, right)| {
            keys.iter()
                .zip(left.iter().zip(right))
                .map(|((_, direction), (left, right))| match direction {
                    SortDirection::Asc => order(left, right),
                    SortDirection::Desc => order(right, left),
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        matched = rows.into_iter().map(|(index, _)| index).collect();
    }

    let offset = request.offset.map_or(0, |offset| usize::try_from(offset).unwrap_or(usize::MAX));
    let limit = request.limit.map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

    Ok(matched.into_iter().skip(offset).take(limit).collect())
}

/// Builder for [`InMemorySession`] instances.
///
/// # Example
///
/// ```ignore
/// use xcrud_core::backend::SessionBackendBuilder;
/// use xcrud_memory::InMemorySession;
///
/// let memory = InMemorySession::builder()
///     .seed("shop", "items", vec![doc! { "_id": "1", "name": "lamp" }])
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemorySessionBuilder {
    seeds: Vec<(String, Vec<Document>)>,
}

impl InMemorySessionBuilder {
    /// Pre-loads documents into `schema.collection`.
    pub fn seed(mut self, schema: &str, collection: &str, docs: impl IntoIterator<Item = Document>) -> Self {
        self.seeds
            .push((format!("{schema}.{collection}"), docs.into_iter().collect()));
        self
    }
}

#[async_trait]
impl SessionBackendBuilder for InMemorySessionBuilder {
    type Backend = InMemorySession;

    async fn build(self) -> CrudResult<Self::Backend> {
        let session = InMemorySession::new();
        {
            let mut store = session.store.write().await;
            for (namespace, docs) in self.seeds {
                store.entry(namespace).or_default().extend(docs);
            }
        }

        Ok(session)
    }
}
