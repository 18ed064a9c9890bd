//! Sessions and schemas.
//!
//! A [`Session`] owns a backend and hands out [`Schema`]s, which in turn hand
//! out [`Collection`]s. Collections only keep a weak reference to the session,
//! and builders only keep a weak reference to their collection, so dropping
//! either one makes pending builders fail with `CollectionGone`.
//!
//! # Example
//!
//! ```ignore
//! use xcrud_core::session::Session;
//!
//! let session = Session::builder(backend).default_schema("shop").build()?;
//! let items = session.default_schema()?.collection("items");
//!
//! items.add("{\"name\": \"lamp\"}").execute().await?;
//! session.close().await;
//! ```

use futures::future::AbortHandle;
use log::{debug, info, warn};
use mea::mutex::Mutex;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use crate::{
    backend::{DynSessionBackend, SessionBackend},
    collection::Collection,
    config::SessionConfig,
    error::{CrudError, CrudResult},
};

/// State shared between a session and the builders executing through it.
pub(crate) struct SessionShared {
    pub(crate) backend: Box<dyn DynSessionBackend>,
    pub(crate) config: SessionConfig,
    sequence: AtomicU64,
    next_ticket: AtomicU64,
    in_flight: Mutex<HashMap<u64, AbortHandle>>,
    closed: AtomicBool,
}

impl SessionShared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the next frame sequence number.
    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Tracks an in-flight execute so that closing the session can abort it.
    pub(crate) async fn register(&self, handle: AbortHandle) -> u64 {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        self.in_flight
            .lock()
            .await
            .insert(ticket, handle);

        ticket
    }

    pub(crate) async fn unregister(&self, ticket: u64) {
        self.in_flight
            .lock()
            .await
            .remove(&ticket);
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let aborted: Vec<AbortHandle> = self.in_flight
            .lock()
            .await
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        if !aborted.is_empty() {
            warn!("closing session with {} operation(s) in flight", aborted.len());
        }

        for handle in aborted {
            handle.abort();
        }
    }
}

impl fmt::Debug for SessionShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionShared")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .field("sequence", &self.sequence)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// A connection to a document store.
///
/// The session is the only strong owner of its backend. Schemas, collections
/// and builders derived from it refer back to it weakly.
#[derive(Debug)]
pub struct Session {
    shared: Arc<SessionShared>,
}

impl Session {
    /// Creates a session over `backend` with the default configuration.
    pub fn new<B: SessionBackend + 'static>(backend: B) -> Self {
        Self::from_parts(Box::new(backend), SessionConfig::default())
    }

    /// Creates a builder for a session with custom settings.
    pub fn builder<B: SessionBackend + 'static>(backend: B) -> SessionBuilder {
        SessionBuilder {
            backend: Box::new(backend),
            config: SessionConfig::default(),
        }
    }

    fn from_parts(backend: Box<dyn DynSessionBackend>, config: SessionConfig) -> Self {
        Session {
            shared: Arc::new(SessionShared {
                backend,
                config,
                sequence: AtomicU64::new(0),
                next_ticket: AtomicU64::new(0),
                in_flight: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Returns a handle to the named schema.
    pub fn schema(&self, name: &str) -> Schema {
        Schema {
            name: name.to_string(),
            session: Arc::downgrade(&self.shared),
        }
    }

    /// Returns the schema named by [`SessionConfig::default_schema`].
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] if no default schema is configured.
    pub fn default_schema(&self) -> CrudResult<Schema> {
        self.shared
            .config
            .default_schema
            .as_deref()
            .map(|name| self.schema(name))
            .ok_or_else(|| CrudError::InvalidArgument("no default schema configured".into()))
    }

    /// Returns the backend if it is of type `B`.
    pub fn backend<B: SessionBackend + 'static>(&self) -> Option<&B> {
        self.shared
            .backend
            .as_any()
            .downcast_ref::<B>()
    }

    /// Returns `true` if the session has not been closed and its backend is alive.
    pub fn is_open(&self) -> bool {
        !self.shared.is_closed() && self.shared.backend.is_alive()
    }

    /// Closes the session.
    ///
    /// Executes that are waiting for a response fail with `Cancelled`; executes
    /// started afterwards fail with `CollectionGone`. Closing twice is a no-op.
    pub async fn close(&self) {
        self.shared.close().await;
        info!("session closed");
    }

    /// Closes the session and shuts its backend down.
    pub async fn shutdown(self) -> CrudResult<()> {
        self.shared.close().await;

        match Arc::try_unwrap(self.shared) {
            Ok(shared) => shared.backend.shutdown_boxed().await,
            Err(_) => {
                // An execute still holds the session; it fails as cancelled and
                // the backend is dropped when it finishes.
                debug!("session still referenced at shutdown, backend dropped later");
                Ok(())
            }
        }
    }
}

/// Fluent construction of a [`Session`].
#[derive(Debug)]
pub struct SessionBuilder {
    backend: Box<dyn DynSessionBackend>,
    config: SessionConfig,
}

impl SessionBuilder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn default_schema(mut self, name: impl Into<String>) -> Self {
        self.config.default_schema = Some(name.into());
        self
    }

    pub fn max_allowed_packet(mut self, bytes: usize) -> Self {
        self.config.max_allowed_packet = bytes;
        self
    }

    /// Builds the session.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] if the configuration is invalid.
    pub fn build(self) -> CrudResult<Session> {
        self.config.validate()?;

        Ok(Session::from_parts(self.backend, self.config))
    }
}

/// A named schema within a session.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    session: Weak<SessionShared>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle to the named collection of this schema.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.name.clone(), name.to_string(), self.session.clone())
    }
}
