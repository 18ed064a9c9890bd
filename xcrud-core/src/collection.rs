//! Collection handles and the builder entry points.
//!
//! A [`Collection`] names one `schema.collection` pair within a session and
//! starts CRUD builders. Builders keep a weak reference back to the collection,
//! so they never keep a collection or its session alive on their own.
//!
//! # Example
//!
//! ```ignore
//! let items = session.schema("shop").collection("items");
//!
//! items.add(r#"{"name": "lamp", "price": 30}"#)
//!     .add(r#"{"name": "desk", "price": 120}"#)?
//!     .execute()
//!     .await?;
//!
//! let mut cheap = items.find("price < :max")
//!     .sort("price DESC")?
//!     .limit(10)?
//!     .bind("max", 100)?
//!     .execute()
//!     .await?;
//! ```

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    crud::{CollectionAdd, CollectionAddBase, CollectionFind, CollectionModify, CollectionRemove},
    error::{CrudError, CrudResult},
    session::SessionShared,
    stage::Open,
    value::DocSource,
};

pub(crate) struct CollectionInner {
    schema: String,
    name: String,
    session: Weak<SessionShared>,
}

impl fmt::Debug for CollectionInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionInner")
            .field("schema", &self.schema)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A document collection within a schema.
///
/// Cloning a collection is cheap; clones share one identity, and builders stay
/// usable as long as at least one clone is alive.
#[derive(Debug, Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Collection {
    pub(crate) fn new(schema: String, name: String, session: Weak<SessionShared>) -> Self {
        Collection {
            inner: Arc::new(CollectionInner { schema, name, session }),
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the name of the schema this collection belongs to.
    pub fn schema_name(&self) -> &str {
        &self.inner.schema
    }

    fn target(&self) -> CollectionRef {
        CollectionRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Starts an add operation without any documents.
    ///
    /// The returned builder can only receive documents. It becomes executable
    /// once the first document is added.
    pub fn add_op(&self) -> CollectionAddBase {
        CollectionAddBase::new(self.target())
    }

    /// Starts an add operation with one document.
    ///
    /// The document is either JSON text or a BSON document; JSON is decoded
    /// when the operation executes.
    pub fn add(&self, doc: impl Into<DocSource>) -> CollectionAdd {
        self.add_op().add(doc)
    }

    /// Starts an add operation with any number of documents, kept in iteration order.
    ///
    /// An empty iterator yields a builder whose `execute` fails with `EmptyBatch`.
    pub fn add_all<I, D>(&self, docs: I) -> CollectionAdd
    where
        I: IntoIterator<Item = D>,
        D: Into<DocSource>,
    {
        self.add_op().add_all(docs)
    }

    /// Starts a find operation matching every document.
    pub fn find_all(&self) -> CollectionFind<Open> {
        CollectionFind::new(self.target(), None)
    }

    /// Starts a find operation matching documents for which `filter` holds.
    ///
    /// The filter text is forwarded verbatim. Blank text matches every document.
    pub fn find(&self, filter: impl Into<String>) -> CollectionFind<Open> {
        CollectionFind::new(self.target(), Some(filter.into()))
    }

    /// Starts a remove operation matching every document.
    pub fn remove_all(&self) -> CollectionRemove<Open> {
        CollectionRemove::new(self.target(), None)
    }

    /// Starts a remove operation matching documents for which `filter` holds.
    pub fn remove(&self, filter: impl Into<String>) -> CollectionRemove<Open> {
        CollectionRemove::new(self.target(), Some(filter.into()))
    }

    /// Starts a modify operation matching every document.
    pub fn modify_all(&self) -> CollectionModify<Open> {
        CollectionModify::new(self.target(), String::new())
    }

    /// Starts a modify operation matching documents for which `filter` holds.
    pub fn modify(&self, filter: impl Into<String>) -> CollectionModify<Open> {
        CollectionModify::new(self.target(), filter.into())
    }
}

/// Weak back-reference from a builder to its collection.
#[derive(Debug, Clone)]
pub(crate) struct CollectionRef {
    inner: Weak<CollectionInner>,
}

/// A live collection together with its open session.
pub(crate) struct Target {
    pub(crate) schema: String,
    pub(crate) collection: String,
    pub(crate) session: Arc<SessionShared>,
}

impl CollectionRef {
    /// Upgrades the back-reference for one execute.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::CollectionGone`] if the collection or its session
    /// was dropped, or the session was closed.
    pub(crate) fn resolve(&self) -> CrudResult<Target> {
        let inner = self
            .inner
            .upgrade()
            .ok_or_else(|| CrudError::CollectionGone("collection was dropped".into()))?;
        let session = inner
            .session
            .upgrade()
            .ok_or_else(|| CrudError::CollectionGone(format!("session of {}.{} was dropped", inner.schema, inner.name)))?;

        if session.is_closed() {
            return Err(CrudError::CollectionGone(format!(
                "session of {}.{} is closed",
                inner.schema, inner.name
            )));
        }

        Ok(Target {
            schema: inner.schema.clone(),
            collection: inner.name.clone(),
            session,
        })
    }
}
