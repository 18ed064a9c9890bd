//! Session backend abstraction.
//!
//! This module defines the traits a transport has to implement so that the
//! builders can submit requests through it.
//!
//! # Traits
//!
//! - [`SessionBackend`]: The core trait for backends
//! - [`DynSessionBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`SessionBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use xcrud_core::{backend::SessionBackend, wire::{self, CrudKind, CrudRequest, Frame}};
//!
//! let backend = MyBackendImpl::new();
//!
//! let request = CrudRequest::new(CrudKind::Find, "shop", "items");
//! let frame = Frame { sequence: 0, kind: CrudKind::Find, payload: wire::encode(&request)? };
//! let response = backend.submit(frame).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use std::{any::Any, fmt::Debug};

use crate::{
    error::CrudResult,
    wire::{Frame, Response},
};

/// Abstract interface for the transport underneath a session.
///
/// Implementers receive encoded requests and answer with a [`Response`] or a
/// [`CrudError`](crate::error::CrudError). Transport failures should be
/// reported as `Transport` and server reported failures as `Server`, so the
/// executor can hand them to the caller unchanged.
///
/// # Thread Safety
///
/// A session may be shared by many builders, so implementations must be
/// `Send + Sync` and do their own synchronization.
///
/// # Ordering
///
/// Frames carry a sequence number that increases in the order the session
/// submitted them. Backends must deliver them to the server in that order.
#[async_trait]
pub trait SessionBackend: Send + Sync + Debug {
    /// Sends one encoded request and waits for its response.
    ///
    /// # Arguments
    ///
    /// * `frame` - The encoded request together with its kind and sequence number
    ///
    /// # Returns
    ///
    /// Returns the server's [`Response`], or a [`CrudError`](crate::error::CrudError) on failure.
    async fn submit(&self, frame: Frame) -> CrudResult<Response>;

    /// Returns `true` while the backend is able to accept requests.
    fn is_alive(&self) -> bool;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> CrudResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> SessionBackend for &B
where
    B: SessionBackend,
{
    async fn submit(&self, frame: Frame) -> CrudResult<Response> {
        SessionBackend::submit(*self, frame).await
    }

    fn is_alive(&self) -> bool {
        SessionBackend::is_alive(*self)
    }
}

#[async_trait]
pub trait DynSessionBackend: Send + Sync + Debug {
    async fn submit(&self, frame: Frame) -> CrudResult<Response>;
    fn is_alive(&self) -> bool;
    async fn shutdown_boxed(self: Box<Self>) -> CrudResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: SessionBackend + 'static> DynSessionBackend for B {
    async fn submit(&self, frame: Frame) -> CrudResult<Response> {
        SessionBackend::submit(self, frame).await
    }

    fn is_alive(&self) -> bool {
        SessionBackend::is_alive(self)
    }

    async fn shutdown_boxed(self: Box<Self>) -> CrudResult<()> {
        self.shutdown().await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[async_trait]
pub trait SessionBackendBuilder {
    type Backend: SessionBackend;

    async fn build(self) -> CrudResult<Self::Backend>;
}
