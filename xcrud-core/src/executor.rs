//! Turns a finished operation state into one round-trip through the session.
//!
//! Everything that can be checked locally is checked before the request is
//! handed to the backend, so a failing execute either never touched the wire
//! or failed with `Transport`, `Server` or `Cancelled`.

use futures::future::{AbortHandle, Abortable, Aborted};
use log::{debug, trace, warn};

use crate::{
    bind::BindingTable,
    collection::CollectionRef,
    config::SessionConfig,
    error::{CrudError, CrudResult},
    result::DocResult,
    session::SessionShared,
    wire::{self, CrudKind, CrudRequest, Frame, Response},
};

/// Commits an operation state into a request.
pub(crate) trait Prepare {
    const KIND: CrudKind;

    /// Names of the parameters the state refers to, in order of appearance.
    fn referenced_params(&self) -> Vec<String>;

    /// Validates the state and writes it into `request`.
    ///
    /// A failing call leaves the state untouched.
    fn prepare(&mut self, request: &mut CrudRequest) -> CrudResult<()>;

    /// Takes back whatever `prepare` moved out of the state, after a failed submit.
    fn restore(&mut self, _request: CrudRequest) {}
}

/// Executes `state` against `target` with the given bindings.
pub(crate) async fn run<S: Prepare + Send>(
    target: &CollectionRef,
    state: &mut S,
    bindings: &BindingTable,
) -> CrudResult<DocResult> {
    let target = target.resolve()?;

    let referenced = state.referenced_params();
    bindings.resolve(referenced.iter().map(String::as_str))?;

    let mut request = CrudRequest::new(S::KIND, target.schema, target.collection);
    request.bindings = bindings.to_map();
    state.prepare(&mut request)?;

    let outcome = match check_request(&request, &target.session.config) {
        Ok(()) => dispatch(&target.session, &request).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(response) => Ok(DocResult::new(S::KIND, response)),
        Err(err) => {
            debug!("{} on {} failed: {err}", request.kind, request.namespace());
            state.restore(request);
            Err(err)
        }
    }
}

/// Range checks the server would otherwise reject after a round-trip.
fn check_request(request: &CrudRequest, config: &SessionConfig) -> CrudResult<()> {
    for (name, value) in [("limit", request.limit), ("offset", request.offset)] {
        if let Some(value) = value {
            if i64::try_from(value).is_err() {
                return Err(CrudError::InvalidArgument(format!("{name} {value} is out of range")));
            }
        }
    }

    let largest = request
        .bindings
        .values()
        .chain(request.updates.iter().filter_map(|step| step.value()))
        .map(|value| value.max_octets())
        .max()
        .unwrap_or(0);
    if largest > config.max_allowed_packet {
        return Err(CrudError::InvalidArgument(format!(
            "octet value of {largest} bytes exceeds max_allowed_packet ({})",
            config.max_allowed_packet
        )));
    }

    Ok(())
}

/// Encodes `request`, submits it and waits for the response or for the session to close.
async fn dispatch(session: &SessionShared, request: &CrudRequest) -> CrudResult<Response> {
    let payload = wire::encode(request)?;
    if payload.len() > session.config.max_allowed_packet {
        return Err(CrudError::InvalidArgument(format!(
            "encoded request of {} bytes exceeds max_allowed_packet ({})",
            payload.len(),
            session.config.max_allowed_packet
        )));
    }

    if !session.backend.is_alive() {
        return Err(CrudError::Transport("session backend is not alive".into()));
    }

    let frame = Frame {
        sequence: session.next_sequence(),
        kind: request.kind,
        payload,
    };
    let sequence = frame.sequence;

    let (handle, registration) = AbortHandle::new_pair();
    let ticket = session.register(handle).await;

    // close() may have drained the registry before this execute registered.
    if session.is_closed() {
        session.unregister(ticket).await;
        return Err(CrudError::Cancelled);
    }

    debug!(
        "submitting {} #{sequence} to {} ({} bytes)",
        request.kind,
        request.namespace(),
        frame.payload.len()
    );

    let outcome = Abortable::new(session.backend.submit(frame), registration).await;
    session.unregister(ticket).await;

    match outcome {
        Ok(Ok(response)) => {
            trace!("{} #{sequence} affected {} item(s)", request.kind, response.affected_items);
            Ok(response)
        }
        Ok(Err(err)) => Err(err),
        Err(Aborted) => {
            warn!("{} #{sequence} on {} cancelled", request.kind, request.namespace());
            Err(CrudError::Cancelled)
        }
    }
}
