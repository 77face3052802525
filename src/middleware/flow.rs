//! Per-invocation chain state.

use http::StatusCode;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context::Context;
use crate::format::{Format, FORMAT_HEADER};
use crate::request::Request;
use crate::response::Response;

/// Everything one request carries through its chain.
///
/// A `Flow` is created per dispatch and owned by that dispatch alone: the
/// halt flag, the response slot, and the request context are never visible
/// to any other request.
#[derive(Debug)]
pub struct Flow {
    request: Request,
    response: Option<Response>,
    halted: bool,
    writes: usize,
    cancel: Option<CancellationToken>,
}

impl Flow {
    /// Starts a flow for `request`, reading the format choice from the
    /// default `X-API-FORMAT` header.
    pub fn new(request: Request) -> Self {
        Self::with_format_header(request, FORMAT_HEADER)
    }

    /// Starts a flow that reads the format choice from `header`. The choice
    /// is stored on the request, so handlers see it too.
    pub fn with_format_header(mut request: Request, header: &str) -> Self {
        let format = Format::from_request(&request, header);
        request.set_format(format);
        Self {
            request,
            response: None,
            halted: false,
            writes: 0,
            cancel: None,
        }
    }

    /// Lets the host abandon this flow between stages.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn context(&self) -> &Context { self.request.context() }
    pub fn context_mut(&mut self) -> &mut Context { self.request.context_mut() }
    pub fn format(&self) -> Format { self.request.format() }

    /// Stops the chain after the current stage returns. Idempotent.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool { self.halted }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Sets the response to `status` with `payload` encoded in the caller's
    /// format.
    pub fn respond<T: Serialize + ?Sized>(&mut self, status: StatusCode, payload: &T) {
        let res = self.request.respond(status, payload);
        self.set_response(res);
    }

    /// Sets a bodiless response.
    pub fn respond_empty(&mut self, status: StatusCode) {
        self.set_response(Response::status(status));
    }

    /// Sets an already-built response. Only the first write in a flow takes
    /// effect; later writes are dropped and logged.
    pub fn set_response(&mut self, res: Response) {
        self.writes += 1;
        if let Some(existing) = &self.response {
            warn!(
                kept = %existing.status_code(),
                dropped = %res.status_code(),
                path = %self.request.path(),
                "response already set for this request, ignoring",
            );
            return;
        }
        self.response = Some(res);
    }

    pub fn response(&self) -> Option<&Response> { self.response.as_ref() }

    /// Number of times a response was set, including ignored writes.
    pub fn response_writes(&self) -> usize { self.writes }

    pub(crate) fn into_parts(self) -> (Request, Option<Response>) {
        (self.request, self.response)
    }
}
