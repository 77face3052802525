//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;

use crate::context::Context;
use crate::format::{Format, FORMAT_HEADER};
use crate::response::Response;

/// An incoming HTTP request, with its body fully collected and its
/// per-request [`Context`] attached.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    context: Context,
    format: Format,
}

impl Request {
    /// Wraps a buffered `http::Request`. The context starts empty and the
    /// format is read from the default `X-API-FORMAT` header.
    pub fn new(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let mut req = Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers: parts.headers,
            body,
            params: HashMap::new(),
            context: Context::new(),
            format: Format::Json,
        };
        req.format = Format::from_request(&req, FORMAT_HEADER);
        req
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/revisions/{id}`, `req.param("id")` on `/revisions/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Facts written by earlier stages of the chain (login state, user).
    pub fn context(&self) -> &Context { &self.context }

    pub fn context_mut(&mut self) -> &mut Context { &mut self.context }

    /// The body format the caller asked for.
    pub fn format(&self) -> Format { self.format }

    pub(crate) fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    /// Builds a response with `payload` encoded in the caller's format.
    ///
    /// ```rust
    /// use apigate::Request;
    /// use bytes::Bytes;
    /// use http::StatusCode;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// #[serde(rename = "revision")]
    /// struct Revision { id: u32 }
    ///
    /// let req = Request::new(
    ///     http::Request::builder().header("X-API-FORMAT", "xml").body(Bytes::new()).unwrap(),
    /// );
    /// let res = req.respond(StatusCode::OK, &Revision { id: 7 });
    /// assert_eq!(res.body(), b"<revision><id>7</id></revision>");
    /// ```
    pub fn respond<T: Serialize + ?Sized>(&self, status: StatusCode, payload: &T) -> Response {
        self.format.render(status, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(
            http::Request::builder()
                .uri("/revisions/7?full=1")
                .header("X-API-KEY", "abc")
                .body(Bytes::new())
                .unwrap(),
        );
        assert_eq!(req.header("x-api-key"), Some("abc"));
        assert_eq!(req.path(), "/revisions/7");
        assert_eq!(req.param("id"), None);
        assert!(req.context().is_empty());
        assert_eq!(req.format(), Format::Json);
    }

    #[test]
    fn respond_follows_the_requested_format() {
        let req = Request::new(
            http::Request::builder()
                .header(FORMAT_HEADER, "xml")
                .body(Bytes::new())
                .unwrap(),
        );
        let res = req.respond(StatusCode::CREATED, &crate::format::ErrorBody::new("x"));
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.header("content-type"), Some("application/xml"));
        assert_eq!(res.body(), b"<error><reason>x</reason></error>");
    }
}
