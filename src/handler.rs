//! Terminal handlers and their stage adapter.
//!
//! # From `async fn` to chain stage
//!
//! Business handlers are plain async functions. They do not see the chain;
//! they get the request (with the context earlier stages filled in) and
//! return something that converts into a [`Response`]:
//!
//! ```text
//! async fn get_rev(req: Request) -> Response { … }   ← user writes this
//!        ↓ endpoint(get_rev)
//! Endpoint(get_rev)                                  ← implements Stage
//!        ↓ chain.push(..)?; chain.compile()?
//! Arc<dyn Stage>                                     ← shared by all requests
//!        ↓ at request time
//! flow.set_response(get_rev(req).await.into_response())
//! ```
//!
//! The request handed to the handler is a clone of the flow's request.
//! Headers and context values are shared or cheaply copied; the body is a
//! reference-counted `Bytes`.

use std::future::Future;

use crate::middleware::{BoxFuture, Flow, Stage};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn call(&self, req: Request) -> BoxFuture<'static, Response>;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let fut = (self)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Wraps a handler so it can be pushed onto a chain.
pub fn endpoint<H: Handler>(handler: H) -> Endpoint<H> {
    Endpoint(handler)
}

/// A handler running as the last stage of a chain. See [`endpoint`].
pub struct Endpoint<H>(H);

impl<H: Handler> Stage for Endpoint<H> {
    fn call<'a>(&'a self, flow: &'a mut Flow) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let res = self.0.call(flow.request().clone()).await;
            flow.set_response(res);
        })
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<H>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;

    use serde::Serialize;

    use crate::context::Key;
    use crate::format::FORMAT_HEADER;

    const SEEN: Key<u8> = Key::new("seen");

    #[derive(Serialize)]
    #[serde(rename = "seen")]
    struct Seen {
        value: Option<u8>,
    }

    async fn seen_payload(req: Request) -> Response {
        req.respond(StatusCode::OK, &Seen { value: req.context().get(SEEN).copied() })
    }

    async fn echo_seen(req: Request) -> String {
        format!("{:?}", req.context().get(SEEN))
    }

    #[tokio::test]
    async fn endpoint_sees_context_and_sets_response() {
        let mut flow = Flow::new(Request::new(http::Request::new(Bytes::new())));
        flow.context_mut().insert(SEEN, 7).unwrap();
        endpoint(echo_seen).call(&mut flow).await;
        let res = flow.response().unwrap();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"Some(7)");
    }

    #[tokio::test]
    async fn endpoint_payload_follows_the_flow_format() {
        let req = http::Request::builder()
            .header(FORMAT_HEADER, "xml")
            .body(Bytes::new())
            .unwrap();
        let mut flow = Flow::new(Request::new(req));
        flow.context_mut().insert(SEEN, 3).unwrap();
        endpoint(seen_payload).call(&mut flow).await;
        let res = flow.response().unwrap();
        assert_eq!(res.header("content-type"), Some("application/xml"));
        assert_eq!(res.body(), b"<seen><value>3</value></seen>");
    }
}
