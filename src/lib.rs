//! # apigate
//!
//! The request pipeline in front of an HTTP API's business handlers:
//! middleware chains with a per-request **halt**, a typed per-request
//! context, and an API-key gate that resolves callers to logged-in or
//! anonymous before the handler runs.
//!
//! ## The pipeline
//!
//! - **Chains**: stages run strictly in push order; any stage may set the
//!   response and halt the rest. Built at startup, frozen, shared read-only.
//! - **Context**: write-once typed slots per request, threaded through the
//!   [`Flow`](middleware::Flow), never global.
//! - **Authentication**: [`Authenticate`](middleware::Authenticate) looks the
//!   `X-API-KEY` header up in a [`LoginStore`](login::LoginStore). Unknown or
//!   expired keys are anonymous; a store failure is a bare `500`.
//! - **Gate**: [`RequireLogin`](middleware::RequireLogin) answers anonymous
//!   callers with `401 {"reason": "not logged in"}`.
//! - **Formats**: JSON by default, XML when `X-API-FORMAT: xml`. Stages
//!   answer through [`Flow::respond`](middleware::Flow::respond), handlers
//!   through [`Request::respond`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use apigate::login::MemoryLoginStore;
//! use apigate::middleware::auth::USER;
//! use apigate::middleware::{Authenticate, RequireLogin};
//! use apigate::{Registrar, Request, Response, Server};
//! use http::{Method, StatusCode};
//! use serde::Serialize;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), apigate::Error> {
//!     let store = Arc::new(MemoryLoginStore::new());
//!
//!     let mut api = Registrar::new();
//!     api.use_stage(Authenticate::new(store))?;
//!     api.use_stage(RequireLogin)?;
//!     api.route(Method::GET, "/me", me)?;
//!
//!     Server::bind("0.0.0.0:3000")?.serve(api.into_router()).await
//! }
//!
//! #[derive(Serialize)]
//! #[serde(rename = "me")]
//! struct Me {
//!     id: String,
//! }
//!
//! // JSON by default, XML when the caller sends `X-API-FORMAT: xml`.
//! async fn me(req: Request) -> Response {
//!     let id = req.context().get(USER).map(|u| u.id.to_string()).unwrap_or_default();
//!     req.respond(StatusCode::OK, &Me { id })
//! }
//! ```

mod error;
mod handler;
mod registrar;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod context;
pub mod format;
pub mod login;
pub mod middleware;

pub use error::Error;
pub use handler::{endpoint, Endpoint, Handler};
pub use registrar::Registrar;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
