//! apigate demo: a content-revision API behind API-key authentication.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example revisions
//!
//! Try:
//!   curl -i http://localhost:3000/revisions/1
//!   curl -i -H 'X-API-FORMAT: xml' -X POST http://localhost:3000/revisions
//!   curl -i -H 'X-API-KEY: demo-key' -X POST http://localhost:3000/revisions \
//!        -d '{"content":"hello"}'
//!   curl -i -H 'X-API-KEY: expired-key' -X POST http://localhost:3000/revisions

use std::sync::Arc;

use apigate::config::Config;
use apigate::login::{LoginRecord, MemoryLoginStore, UserId};
use apigate::middleware::auth::{unix_now, LOGGED_IN, USER};
use apigate::middleware::{Authenticate, RequireLogin};
use apigate::{Registrar, Request, Response, Server};
use http::{Method, StatusCode};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), apigate::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let now = unix_now();
    let store = Arc::new(MemoryLoginStore::from_iter([
        LoginRecord::new("demo-key", UserId::new("5f2b9c"), now + 3600),
        LoginRecord::new("expired-key", UserId::new("77aa01"), now - 60),
    ]));

    let mut api = Registrar::new();
    api.use_stage(Authenticate::new(store).with_header(config.api_key_header.clone()))?;

    // Readable by anyone; logged-in callers are told who they are.
    api.route(Method::GET, "/revisions/{id}", get_revision)?;

    api.use_stage(RequireLogin)?;
    api.route(Method::POST, "/revisions", create_revision)?;
    api.pop_stage()?;

    api.route(Method::GET, "/healthz", |_req: Request| async { "ok" })?;

    Server::from_config(&config)?.serve(api.into_router()).await
}

#[derive(Serialize)]
#[serde(rename = "revision")]
struct Revision<'a> {
    id: &'a str,
    content: &'a str,
    #[serde(rename = "viewerLoggedIn")]
    viewer_logged_in: bool,
}

#[derive(Serialize)]
#[serde(rename = "created")]
struct Created<'a> {
    id: &'a str,
    uid: &'a str,
    size: usize,
}

// GET /revisions/{id}
async fn get_revision(req: Request) -> Response {
    let payload = Revision {
        id: req.param("id").unwrap_or("unknown"),
        content: "…",
        viewer_logged_in: req.context().get(LOGGED_IN).copied().unwrap_or(false),
    };
    req.respond(StatusCode::OK, &payload)
}

// POST /revisions, only reached by logged-in callers.
async fn create_revision(req: Request) -> Response {
    let Some(user) = req.context().get(USER) else {
        return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
    };
    let payload = Created { id: "99", uid: user.id.as_str(), size: req.body().len() };
    req.respond(StatusCode::CREATED, &payload)
        .with_header("location", "/revisions/99")
}
