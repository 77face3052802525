//! Route registration with a shared stage prefix.
//!
//! The registrar keeps one unsealed [`Chain`] as a prefix. Every route clones
//! it, appends its handler, compiles, and lands in the router. Stages added
//! with [`use_stage`](Registrar::use_stage) apply to routes registered after
//! them; [`pop_stage`](Registrar::pop_stage) drops the last one again:
//!
//! ```rust
//! use std::sync::Arc;
//! use apigate::login::MemoryLoginStore;
//! use apigate::middleware::{Authenticate, RequireLogin};
//! use apigate::{Registrar, Request};
//! use http::Method;
//!
//! async fn list(_req: Request) -> &'static str { "[]" }
//! async fn create(_req: Request) -> &'static str { "{}" }
//!
//! let mut api = Registrar::new();
//! api.use_stage(Authenticate::new(Arc::new(MemoryLoginStore::new())))?;
//! api.route(Method::GET, "/revisions", list)?;           // anyone
//!
//! api.use_stage(RequireLogin)?;
//! api.route(Method::POST, "/revisions", create)?;        // logged-in only
//! api.pop_stage()?;
//!
//! let router = api.into_router();
//! # Ok::<(), apigate::Error>(())
//! ```

use http::Method;
use tracing::debug;

use crate::error::Error;
use crate::handler::{endpoint, Handler};
use crate::middleware::{BoxedStage, Chain, Stage};
use crate::router::Router;

/// Builds a [`Router`] from handlers plus a shared stage prefix.
#[derive(Default)]
pub struct Registrar {
    router: Router,
    prefix: Chain,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `stage` to the prefix of every route registered from now on.
    pub fn use_stage(&mut self, stage: impl Stage) -> Result<&mut Self, Error> {
        debug!(stage = stage.name(), "adding stage to route prefix");
        self.prefix.push(stage)?;
        Ok(self)
    }

    /// Removes the last stage added with [`use_stage`](Self::use_stage).
    pub fn pop_stage(&mut self) -> Result<BoxedStage, Error> {
        let stage = self.prefix.pop()?;
        debug!(stage = stage.name(), "removed stage from route prefix");
        Ok(stage)
    }

    /// Registers `handler` for `method` + `path` behind the current prefix.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, Error> {
        let mut chain = self.prefix.clone();
        chain.push(endpoint(handler))?;
        self.mount(method, path, chain)
    }

    /// Registers a caller-assembled chain, without the prefix.
    pub fn mount(&mut self, method: Method, path: &str, mut chain: Chain) -> Result<&mut Self, Error> {
        debug!(%method, path, stages = chain.len(), "setting up route");
        let compiled = chain.compile()?;
        self.router.insert(method, path, compiled)?;
        Ok(self)
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}
