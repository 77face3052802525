//! Middleware layer.
//!
//! A route is served by a **chain** of stages. Each stage receives the
//! request's [`Flow`], may read or write its [`Context`](crate::context::Context),
//! may set the response, and may **halt** the chain so no later stage runs.
//!
//! ```text
//! Authenticate ──▶ RequireLogin ──▶ Endpoint(handler)
//!      │                 │
//!      │ 500 + halt      │ 401 + halt
//!      ▼                 ▼
//!   response          response
//! ```
//!
//! Chains are assembled once at startup with [`Chain`] and frozen into a
//! [`CompiledChain`], which is shared read-only by every in-flight request.
//! Halting is per-request state on the [`Flow`], so one request breaking out
//! of a chain never affects another running the same chain.
//!
//! # Writing a stage
//!
//! Implement [`Stage`] on a struct, or wrap a closure with [`stage_fn`]:
//!
//! ```rust
//! use apigate::middleware::{stage_fn, Chain};
//! use http::StatusCode;
//!
//! let mut chain = Chain::new();
//! chain.push(stage_fn(|flow| Box::pin(async move {
//!     if flow.request().header("x-maintenance").is_some() {
//!         flow.respond_empty(StatusCode::SERVICE_UNAVAILABLE);
//!         flow.halt();
//!     }
//! })))?;
//! # Ok::<(), apigate::middleware::ChainError>(())
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod auth;
pub mod chain;
pub mod flow;
pub mod gate;

pub use auth::{Authenticate, Identity};
pub use chain::{Chain, ChainError, CompiledChain};
pub use flow::Flow;
pub use gate::RequireLogin;

/// A heap-allocated, type-erased `Send` future borrowing for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One step of a chain.
///
/// Stages are shared across concurrent requests, so all per-request state
/// lives in the [`Flow`], never in `self`.
pub trait Stage: Send + Sync + 'static {
    fn call<'a>(&'a self, flow: &'a mut Flow) -> BoxFuture<'a, ()>;

    /// Label used in dispatch traces.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A stage shared by every chain it was pushed onto.
pub type BoxedStage = Arc<dyn Stage>;

/// Adapts a closure into a [`Stage`].
///
/// The closure returns a boxed future borrowing the flow, the same shape
/// as [`Stage::call`].
pub fn stage_fn<F>(f: F) -> FnStage<F>
where
    F: for<'a> Fn(&'a mut Flow) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    FnStage(f)
}

/// Closure stage returned by [`stage_fn`].
pub struct FnStage<F>(F);

impl<F> Stage for FnStage<F>
where
    F: for<'a> Fn(&'a mut Flow) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, flow: &'a mut Flow) -> BoxFuture<'a, ()> {
        (self.0)(flow)
    }
}
