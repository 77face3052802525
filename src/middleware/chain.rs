//! Chain construction and dispatch.
//!
//! # Two lifetimes
//!
//! A [`Chain`] is a startup-time builder: single-owner, mutable, used while
//! routes are registered. [`Chain::compile`] seals it and returns a
//! [`CompiledChain`], an immutable `Arc<[stage]>` that every request walks
//! concurrently without locking.
//!
//! Misuse of the builder (popping an empty chain, touching a sealed one,
//! compiling nothing) is reported as a [`ChainError`] so route registration
//! fails at startup instead of mid-request.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::flow::Flow;
use super::{BoxedStage, Stage};
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("cannot pop a stage from an empty chain")]
    Empty,

    #[error("chain is already compiled; its stages are frozen")]
    Sealed,

    #[error("cannot compile a chain with no stages")]
    NoStages,
}

/// Startup-time chain builder.
///
/// Cloning an unsealed builder is the way to share a prefix of stages between
/// routes: each clone gets its own stage list, backed by the same stages.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<BoxedStage>,
    sealed: bool,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `stage` to the end of the chain.
    pub fn push(&mut self, stage: impl Stage) -> Result<&mut Self, ChainError> {
        self.push_boxed(Arc::new(stage))
    }

    /// Appends an already-shared stage.
    pub fn push_boxed(&mut self, stage: BoxedStage) -> Result<&mut Self, ChainError> {
        if self.sealed {
            return Err(ChainError::Sealed);
        }
        self.stages.push(stage);
        Ok(self)
    }

    /// Removes and returns the most recently pushed stage.
    pub fn pop(&mut self) -> Result<BoxedStage, ChainError> {
        if self.sealed {
            return Err(ChainError::Sealed);
        }
        self.stages.pop().ok_or(ChainError::Empty)
    }

    pub fn len(&self) -> usize { self.stages.len() }
    pub fn is_empty(&self) -> bool { self.stages.is_empty() }
    pub fn is_sealed(&self) -> bool { self.sealed }

    /// Freezes the current stage sequence into a dispatchable chain.
    ///
    /// The builder is sealed afterwards: further `push`/`pop` calls fail.
    pub fn compile(&mut self) -> Result<CompiledChain, ChainError> {
        if self.sealed {
            return Err(ChainError::Sealed);
        }
        if self.stages.is_empty() {
            return Err(ChainError::NoStages);
        }
        self.sealed = true;
        let stages: Arc<[BoxedStage]> = self.stages.iter().cloned().collect();
        debug!(stages = ?StageNames(&stages), "chain compiled");
        Ok(CompiledChain { stages })
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &StageNames(&self.stages))
            .field("sealed", &self.sealed)
            .finish()
    }
}

/// A frozen, shareable chain. Cloning is one atomic increment.
#[derive(Clone)]
pub struct CompiledChain {
    stages: Arc<[BoxedStage]>,
}

impl CompiledChain {
    pub fn len(&self) -> usize { self.stages.len() }

    /// Runs `req` through every stage in push order until one halts.
    pub async fn dispatch(&self, req: Request) -> Response {
        self.serve_flow(Flow::new(req)).await
    }

    /// Like [`dispatch`](Self::dispatch), but checks `cancel` before each
    /// stage and abandons the chain once it fires.
    pub async fn dispatch_with_cancellation(
        &self,
        req: Request,
        cancel: CancellationToken,
    ) -> Response {
        self.serve_flow(Flow::new(req).with_cancellation(cancel)).await
    }

    /// Walks the stages over a caller-built flow and returns the finished flow.
    ///
    /// Useful when the caller needs the final context as well as the response.
    pub async fn run_flow(&self, mut flow: Flow) -> Flow {
        for (position, stage) in self.stages.iter().enumerate() {
            if flow.is_cancelled() {
                debug!(position, path = %flow.request().path(), "request cancelled between stages");
                if flow.response().is_none() {
                    flow.respond_empty(StatusCode::SERVICE_UNAVAILABLE);
                }
                break;
            }
            trace!(position, stage = stage.name(), "running stage");
            stage.call(&mut flow).await;
            if flow.is_halted() {
                trace!(position, stage = stage.name(), "chain halted");
                break;
            }
        }
        flow
    }

    /// Runs `flow` and turns it into the response to send.
    pub(crate) async fn serve_flow(&self, flow: Flow) -> Response {
        let (_, response) = self.run_flow(flow).await.into_parts();
        response.unwrap_or_else(|| Response::status(StatusCode::OK))
    }
}

impl fmt::Debug for CompiledChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledChain").field(&StageNames(&self.stages)).finish()
    }
}

struct StageNames<'a>(&'a [BoxedStage]);

impl fmt::Debug for StageNames<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(|s| s.name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::BoxFuture;

    struct Noop;

    impl Stage for Noop {
        fn call<'a>(&'a self, _flow: &'a mut Flow) -> BoxFuture<'a, ()> {
            Box::pin(async {})
        }
    }

    #[test]
    fn pop_on_empty_chain_fails() {
        let mut chain = Chain::new();
        assert_eq!(chain.pop().err(), Some(ChainError::Empty));
    }

    #[test]
    fn compile_on_empty_chain_fails() {
        assert_eq!(Chain::new().compile().err(), Some(ChainError::NoStages));
    }

    #[test]
    fn sealed_chain_rejects_mutation() {
        let mut chain = Chain::new();
        chain.push(Noop).unwrap();
        chain.compile().unwrap();
        assert!(chain.is_sealed());
        assert_eq!(chain.push(Noop).err(), Some(ChainError::Sealed));
        assert_eq!(chain.pop().err(), Some(ChainError::Sealed));
        assert_eq!(chain.compile().err(), Some(ChainError::Sealed));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn clone_of_prefix_is_independent() {
        let mut prefix = Chain::new();
        prefix.push(Noop).unwrap();
        let mut route = prefix.clone();
        route.push(Noop).unwrap();
        let compiled = route.compile().unwrap();
        assert_eq!(compiled.len(), 2);
        assert_eq!(prefix.len(), 1);
        assert!(!prefix.is_sealed());
    }

    #[tokio::test]
    async fn chain_without_response_yields_empty_200() {
        let mut chain = Chain::new();
        chain.push(Noop).unwrap();
        let req = Request::new(http::Request::new(bytes::Bytes::new()));
        let res = chain.compile().unwrap().dispatch(req).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(res.body().is_empty());
    }
}
