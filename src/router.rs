//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Every route resolves to
//! a [`CompiledChain`]; building those chains is the
//! [`Registrar`](crate::Registrar)'s job.

use std::collections::HashMap;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::middleware::CompiledChain;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<CompiledChain>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `chain` for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    /// Fails if the path is malformed or conflicts with an existing route.
    pub fn on(mut self, method: Method, path: &str, chain: CompiledChain) -> Result<Self, Error> {
        self.insert(method, path, chain)?;
        Ok(self)
    }

    pub(crate) fn insert(
        &mut self,
        method: Method,
        path: &str,
        chain: CompiledChain,
    ) -> Result<(), Error> {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, chain)
            .map_err(|source| Error::Route { path: path.to_owned(), source })
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(CompiledChain, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let chain = matched.value.clone();
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((chain, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::endpoint;
    use crate::middleware::Chain;
    use crate::request::Request;

    async fn ok(_req: Request) -> &'static str { "ok" }

    fn chain() -> CompiledChain {
        let mut chain = Chain::new();
        chain.push(endpoint(ok)).unwrap();
        chain.compile().unwrap()
    }

    #[test]
    fn lookup_extracts_params_per_method() {
        let router = Router::new()
            .on(Method::GET, "/revisions/{id}", chain())
            .unwrap();
        let (_, params) = router.lookup(&Method::GET, "/revisions/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(router.lookup(&Method::POST, "/revisions/42").is_none());
        assert!(router.lookup(&Method::GET, "/other").is_none());
    }

    #[test]
    fn conflicting_route_is_a_setup_error() {
        let router = Router::new().on(Method::GET, "/a/{id}", chain()).unwrap();
        let err = router.on(Method::GET, "/a/{id}", chain()).err().unwrap();
        assert!(matches!(err, Error::Route { ref path, .. } if path == "/a/{id}"));
    }
}
