//! "Require login" gate.

use http::StatusCode;
use tracing::debug;

use super::auth::LOGGED_IN;
use super::flow::Flow;
use super::{BoxFuture, Stage};
use crate::format::ErrorBody;

/// Reason sent with the `401` when the gate rejects a request.
pub const NOT_LOGGED_IN: &str = "not logged in";

/// Rejects anonymous requests with `401 {"reason": "not logged in"}`.
///
/// Must sit after [`Authenticate`](super::Authenticate) in the chain. If no
/// authentication stage ran, the login slot is empty and the request is
/// treated as anonymous.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireLogin;

impl Stage for RequireLogin {
    fn call<'a>(&'a self, flow: &'a mut Flow) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let logged_in = flow.context().get(LOGGED_IN).copied().unwrap_or(false);
            if logged_in {
                return;
            }
            debug!(
                path = %flow.request().path(),
                status = StatusCode::UNAUTHORIZED.as_u16(),
                "user not logged in",
            );
            flow.halt();
            flow.respond(StatusCode::UNAUTHORIZED, &ErrorBody::new(NOT_LOGGED_IN));
        })
    }

    fn name(&self) -> &'static str { "require_login" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::request::Request;

    fn flow() -> Flow {
        Flow::new(Request::new(http::Request::new(Bytes::new())))
    }

    #[tokio::test]
    async fn logged_in_request_passes() {
        let mut flow = flow();
        flow.context_mut().insert(LOGGED_IN, true).unwrap();
        RequireLogin.call(&mut flow).await;
        assert!(!flow.is_halted());
        assert!(flow.response().is_none());
    }

    #[tokio::test]
    async fn anonymous_request_gets_401() {
        let mut flow = flow();
        flow.context_mut().insert(LOGGED_IN, false).unwrap();
        RequireLogin.call(&mut flow).await;
        assert!(flow.is_halted());
        let res = flow.response().unwrap();
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.body(), br#"{"reason":"not logged in"}"#);
    }

    #[tokio::test]
    async fn missing_login_slot_counts_as_anonymous() {
        let mut flow = flow();
        RequireLogin.call(&mut flow).await;
        assert!(flow.is_halted());
        assert_eq!(flow.response().unwrap().status_code(), StatusCode::UNAUTHORIZED);
    }
}
