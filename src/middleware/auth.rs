//! API-key authentication stage.
//!
//! Resolves the key presented in the `X-API-KEY` header into an
//! [`Identity`] and records the outcome in the request context:
//!
//! | Outcome | Context | Chain |
//! |---|---|---|
//! | no key, unknown key, expired key | `LOGGED_IN = false` | continues |
//! | valid key | `LOGGED_IN = true`, `USER = UserInfo` | continues |
//! | store failure | nothing | `500`, halted |
//!
//! An absent or stale credential is an ordinary outcome that later stages
//! may accept (public content) or reject ([`RequireLogin`](super::RequireLogin)).
//! A store failure leaves the identity unknown, so nothing after this stage
//! is allowed to run.

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, warn};

use super::flow::Flow;
use super::{BoxFuture, Stage};
use crate::context::{Context, ContextError, Key};
use crate::login::{LoginStore, StoreError, UserId};

/// Default header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Whether the request presented a valid, unexpired key.
pub const LOGGED_IN: Key<bool> = Key::new("loggedIn");

/// The authenticated user. Present only when `LOGGED_IN` is `true`.
pub const USER: Key<UserInfo> = Key::new("user");

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub id: UserId,
}

/// Result of resolving one API key. Lives only as long as its request.
#[derive(Debug)]
pub enum Identity {
    Anonymous,
    Authenticated { user_id: UserId },
    ResolutionFailed { cause: StoreError },
}

/// Looks `key` up in `store` and classifies the result against `now`
/// (unix seconds).
///
/// An absent header is looked up as the empty key. The store is consulted
/// on every request, so an outage fails anonymous traffic too.
pub async fn resolve(store: &dyn LoginStore, key: Option<&str>, now: i64) -> Identity {
    let key = key.unwrap_or_default();

    match store.find_by_key(key).await {
        Err(cause) => Identity::ResolutionFailed { cause },
        Ok(None) => {
            debug!(key = %redact(key), "no login for api key");
            Identity::Anonymous
        }
        Ok(Some(record)) if record.is_expired(now) => {
            debug!(key = %redact(key), expired_at = record.expires_at, "login expired");
            Identity::Anonymous
        }
        Ok(Some(record)) => Identity::Authenticated { user_id: record.user_id },
    }
}

/// Writes the login facts for `identity` into `ctx`.
///
/// Returns `Ok(false)` without writing anything for a failed resolution.
/// Either slot being filled already is an error, and leaves `ctx` untouched.
fn record(ctx: &mut Context, identity: Identity) -> Result<bool, ContextError> {
    if ctx.contains(LOGGED_IN) {
        return Err(ContextError::AlreadySet(LOGGED_IN.name()));
    }
    if ctx.contains(USER) {
        return Err(ContextError::AlreadySet(USER.name()));
    }
    match identity {
        Identity::Anonymous => ctx.insert(LOGGED_IN, false).map(|()| true),
        Identity::Authenticated { user_id } => {
            ctx.insert(LOGGED_IN, true)?;
            ctx.insert(USER, UserInfo { id: user_id })?;
            Ok(true)
        }
        Identity::ResolutionFailed { .. } => Ok(false),
    }
}

/// Unix seconds, from the system clock.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The authentication stage.
///
/// ```rust
/// use std::sync::Arc;
/// use apigate::login::MemoryLoginStore;
/// use apigate::middleware::{Authenticate, Chain, RequireLogin};
///
/// let store = Arc::new(MemoryLoginStore::new());
/// let mut chain = Chain::new();
/// chain.push(Authenticate::new(store))?.push(RequireLogin)?;
/// # Ok::<(), apigate::middleware::ChainError>(())
/// ```
pub struct Authenticate {
    store: Arc<dyn LoginStore>,
    header: String,
    clock: fn() -> i64,
}

impl Authenticate {
    pub fn new(store: Arc<dyn LoginStore>) -> Self {
        Self { store, header: API_KEY_HEADER.to_owned(), clock: unix_now }
    }

    /// Reads the key from `header` instead of `X-API-KEY`.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Replaces the wall clock used for expiry checks.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }
}

impl Stage for Authenticate {
    fn call<'a>(&'a self, flow: &'a mut Flow) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let key = flow.request().header(&self.header).map(str::to_owned);
            let identity = resolve(self.store.as_ref(), key.as_deref(), (self.clock)()).await;

            if let Identity::ResolutionFailed { cause } = &identity {
                warn!(
                    key = %key.as_deref().map(redact).unwrap_or_default(),
                    path = %flow.request().path(),
                    "login lookup failed: {cause}",
                );
                flow.halt();
                flow.respond_empty(StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }

            if let Err(e) = record(flow.context_mut(), identity) {
                // Another stage already wrote the login facts; a chain with two
                // authentication stages cannot tell which identity is real.
                warn!("authentication ran twice on one request: {e}");
                flow.halt();
                flow.respond_empty(StatusCode::INTERNAL_SERVER_ERROR);
            }
        })
    }

    fn name(&self) -> &'static str { "authenticate" }
}

/// First few characters of a key, for logs.
fn redact(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::login::{LoginRecord, MemoryLoginStore};
    use crate::request::Request;
    use crate::response::Response;

    const NOW: i64 = 1_700_000_000;

    struct DownStore;

    #[async_trait]
    impl LoginStore for DownStore {
        async fn find_by_key(&self, _key: &str) -> Result<Option<crate::login::LoginRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn store_with(expires_at: i64) -> Arc<dyn LoginStore> {
        Arc::new(MemoryLoginStore::from_iter([LoginRecord::new(
            "valid-key",
            UserId::new("u-1"),
            expires_at,
        )]))
    }

    fn flow_with_key(key: Option<&str>) -> Flow {
        let mut builder = http::Request::builder().uri("/revisions");
        if let Some(k) = key {
            builder = builder.header(API_KEY_HEADER, k);
        }
        Flow::new(Request::new(builder.body(Bytes::new()).unwrap()))
    }

    async fn run(store: Arc<dyn LoginStore>, key: Option<&str>) -> Flow {
        let stage = Authenticate::new(store).with_clock(|| NOW);
        let mut flow = flow_with_key(key);
        stage.call(&mut flow).await;
        flow
    }

    #[tokio::test]
    async fn absent_and_unknown_keys_are_anonymous() {
        for key in [None, Some(""), Some("nobody")] {
            let flow = run(store_with(NOW + 60), key).await;
            assert_eq!(flow.context().get(LOGGED_IN), Some(&false), "key {key:?}");
            assert!(!flow.context().contains(USER));
            assert!(!flow.is_halted());
            assert!(flow.response().is_none());
        }
    }

    #[tokio::test]
    async fn expiry_boundary() {
        for expires_at in [NOW - 1, NOW - 3600] {
            let flow = run(store_with(expires_at), Some("valid-key")).await;
            assert_eq!(flow.context().get(LOGGED_IN), Some(&false));
            assert!(!flow.is_halted());
        }
        for expires_at in [NOW + 1, NOW + 3600] {
            let flow = run(store_with(expires_at), Some("valid-key")).await;
            assert_eq!(flow.context().get(LOGGED_IN), Some(&true));
            assert_eq!(flow.context().get(USER).map(|u| u.id.as_str()), Some("u-1"));
        }
    }

    #[tokio::test]
    async fn store_failure_halts_with_bare_500() {
        let flow = run(Arc::new(DownStore), Some("valid-key")).await;
        assert!(flow.is_halted());
        assert!(flow.context().is_empty());
        assert_eq!(flow.response_writes(), 1);
        let res = flow.response().unwrap();
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.body().is_empty());
    }

    #[tokio::test]
    async fn store_failure_halts_even_without_a_key() {
        for key in [None, Some("")] {
            let flow = run(Arc::new(DownStore), key).await;
            assert!(flow.is_halted(), "key {key:?}");
            assert!(flow.context().is_empty());
            assert_eq!(flow.response().map(Response::status_code), Some(StatusCode::INTERNAL_SERVER_ERROR));
        }
    }

    #[tokio::test]
    async fn missing_header_is_looked_up_as_the_empty_key() {
        let store: Arc<dyn LoginStore> = Arc::new(MemoryLoginStore::from_iter([LoginRecord::new(
            "",
            UserId::new("blank"),
            NOW + 60,
        )]));
        let flow = run(store, None).await;
        assert_eq!(flow.context().get(LOGGED_IN), Some(&true));
        assert_eq!(flow.context().get(USER).map(|u| u.id.as_str()), Some("blank"));
    }

    #[tokio::test]
    async fn preset_user_slot_is_left_alone() {
        let stage = Authenticate::new(store_with(NOW + 60)).with_clock(|| NOW);
        let mut flow = flow_with_key(Some("valid-key"));
        flow.context_mut().insert(USER, UserInfo { id: UserId::new("someone-else") }).unwrap();

        stage.call(&mut flow).await;

        assert!(flow.is_halted());
        assert!(!flow.context().contains(LOGGED_IN));
        assert_eq!(flow.context().get(USER).map(|u| u.id.as_str()), Some("someone-else"));
        assert_eq!(flow.response().map(Response::status_code), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn custom_header_is_honoured() {
        let stage = Authenticate::new(store_with(NOW + 1))
            .with_header("x-token")
            .with_clock(|| NOW);
        let mut flow = Flow::new(Request::new(
            http::Request::builder()
                .header("x-token", "valid-key")
                .body(Bytes::new())
                .unwrap(),
        ));
        stage.call(&mut flow).await;
        assert_eq!(flow.context().get(LOGGED_IN), Some(&true));
    }

    #[test]
    fn redaction_keeps_only_a_prefix() {
        assert_eq!(redact("abcdefgh"), "abcd…");
        assert_eq!(redact("ab"), "ab…");
    }
}
