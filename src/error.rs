//! Unified error type.

use crate::middleware::chain::ChainError;

/// The error type returned by apigate's fallible setup and serving operations.
///
/// Application-level outcomes (401, 404, 500 for a failed login lookup) are
/// expressed as HTTP [`Response`](crate::Response) values, not as `Error`s.
/// This type surfaces startup mistakes and infrastructure failures: a broken
/// chain, an invalid route, a bad bind address, or a failed accept.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("chain: {0}")]
    Chain(#[from] ChainError),

    #[error("invalid route `{path}`: {source}")]
    Route {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("config: {0}")]
    Config(#[from] envy::Error),
}
