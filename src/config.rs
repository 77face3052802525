//! Environment configuration.
//!
//! Variables are read with the `APIGATE_` prefix after an optional `.env`
//! file is loaded:
//!
//! | Variable | Default |
//! |---|---|
//! | `APIGATE_BIND_ADDR` | `0.0.0.0:3000` |
//! | `APIGATE_API_KEY_HEADER` | `X-API-KEY` |
//! | `APIGATE_FORMAT_HEADER` | `X-API-FORMAT` |

use serde::Deserialize;

use crate::format::FORMAT_HEADER;
use crate::middleware::auth::API_KEY_HEADER;

const PREFIX: &str = "APIGATE_";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    #[serde(default = "default_format_header")]
    pub format_header: String,
}

fn default_bind_addr() -> String { "0.0.0.0:3000".to_owned() }
fn default_api_key_header() -> String { API_KEY_HEADER.to_owned() }
fn default_format_header() -> String { FORMAT_HEADER.to_owned() }

impl Config {
    /// Loads `.env` if present, then reads `APIGATE_*` variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(PREFIX).from_env::<Self>()
    }

    /// Reads configuration from explicit `(name, value)` pairs, using the
    /// same prefix and defaults as [`from_env`](Self::from_env).
    pub fn from_pairs<I>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(PREFIX).from_iter(pairs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_key_header: default_api_key_header(),
            format_header: default_format_header(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_pairs(Vec::new()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let config = Config::from_pairs(vec![
            ("APIGATE_BIND_ADDR".to_owned(), "127.0.0.1:8080".to_owned()),
            ("APIGATE_API_KEY_HEADER".to_owned(), "X-Token".to_owned()),
            ("BIND_ADDR".to_owned(), "ignored:1".to_owned()),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.api_key_header, "X-Token");
        assert_eq!(config.format_header, FORMAT_HEADER);
    }
}
