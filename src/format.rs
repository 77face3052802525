//! Response format negotiation and payload encoding.
//!
//! The caller picks the body format with a request header (`X-API-FORMAT`
//! by default): `xml` selects XML, anything else selects JSON. Stages never
//! serialize by hand; they hand a status and a payload to
//! [`Flow::respond`](crate::middleware::Flow::respond), which lands here.
//!
//! XML bodies use the payload's serde name as the root element:
//!
//! ```rust
//! use apigate::format::{ErrorBody, Format};
//!
//! let body = ErrorBody::new("not logged in");
//! assert_eq!(Format::Json.encode(&body).unwrap(), br#"{"reason":"not logged in"}"#);
//! assert_eq!(
//!     Format::Xml.encode(&body).unwrap(),
//!     b"<error><reason>not logged in</reason></error>",
//! );
//! ```

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::request::Request;
use crate::response::{ContentType, Response};

/// Default header carrying the caller's format choice.
pub const FORMAT_HEADER: &str = "X-API-FORMAT";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    #[default]
    Json,
    Xml,
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::de::DeError),
}

impl Format {
    /// Parses a header value. Only `xml` (any case) selects XML.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("xml") { Self::Xml } else { Self::Json }
    }

    /// Reads the format choice from `header` on `req`, defaulting to JSON.
    pub fn from_request(req: &Request, header: &str) -> Self {
        req.header(header).map(Self::parse).unwrap_or_default()
    }

    pub fn content_type(self) -> ContentType {
        match self {
            Self::Json => ContentType::Json,
            Self::Xml  => ContentType::Xml,
        }
    }

    pub fn encode<T: Serialize + ?Sized>(self, payload: &T) -> Result<Vec<u8>, EncodeError> {
        match self {
            Self::Json => Ok(serde_json::to_vec(payload)?),
            Self::Xml  => Ok(quick_xml::se::to_string(payload)?.into_bytes()),
        }
    }

    /// Builds the response for `status` with an encoded `payload`.
    ///
    /// A payload that fails to encode becomes a bare `500`; encoder text is
    /// logged, never sent.
    pub fn render<T: Serialize + ?Sized>(self, status: StatusCode, payload: &T) -> Response {
        match self.encode(payload) {
            Ok(body) => Response::builder().status(status).bytes(self.content_type(), body),
            Err(e) => {
                error!(format = ?self, "failed to encode response payload: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Machine-readable failure payload: `{"reason": "..."}` or
/// `<error><reason>...</reason></error>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename = "error")]
pub struct ErrorBody {
    pub reason: String,
}

impl ErrorBody {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}
