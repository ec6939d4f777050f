//! Error types for the terragen-rpc crate.
//!
//! One [`Error`] is produced per failed call. Variants that come from a
//! server reply carry the offending [`Reply`] so callers can inspect the raw
//! bytes and the decoded JSON.

use std::time::Duration;

use crate::protocol::{ApiErrorKind, ErrorClass, LowLevelErrorKind};
use crate::reply::Reply;
use crate::transport::CodecError;

/// Unified error type for RPC operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The connection could not be established or broke before the reply was complete.
    #[error("Connection to Terragen RPC server failed: {0}")]
    Connection(#[source] std::io::Error),

    /// A socket operation exceeded the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be framed, or the reply exceeded the size limit.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The request could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server responded with data that cannot be parsed as a JSON-RPC reply.
    #[error("Terragen RPC server responded with data that cannot be parsed: {reason}")]
    Reply { reason: String, reply: Box<Reply> },

    #[error(
        "API error ({kind}) {}: {}",
        .reply.error_code.unwrap_or_default(),
        .reply.error_message.as_deref().unwrap_or_default()
    )]
    Api { kind: ApiErrorKind, reply: Box<Reply> },

    #[error(
        "Terragen RPC low level error ({kind}) {}: {}",
        .reply.error_code.unwrap_or_default(),
        .reply.error_message.as_deref().unwrap_or_default()
    )]
    LowLevel {
        kind: LowLevelErrorKind,
        reply: Box<Reply>,
    },

    /// The server reported an error code outside the reserved JSON-RPC codes.
    #[error(
        "RPC error {}: {}",
        .reply.error_code.unwrap_or_default(),
        .reply.error_message.as_deref().unwrap_or_default()
    )]
    Rpc { reply: Box<Reply> },
}

/// Coarse category of an [`Error`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Connection,
    Timeout,
    Reply,
    Api(ApiErrorKind),
    LowLevel(LowLevelErrorKind),
    Rpc,
}

impl Error {
    /// Build the typed error for a reply whose `error` member was present.
    pub(crate) fn from_error_reply(code: i64, reply: Reply) -> Self {
        let reply = Box::new(reply);
        match ErrorClass::from_code(code) {
            ErrorClass::Api(kind) => Self::Api { kind, reply },
            ErrorClass::LowLevel(kind) => Self::LowLevel { kind, reply },
            ErrorClass::Other => Self::Rpc { reply },
        }
    }

    pub(crate) fn reply(reason: impl Into<String>, reply: Reply) -> Self {
        Self::Reply {
            reason: reason.into(),
            reply: Box::new(reply),
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Connection(_) => ErrorCategory::Connection,
            Error::Timeout(_) => ErrorCategory::Timeout,
            Error::Reply { .. } => ErrorCategory::Reply,
            Error::Api { kind, .. } => ErrorCategory::Api(*kind),
            // Local framing and encoding failures are internal errors of this client.
            Error::Codec(_) | Error::Json(_) => {
                ErrorCategory::LowLevel(LowLevelErrorKind::InternalError)
            }
            Error::LowLevel { kind, .. } => ErrorCategory::LowLevel(*kind),
            Error::Rpc { .. } => ErrorCategory::Rpc,
        }
    }

    /// The reply being classified when the error was raised, if any.
    #[must_use]
    pub fn server_reply(&self) -> Option<&Reply> {
        match self {
            Error::Reply { reply, .. }
            | Error::Api { reply, .. }
            | Error::LowLevel { reply, .. }
            | Error::Rpc { reply } => Some(reply),
            Error::Connection(_) | Error::Timeout(_) | Error::Codec(_) | Error::Json(_) => None,
        }
    }

    /// The JSON-RPC error code reported by the server, if any.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        self.server_reply().and_then(|reply| reply.error_code)
    }

    /// The `more_info` detail reported by the server, if any.
    #[must_use]
    pub fn more_info(&self) -> Option<&str> {
        self.server_reply().and_then(|reply| reply.more_info.as_deref())
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// True if the call never completed at the transport level.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
