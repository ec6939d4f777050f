//! JSON-RPC 2.0 envelope types and error-code classification.
//!
//! Requests always carry positional params. Replies are classified by the
//! `error.code` the server reports, following the JSON-RPC 2.0 reserved ranges.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const SERVER_ERROR_MIN: i64 = -32099;
pub const SERVER_ERROR_MAX: i64 = -32000;

/// JSON-RPC 2.0 request. A request without an id is a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl Request {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Vec<Value>, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }

    #[must_use]
    pub fn notification(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: None,
        }
    }

    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Serialize this request to UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// The `error` member of a JSON-RPC reply as sent by the Terragen server.
///
/// `more_info` is a server extension carrying extra human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_info: Option<String>,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            more_info: None,
        }
    }

    #[must_use]
    pub fn with_more_info(mut self, more_info: impl Into<String>) -> Self {
        self.more_info = Some(more_info.into());
        self
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::from_code(self.code)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Error codes that point at a client/server API mismatch or misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    MethodNotFound,
    InvalidParams,
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiErrorKind::MethodNotFound => write!(f, "method not found"),
            ApiErrorKind::InvalidParams => write!(f, "invalid params"),
        }
    }
}

/// Error codes attributable to the protocol layer or the server implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LowLevelErrorKind {
    ParseError,
    InvalidRequest,
    InternalError,
    ServerError,
}

impl std::fmt::Display for LowLevelErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LowLevelErrorKind::ParseError => write!(f, "parse error"),
            LowLevelErrorKind::InvalidRequest => write!(f, "invalid request"),
            LowLevelErrorKind::InternalError => write!(f, "internal error"),
            LowLevelErrorKind::ServerError => write!(f, "server error"),
        }
    }
}

/// Classification of a server-reported JSON-RPC error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Api(ApiErrorKind),
    LowLevel(LowLevelErrorKind),
    /// Any code outside the reserved JSON-RPC codes.
    Other,
}

impl ErrorClass {
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            PARSE_ERROR => Self::LowLevel(LowLevelErrorKind::ParseError),
            INVALID_REQUEST => Self::LowLevel(LowLevelErrorKind::InvalidRequest),
            METHOD_NOT_FOUND => Self::Api(ApiErrorKind::MethodNotFound),
            INVALID_PARAMS => Self::Api(ApiErrorKind::InvalidParams),
            INTERNAL_ERROR => Self::LowLevel(LowLevelErrorKind::InternalError),
            SERVER_ERROR_MIN..=SERVER_ERROR_MAX => Self::LowLevel(LowLevelErrorKind::ServerError),
            _ => Self::Other,
        }
    }
}
