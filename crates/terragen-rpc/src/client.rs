//! RPC client for the Terragen RPC server.
//!
//! Each call builds a JSON-RPC 2.0 request with the next id, sends it over a
//! fresh connection and classifies the reply. The client holds its own id
//! counter and settings, so independent clients never interfere.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::{ClientConfig, ConfigError, timeout_from_secs};
use crate::error::Result;
use crate::protocol::Request;
use crate::reply::Reply;
use crate::transport::Transport;

/// Payload used by [`RpcClient::call_with_invalid_json`].
const INVALID_JSON_PAYLOAD: &str = "This is a test of invalid JSON, and if the server is \
compliant it should respond with a JSON-RPC object with error code -32700";

/// Note used by [`RpcClient::call_with_invalid_request`].
const INVALID_REQUEST_NOTE: &str = "This is a test of an invalid request, and if the server is \
compliant it should respond with a JSON-RPC object with error code -32600";

/// Client for the Terragen RPC server.
///
/// `RpcClient` is `Send + Sync`; share it through `Arc` to issue calls from
/// several tasks. Settings may be changed at any time and apply to calls
/// started afterwards.
#[derive(Debug)]
pub struct RpcClient {
    config: RwLock<ClientConfig>,
    next_id: AtomicU64,
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcClient {
    /// Client for `localhost:36971` with a 10 second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config: RwLock::new(config),
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of the current settings.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.config().timeout()
    }

    /// Set the socket timeout for subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a zero timeout or one too large to
    /// be stored in seconds. The previous timeout stays in effect.
    pub fn set_timeout(&self, timeout: Duration) -> std::result::Result<(), ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must not be zero".to_string()));
        }
        self.set_timeout_secs(timeout.as_secs_f64())
    }

    /// Set the socket timeout in seconds for subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `secs` is not a positive finite number
    /// or does not fit in a `Duration`. The previous timeout stays in effect.
    pub fn set_timeout_secs(&self, secs: f64) -> std::result::Result<(), ConfigError> {
        timeout_from_secs(secs)?;
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.timeout_secs = secs;
        Ok(())
    }

    /// Point subsequent calls at another server.
    pub fn set_endpoint(&self, host: impl Into<String>, port: u16) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.host = host.into();
        config.port = port;
    }

    fn transport(&self) -> Transport {
        let config = self.config();
        let timeout = config.timeout();
        Transport::new(config.host, config.port, timeout)
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Call `method` with positional `params` and return the classified reply.
    ///
    /// # Errors
    ///
    /// - `Error::Connection` / `Error::Timeout` if the call never completed.
    /// - `Error::Reply` if the server's reply cannot be parsed.
    /// - `Error::Api` for method-not-found and invalid-params replies, which
    ///   usually mean a client/server version mismatch.
    /// - `Error::LowLevel` for other reserved JSON-RPC error codes.
    /// - `Error::Rpc` for any other error code.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Reply> {
        let id = self.next_request_id();
        let request = Request::new(method, params, id);
        debug!(method, id, "Sending RPC request");

        let payload = Bytes::from(request.to_bytes()?);
        let raw = self.transport().send(payload).await?;

        match Reply::from_bytes(raw) {
            Ok(reply) => {
                debug!(method, id, "RPC call succeeded");
                Ok(reply)
            }
            Err(e) => {
                warn!(method, id, category = ?e.category(), "RPC call failed: {e}");
                Err(e)
            }
        }
    }

    /// Call `method` and return only the result value.
    ///
    /// # Errors
    ///
    /// Same as [`RpcClient::call`].
    pub async fn call_value(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        Ok(self.call(method, params).await?.into_value())
    }

    /// Send a notification. No id is consumed and the reply, if any, is discarded.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` or `Error::Timeout` if the exchange fails.
    pub async fn notify(&self, method: &str, params: Vec<Value>) -> Result<()> {
        let notification = Request::notification(method, params);
        debug!(method, "Sending RPC notification");

        let payload = Bytes::from(notification.to_bytes()?);
        let discarded = self.transport().send(payload).await?;
        debug!(method, bytes = discarded.len(), "Notification sent");
        Ok(())
    }

    /// Send a payload that is not JSON. A compliant server replies with a
    /// parse error, so this returns `Error::LowLevel` with
    /// `LowLevelErrorKind::ParseError`.
    ///
    /// # Errors
    ///
    /// Always returns an error for a compliant server; see [`RpcClient::call`].
    pub async fn call_with_invalid_json(&self) -> Result<Reply> {
        let raw = self
            .transport()
            .send(Bytes::from_static(INVALID_JSON_PAYLOAD.as_bytes()))
            .await?;
        Reply::from_bytes(raw)
    }

    /// Send a JSON object that is not a JSON-RPC request. A compliant server
    /// replies with `LowLevelErrorKind::InvalidRequest`. Consumes a request id.
    ///
    /// # Errors
    ///
    /// Always returns an error for a compliant server; see [`RpcClient::call`].
    pub async fn call_with_invalid_request(&self) -> Result<Reply> {
        let id = self.next_request_id();
        debug!(id, "Sending deliberately invalid request");

        let payload = serde_json::to_vec(&json!({ "note": INVALID_REQUEST_NOTE }))?;
        let raw = self.transport().send(Bytes::from(payload)).await?;
        Reply::from_bytes(raw)
    }
}
