//! Decoding and classification of raw server replies.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::RpcError;

/// Data returned by a call, including error information when the server
/// reported one.
///
/// `ok` is true exactly when the reply had a `result` member and no `error`
/// member; `value` then holds that result verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub ok: bool,
    pub value: Option<Value>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
    pub more_info: Option<String>,
    /// Bytes exactly as received from the server.
    pub raw_bytes: Bytes,
    /// The decoded JSON, when the bytes parsed.
    pub raw_parsed: Option<Value>,
}

impl Reply {
    fn unparsed(raw_bytes: Bytes) -> Self {
        Self {
            ok: false,
            value: None,
            error_code: None,
            error_message: None,
            more_info: None,
            raw_bytes,
            raw_parsed: None,
        }
    }

    /// Decode raw reply bytes and classify them.
    ///
    /// # Errors
    ///
    /// Returns `Error::Reply` if the bytes are not a JSON object holding
    /// exactly one of `result` or `error`, or if `error` is malformed.
    /// Returns `Error::Api`, `Error::LowLevel` or `Error::Rpc` when the server
    /// reported an error, according to its code.
    pub fn from_bytes(raw_bytes: Bytes) -> Result<Self> {
        let mut reply = Self::unparsed(raw_bytes);

        let parsed: Value = match serde_json::from_slice(&reply.raw_bytes) {
            Ok(parsed) => parsed,
            Err(e) => return Err(Error::reply(format!("invalid JSON: {e}"), reply)),
        };
        let members = parsed
            .as_object()
            .map(|object| (object.get("result").cloned(), object.get("error").cloned()));
        reply.raw_parsed = Some(parsed);

        let Some(members) = members else {
            return Err(Error::reply("reply is not a JSON object", reply));
        };

        match members {
            (Some(result), None) => {
                reply.value = Some(result);
                reply.ok = true;
                Ok(reply)
            }
            (None, Some(error)) => {
                let rpc_error: RpcError = match serde_json::from_value(error) {
                    Ok(rpc_error) => rpc_error,
                    Err(e) => {
                        return Err(Error::reply(format!("malformed error object: {e}"), reply));
                    }
                };
                let code = rpc_error.code;
                reply.error_code = Some(code);
                reply.error_message = Some(rpc_error.message);
                reply.more_info = rpc_error.more_info;
                Err(Error::from_error_reply(code, reply))
            }
            (Some(_), Some(_)) => Err(Error::reply("reply has both 'result' and 'error'", reply)),
            (None, None) => Err(Error::reply("reply has neither 'result' nor 'error'", reply)),
        }
    }

    /// The result value, consuming the reply. `Null` when the call failed.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value.unwrap_or(Value::Null)
    }
}
