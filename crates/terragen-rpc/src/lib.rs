//! JSON-RPC 2.0 client for the Terragen RPC server.
//!
//! The server listens on TCP (`localhost:36971` by default). Each call opens a
//! fresh connection, sends one length-prefixed JSON-RPC request, reads the
//! reply until the server closes the connection, and classifies it.
//!
//! # Architecture
//!
//! - [`transport`]: Length-prefix codec and one-shot TCP exchange
//! - [`protocol`]: JSON-RPC 2.0 request/error types and error-code classification
//! - [`reply`]: Decoding raw reply bytes into a [`Reply`] or a typed [`Error`]
//! - [`client`]: [`RpcClient`] with the request-id counter and settings
//! - [`config`]: Endpoint and timeout settings
//! - [`error`]: Error taxonomy and `Result` alias
//!
//! # Example
//!
//! ```no_run
//! use terragen_rpc::{ClientConfig, Error, RpcClient};
//!
//! # async fn example() -> Result<(), Error> {
//! let client = RpcClient::with_config(ClientConfig {
//!     timeout_secs: 5.0,
//!     ..ClientConfig::default()
//! });
//!
//! match client.call("node_by_path", vec!["/Render Camera".into()]).await {
//!     Ok(reply) => println!("camera id: {:?}", reply.value),
//!     Err(Error::Timeout(after)) => eprintln!("no answer after {after:?}"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reply;
pub mod transport;

pub use client::RpcClient;

pub use config::{ClientConfig, ConfigError, ConfigPaths, DEFAULT_HOST, DEFAULT_PORT};

pub use error::{Error, ErrorCategory, Result};

pub use protocol::{
    ApiErrorKind, ErrorClass, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION,
    LowLevelErrorKind, METHOD_NOT_FOUND, PARSE_ERROR, Request, RpcError, SERVER_ERROR_MAX,
    SERVER_ERROR_MIN,
};

pub use reply::Reply;

pub use transport::{CodecError, LengthPrefixCodec, Transport};
