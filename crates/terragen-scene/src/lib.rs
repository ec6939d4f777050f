//! Typed scene operations for Terragen over its JSON-RPC interface.
//!
//! [`Scene`] wraps a [`terragen_rpc::RpcClient`] and turns the server's
//! method surface into typed calls: node lookups return
//! `Option<NodeId>`, the server's empty-id sentinel becomes `None`, and
//! parameter values are parsed from the strings Terragen stores them as.
//!
//! ```no_run
//! use terragen_rpc::RpcClient;
//! use terragen_scene::Scene;
//!
//! # async fn demo() -> terragen_scene::Result<()> {
//! let scene = Scene::new(RpcClient::new());
//! if let Some(camera) = scene.node_by_path("/Render Camera").await? {
//!     let fov = scene.get_param_as_float(&camera, "fov_angle").await?;
//!     scene.set_param(&camera, "fov_angle", fov * 0.5).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod methods;
mod node;
mod scene;

pub use error::{Result, SceneError};
pub use methods::ServerApi;
pub use scene::{DEFAULT_INPUT_PORT, Scene};
pub use terragen_types::{NodeId, ParamValue};
