//! Project, lookup and selection operations.
//!
//! Operations that the server may legitimately refuse (opening a missing
//! file, inserting a clip next to an invalid node) report that as `false`
//! rather than an error. Errors are reserved for failed calls.

use serde_json::Value;
use terragen_rpc::RpcClient;
use terragen_types::{NodeId, ValueError};
use tracing::debug;

use crate::error::{Result, SceneError};
use crate::methods::{self, ServerApi};

/// Default input port used by [`Scene::insert_clip_file_before`].
pub const DEFAULT_INPUT_PORT: &str = "input_node";

/// Typed access to the scene of a running Terragen instance.
#[derive(Debug, Default)]
pub struct Scene {
    client: RpcClient,
    api: ServerApi,
}

impl Scene {
    #[must_use]
    pub fn new(client: RpcClient) -> Self {
        Self {
            client,
            api: ServerApi::default(),
        }
    }

    #[must_use]
    pub fn with_api(mut self, api: ServerApi) -> Self {
        self.api = api;
        self
    }

    #[must_use]
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    #[must_use]
    pub fn api(&self) -> ServerApi {
        self.api
    }

    pub(crate) async fn call(&self, method: &'static str, params: Vec<Value>) -> Result<Value> {
        Ok(self.client.call(method, params).await?.into_value())
    }

    pub(crate) async fn call_node(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<Option<NodeId>> {
        let value = self.call(method, params).await?;
        let node = NodeId::from_value(&value).map_err(|source| unexpected(method, source))?;
        if node.is_none() {
            debug!(method, "Server returned no node");
        }
        Ok(node)
    }

    pub(crate) async fn call_nodes(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<Vec<NodeId>> {
        let value = self.call(method, params).await?;
        NodeId::list_from_value(&value).map_err(|source| unexpected(method, source))
    }

    pub(crate) async fn call_string(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<String> {
        match self.call(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(unexpected_value(method, "string", other)),
        }
    }

    pub(crate) async fn call_strings(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<Vec<String>> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value.clone())
            .map_err(|_| unexpected_value(method, "array of strings", value))
    }

    pub(crate) async fn call_bool(&self, method: &'static str, params: Vec<Value>) -> Result<bool> {
        match self.call(method, params).await? {
            Value::Bool(b) => Ok(b),
            other => Err(unexpected_value(method, "boolean", other)),
        }
    }

    /// File path of the current project.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a string.
    pub async fn project_filepath(&self) -> Result<String> {
        self.call_string(methods::PROJECT_FILEPATH, Vec::new())
            .await
    }

    /// Root node of the current project.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a node id.
    pub async fn root(&self) -> Result<Option<NodeId>> {
        self.call_node(methods::ROOT, Vec::new()).await
    }

    /// Find a node by its path in the hierarchy, e.g. `/Render Camera`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a node id.
    pub async fn node_by_path(&self, path: &str) -> Result<Option<NodeId>> {
        self.call_node(methods::NODE_BY_PATH, vec![Value::from(path)])
            .await
    }

    /// Create a node of `class_name` (e.g. `camera`, `sunlight`,
    /// `image_map_shader`) as a child of `parent`. Use [`Scene::root`] to add
    /// to the top level of the project.
    ///
    /// Creating an object reader such as `obj_reader` opens a file dialog in
    /// Terragen and blocks until it is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a node id.
    pub async fn create_child(&self, parent: &NodeId, class_name: &str) -> Result<Option<NodeId>> {
        self.call_node(
            methods::CREATE_CHILD,
            vec![parent.to_value(), Value::from(class_name)],
        )
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn delete(&self, node: &NodeId) -> Result<()> {
        self.call(methods::DELETE, vec![node.to_value()]).await?;
        Ok(())
    }

    /// Delete several nodes in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn delete_many(&self, nodes: &[NodeId]) -> Result<()> {
        self.call(methods::DELETE, vec![id_array(nodes)]).await?;
        Ok(())
    }

    /// Nodes currently selected in the UI, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a list of ids.
    pub async fn current_selection(&self) -> Result<Vec<NodeId>> {
        self.call_nodes(methods::CURRENT_SELECTION, Vec::new())
            .await
    }

    /// Add one node to the UI selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn select_one_more(&self, node: &NodeId) -> Result<()> {
        self.call(self.api.select_one_method(), vec![node.to_value()])
            .await?;
        Ok(())
    }

    /// Add nodes to the UI selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn select_more(&self, nodes: &[NodeId]) -> Result<()> {
        self.call(self.api.select_many_method(), vec![id_array(nodes)])
            .await?;
        Ok(())
    }

    /// Replace the UI selection with `nodes`.
    ///
    /// # Errors
    ///
    /// Returns an error if either call fails.
    pub async fn select_just(&self, nodes: &[NodeId]) -> Result<()> {
        self.select_none().await?;
        self.select_more(nodes).await
    }

    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn select_none(&self) -> Result<()> {
        self.call(methods::SELECT_NONE, Vec::new()).await?;
        Ok(())
    }

    /// Close the current project without saving and start a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn new_project(&self) -> Result<()> {
        self.call(methods::NEW_PROJECT, Vec::new()).await?;
        Ok(())
    }

    /// Close the current project without saving and open `filename`.
    /// Returns `false` if the server could not open it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the call itself fails.
    pub async fn open_project(&self, filename: &str) -> Result<bool> {
        self.call_bool(methods::OPEN_PROJECT, vec![Value::from(filename)])
            .await
    }

    /// Save the project as `filename`. Returns `false` if the server could
    /// not save it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the call itself fails.
    pub async fn save_project(&self, filename: &str) -> Result<bool> {
        self.call_bool(methods::SAVE_PROJECT, vec![Value::from(filename)])
            .await
    }

    /// Load a clip file into the project without connecting it.
    ///
    /// The server usually selects the inserted nodes.
    ///
    /// # Errors
    ///
    /// Returns an error only if the call itself fails.
    pub async fn insert_clip_file(&self, filename: &str) -> Result<bool> {
        self.call_bool(methods::INSERT_CLIP_FILE, vec![Value::from(filename)])
            .await
    }

    /// Load a clip file and wire it downstream of `input_node`:
    /// `input_node -> CLIP =>> previous downstream(s)`.
    ///
    /// Returns `false` if `input_node` is not valid.
    ///
    /// # Errors
    ///
    /// Returns an error only if the call itself fails.
    pub async fn insert_clip_file_after(&self, filename: &str, input_node: &NodeId) -> Result<bool> {
        self.call_bool(
            methods::INSERT_CLIP_FILE_AFTER,
            vec![Value::from(filename), input_node.to_value()],
        )
        .await
    }

    /// Load a clip file and wire it into `output_param` of `output_node`:
    /// `previous upstream -> CLIP -> output_node`. `output_param` defaults to
    /// the node's main input, [`DEFAULT_INPUT_PORT`].
    ///
    /// Returns `false` if `output_node` is not valid or has no such port.
    ///
    /// # Errors
    ///
    /// Returns an error only if the call itself fails.
    pub async fn insert_clip_file_before(
        &self,
        filename: &str,
        output_node: &NodeId,
        output_param: Option<&str>,
    ) -> Result<bool> {
        self.call_bool(
            methods::INSERT_CLIP_FILE_BEFORE,
            vec![
                Value::from(filename),
                output_node.to_value(),
                Value::from(output_param.unwrap_or(DEFAULT_INPUT_PORT)),
            ],
        )
        .await
    }
}

fn id_array(nodes: &[NodeId]) -> Value {
    Value::Array(nodes.iter().map(NodeId::to_value).collect())
}

fn unexpected(method: &'static str, source: ValueError) -> SceneError {
    SceneError::UnexpectedResult { method, source }
}

fn unexpected_value(method: &'static str, expected: &'static str, found: Value) -> SceneError {
    unexpected(method, ValueError::UnexpectedValue { expected, found })
}
