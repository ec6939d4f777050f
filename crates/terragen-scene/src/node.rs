//! Per-node queries and parameter access.

use serde_json::Value;
use terragen_types::{NodeId, ParamValue, ValueError};

use crate::error::{Result, SceneError};
use crate::methods;
use crate::scene::Scene;

impl Scene {
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a string.
    pub async fn name(&self, node: &NodeId) -> Result<String> {
        self.call_string(methods::NAME, vec![node.to_value()]).await
    }

    /// Full path of the node in the hierarchy, e.g. `/Render Camera`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a string.
    pub async fn path(&self, node: &NodeId) -> Result<String> {
        self.call_string(self.api().path_method(), vec![node.to_value()])
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a string.
    pub async fn parent_path(&self, node: &NodeId) -> Result<String> {
        self.call_string(methods::PARENT_PATH, vec![node.to_value()])
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a node id.
    pub async fn parent(&self, node: &NodeId) -> Result<Option<NodeId>> {
        self.call_node(methods::PARENT, vec![node.to_value()]).await
    }

    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a list of ids.
    pub async fn children(&self, node: &NodeId) -> Result<Vec<NodeId>> {
        self.call_nodes(methods::CHILDREN, vec![node.to_value()])
            .await
    }

    /// Children of `node` whose class is exactly `class_name`.
    /// Subclasses are not matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a list of ids.
    pub async fn children_filtered_by_class(
        &self,
        node: &NodeId,
        class_name: &str,
    ) -> Result<Vec<NodeId>> {
        self.call_nodes(
            methods::CHILDREN_FILTERED_BY_CLASS,
            vec![node.to_value(), Value::from(class_name)],
        )
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a list of strings.
    pub async fn param_names(&self, node: &NodeId) -> Result<Vec<String>> {
        self.call_strings(methods::PARAM_NAMES, vec![node.to_value()])
            .await
    }

    /// Raw string form of a parameter as Terragen stores it.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a string.
    pub async fn get_param_as_string(&self, node: &NodeId, param: &str) -> Result<String> {
        self.call_string(
            methods::GET_PARAM_AS_STRING,
            vec![node.to_value(), Value::from(param)],
        )
        .await
    }

    /// First word of the parameter as an integer; an empty value reads as 0.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::Param` if the value is not an integer.
    pub async fn get_param_as_int(&self, node: &NodeId, param: &str) -> Result<i64> {
        let raw = self.get_param_as_string(node, param).await?;
        terragen_types::parse_first_int(&raw).map_err(|source| param_error(param, source))
    }

    /// First word of the parameter as a float; an empty value reads as 0.0.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::Param` if the value is not a number.
    pub async fn get_param_as_float(&self, node: &NodeId, param: &str) -> Result<f64> {
        let raw = self.get_param_as_string(node, param).await?;
        terragen_types::parse_first_float(&raw).map_err(|source| param_error(param, source))
    }

    /// Every word of the parameter as a float, for vectors and colours.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::Param` if any component is not a number.
    pub async fn get_param_as_components(&self, node: &NodeId, param: &str) -> Result<Vec<f64>> {
        let raw = self.get_param_as_string(node, param).await?;
        terragen_types::parse_components(&raw).map_err(|source| param_error(param, source))
    }

    /// Set a parameter from a typed value.
    ///
    /// ```no_run
    /// # async fn demo(scene: &terragen_scene::Scene, camera: &terragen_types::NodeId)
    /// #     -> terragen_scene::Result<()> {
    /// scene.set_param(camera, "position", [0.0, 100.0, -250.0]).await?;
    /// scene.set_param(camera, "enable", true).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn set_param(
        &self,
        node: &NodeId,
        param: &str,
        value: impl Into<ParamValue>,
    ) -> Result<()> {
        let value = value.into();
        self.set_param_from_string(node, param, &value.to_param_string())
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn set_param_from_string(&self, node: &NodeId, param: &str, value: &str) -> Result<()> {
        self.call(
            methods::SET_PARAM_FROM_STRING,
            vec![node.to_value(), Value::from(param), Value::from(value)],
        )
        .await?;
        Ok(())
    }

    /// Flip the node's enable state.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn toggle_enable_node(&self, node: &NodeId) -> Result<()> {
        self.call(methods::TOGGLE_ENABLE_NODE, vec![node.to_value()])
            .await?;
        Ok(())
    }
}

fn param_error(param: &str, source: ValueError) -> SceneError {
    SceneError::Param {
        param: param.to_string(),
        source,
    }
}
