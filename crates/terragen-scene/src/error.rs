use terragen_types::ValueError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Rpc(#[from] terragen_rpc::Error),

    #[error("Unexpected result from '{method}': {source}")]
    UnexpectedResult {
        method: &'static str,
        #[source]
        source: ValueError,
    },

    #[error("Cannot read parameter '{param}': {source}")]
    Param {
        param: String,
        #[source]
        source: ValueError,
    },
}

impl SceneError {
    /// The underlying RPC error, if the call itself failed.
    #[must_use]
    pub fn as_rpc(&self) -> Option<&terragen_rpc::Error> {
        match self {
            SceneError::Rpc(e) => Some(e),
            SceneError::UnexpectedResult { .. } | SceneError::Param { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;
