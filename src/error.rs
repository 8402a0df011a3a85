use thiserror::Error;

/// Failures while flattening a provider payload into a `GameState`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// A field the game phase requires is missing from the payload.
    #[error("upstream schema error: missing `{path}`")]
    UpstreamSchema { path: String },

    /// A field is present but cannot be read as the expected type.
    #[error("upstream schema error: `{path}` has unexpected value {value}")]
    InvalidValue { path: String, value: String },

    #[error("invalid game json: {0}")]
    Json(String),
}

impl StateError {
    pub fn missing(path: impl Into<String>) -> Self {
        StateError::UpstreamSchema { path: path.into() }
    }

    pub fn invalid(path: impl Into<String>, value: &serde_json::Value) -> Self {
        StateError::InvalidValue {
            path: path.into(),
            value: value.to_string(),
        }
    }
}

/// Reasons a snapshot has no situation to encode.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Game has not started")]
    NotStarted,

    #[error("Game is finished")]
    AlreadyFinished,
}
