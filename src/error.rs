use thiserror::Error;

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors that abort a generation run.
///
/// Unresolvable binding paths are not errors; they are reported as
/// diagnostics and generation continues.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Scene node declaration has no name attribute: {0}")]
    MissingNodeName(String),

    #[error("Could not find parent node {parent} of node {node}")]
    MissingParent { node: String, parent: String },

    #[error("Parent chain of node {0} loops back on itself")]
    ParentCycle(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid generator config: {0}")]
    Config(String),

    #[error("Project path not found: {0}")]
    ProjectNotFound(String),
}

impl GeneratorError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        GeneratorError::Io { path: path.into(), source }
    }
}

impl From<serde_json::Error> for GeneratorError {
    fn from(err: serde_json::Error) -> Self {
        GeneratorError::Config(err.to_string())
    }
}

impl From<GeneratorError> for napi::Error {
    fn from(err: GeneratorError) -> Self {
        napi::Error::from_reason(err.to_string())
    }
}
