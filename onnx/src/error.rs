use thiserror::Error;

/// Errors returned by runtime operations.
#[derive(Debug, Error)]
pub enum OnnxError {
    #[error("onnx: {0}")]
    Runtime(String),

    #[error("onnx: model has no {kind} named {name:?}")]
    Binding { kind: &'static str, name: String },

    #[error("onnx: model declares {kind} {name:?} as {declared:?}, bound buffer is {bound:?}")]
    IncompatibleShape {
        kind: &'static str,
        name: String,
        declared: Vec<i64>,
        bound: Vec<i64>,
    },

    #[error("onnx: shape mismatch: expected {expected} elements, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("onnx: empty data")]
    EmptyData,
}

/// Failure of the one-time environment setup.
///
/// Cloneable so the memoized outcome can be handed to every caller.
#[derive(Debug, Clone, Error)]
#[error("onnx: environment initialization failed: {0}")]
pub struct EnvironmentError(pub String);

impl From<OnnxError> for EnvironmentError {
    fn from(err: OnnxError) -> Self {
        Self(err.to_string())
    }
}
