use std::path::PathBuf;

use lens_onnx::{EnvironmentError, OnnxError};
use thiserror::Error;

/// Errors returned while loading a label table.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("open label file {path:?} failed: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read labels from {path:?} failed: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no labels found in {path:?}")]
    Empty { path: PathBuf },
}

/// Errors returned while constructing an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("create {which} tensor failed: {source}")]
    Tensor {
        which: &'static str,
        #[source]
        source: OnnxError,
    },

    #[error("create session for {path:?} failed: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: OnnxError,
    },

    #[error(transparent)]
    Labels(#[from] LabelError),

    #[error("engine pool needs at least one engine")]
    EmptyPool,
}

/// Errors returned by a classification call.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("image not found: {path:?}: {source}")]
    ImageNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("inference failed: {0}")]
    Inference(#[source] OnnxError),

    #[error("empty output from model")]
    EmptyOutput,

    #[error("engine is released")]
    Released,
}
