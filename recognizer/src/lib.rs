//! Image classification with a fixed pretrained model.
//!
//! # Pipeline
//!
//! 1. Decode: raw bytes -> [`image::DynamicImage`] (format auto-detected)
//! 2. [`preprocess`]: stretch to the model resolution with Catmull-Rom
//!    filtering, scale to `[0, 1]`, write planar RGB into the input buffer
//! 3. Forward pass over the engine's bound session
//! 4. [`postprocess::argmax`] over the output buffer, resolved through the
//!    [`LabelTable`] (out-of-range indices give [`UNKNOWN_LABEL`])
//!
//! # Resources
//!
//! An [`Engine`] owns its session and both buffers and releases them
//! together, on [`Engine::release`] or on drop. The runtime environment is
//! initialized once per process and its outcome is shared by every engine.
//!
//! # Concurrency
//!
//! Predict calls take `&mut Engine`, so one engine never runs two calls at
//! once. Share an [`EnginePool`] to serve concurrent callers.
//!
//! # Usage
//!
//! ```ignore
//! use lens_recognizer::OnnxEngine;
//!
//! let mut engine = OnnxEngine::new("mobilenetv2-7.onnx", "imagenet_classes.txt", 224, 224)?;
//! let label = engine.predict_from_file("cat.jpg")?;
//! ```

mod engine;
mod error;
pub mod labels;
mod pool;
pub mod postprocess;
pub mod preprocess;
#[cfg(test)]
mod testing;

pub use engine::{Engine, INPUT_NAME, NUM_CLASSES, OUTPUT_NAME};
#[cfg(feature = "onnx")]
pub use engine::OnnxEngine;
pub use error::{EngineError, LabelError, PredictError};
pub use labels::{LabelTable, UNKNOWN_LABEL};
pub use pool::{EnginePool, PooledEngine};
pub use preprocess::{preprocess, InputSize};

pub use lens_onnx as runtime;
