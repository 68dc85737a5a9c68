//! Runtime seam for running fixed-topology ONNX models.
//!
//! This crate defines the handles an inference engine owns: a process-wide
//! [`Environment`], a compiled [`Session`] and reusable [`TensorBuffer`]s.
//! Backends implement [`Runtime`]. The ONNX Runtime backend,
//! [`OrtRuntime`], is available with the `ort` feature.
//!
//! # Usage
//!
//! ```ignore
//! use lens_onnx::{Binding, OrtRuntime, Runtime, Session, TensorBuffer};
//!
//! let rt = OrtRuntime;
//! rt.ensure_initialized()?;
//! let mut input = rt.new_tensor(&[1, 3, 224, 224])?;
//! let mut output = rt.new_tensor(&[1, 1000])?;
//! let mut session = rt.new_session(
//!     "mobilenetv2-7.onnx".as_ref(),
//!     &Binding {
//!         input_name: "data",
//!         input: &input,
//!         output_name: "mobilenetv20_output_flatten0_reshape0",
//!         output: &output,
//!     },
//! )?;
//! input.data_mut().fill(0.5);
//! session.run(&input, &mut output)?;
//! ```
//!
//! # Dynamic Linking
//!
//! With the `ort` feature, ONNX Runtime is fetched and linked by the `ort`
//! crate. Without it, the crate has no native dependency.

mod env;
mod error;
#[cfg(feature = "ort")]
mod ort_backend;
mod runtime;

pub use env::Environment;
pub use error::{EnvironmentError, OnnxError};
#[cfg(feature = "ort")]
pub use ort_backend::{OrtRuntime, OrtSession, OrtTensor};
pub use runtime::{dims_compatible, element_count, Binding, Runtime, Session, TensorBuffer};
