//! ONNX Runtime backend built on the `ort` crate.
//!
//! Buffers are native ONNX Runtime tensors. Compiling a session checks the
//! model's declared input and output against the bound buffers and records
//! them in an I/O binding: the input buffer is bound in place, the output is
//! written into a tensor preallocated at compile time. A run reuses that
//! binding and allocates nothing.

use std::path::Path;

use ort::logging::LogLevel;
use ort::session::{IoBinding, Session as OrtSessionHandle};
use ort::value::{Tensor, ValueType};

use crate::env::Environment;
use crate::error::OnnxError;
use crate::runtime::{dims_compatible, element_count, Binding, Runtime, Session, TensorBuffer};

/// ONNX Runtime only allows one environment per process.
static ORT_ENVIRONMENT: Environment = Environment::new();

fn runtime_error(err: ort::Error) -> OnnxError {
    OnnxError::Runtime(err.to_string())
}

fn zeroed(shape: &[i64]) -> Result<Tensor<f32>, OnnxError> {
    let len = element_count(shape)?;
    Tensor::from_array((shape.to_vec(), vec![0.0f32; len])).map_err(runtime_error)
}

fn check_declared(
    kind: &'static str,
    name: &str,
    declared: Option<&ValueType>,
    bound: &[i64],
) -> Result<(), OnnxError> {
    let Some(declared) = declared else {
        return Err(OnnxError::Binding {
            kind,
            name: name.to_string(),
        });
    };
    let dims: Vec<i64> = match declared {
        ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
        _ => Vec::new(),
    };
    if !dims_compatible(&dims, bound) {
        return Err(OnnxError::IncompatibleShape {
            kind,
            name: name.to_string(),
            declared: dims,
            bound: bound.to_vec(),
        });
    }
    Ok(())
}

/// [`Runtime`] backed by ONNX Runtime on the CPU.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrtRuntime;

impl Runtime for OrtRuntime {
    type Tensor = OrtTensor;
    type Session = OrtSession;

    fn environment(&self) -> &Environment {
        &ORT_ENVIRONMENT
    }

    fn initialize(&self) -> Result<(), OnnxError> {
        // Building a session builder loads the library and commits the
        // global environment.
        OrtSessionHandle::builder().map(drop).map_err(runtime_error)
    }

    fn new_tensor(&self, shape: &[i64]) -> Result<OrtTensor, OnnxError> {
        Ok(OrtTensor {
            shape: shape.to_vec(),
            value: zeroed(shape)?,
        })
    }

    fn new_session(
        &self,
        model_path: &Path,
        binding: &Binding<'_, OrtTensor>,
    ) -> Result<OrtSession, OnnxError> {
        let session = OrtSessionHandle::builder()
            .and_then(|b| b.with_log_level(LogLevel::Error))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                OnnxError::Runtime(format!("load model {}: {e}", model_path.display()))
            })?;

        let input = session
            .inputs
            .iter()
            .find(|i| i.name == binding.input_name)
            .map(|i| &i.input_type);
        check_declared("input", binding.input_name, input, binding.input.shape())?;

        let output = session
            .outputs
            .iter()
            .find(|o| o.name == binding.output_name)
            .map(|o| &o.output_type);
        check_declared("output", binding.output_name, output, binding.output.shape())?;

        let mut io = session.create_binding().map_err(runtime_error)?;
        io.bind_input(binding.input_name, &binding.input.value)
            .map_err(runtime_error)?;
        io.bind_output(binding.output_name, zeroed(binding.output.shape())?)
            .map_err(runtime_error)?;

        Ok(OrtSession {
            io,
            session,
            output_name: binding.output_name.to_string(),
        })
    }
}

/// A float32 tensor allocated through ONNX Runtime.
pub struct OrtTensor {
    shape: Vec<i64>,
    value: Tensor<f32>,
}

impl TensorBuffer for OrtTensor {
    fn shape(&self) -> &[i64] {
        &self.shape
    }

    fn data(&self) -> &[f32] {
        self.value.extract_tensor().1
    }

    fn data_mut(&mut self) -> &mut [f32] {
        self.value.extract_tensor_mut().1
    }
}

impl std::fmt::Debug for OrtTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtTensor")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// A loaded ONNX model with its input and output bound.
pub struct OrtSession {
    // Dropped before the session it was created from.
    io: IoBinding,
    session: OrtSessionHandle,
    output_name: String,
}

impl std::fmt::Debug for OrtSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtSession")
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl Session for OrtSession {
    type Tensor = OrtTensor;

    fn run(&mut self, _input: &OrtTensor, output: &mut OrtTensor) -> Result<(), OnnxError> {
        // The input buffer is bound in place, so ONNX Runtime already sees
        // what the caller wrote into it.
        let outputs = self.session.run_binding(&self.io).map_err(runtime_error)?;

        let (_, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(runtime_error)?;

        if data.len() != output.len() {
            return Err(OnnxError::ShapeMismatch {
                expected: output.len(),
                got: data.len(),
            });
        }
        output.data_mut().copy_from_slice(data);
        Ok(())
    }
}
