//! Backend-neutral session and tensor types.
//!
//! An inference backend implements [`Runtime`]. Sessions are compiled against
//! a fixed [`Binding`]: one named input and one named output, each tied to a
//! buffer the caller allocated up front. The same two buffers serve every
//! call.

use std::path::Path;

use crate::env::Environment;
use crate::error::{EnvironmentError, OnnxError};

/// A float32 buffer with a fixed shape.
pub trait TensorBuffer {
    /// Returns the tensor dimensions.
    fn shape(&self) -> &[i64];

    fn data(&self) -> &[f32];

    fn data_mut(&mut self) -> &mut [f32];

    /// Number of elements.
    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// The named input and output a session is compiled against, with the
/// buffers bound to them.
pub struct Binding<'a, T> {
    pub input_name: &'a str,
    pub input: &'a T,
    pub output_name: &'a str,
    pub output: &'a T,
}

/// A compiled model bound to one input and one output.
pub trait Session {
    type Tensor: TensorBuffer;

    /// Runs one forward pass, reading `input` and overwriting `output`.
    ///
    /// `input` and `output` must be the buffers the session was compiled
    /// with.
    fn run(&mut self, input: &Self::Tensor, output: &mut Self::Tensor) -> Result<(), OnnxError>;
}

/// An inference backend.
pub trait Runtime {
    type Tensor: TensorBuffer;
    type Session: Session<Tensor = Self::Tensor>;

    /// The process-wide environment for this backend.
    fn environment(&self) -> &Environment;

    /// One-time native setup. Only called through [`Runtime::ensure_initialized`].
    fn initialize(&self) -> Result<(), OnnxError>;

    /// Allocates a zeroed tensor with the given shape.
    fn new_tensor(&self, shape: &[i64]) -> Result<Self::Tensor, OnnxError>;

    /// Loads the model at `model_path`, checks that it declares the bound
    /// input and output with compatible shapes, and binds the buffers.
    fn new_session(
        &self,
        model_path: &Path,
        binding: &Binding<'_, Self::Tensor>,
    ) -> Result<Self::Session, OnnxError>;

    /// Initializes the environment on first use and replays the outcome.
    fn ensure_initialized(&self) -> Result<(), EnvironmentError> {
        self.environment().ensure_initialized(|| self.initialize())
    }
}

/// Number of elements described by `shape`.
pub fn element_count(shape: &[i64]) -> Result<usize, OnnxError> {
    if shape.is_empty() {
        return Err(OnnxError::EmptyData);
    }
    shape.iter().try_fold(1usize, |acc, &d| {
        if d <= 0 {
            return Err(OnnxError::Runtime(format!(
                "invalid tensor dimension {d} in shape {shape:?}"
            )));
        }
        acc.checked_mul(d as usize)
            .ok_or_else(|| OnnxError::Runtime(format!("tensor shape {shape:?} overflows")))
    })
}

/// Whether a model's declared `dims` accept a buffer of shape `shape`.
/// Negative declared dimensions are symbolic and match any size.
pub fn dims_compatible(dims: &[i64], shape: &[i64]) -> bool {
    dims.len() == shape.len() && dims.iter().zip(shape).all(|(&d, &s)| d < 0 || d == s)
}
