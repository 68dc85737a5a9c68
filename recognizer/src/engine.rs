//! Inference engine: one compiled session, two reusable buffers and a label
//! table, released together.

use std::fmt;
use std::path::Path;

use image::DynamicImage;
use lens_onnx::{Binding, Runtime, Session, TensorBuffer};
use tracing::debug;

use crate::error::{EngineError, PredictError};
use crate::labels::LabelTable;
use crate::postprocess::argmax;
use crate::preprocess::{preprocess, InputSize};

/// Name of the model's single input node.
pub const INPUT_NAME: &str = "data";

/// Name of the model's single output node.
pub const OUTPUT_NAME: &str = "mobilenetv20_output_flatten0_reshape0";

/// Number of classes the bound model scores.
pub const NUM_CLASSES: usize = 1000;

/// Classifies images with one fixed model.
///
/// The engine owns a session and its input/output buffers. Every call
/// overwrites the input buffer and reads the output buffer in place, so a
/// call needs `&mut self`: one call in flight per engine. To serve concurrent
/// callers, give each its own engine or share an
/// [`EnginePool`](crate::EnginePool).
///
/// Native resources are released by [`Engine::release`] or on drop,
/// whichever comes first.
pub struct Engine<R: Runtime> {
    session: Option<R::Session>,
    input: Option<R::Tensor>,
    output: Option<R::Tensor>,
    labels: LabelTable,
    size: InputSize,
}

impl<R: Runtime + Default> Engine<R> {
    /// Creates an engine on the default runtime.
    ///
    /// If either dimension is not positive, 224x224 is used.
    pub fn new(
        model_path: impl AsRef<Path>,
        label_path: impl AsRef<Path>,
        input_height: i32,
        input_width: i32,
    ) -> Result<Self, EngineError> {
        Self::with_runtime(&R::default(), model_path, label_path, input_height, input_width)
    }
}

impl<R: Runtime> Engine<R> {
    /// Creates an engine on `runtime`.
    ///
    /// Initializes the runtime environment on first use, allocates the input
    /// (1x3xHxW) and output (1x1000) buffers, compiles the session against
    /// them, then loads the labels. Anything allocated before a failure is
    /// released before the error is returned.
    pub fn with_runtime(
        runtime: &R,
        model_path: impl AsRef<Path>,
        label_path: impl AsRef<Path>,
        input_height: i32,
        input_width: i32,
    ) -> Result<Self, EngineError> {
        let model_path = model_path.as_ref();
        let label_path = label_path.as_ref();
        let size = InputSize::resolve(input_height, input_width);

        runtime.ensure_initialized()?;

        let input_shape = size.shape();
        let output_shape = [1, NUM_CLASSES as i64];

        let input = runtime
            .new_tensor(&input_shape)
            .map_err(|source| EngineError::Tensor {
                which: "input",
                source,
            })?;
        let output = runtime
            .new_tensor(&output_shape)
            .map_err(|source| EngineError::Tensor {
                which: "output",
                source,
            })?;

        let binding = Binding {
            input_name: INPUT_NAME,
            input: &input,
            output_name: OUTPUT_NAME,
            output: &output,
        };
        let session = match runtime.new_session(model_path, &binding) {
            Ok(session) => session,
            Err(source) => {
                drop(input);
                drop(output);
                return Err(EngineError::ModelLoad {
                    path: model_path.to_path_buf(),
                    source,
                });
            }
        };

        // Partial handles go in the same order as `release`.
        let labels = match LabelTable::load(label_path) {
            Ok(labels) => labels,
            Err(err) => {
                drop(session);
                drop(input);
                drop(output);
                return Err(err.into());
            }
        };

        debug!(
            model = %model_path.display(),
            height = size.height,
            width = size.width,
            labels = labels.len(),
            "engine ready"
        );

        Ok(Self {
            session: Some(session),
            input: Some(input),
            output: Some(output),
            labels,
            size,
        })
    }

    /// Model input resolution.
    pub fn input_size(&self) -> InputSize {
        self.size
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Decodes `raw` (format auto-detected) and classifies it.
    pub fn predict_from_bytes(&mut self, raw: &[u8]) -> Result<String, PredictError> {
        let image = image::load_from_memory(raw)?;
        self.predict_from_image(&image)
    }

    /// Reads and classifies the image file at `path`.
    pub fn predict_from_file(&mut self, path: impl AsRef<Path>) -> Result<String, PredictError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| PredictError::ImageNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        self.predict_from_bytes(&raw)
    }

    /// Classifies a decoded image.
    ///
    /// Returns the best label, or [`UNKNOWN_LABEL`](crate::UNKNOWN_LABEL)
    /// when the winning class has no entry in the label table.
    pub fn predict_from_image(&mut self, image: &DynamicImage) -> Result<String, PredictError> {
        self.stage_input(image)?;
        self.execute()
    }

    /// Writes the preprocessed image into the input buffer.
    pub(crate) fn stage_input(&mut self, image: &DynamicImage) -> Result<(), PredictError> {
        let input = self.input.as_mut().ok_or(PredictError::Released)?;
        preprocess(image, self.size, input.data_mut()).map_err(PredictError::Inference)
    }

    /// Runs the session over the current input buffer and resolves the label.
    pub(crate) fn execute(&mut self) -> Result<String, PredictError> {
        let (Some(session), Some(input), Some(output)) =
            (self.session.as_mut(), self.input.as_ref(), self.output.as_mut())
        else {
            return Err(PredictError::Released);
        };

        session.run(input, output).map_err(PredictError::Inference)?;

        let index = argmax(output.data()).ok_or(PredictError::EmptyOutput)?;
        Ok(self.labels.resolve(index).to_string())
    }

    /// Releases the session, then the input buffer, then the output buffer.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn release(&mut self) {
        let released = self.session.is_some() || self.input.is_some() || self.output.is_some();
        drop(self.session.take());
        drop(self.input.take());
        drop(self.output.take());
        if released {
            debug!("engine released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.session.is_none() && self.input.is_none() && self.output.is_none()
    }

    #[cfg(test)]
    pub(crate) fn input_data(&self) -> Option<&[f32]> {
        self.input.as_ref().map(TensorBuffer::data)
    }
}

impl<R: Runtime> Drop for Engine<R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: Runtime> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("size", &self.size)
            .field("labels", &self.labels.len())
            .field("released", &self.is_released())
            .finish()
    }
}

/// Engine on the ONNX Runtime backend.
#[cfg(feature = "onnx")]
pub type OnnxEngine = Engine<lens_onnx::OrtRuntime>;
