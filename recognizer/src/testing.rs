//! Test doubles: a resource-counting fake runtime and image fixtures.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lens_onnx::{
    dims_compatible, element_count, Binding, Environment, OnnxError, Runtime, Session,
    TensorBuffer,
};
use parking_lot::Mutex;

/// Maps the input buffer to the output buffer.
pub(crate) type Forward = Arc<dyn Fn(&[f32], &mut [f32]) + Send + Sync>;

/// Construction step to fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Init,
    InputTensor,
    OutputTensor,
    Session,
}

/// Shared counters for every handle a [`FakeRuntime`] hands out.
#[derive(Default)]
struct Ledger {
    live: AtomicUsize,
    allocated: AtomicUsize,
    released: Mutex<Vec<&'static str>>,
}

/// Handle that counts itself in the ledger until dropped.
struct Handle {
    kind: &'static str,
    ledger: Arc<Ledger>,
}

impl Handle {
    fn new(kind: &'static str, ledger: &Arc<Ledger>) -> Self {
        ledger.live.fetch_add(1, Ordering::SeqCst);
        ledger.allocated.fetch_add(1, Ordering::SeqCst);
        Self {
            kind,
            ledger: Arc::clone(ledger),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.ledger.live.fetch_sub(1, Ordering::SeqCst);
        self.ledger.released.lock().push(self.kind);
    }
}

pub(crate) struct FakeTensor {
    shape: Vec<i64>,
    data: Vec<f32>,
    _handle: Handle,
}

impl TensorBuffer for FakeTensor {
    fn shape(&self) -> &[i64] {
        &self.shape
    }

    fn data(&self) -> &[f32] {
        &self.data
    }

    fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

pub(crate) struct FakeSession {
    forward: Forward,
    fail_run: Arc<AtomicBool>,
    _handle: Handle,
}

impl Session for FakeSession {
    type Tensor = FakeTensor;

    fn run(&mut self, input: &FakeTensor, output: &mut FakeTensor) -> Result<(), OnnxError> {
        if self.fail_run.load(Ordering::SeqCst) {
            return Err(OnnxError::Runtime("device lost".into()));
        }
        (self.forward)(&input.data, &mut output.data);
        Ok(())
    }
}

/// In-memory runtime that tracks every handle it creates.
///
/// Its default model scores the three color planes: output `c` is the sum of
/// input plane `c` for `c < 3`, everything else is zero.
pub(crate) struct FakeRuntime {
    env: Environment,
    init_calls: AtomicUsize,
    ledger: Arc<Ledger>,
    fail: Option<Stage>,
    fail_run: Arc<AtomicBool>,
    empty_output: bool,
    input_dims: Vec<i64>,
    forward: Forward,
}

impl FakeRuntime {
    pub(crate) fn new() -> Self {
        Self {
            env: Environment::new(),
            init_calls: AtomicUsize::new(0),
            ledger: Arc::default(),
            fail: None,
            fail_run: Arc::new(AtomicBool::new(false)),
            empty_output: false,
            input_dims: vec![1, 3, -1, -1],
            forward: Arc::new(forward_channel_sums),
        }
    }

    pub(crate) fn failing(mut self, stage: Stage) -> Self {
        self.fail = Some(stage);
        self
    }

    pub(crate) fn with_forward(mut self, forward: Forward) -> Self {
        self.forward = forward;
        self
    }

    pub(crate) fn with_empty_output(mut self) -> Self {
        self.empty_output = true;
        self
    }

    /// Input shape the fake model declares. Negative dimensions are free.
    pub(crate) fn with_input_dims(mut self, dims: &[i64]) -> Self {
        self.input_dims = dims.to_vec();
        self
    }

    pub(crate) fn set_run_failure(&self, fail: bool) {
        self.fail_run.store(fail, Ordering::SeqCst);
    }

    /// Handles currently alive.
    pub(crate) fn live(&self) -> usize {
        self.ledger.live.load(Ordering::SeqCst)
    }

    /// Handles ever created.
    pub(crate) fn allocated(&self) -> usize {
        self.ledger.allocated.load(Ordering::SeqCst)
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Kinds of released handles, in release order.
    pub(crate) fn release_log(&self) -> Vec<&'static str> {
        self.ledger.released.lock().clone()
    }

    fn check(&self, stage: Stage) -> Result<(), OnnxError> {
        if self.fail == Some(stage) {
            return Err(OnnxError::Runtime(format!("injected {stage:?} failure")));
        }
        Ok(())
    }
}

impl Runtime for FakeRuntime {
    type Tensor = FakeTensor;
    type Session = FakeSession;

    fn environment(&self) -> &Environment {
        &self.env
    }

    fn initialize(&self) -> Result<(), OnnxError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Stage::Init)
    }

    fn new_tensor(&self, shape: &[i64]) -> Result<FakeTensor, OnnxError> {
        let is_input = shape.len() == 4;
        if is_input {
            self.check(Stage::InputTensor)?;
        } else {
            self.check(Stage::OutputTensor)?;
        }
        let len = if !is_input && self.empty_output {
            0
        } else {
            element_count(shape)?
        };
        Ok(FakeTensor {
            shape: shape.to_vec(),
            data: vec![0.0; len],
            _handle: Handle::new(if is_input { "input" } else { "output" }, &self.ledger),
        })
    }

    fn new_session(
        &self,
        _model_path: &Path,
        binding: &Binding<'_, FakeTensor>,
    ) -> Result<FakeSession, OnnxError> {
        self.check(Stage::Session)?;
        check_bound("input", binding.input_name, &self.input_dims, binding.input)?;
        check_bound("output", binding.output_name, &[1, -1], binding.output)?;
        Ok(FakeSession {
            forward: Arc::clone(&self.forward),
            fail_run: Arc::clone(&self.fail_run),
            _handle: Handle::new("session", &self.ledger),
        })
    }
}

fn check_bound(
    kind: &'static str,
    name: &str,
    declared: &[i64],
    bound: &FakeTensor,
) -> Result<(), OnnxError> {
    if dims_compatible(declared, bound.shape()) {
        return Ok(());
    }
    Err(OnnxError::IncompatibleShape {
        kind,
        name: name.to_string(),
        declared: declared.to_vec(),
        bound: bound.shape().to_vec(),
    })
}

fn forward_channel_sums(input: &[f32], output: &mut [f32]) {
    output.fill(0.0);
    let plane = input.len() / 3;
    for (c, score) in output.iter_mut().take(3).enumerate() {
        *score = input[c * plane..(c + 1) * plane].iter().sum();
    }
}

/// Model that always puts all weight on `index`.
pub(crate) fn forward_hot(index: usize) -> Forward {
    Arc::new(move |_input: &[f32], output: &mut [f32]| {
        output.fill(0.0);
        output[index] = 1.0;
    })
}

/// Writes a label file into `dir`.
pub(crate) fn write_labels(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("labels.txt");
    std::fs::write(&path, content).unwrap();
    path
}

pub(crate) fn solid(color: [u8; 3], width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// Encodes `image` as PNG.
pub(crate) fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
