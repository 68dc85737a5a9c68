//! Image to model-input conversion.
//!
//! The model expects a planar (channel-major) float tensor: the whole red
//! plane in row-major order, then green, then blue, each value in `[0, 1]`.
//!
//! ```text
//! out[y*W + x]         = R / 255
//! out[H*W + y*W + x]   = G / 255
//! out[2*H*W + y*W + x] = B / 255
//! ```

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use lens_onnx::OnnxError;

/// Default model resolution, used when a requested dimension is not positive.
pub const DEFAULT_INPUT_SIDE: u32 = 224;

/// Number of color channels fed to the model.
pub const CHANNELS: usize = 3;

/// Spatial size of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub height: u32,
    pub width: u32,
}

impl InputSize {
    /// Builds a size from requested dimensions. If either is `<= 0`, both
    /// fall back to [`DEFAULT_INPUT_SIDE`].
    pub fn resolve(height: i32, width: i32) -> Self {
        if height <= 0 || width <= 0 {
            return Self {
                height: DEFAULT_INPUT_SIDE,
                width: DEFAULT_INPUT_SIDE,
            };
        }
        Self {
            height: height as u32,
            width: width as u32,
        }
    }

    /// Elements in one channel plane (H*W).
    pub fn plane(&self) -> usize {
        self.height as usize * self.width as usize
    }

    /// Elements in the full input tensor (3*H*W).
    pub fn tensor_len(&self) -> usize {
        CHANNELS * self.plane()
    }

    /// Input tensor shape `[1, 3, H, W]`.
    pub fn shape(&self) -> [i64; 4] {
        [1, CHANNELS as i64, self.height as i64, self.width as i64]
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::resolve(0, 0)
    }
}

/// Stretches `image` to `size` with Catmull-Rom filtering, ignoring the
/// source aspect ratio.
///
/// Color is premultiplied by alpha before resampling, so translucent pixels
/// come out composited onto black.
pub fn resize(image: &DynamicImage, size: InputSize) -> RgbaImage {
    let mut rgba = image.to_rgba8();
    premultiply(&mut rgba);
    if rgba.width() == size.width && rgba.height() == size.height {
        return rgba;
    }
    imageops::resize(&rgba, size.width, size.height, FilterType::CatmullRom)
}

fn premultiply(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let alpha = u16::from(px.0[3]);
        if alpha == 255 {
            continue;
        }
        for c in &mut px.0[..3] {
            *c = (u16::from(*c) * alpha / 255) as u8;
        }
    }
}

/// Resizes `image` and writes it into `out` in planar layout.
///
/// `out` must hold exactly `size.tensor_len()` values; previous contents are
/// overwritten.
pub fn preprocess(
    image: &DynamicImage,
    size: InputSize,
    out: &mut [f32],
) -> Result<(), OnnxError> {
    check_len(size.tensor_len(), out)?;
    let resized = resize(image, size);
    write_planar(&resized, out)
}

/// Writes the color channels of `image` into `out` as three normalized
/// planes. Alpha is not written.
pub fn write_planar(image: &RgbaImage, out: &mut [f32]) -> Result<(), OnnxError> {
    let plane = image.width() as usize * image.height() as usize;
    check_len(CHANNELS * plane, out)?;

    let (reds, rest) = out.split_at_mut(plane);
    let (greens, blues) = rest.split_at_mut(plane);

    // Pixels iterate row-major, matching the y*W+x plane offset.
    for (i, px) in image.pixels().enumerate() {
        let [r, g, b, _] = px.0;
        reds[i] = f32::from(r) / 255.0;
        greens[i] = f32::from(g) / 255.0;
        blues[i] = f32::from(b) / 255.0;
    }
    Ok(())
}

fn check_len(expected: usize, out: &[f32]) -> Result<(), OnnxError> {
    if out.len() != expected {
        return Err(OnnxError::ShapeMismatch {
            expected,
            got: out.len(),
        });
    }
    Ok(())
}
