use image::imageops::{self, FilterType};
use serde::Deserialize;

use crate::decode::PixelArray;
use crate::error::{Error, Result};

/// Numeric range the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PixelRange {
    /// Raw byte values cast to float.
    #[serde(rename = "0-255")]
    Raw,

    /// Byte values divided by 255.
    #[serde(rename = "0-1")]
    Unit,
}

impl Default for PixelRange {
    fn default() -> Self {
        PixelRange::Raw
    }
}

/// Input geometry and range expected by a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub width: u32,
    pub height: u32,
    pub range: PixelRange,
}

impl Default for InputSpec {
    fn default() -> Self {
        InputSpec {
            width: 256,
            height: 256,
            range: PixelRange::Raw,
        }
    }
}

/// Single-example NHWC batch, shape `[1, height, width, 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    dims: [u64; 4],
    data: Vec<f32>,
}

impl InputTensor {
    pub fn from_raw(height: u32, width: u32, data: Vec<f32>) -> Result<Self> {
        let dims = [1, u64::from(height), u64::from(width), 3];
        let expected: u64 = dims.iter().product();

        if data.len() as u64 != expected {
            return Err(Error::Preprocess(format!(
                "tensor of shape {:?} needs {} values, got {}",
                dims,
                expected,
                data.len()
            )));
        }

        Ok(InputTensor { dims, data })
    }

    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Stretch `pixels` to the model's geometry and convert to floats.
///
/// Aspect ratio is not preserved. Resampling uses the bilinear (`Triangle`)
/// filter.
pub fn preprocess(pixels: &PixelArray, spec: &InputSpec) -> Result<InputTensor> {
    if spec.width == 0 || spec.height == 0 {
        return Err(Error::Preprocess(format!(
            "invalid model input size {}x{}",
            spec.width, spec.height
        )));
    }

    let resized = imageops::resize(
        pixels.as_image(),
        spec.width,
        spec.height,
        FilterType::Triangle,
    );

    let scale = match spec.range {
        PixelRange::Raw => 1f32,
        PixelRange::Unit => 1f32 / 255f32,
    };

    let raw: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|x| f32::from(x) * scale)
        .collect();

    InputTensor::from_raw(spec.height, spec.width, raw)
}
