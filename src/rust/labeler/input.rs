use image::imageops::FilterType;
use ndarray::Array4;

use super::error::LabelerError;
use crate::models::{InputLayout, Preprocessing};

/// Decodes encoded image bytes (JPEG, PNG, ...) into the model's input tensor.
///
/// The image is resized to a square of `input_size` pixels without keeping the
/// aspect ratio, converted to RGB, and normalized per channel as
/// `(value - mean) / std`.
pub(crate) fn image_to_tensor(bytes: &[u8], pre: &Preprocessing) -> Result<Array4<f32>, LabelerError> {
    if bytes.is_empty() {
        return Err(LabelerError::DecodeError("Image data is empty".into()));
    }
    let image = image::load_from_memory(bytes)?;
    let rgb = image
        .resize_exact(pre.input_size, pre.input_size, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros(pre.input_shape());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let value = (pixel[c] as f32 - pre.mean[c]) / pre.std[c];
            match pre.layout {
                InputLayout::Nhwc => tensor[[0, y, x, c]] = value,
                InputLayout::Nchw => tensor[[0, c, y, x]] = value,
            }
        }
    }
    Ok(tensor)
}
