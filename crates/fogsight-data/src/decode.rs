//! Image decoding into the channel-major float layout the pipeline expects.

use std::path::Path;

use fogsight_core::{Error, Result};
use ndarray::Array3;

/// Decodes an image file into a (3, H, W) array with values in [0,255].
/// Every source is converted to RGB regardless of its stored color type.
pub fn decode_image(path: &Path) -> Result<Array3<f32>> {
    let img = image::open(path)
        .map_err(|e| Error::Decode(format!("{}: {e}", path.display())))?
        .to_rgb8();

    let (w, h) = img.dimensions();
    let mut out = Array3::<f32>::zeros((3, h as usize, w as usize));
    for (x, y, pixel) in img.enumerate_pixels() {
        out[[0, y as usize, x as usize]] = pixel[0] as f32;
        out[[1, y as usize, x as usize]] = pixel[1] as f32;
        out[[2, y as usize, x as usize]] = pixel[2] as f32;
    }
    Ok(out)
}
