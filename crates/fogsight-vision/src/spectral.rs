//! Frequency-domain high-pass filtering of single-channel images.
//!
//! The filter transforms a (1, H, W) image with a real-input 2D FFT into a
//! (H, W/2+1) complex half-spectrum, centers the spectrum, scales it by a
//! weight mask, restores the corner-origin layout and inverts back to the
//! spatial domain at the original size. Output values are real and NOT
//! clamped here; display-range clamping happens downstream.

use std::sync::Arc;

use fogsight_core::{ImageDim, Result, SpectralMask};
use ndarray::{Array2, Array3, ArrayView3};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::mask::MaskCache;

/// High-pass filter for a fixed image grid. FFT plans and the weight mask
/// are prepared once at construction; mask geometry that does not fit the
/// spectrum is rejected here, never mid-batch.
pub struct HighpassFilter {
    img_dim: ImageDim,
    weights: Arc<Array2<f32>>,
    fwd_row: Arc<dyn Fft<f32>>,
    fwd_col: Arc<dyn Fft<f32>>,
    inv_row: Arc<dyn Fft<f32>>,
    inv_col: Arc<dyn Fft<f32>>,
}

impl HighpassFilter {
    pub fn new(img_dim: ImageDim, mask: SpectralMask, masks: &MaskCache) -> Result<Self> {
        let spectrum = img_dim.spectrum();
        let weights = match mask {
            SpectralMask::Notch(mask_dim) => masks.notch(mask_dim, spectrum)?,
            SpectralMask::RadialHighpass { radius } => {
                masks.radial_highpass(radius, spectrum)?
            }
        };

        let mut planner = FftPlanner::new();
        let fwd_row = planner.plan_fft_forward(img_dim.width);
        let fwd_col = planner.plan_fft_forward(img_dim.height);
        let inv_row = planner.plan_fft_inverse(img_dim.width);
        let inv_col = planner.plan_fft_inverse(img_dim.height);

        Ok(Self {
            img_dim,
            weights,
            fwd_row,
            fwd_col,
            inv_row,
            inv_col,
        })
    }

    pub fn img_dim(&self) -> ImageDim {
        self.img_dim
    }

    /// Filters a (1, H, W) image matching the configured grid. Deterministic:
    /// identical input yields bit-identical output.
    pub fn apply(&self, img: &ArrayView3<'_, f32>) -> Array3<f32> {
        let (c, h, w) = img.dim();
        assert_eq!(c, 1, "high-pass filter expects a single-channel image");
        assert_eq!(
            (h, w),
            (self.img_dim.height, self.img_dim.width),
            "image does not match the configured filter grid"
        );

        let (spec_h, spec_w) = self.img_dim.spectrum();

        // Forward: real FFT along rows, keeping the non-redundant half.
        let mut spectrum = Array2::<Complex<f32>>::zeros((spec_h, spec_w));
        let mut row_buf = vec![Complex::new(0.0f32, 0.0); w];
        for y in 0..h {
            for x in 0..w {
                row_buf[x] = Complex::new(img[[0, y, x]], 0.0);
            }
            self.fwd_row.process(&mut row_buf);
            for x in 0..spec_w {
                spectrum[[y, x]] = row_buf[x];
            }
        }

        // Forward: complex FFT along columns.
        let mut col_buf = vec![Complex::new(0.0f32, 0.0); h];
        for x in 0..spec_w {
            for y in 0..h {
                col_buf[y] = spectrum[[y, x]];
            }
            self.fwd_col.process(&mut col_buf);
            for y in 0..h {
                spectrum[[y, x]] = col_buf[y];
            }
        }

        // Center the spectrum, scale by the mask, restore the layout.
        let mut centered = roll2(&spectrum, spec_h / 2, spec_w / 2);
        centered.zip_mut_with(self.weights.as_ref(), |s, &m| *s = *s * m);
        let mut spectrum = roll2(&centered, spec_h - spec_h / 2, spec_w - spec_w / 2);

        // Inverse: complex FFT along columns.
        for x in 0..spec_w {
            for y in 0..h {
                col_buf[y] = spectrum[[y, x]];
            }
            self.inv_col.process(&mut col_buf);
            for y in 0..h {
                spectrum[[y, x]] = col_buf[y];
            }
        }

        // Inverse: rebuild each full row from conjugate symmetry, invert,
        // keep the real part with backward 1/(H*W) normalization.
        let scale = 1.0 / (h * w) as f32;
        let mut out = Array3::<f32>::zeros((1, h, w));
        for y in 0..h {
            for x in 0..spec_w {
                row_buf[x] = spectrum[[y, x]];
            }
            for x in spec_w..w {
                row_buf[x] = spectrum[[y, w - x]].conj();
            }
            self.inv_row.process(&mut row_buf);
            for x in 0..w {
                out[[0, y, x]] = row_buf[x].re * scale;
            }
        }

        out
    }
}

/// Cyclic roll of a 2D array: element (y, x) moves to
/// ((y + dy) % h, (x + dx) % w).
fn roll2(src: &Array2<Complex<f32>>, dy: usize, dx: usize) -> Array2<Complex<f32>> {
    let (h, w) = src.dim();
    let mut out = Array2::<Complex<f32>>::zeros((h, w));
    for y in 0..h {
        let ty = (y + dy) % h;
        for x in 0..w {
            out[[ty, (x + dx) % w]] = src[[y, x]];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogsight_core::MaskDim;
    use ndarray::Array3;

    fn notch(h: usize, w: usize) -> SpectralMask {
        SpectralMask::Notch(MaskDim::new(h, w))
    }

    fn textured_image(h: usize, w: usize) -> Array3<f32> {
        Array3::from_shape_fn((1, h, w), |(_, y, x)| {
            (0.3 * (y as f32 * 0.7).sin() + 0.5 * (x as f32 * 1.3).cos() + 0.5).clamp(0.0, 1.0)
        })
    }

    fn max_abs_diff(a: &Array3<f32>, b: &Array3<f32>) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0f32, f32::max)
    }

    #[test]
    fn filter_is_deterministic() {
        let masks = MaskCache::new();
        let filter = HighpassFilter::new(ImageDim::new(24, 32), notch(6, 8), &masks).unwrap();
        let img = textured_image(24, 32);

        let a = filter.apply(&img.view());
        let b = filter.apply(&img.view());
        assert_eq!(a, b);
    }

    #[test]
    fn zero_mask_round_trips() {
        let masks = MaskCache::new();
        let filter = HighpassFilter::new(ImageDim::new(24, 32), notch(0, 0), &masks).unwrap();
        let img = textured_image(24, 32);

        let out = filter.apply(&img.view());
        let max_err = max_abs_diff(&img, &out);
        assert!(max_err < 1e-4, "round-trip error {max_err}");
    }

    #[test]
    fn odd_width_round_trips() {
        let masks = MaskCache::new();
        let filter = HighpassFilter::new(ImageDim::new(17, 21), notch(0, 0), &masks).unwrap();
        let img = textured_image(17, 21);

        let out = filter.apply(&img.view());
        let max_err = max_abs_diff(&img, &out);
        assert!(max_err < 1e-4, "round-trip error {max_err}");
    }

    #[test]
    fn notch_removes_dc_energy() {
        // A constant image is pure DC; the notch covers the spectrum center,
        // so the output collapses toward zero mean.
        let masks = MaskCache::new();
        let filter = HighpassFilter::new(ImageDim::new(16, 16), notch(4, 4), &masks).unwrap();
        let img = Array3::from_elem((1, 16, 16), 0.5f32);

        let out = filter.apply(&img.view());
        let mean = out.iter().sum::<f32>() / out.len() as f32;
        assert!(mean.abs() < 1e-3, "residual mean {mean}");
    }

    #[test]
    fn radial_mask_attenuates_dc_energy() {
        let masks = MaskCache::new();
        let filter = HighpassFilter::new(
            ImageDim::new(16, 16),
            SpectralMask::RadialHighpass { radius: 0.3 },
            &masks,
        )
        .unwrap();
        let img = Array3::from_elem((1, 16, 16), 0.5f32);

        let out = filter.apply(&img.view());
        let mean = out.iter().sum::<f32>() / out.len() as f32;
        assert!(mean.abs() < 0.05, "residual mean {mean}");
    }

    #[test]
    fn oversized_mask_fails_at_construction() {
        let masks = MaskCache::new();
        assert!(HighpassFilter::new(ImageDim::new(16, 16), notch(64, 4), &masks).is_err());
    }
}
