//! Frequency-domain weight masks and their memoization cache.
//!
//! A mask is a weight grid matching the half-spectrum of the configured
//! image size; multiplying the centered spectrum by the mask suppresses the
//! frequency components where the weight is zero. Masks are pure functions
//! of their parameters and the spectrum grid, so they are computed once and
//! shared; the nested render loop is the expensive part.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fogsight_core::{Error, MaskDim, Result};
use ndarray::Array2;

/// Row and column spans of the rectangular notch on the centered spectrum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotchBounds {
    pub rows: std::ops::Range<usize>,
    pub cols: std::ops::Range<usize>,
}

/// Computes the notch placement for `mask` on a `spectrum` grid, rejecting
/// geometry that would fall outside the grid.
///
/// The row window spans `mask.height` centered on the spectrum. The column
/// window spans `mask.width / 2` and its start is offset from the center by
/// a quarter of the mask HEIGHT, not the width; the notch is horizontally
/// asymmetric.
pub fn notch_bounds(mask: MaskDim, spectrum: (usize, usize)) -> Result<NotchBounds> {
    let (spec_h, spec_w) = spectrum;

    let out_of_bounds = || Error::MaskOutOfBounds {
        mask_h: mask.height,
        mask_w: mask.width,
        spectrum_h: spec_h,
        spectrum_w: spec_w,
    };

    let row_start = (spec_h / 2)
        .checked_sub(mask.height / 2)
        .ok_or_else(out_of_bounds)?;
    let col_start = (spec_w / 2)
        .checked_sub(mask.height / 4)
        .ok_or_else(out_of_bounds)?;

    let row_end = row_start + mask.height;
    let col_end = col_start + mask.width / 2;
    if row_end > spec_h || col_end > spec_w {
        return Err(out_of_bounds());
    }

    Ok(NotchBounds {
        rows: row_start..row_end,
        cols: col_start..col_end,
    })
}

/// Cache key: mask parameters plus the spectrum grid they were rendered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MaskKey {
    Notch {
        mask: (usize, usize),
        spectrum: (usize, usize),
    },
    RadialHighpass {
        radius_bits: u32,
        spectrum: (usize, usize),
    },
}

/// Compute-once cache of frequency masks, keyed by mask parameters and
/// spectrum grid. Entries are never invalidated; concurrent readers share
/// the rendered masks through `Arc` and inserts go through a guarded path.
#[derive(Debug, Default)]
pub struct MaskCache {
    masks: Mutex<HashMap<MaskKey, Arc<Array2<f32>>>>,
}

impl MaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct masks rendered so far.
    pub fn len(&self) -> usize {
        self.masks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hard rectangular notch: weight zero inside the bounds computed by
    /// [`notch_bounds`], one everywhere else.
    pub fn notch(&self, mask: MaskDim, spectrum: (usize, usize)) -> Result<Arc<Array2<f32>>> {
        let bounds = notch_bounds(mask, spectrum)?;
        let key = MaskKey::Notch {
            mask: (mask.height, mask.width),
            spectrum,
        };
        Ok(self.get_or_render(key, || {
            let mut weights = Array2::<f32>::ones(spectrum);
            for y in bounds.rows.clone() {
                for x in bounds.cols.clone() {
                    weights[[y, x]] = 0.0;
                }
            }
            weights
        }))
    }

    /// Soft elliptical high-pass mask: weights rise from zero at the
    /// spectrum center to one at `radius` (as a fraction of each spectrum
    /// axis), with an eighth-power falloff.
    pub fn radial_highpass(
        &self,
        radius: f32,
        spectrum: (usize, usize),
    ) -> Result<Arc<Array2<f32>>> {
        if !(radius > 0.0 && radius <= 1.0) {
            return Err(Error::Config(format!(
                "radial mask radius must be in (0, 1], got {radius}"
            )));
        }

        let key = MaskKey::RadialHighpass {
            radius_bits: radius.to_bits(),
            spectrum,
        };
        Ok(self.get_or_render(key, || {
            let (spec_h, spec_w) = spectrum;
            let mut weights = Array2::<f32>::ones(spectrum);

            let radius_h = spec_h as f64 * radius as f64;
            let radius_w = spec_w as f64 * radius as f64;
            let center_y = (spec_h - 1) as f64 / 2.0;
            let center_x = (spec_w - 1) as f64 / 2.0;

            let top = ((center_y.floor() - radius_h) as i64).max(0) as usize;
            let bottom = ((center_y.ceil() + radius_h) as i64).min(spec_h as i64) as usize;
            let left = ((center_x.floor() - radius_w) as i64).max(0) as usize;
            let right = ((center_x.ceil() + radius_w) as i64).min(spec_w as i64) as usize;

            for y in top..bottom {
                for x in left..right {
                    let dy = (y as f64 - center_y).abs() / radius_h;
                    let dx = (x as f64 - center_x).abs() / radius_w;
                    let distance = (dy * dy + dx * dx).sqrt().min(1.0);
                    weights[[y, x]] = distance.powi(8) as f32;
                }
            }
            weights
        }))
    }

    fn get_or_render<F>(&self, key: MaskKey, render: F) -> Arc<Array2<f32>>
    where
        F: FnOnce() -> Array2<f32>,
    {
        let mut masks = self.masks.lock().unwrap();
        masks
            .entry(key)
            .or_insert_with(|| Arc::new(render()))
            .clone()
    }
}
