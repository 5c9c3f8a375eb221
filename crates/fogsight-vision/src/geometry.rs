//! Geometric normalization: centered aspect-ratio crop followed by a
//! bicubic resize to a fixed pixel grid.
//!
//! Cropping always reduces exactly one axis: when the image is taller than
//! the target aspect ratio its height is trimmed, when it is wider its
//! width is trimmed, and the surviving axis is left untouched. The crop is
//! centered; the resize uses cubic convolution without antialiasing, so a
//! same-size resize is an exact identity.

use fogsight_core::ImageDim;
use ndarray::{s, Array3, ArrayView3};

/// Cubic convolution coefficient. Matches the common bicubic kernel used
/// by image runtimes for non-antialiased resampling.
const CUBIC_A: f64 = -0.75;

/// Crops `img` (channels, H, W) to the target aspect ratio with a centered
/// crop, then resizes to exactly `target`.
pub fn normalize(img: &ArrayView3<'_, f32>, target: ImageDim) -> Array3<f32> {
    let (_, h, w) = img.dim();

    let target_ratio = target.ratio();
    let ratio = h as f64 / w as f64;

    let cropped: Array3<f32> = if ratio > target_ratio {
        let crop_h = (round_half_even(w as f64 * target_ratio) as usize).min(h);
        center_crop(img, crop_h, w)
    } else if ratio < target_ratio {
        let crop_w = (round_half_even(h as f64 / target_ratio) as usize).min(w);
        center_crop(img, h, crop_w)
    } else {
        img.to_owned()
    };

    resize_bicubic(&cropped.view(), target.height, target.width)
}

/// Centered crop to (crop_h, crop_w). Odd margins follow the same
/// round-half-to-even policy as the crop-size computation.
fn center_crop(img: &ArrayView3<'_, f32>, crop_h: usize, crop_w: usize) -> Array3<f32> {
    let (_, h, w) = img.dim();
    let top = (round_half_even((h - crop_h) as f64 / 2.0) as usize).min(h - crop_h);
    let left = (round_half_even((w - crop_w) as f64 / 2.0) as usize).min(w - crop_w);

    img.slice(s![.., top..top + crop_h, left..left + crop_w])
        .to_owned()
}

/// Rounds to the nearest integer, ties to even.
fn round_half_even(x: f64) -> f64 {
    let floor = x.floor();
    let frac = x - floor;
    if frac > 0.5 {
        floor + 1.0
    } else if frac < 0.5 {
        floor
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

fn cubic_weight(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        (CUBIC_A + 2.0) * t * t * t - (CUBIC_A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        CUBIC_A * t * t * t - 5.0 * CUBIC_A * t * t + 8.0 * CUBIC_A * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

/// Separable bicubic resampling with half-pixel coordinate mapping and
/// border replication. No antialiasing prefilter is applied.
fn resize_bicubic(img: &ArrayView3<'_, f32>, out_h: usize, out_w: usize) -> Array3<f32> {
    let (c, in_h, in_w) = img.dim();

    // Horizontal pass: (c, in_h, in_w) -> (c, in_h, out_w)
    let (w_taps, w_weights) = sampling_plan(in_w, out_w);
    let mut mid = Array3::<f32>::zeros((c, in_h, out_w));
    for ch in 0..c {
        for y in 0..in_h {
            for x in 0..out_w {
                let taps = &w_taps[x];
                let weights = &w_weights[x];
                let mut acc = 0.0f64;
                for k in 0..4 {
                    acc += weights[k] * img[[ch, y, taps[k]]] as f64;
                }
                mid[[ch, y, x]] = acc as f32;
            }
        }
    }

    // Vertical pass: (c, in_h, out_w) -> (c, out_h, out_w)
    let (h_taps, h_weights) = sampling_plan(in_h, out_h);
    let mut out = Array3::<f32>::zeros((c, out_h, out_w));
    for ch in 0..c {
        for y in 0..out_h {
            let taps = &h_taps[y];
            let weights = &h_weights[y];
            for x in 0..out_w {
                let mut acc = 0.0f64;
                for k in 0..4 {
                    acc += weights[k] * mid[[ch, taps[k], x]] as f64;
                }
                out[[ch, y, x]] = acc as f32;
            }
        }
    }

    out
}

/// Precomputes the four source taps and kernel weights for every output
/// coordinate along one axis.
fn sampling_plan(in_len: usize, out_len: usize) -> (Vec<[usize; 4]>, Vec<[f64; 4]>) {
    let scale = in_len as f64 / out_len as f64;
    let mut taps = Vec::with_capacity(out_len);
    let mut weights = Vec::with_capacity(out_len);

    for dst in 0..out_len {
        let src = (dst as f64 + 0.5) * scale - 0.5;
        let base = src.floor();

        let mut t = [0usize; 4];
        let mut w = [0f64; 4];
        for k in 0..4 {
            let pos = base as i64 - 1 + k as i64;
            t[k] = pos.clamp(0, in_len as i64 - 1) as usize;
            w[k] = cubic_weight(src - pos as f64);
        }
        taps.push(t);
        weights.push(w);
    }

    (taps, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn gradient_image(c: usize, h: usize, w: usize) -> Array3<f32> {
        Array3::from_shape_fn((c, h, w), |(ch, y, x)| {
            (ch * 10_000 + y * 100 + x) as f32
        })
    }

    #[test]
    fn output_shape_is_exact() {
        for (h, w) in [(240, 320), (120, 160), (97, 311), (160, 120)] {
            let img = gradient_image(3, h, w);
            let out = normalize(&img.view(), ImageDim::new(120, 160));
            assert_eq!(out.dim(), (3, 120, 160));
        }
    }

    #[test]
    fn matching_ratio_skips_the_crop() {
        // 240x320 has the same 3:4 ratio as 120x160: the full field of view
        // survives, only scaled. Corner values map back onto corner values.
        let img = gradient_image(1, 240, 320);
        let out = normalize(&img.view(), ImageDim::new(120, 160));
        assert_eq!(out.dim(), (1, 120, 160));

        // A same-size "resize" is an exact identity.
        let small = gradient_image(1, 120, 160);
        let same = normalize(&small.view(), ImageDim::new(120, 160));
        assert_eq!(same, small);
    }

    #[test]
    fn wide_image_crop_stays_centered() {
        // 100x300 against a square target: width is cropped to 100, centered
        // at columns 100..200. A marker at the horizontal center must stay
        // at the center of the output.
        let mut img = Array3::<f32>::zeros((1, 100, 300));
        img[[0, 50, 150]] = 1.0;
        let out = normalize(&img.view(), ImageDim::new(100, 100));
        assert_eq!(out.dim(), (1, 100, 100));

        let (max_pos, max_val) = out
            .indexed_iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(pos, &v)| (pos, v))
            .unwrap();
        assert!(max_val > 0.0);
        assert!(
            (max_pos.2 as i64 - 50).abs() <= 1,
            "marker drifted to column {}",
            max_pos.2
        );
    }

    #[test]
    fn tall_image_crops_height() {
        // 300x100 against a square target: height is cropped to 100; rows
        // outside 100..200 are discarded entirely.
        let mut img = Array3::<f32>::zeros((1, 300, 100));
        img[[0, 10, 50]] = 100.0; // in the trimmed top margin
        img[[0, 150, 50]] = 1.0; // at the center
        let out = normalize(&img.view(), ImageDim::new(100, 100));

        let total: f32 = out.iter().sum();
        assert!(total < 50.0, "trimmed margin leaked into the output");
    }

    #[test]
    fn ties_round_to_even() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(2.4), 2.0);
        assert_eq!(round_half_even(2.6), 3.0);
    }

    #[test]
    fn cubic_kernel_partitions_unity() {
        // The four taps of the cubic kernel sum to one at any phase.
        for phase in [0.0, 0.1, 0.25, 0.5, 0.9] {
            let sum: f64 = (-1..=2).map(|k| cubic_weight(phase - k as f64)).sum();
            assert!((sum - 1.0).abs() < 1e-12, "phase {phase}: sum {sum}");
        }
    }
}
