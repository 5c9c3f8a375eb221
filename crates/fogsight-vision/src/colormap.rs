//! False-color mapping of single-channel images.
//!
//! Two mappers exist: a piecewise-linear gradient across a list of RGB
//! anchor colors (used with 3-channel views), and an exponential tone curve
//! that keeps a single channel while stretching contrast in the bright,
//! fog-dominated range.

use fogsight_core::{Colormap, Error, Result};
use ndarray::{Array3, ArrayView3};

/// The stock visibility ramp: black through purple, blue, green, yellow
/// and orange to red.
const VISIBILITY_ANCHORS: [[u8; 3]; 11] = [
    [0x00, 0x00, 0x00],
    [0x3F, 0x00, 0x3F],
    [0x7E, 0x00, 0x7E],
    [0x43, 0x00, 0xBD],
    [0x03, 0x00, 0xFD],
    [0x00, 0x3F, 0x82],
    [0x00, 0x7D, 0x05],
    [0x7C, 0xBE, 0x00],
    [0xFB, 0xFE, 0x00],
    [0xFF, 0x7F, 0x00],
    [0xFF, 0x05, 0x00],
];

/// Piecewise-linear gradient over evenly spaced RGB anchors in [0,1].
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorGradient {
    anchors: Vec<[f32; 3]>,
}

impl AnchorGradient {
    pub fn new(anchors: Vec<[f32; 3]>) -> Result<Self> {
        if anchors.len() < 2 {
            return Err(Error::Config(
                "a colormap gradient needs at least two anchor colors".into(),
            ));
        }
        Ok(Self { anchors })
    }

    /// The stock 11-anchor visibility ramp.
    pub fn visibility_ramp() -> Self {
        let anchors = VISIBILITY_ANCHORS
            .iter()
            .map(|rgb| {
                [
                    rgb[0] as f32 / 255.0,
                    rgb[1] as f32 / 255.0,
                    rgb[2] as f32 / 255.0,
                ]
            })
            .collect();
        Self { anchors }
    }

    /// Evaluates the gradient at `v`, clamped to [0,1].
    pub fn eval(&self, v: f32) -> [f32; 3] {
        let v = v.clamp(0.0, 1.0);
        let segments = self.anchors.len() - 1;
        let pos = v * segments as f32;
        let idx = (pos.floor() as usize).min(segments - 1);
        let t = pos - idx as f32;

        let lo = self.anchors[idx];
        let hi = self.anchors[idx + 1];
        [
            lo[0] + (hi[0] - lo[0]) * t,
            lo[1] + (hi[1] - lo[1]) * t,
            lo[2] + (hi[2] - lo[2]) * t,
        ]
    }

    /// Maps a (1, H, W) image in [0,1] to a (3, H, W) false-color image.
    pub fn map(&self, gray: &ArrayView3<'_, f32>) -> Array3<f32> {
        let (c, h, w) = gray.dim();
        assert_eq!(c, 1, "colormap input must be single-channel");

        let mut out = Array3::<f32>::zeros((3, h, w));
        for y in 0..h {
            for x in 0..w {
                let rgb = self.eval(gray[[0, y, x]]);
                out[[0, y, x]] = rgb[0];
                out[[1, y, x]] = rgb[1];
                out[[2, y, x]] = rgb[2];
            }
        }
        out
    }
}

/// Exponential fog-highlight curve: `v' = 1.02^(255*v - 255)`, clamped to
/// [0,1]. Near-saturated pixels keep most of their value while darker ones
/// collapse toward zero, emphasizing dense fog regions. Single-channel in,
/// single-channel out.
pub fn fog_highlight(gray: &ArrayView3<'_, f32>) -> Array3<f32> {
    let (c, _, _) = gray.dim();
    assert_eq!(c, 1, "fog highlight input must be single-channel");

    gray.mapv(|v| 1.02f32.powf(255.0 * v - 255.0).clamp(0.0, 1.0))
}

/// Resolves a colormap configuration into the gradient used for 3-channel
/// views, when it names one.
pub fn resolve_gradient(colormap: &Colormap) -> Result<Option<AnchorGradient>> {
    match colormap {
        Colormap::VisibilityRamp => Ok(Some(AnchorGradient::visibility_ramp())),
        Colormap::Anchors(anchors) => Ok(Some(AnchorGradient::new(anchors.clone())?)),
        Colormap::FogHighlight => Ok(None),
    }
}
