//! Per-sample preprocessing pipeline.
//!
//! Composes geometric normalization, grayscale reduction, false-color
//! mapping and frequency filtering into the packed multi-view sample the
//! network consumes. All geometry and colormap validation happens at
//! construction; the per-sample path assumes a valid configuration.

use fogsight_core::{
    ColorChannels, Error, GraySource, Label, PipelineConfig, Result, ViewKind,
};
use ndarray::{s, Array3};

use crate::colormap::{fog_highlight, resolve_gradient, AnchorGradient};
use crate::geometry::normalize;
use crate::mask::MaskCache;
use crate::spectral::HighpassFilter;
use crate::view::MultiViewSample;

/// Builds multi-view samples from decoded RGB images.
pub struct FramePipeline {
    config: PipelineConfig,
    gradient: Option<AnchorGradient>,
    highpass: Option<HighpassFilter>,
}

impl FramePipeline {
    /// Validates `config` and prepares the filter and colormap stages.
    /// Mask geometry that does not fit the configured spectrum is rejected
    /// here.
    pub fn new(config: PipelineConfig, masks: &MaskCache) -> Result<Self> {
        config.validate()?;

        let gradient = match &config.colormap {
            Some(colormap) => resolve_gradient(colormap)?,
            None => None,
        };

        let highpass = config
            .mask
            .map(|mask| HighpassFilter::new(config.img_dim, mask, masks))
            .transpose()?;

        Ok(Self {
            config,
            gradient,
            highpass,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The view set every processed sample will carry, in packing order.
    pub fn view_kinds(&self) -> Vec<ViewKind> {
        let mut kinds = vec![ViewKind::Original];
        if self.config.colormap.is_some() {
            kinds.push(ViewKind::PseudoColor);
        }
        if self.highpass.is_some() {
            kinds.push(ViewKind::Frequency);
        }
        kinds
    }

    /// Processes one decoded (3, H, W) image with values in [0,255] into a
    /// packed sample; the label passes through untouched.
    pub fn process(&self, img: Array3<f32>, label: Label) -> Result<MultiViewSample> {
        let (c, _, _) = img.dim();
        if c != 3 {
            return Err(Error::ChannelMismatch {
                expected: 3,
                actual: c,
            });
        }

        let orig = normalize(&img.view(), self.config.img_dim).mapv(|v| v / 255.0);

        let wants_pseudo = self.config.colormap.is_some();
        let gray = if wants_pseudo || self.highpass.is_some() {
            Some(self.reduce_gray(&orig))
        } else {
            None
        };

        let mut views = Vec::with_capacity(3);
        let orig_view = match self.config.channels {
            ColorChannels::Rgb => orig,
            ColorChannels::Gray => luma(&orig),
        };
        views.push((ViewKind::Original, orig_view));

        if wants_pseudo {
            if let Some(gray) = &gray {
                let pseudo = match (self.config.channels, &self.gradient) {
                    (ColorChannels::Rgb, Some(gradient)) => gradient.map(&gray.view()),
                    _ => fog_highlight(&gray.view()),
                };
                views.push((ViewKind::PseudoColor, pseudo));
            }
        }

        if let (Some(filter), Some(gray)) = (&self.highpass, &gray) {
            let filtered = filter.apply(&gray.view()).mapv(|v| v.clamp(0.0, 1.0));
            let frequency = match (self.config.channels, &self.gradient) {
                (ColorChannels::Rgb, Some(gradient)) => gradient.map(&filtered.view()),
                _ => filtered,
            };
            views.push((ViewKind::Frequency, frequency));
        }

        MultiViewSample::new(views, label)
    }

    fn reduce_gray(&self, orig: &Array3<f32>) -> Array3<f32> {
        match self.config.gray_source {
            GraySource::Blue => orig.slice(s![2..3, .., ..]).to_owned(),
            GraySource::Average => luma(orig),
        }
    }
}

/// ITU-R 601 luma reduction of a (3, H, W) image to (1, H, W).
pub fn luma(img: &Array3<f32>) -> Array3<f32> {
    let (c, h, w) = img.dim();
    if c == 1 {
        return img.clone();
    }
    Array3::from_shape_fn((1, h, w), |(_, y, x)| {
        0.2989 * img[[0, y, x]] + 0.587 * img[[1, y, x]] + 0.114 * img[[2, y, x]]
    })
}
