//! Fundamental types for the fogsight visibility estimation system.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pixel grid for normalized images, height first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct ImageDim {
    pub height: usize,
    pub width: usize,
}

impl ImageDim {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Height-over-width aspect ratio.
    pub fn ratio(&self) -> f64 {
        self.height as f64 / self.width as f64
    }

    /// Half-spectrum grid produced by a real 2D FFT of this image grid.
    pub fn spectrum(&self) -> (usize, usize) {
        (self.height, self.width / 2 + 1)
    }
}

impl From<[usize; 2]> for ImageDim {
    fn from(d: [usize; 2]) -> Self {
        Self::new(d[0], d[1])
    }
}

impl From<ImageDim> for [usize; 2] {
    fn from(d: ImageDim) -> Self {
        [d.height, d.width]
    }
}

/// Extent of the frequency notch removed by the high-pass filter,
/// height first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct MaskDim {
    pub height: usize,
    pub width: usize,
}

impl MaskDim {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }
}

impl From<[usize; 2]> for MaskDim {
    fn from(d: [usize; 2]) -> Self {
        Self::new(d[0], d[1])
    }
}

impl From<MaskDim> for [usize; 2] {
    fn from(d: MaskDim) -> Self {
        [d.height, d.width]
    }
}

/// Channel layout of packed views. Only grayscale and RGB images exist in
/// this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorChannels {
    Gray,
    Rgb,
}

impl ColorChannels {
    pub fn count(&self) -> usize {
        match self {
            ColorChannels::Gray => 1,
            ColorChannels::Rgb => 3,
        }
    }

    pub fn from_count(count: usize) -> Result<Self> {
        match count {
            1 => Ok(ColorChannels::Gray),
            3 => Ok(ColorChannels::Rgb),
            other => Err(Error::Config(format!(
                "channel count must be 1 or 3, got {other}"
            ))),
        }
    }
}

/// Which single channel of the normalized RGB image feeds the pseudo-color
/// and frequency views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraySource {
    /// The blue channel, unweighted. Fog scatters blue light most strongly.
    Blue,
    /// ITU-R 601 luma reduction of all three channels.
    Average,
}

/// The three parallel representations of one input image. Variant order is
/// the packing order along the view axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViewKind {
    Original,
    PseudoColor,
    Frequency,
}

impl ViewKind {
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Ground-truth target attached to a sample: a single visibility distance
/// for regression, or a one-hot class vector for classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    values: Vec<f32>,
}

impl Label {
    pub fn scalar(value: f32) -> Self {
        Self {
            values: vec![value],
        }
    }

    pub fn one_hot(class: usize, num_classes: usize) -> Self {
        let mut values = vec![0.0; num_classes];
        values[class] = 1.0;
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Learning task, derived from the configured class count: one output is
/// a visibility distance, several are one-hot class scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    Regression,
    Classification { classes: usize },
}

impl Task {
    pub fn from_class_count(classes: usize) -> Result<Self> {
        match classes {
            0 => Err(Error::Config("class count must be positive".into())),
            1 => Ok(Task::Regression),
            n => Ok(Task::Classification { classes: n }),
        }
    }

    /// Width of the label vector carried by each sample.
    pub fn label_len(&self) -> usize {
        match self {
            Task::Regression => 1,
            Task::Classification { classes } => *classes,
        }
    }
}

/// Dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

/// Frequency-suppression mask selection for the high-pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpectralMask {
    /// Hard rectangular notch of the given extent.
    Notch(MaskDim),
    /// Soft elliptical attenuation out to `radius` (a fraction of each
    /// spectrum axis), with an eighth-power falloff.
    RadialHighpass { radius: f32 },
}

/// False-color mapping applied to single-channel views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Colormap {
    /// The stock 11-anchor black-to-red visibility ramp.
    VisibilityRamp,
    /// Exponential tone curve emphasizing near-saturated fog pixels;
    /// single-channel output.
    FogHighlight,
    /// Custom piecewise-linear gradient over the given RGB anchors in [0,1].
    Anchors(Vec<[f32; 3]>),
}

/// Configuration value for the per-sample preprocessing pipeline. Passed
/// explicitly into stage constructors; there is no ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Output grid after geometric normalization.
    pub img_dim: ImageDim,
    /// Channel layout of every packed view.
    pub channels: ColorChannels,
    /// Source channel for the derived grayscale views.
    pub gray_source: GraySource,
    /// Enables the pseudo-color view when present.
    pub colormap: Option<Colormap>,
    /// Enables the frequency-filtered view when present.
    pub mask: Option<SpectralMask>,
}

impl PipelineConfig {
    /// Validates the parts of the configuration that do not depend on the
    /// spectrum geometry; mask bounds are checked by the filter constructor.
    pub fn validate(&self) -> Result<()> {
        if self.img_dim.height == 0 || self.img_dim.width == 0 {
            return Err(Error::Config(format!(
                "image dimensions must be positive, got {}x{}",
                self.img_dim.height, self.img_dim.width
            )));
        }

        match (&self.channels, &self.colormap) {
            (ColorChannels::Rgb, Some(Colormap::FogHighlight)) => {
                return Err(Error::Config(
                    "fog-highlight colormap produces a single channel and cannot be used \
                     with 3-channel views"
                        .into(),
                ));
            }
            (ColorChannels::Gray, Some(Colormap::VisibilityRamp | Colormap::Anchors(_))) => {
                return Err(Error::Config(
                    "anchor-gradient colormaps produce 3 channels and cannot be used \
                     with single-channel views"
                        .into(),
                ));
            }
            _ => {}
        }

        if let Some(Colormap::Anchors(anchors)) = &self.colormap {
            if anchors.len() < 2 {
                return Err(Error::Config(
                    "a colormap gradient needs at least two anchor colors".into(),
                ));
            }
        }

        if self.channels == ColorChannels::Rgb && self.mask.is_some() && self.colormap.is_none()
        {
            return Err(Error::Config(
                "3-channel frequency views require a colormap to expand the filtered \
                 grayscale image"
                    .into(),
            ));
        }

        Ok(())
    }
}
