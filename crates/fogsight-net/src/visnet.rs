//! The full three-branch visibility network.
//!
//! One convolutional branch per view. The frequency branch absorbs the
//! pseudo-color and original activations through additive fusion after the
//! first two stages; after the third stage the pseudo-color and original
//! branches merge into a shared neck while the frequency branch keeps its
//! own, and a two-layer head maps the concatenated features to the output.

use candle_core::{bail, Module, Result, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Dropout, Linear, VarBuilder};

use crate::model::{ModelConfig, VisibilityModel};

/// Channel widths of the three stages.
const WIDTHS: [usize; 3] = [64, 128, 256];
/// Neck widths: frequency, then pseudo-color + original.
const NECK_FFT: usize = 1024;
const NECK_PC_ORIG: usize = 2048;
const HEAD_HIDDEN: usize = 4096;
const DROPOUT_P: f32 = 0.4;

/// A pointwise/spatial convolution stack followed by 2x2 max-pooling.
pub(crate) struct ConvStage {
    convs: Vec<Conv2d>,
}

impl ConvStage {
    /// {1x1, 3x3} stack.
    pub(crate) fn pair(in_c: usize, out_c: usize, vb: VarBuilder) -> Result<Self> {
        let conv1 = conv2d(in_c, out_c, 1, Conv2dConfig::default(), vb.pp("conv1"))?;
        let conv2 = conv2d(out_c, out_c, 3, Conv2dConfig::default(), vb.pp("conv2"))?;
        Ok(Self {
            convs: vec![conv1, conv2],
        })
    }

    /// {1x1, strided 3x3, 1x1} stack.
    pub(crate) fn strided(in_c: usize, out_c: usize, vb: VarBuilder) -> Result<Self> {
        let conv1 = conv2d(in_c, out_c, 1, Conv2dConfig::default(), vb.pp("conv1"))?;
        let conv2 = conv2d(
            out_c,
            out_c,
            3,
            Conv2dConfig {
                stride: 2,
                ..Default::default()
            },
            vb.pp("conv2"),
        )?;
        let conv3 = conv2d(out_c, out_c, 1, Conv2dConfig::default(), vb.pp("conv3"))?;
        Ok(Self {
            convs: vec![conv1, conv2, conv3],
        })
    }

    pub(crate) fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();
        for conv in &self.convs {
            x = conv.forward(&x)?;
        }
        x.max_pool2d(2)
    }
}

/// One per-view convolutional branch: pair, pair, strided.
pub(crate) struct Branch {
    pub(crate) stage1: ConvStage,
    pub(crate) stage2: ConvStage,
    pub(crate) stage3: ConvStage,
}

impl Branch {
    pub(crate) fn new(in_c: usize, widths: [usize; 3], vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            stage1: ConvStage::pair(in_c, widths[0], vb.pp("stage1"))?,
            stage2: ConvStage::pair(widths[0], widths[1], vb.pp("stage2"))?,
            stage3: ConvStage::strided(widths[1], widths[2], vb.pp("stage3"))?,
        })
    }
}

/// Spatial extent after a {1x1, 3x3, pool} stage.
fn after_pair(n: usize) -> Option<usize> {
    let conv = n.checked_sub(2)?;
    let pooled = conv / 2;
    (pooled > 0).then_some(pooled)
}

/// Spatial extent after a {1x1, strided 3x3, 1x1, pool} stage.
fn after_strided(n: usize) -> Option<usize> {
    let conv = n.checked_sub(3)?;
    let strided = conv / 2 + 1;
    let pooled = strided / 2;
    (pooled > 0).then_some(pooled)
}

/// Flattened feature width of one branch, or `None` when the input grid
/// collapses before the last stage.
pub(crate) fn branch_feature_dim(height: usize, width: usize, top_width: usize) -> Option<usize> {
    let h = after_strided(after_pair(after_pair(height)?)?)?;
    let w = after_strided(after_pair(after_pair(width)?)?)?;
    Some(top_width * h * w)
}

pub struct VisNet {
    fft: Branch,
    pc: Branch,
    orig: Branch,
    neck_fft: Linear,
    neck_pc_orig: Linear,
    head1: Linear,
    head2: Linear,
    dropout: Dropout,
}

impl VisNet {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let Some(feature_dim) =
            branch_feature_dim(config.img_dim.height, config.img_dim.width, WIDTHS[2])
        else {
            bail!(
                "image grid {}x{} collapses inside the convolutional stages",
                config.img_dim.height,
                config.img_dim.width
            );
        };

        let fft = Branch::new(config.channels, WIDTHS, vb.pp("fft"))?;
        let pc = Branch::new(config.channels, WIDTHS, vb.pp("pc"))?;
        let orig = Branch::new(config.channels, WIDTHS, vb.pp("orig"))?;

        let neck_fft = linear(feature_dim, NECK_FFT, vb.pp("neck_fft"))?;
        let neck_pc_orig = linear(feature_dim, NECK_PC_ORIG, vb.pp("neck_pc_orig"))?;
        let head1 = linear(NECK_FFT + NECK_PC_ORIG, HEAD_HIDDEN, vb.pp("head1"))?;
        let head2 = linear(HEAD_HIDDEN, config.num_classes, vb.pp("head2"))?;

        Ok(Self {
            fft,
            pc,
            orig,
            neck_fft,
            neck_pc_orig,
            head1,
            head2,
            dropout: Dropout::new(DROPOUT_P),
        })
    }
}

impl VisibilityModel for VisNet {
    fn forward(&self, views: &Tensor, train: bool) -> Result<Tensor> {
        let (v, _, _, _, _) = views.dims5()?;
        if v != 3 {
            bail!("three-branch network expects 3 views, got {v}");
        }

        let orig = views.get(0)?;
        let pc = views.get(1)?;
        let fft = views.get(2)?;

        let fft_x = self.fft.stage1.forward(&fft)?;
        let pc_x = self.pc.stage1.forward(&pc)?;
        let orig_x = self.orig.stage1.forward(&orig)?;
        let fft_x = ((&pc_x + &orig_x)? + fft_x)?;

        let fft_x = self.fft.stage2.forward(&fft_x)?;
        let pc_x = self.pc.stage2.forward(&pc_x)?;
        let orig_x = self.orig.stage2.forward(&orig_x)?;
        let fft_x = ((&pc_x + &orig_x)? + fft_x)?;

        let fft_x = self.fft.stage3.forward(&fft_x)?;
        let pc_x = self.pc.stage3.forward(&pc_x)?;
        let orig_x = self.orig.stage3.forward(&orig_x)?;
        let pc_orig = (pc_x + orig_x)?;

        let fft_feat = self.neck_fft.forward(&fft_x.flatten_from(1)?)?;
        let fft_feat = self.dropout.forward(&fft_feat, train)?;
        let po_feat = self.neck_pc_orig.forward(&pc_orig.flatten_from(1)?)?;
        let po_feat = self.dropout.forward(&po_feat, train)?;

        let cat = Tensor::cat(&[&fft_feat, &po_feat], 1)?;
        let x = self.head1.forward(&cat)?;
        self.head2.forward(&x)
    }
}
