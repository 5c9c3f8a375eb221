//! Compact variant of the three-branch network.
//!
//! Same topology as the full network at a quarter of the channel widths,
//! with per-channel input normalization folded into the forward pass so
//! exported weights carry their own statistics.

use candle_core::{bail, Module, Result, Tensor};
use candle_nn::{linear, Dropout, Linear, VarBuilder};

use crate::model::{ModelConfig, VisibilityModel};
use crate::visnet::{branch_feature_dim, Branch};

const WIDTHS: [usize; 3] = [32, 64, 128];
const NECK_FFT: usize = 512;
const NECK_PC_ORIG: usize = 1024;
const HEAD_HIDDEN: usize = 2048;
const DROPOUT_P: f32 = 0.4;

pub struct VisNetReduced {
    mean: Tensor,
    std: Tensor,
    fft: Branch,
    pc: Branch,
    orig: Branch,
    neck_fft: Linear,
    neck_pc_orig: Linear,
    head1: Linear,
    head2: Linear,
    dropout: Dropout,
}

impl VisNetReduced {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        if config.input_mean.len() != config.channels || config.input_std.len() != config.channels
        {
            bail!(
                "normalization statistics must have {} entries, got {}/{}",
                config.channels,
                config.input_mean.len(),
                config.input_std.len()
            );
        }

        let Some(feature_dim) =
            branch_feature_dim(config.img_dim.height, config.img_dim.width, WIDTHS[2])
        else {
            bail!(
                "image grid {}x{} collapses inside the convolutional stages",
                config.img_dim.height,
                config.img_dim.width
            );
        };

        // Broadcast over (V, N, C, H, W).
        let shape = (1, 1, config.channels, 1, 1);
        let mean = Tensor::from_vec(config.input_mean.clone(), shape, vb.device())?;
        let std = Tensor::from_vec(config.input_std.clone(), shape, vb.device())?;

        let fft = Branch::new(config.channels, WIDTHS, vb.pp("fft"))?;
        let pc = Branch::new(config.channels, WIDTHS, vb.pp("pc"))?;
        let orig = Branch::new(config.channels, WIDTHS, vb.pp("orig"))?;

        let neck_fft = linear(feature_dim, NECK_FFT, vb.pp("neck_fft"))?;
        let neck_pc_orig = linear(feature_dim, NECK_PC_ORIG, vb.pp("neck_pc_orig"))?;
        let head1 = linear(NECK_FFT + NECK_PC_ORIG, HEAD_HIDDEN, vb.pp("head1"))?;
        let head2 = linear(HEAD_HIDDEN, config.num_classes, vb.pp("head2"))?;

        Ok(Self {
            mean,
            std,
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

impl VisibilityModel for VisNetReduced {
    fn forward(&self, views: &Tensor, train: bool) -> Result<Tensor> {
        let (v, _, _, _, _) = views.dims5()?;
        if v != 3 {
            bail!("three-branch network expects 3 views, got {v}");
        }

        let views = views
            .broadcast_sub(&self.mean)?
            .broadcast_div(&self.std)?;

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
