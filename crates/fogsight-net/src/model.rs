//! Model abstraction, configuration and registry.

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use fogsight_core::ImageDim;
use serde::{Deserialize, Serialize};

use crate::reduced::VisNetReduced;
use crate::visnet::VisNet;

/// A network mapping the (V, N, C, H, W) batch stack to (N, K) outputs:
/// one visibility distance per sample, or K class scores.
pub trait VisibilityModel {
    fn forward(&self, views: &Tensor, train: bool) -> candle_core::Result<Tensor>;
}

/// Shared model construction parameters.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Spatial grid of every input view.
    pub img_dim: ImageDim,
    /// Channels per view (1 or 3).
    pub channels: usize,
    /// Output width: 1 for regression, K for classification.
    pub num_classes: usize,
    /// Per-channel input mean, used by models that normalize their input.
    pub input_mean: Vec<f32>,
    /// Per-channel input standard deviation.
    pub input_std: Vec<f32>,
}

impl ModelConfig {
    pub fn new(img_dim: ImageDim, channels: usize, num_classes: usize) -> Self {
        Self {
            img_dim,
            channels,
            num_classes,
            input_mean: vec![0.0; channels],
            input_std: vec![1.0; channels],
        }
    }

    pub fn with_normalization(mut self, mean: Vec<f32>, std: Vec<f32>) -> Self {
        self.input_mean = mean;
        self.input_std = std;
        self
    }
}

/// The supported network architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "VISNET")]
    VisNet,
    #[serde(rename = "VISNET_REDUCED")]
    VisNetReduced,
}

impl ModelKind {
    pub fn build(
        &self,
        config: &ModelConfig,
        vb: VarBuilder,
    ) -> candle_core::Result<Box<dyn VisibilityModel>> {
        match self {
            ModelKind::VisNet => Ok(Box::new(VisNet::new(config, vb)?)),
            ModelKind::VisNetReduced => Ok(Box::new(VisNetReduced::new(config, vb)?)),
        }
    }
}

/// Resolves the compute device: CUDA when requested and present, CPU
/// otherwise.
pub fn resolve_device(try_cuda: bool) -> Device {
    if !try_cuda {
        tracing::info!("using CPU");
        return Device::Cpu;
    }
    match Device::cuda_if_available(0) {
        Ok(device) => {
            if device.is_cuda() {
                tracing::info!("CUDA available, using GPU");
            } else {
                tracing::info!("CUDA unavailable, using CPU");
            }
            device
        }
        Err(e) => {
            tracing::warn!("CUDA initialization failed ({e}), using CPU");
            Device::Cpu
        }
    }
}
