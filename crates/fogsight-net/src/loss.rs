//! Loss functions for visibility training.

use candle_core::{Result, Tensor};
use candle_nn::ops::log_softmax;

/// Smooth-L1 (Huber) loss, mean over all elements.
///
/// Quadratic inside the unit interval, linear outside: 0.5*x^2 if |x| < 1,
/// |x| - 0.5 otherwise.
pub fn smooth_l1(pred: &Tensor, target: &Tensor) -> Result<Tensor> {
    let diff = (pred - target)?;
    let abs_diff = diff.abs()?;

    let squared = ((&diff * &diff)? * 0.5)?;
    let linear = (&abs_diff - 0.5)?;

    let mask = abs_diff.lt(1.0)?;
    mask.where_cond(&squared, &linear)?.mean_all()
}

/// Cross-entropy of (N, K) logits against (N, K) one-hot targets, mean
/// over the batch.
pub fn cross_entropy_one_hot(logits: &Tensor, target: &Tensor) -> Result<Tensor> {
    let log_probs = log_softmax(logits, 1)?;
    let ce = (log_probs * target)?.sum(1)?.neg()?;
    ce.mean_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn smooth_l1_regions() -> Result<()> {
        let device = Device::Cpu;
        let pred = Tensor::new(&[[0.0f32], [0.5], [2.0]], &device)?;
        let target = Tensor::new(&[[0.0f32], [0.0], [0.0]], &device)?;

        // Per-element losses are 0, 0.125 and 1.5; mean over three samples.
        let loss: f32 = smooth_l1(&pred, &target)?.to_scalar()?;
        let expected = (0.0 + 0.125 + 1.5) / 3.0;
        assert!((loss - expected).abs() < 1e-6, "loss {loss}");
        Ok(())
    }

    #[test]
    fn smooth_l1_is_zero_on_perfect_fit() -> Result<()> {
        let device = Device::Cpu;
        let values = Tensor::new(&[[1.0f32], [2.0], [3.0]], &device)?;
        let loss: f32 = smooth_l1(&values, &values)?.to_scalar()?;
        assert!(loss.abs() < 1e-7);
        Ok(())
    }

    #[test]
    fn cross_entropy_of_uniform_logits_is_log_k() -> Result<()> {
        let device = Device::Cpu;
        let logits = Tensor::zeros((2, 4), candle_core::DType::F32, &device)?;
        let target = Tensor::new(&[[1.0f32, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]], &device)?;

        let loss: f32 = cross_entropy_one_hot(&logits, &target)?.to_scalar()?;
        assert!((loss - (4.0f32).ln()).abs() < 1e-5, "loss {loss}");
        Ok(())
    }

    #[test]
    fn cross_entropy_prefers_the_right_class() -> Result<()> {
        let device = Device::Cpu;
        let target = Tensor::new(&[[1.0f32, 0.0]], &device)?;

        let good = Tensor::new(&[[5.0f32, -5.0]], &device)?;
        let bad = Tensor::new(&[[-5.0f32, 5.0]], &device)?;

        let good_loss: f32 = cross_entropy_one_hot(&good, &target)?.to_scalar()?;
        let bad_loss: f32 = cross_entropy_one_hot(&bad, &target)?.to_scalar()?;
        assert!(good_loss < bad_loss);
        Ok(())
    }
}
