//! Running metric accumulators for training and evaluation.

/// Accumulates regression outputs and targets across batches.
#[derive(Debug, Default, Clone)]
pub struct RegressionMetrics {
    outputs: Vec<f32>,
    targets: Vec<f32>,
    loss_sum: f64,
}

impl RegressionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one batch: its mean loss plus per-sample predictions and
    /// ground truth.
    pub fn push(&mut self, batch_loss: f32, outputs: &[f32], targets: &[f32]) {
        debug_assert_eq!(outputs.len(), targets.len());
        self.loss_sum += batch_loss as f64 * outputs.len() as f64;
        self.outputs.extend_from_slice(outputs);
        self.targets.extend_from_slice(targets);
    }

    pub fn count(&self) -> usize {
        self.outputs.len()
    }

    /// Sample-weighted mean of the batch losses.
    pub fn loss(&self) -> f64 {
        if self.outputs.is_empty() {
            return 0.0;
        }
        self.loss_sum / self.outputs.len() as f64
    }

    /// Mean absolute error.
    pub fn mae(&self) -> f64 {
        if self.outputs.is_empty() {
            return 0.0;
        }
        self.residuals().map(f64::abs).sum::<f64>() / self.outputs.len() as f64
    }

    /// Root mean squared error.
    pub fn rmse(&self) -> f64 {
        if self.outputs.is_empty() {
            return 0.0;
        }
        (self.residuals().map(|r| r * r).sum::<f64>() / self.outputs.len() as f64).sqrt()
    }

    /// Coefficient of determination. Zero when the targets have no
    /// variance.
    pub fn r2(&self) -> f64 {
        if self.targets.len() < 2 {
            return 0.0;
        }
        let mean = self.targets.iter().map(|&t| t as f64).sum::<f64>()
            / self.targets.len() as f64;
        let ss_tot: f64 = self
            .targets
            .iter()
            .map(|&t| (t as f64 - mean).powi(2))
            .sum();
        if ss_tot < f64::EPSILON {
            return 0.0;
        }
        let ss_res: f64 = self.residuals().map(|r| r * r).sum();
        1.0 - ss_res / ss_tot
    }

    /// (predicted, true) pairs in accumulation order.
    pub fn pairs(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.outputs
            .iter()
            .copied()
            .zip(self.targets.iter().copied())
    }

    fn residuals(&self) -> impl Iterator<Item = f64> + '_ {
        self.outputs
            .iter()
            .zip(self.targets.iter())
            .map(|(&o, &t)| o as f64 - t as f64)
    }
}

/// Accumulates classification accuracy across batches.
#[derive(Debug, Default, Clone)]
pub struct ClassificationMetrics {
    correct: usize,
    total: usize,
    loss_sum: f64,
}

impl ClassificationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one batch of (N, K) logits against one-hot targets.
    pub fn push(&mut self, batch_loss: f32, outputs: &[Vec<f32>], targets: &[Vec<f32>]) {
        debug_assert_eq!(outputs.len(), targets.len());
        self.loss_sum += batch_loss as f64 * outputs.len() as f64;
        self.total += outputs.len();
        for (output, target) in outputs.iter().zip(targets) {
            if argmax(output) == argmax(target) {
                self.correct += 1;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.total
    }

    pub fn loss(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.loss_sum / self.total as f64
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_fit_has_unit_r2() {
        let mut m = RegressionMetrics::new();
        m.push(0.0, &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(m.count(), 3);
        assert!((m.r2() - 1.0).abs() < 1e-9);
        assert!(m.mae() < 1e-9);
        assert!(m.rmse() < 1e-9);
    }

    #[test]
    fn mean_prediction_has_zero_r2() {
        let mut m = RegressionMetrics::new();
        m.push(0.5, &[2.0, 2.0, 2.0, 2.0], &[1.0, 2.0, 3.0, 2.0]);
        assert!(m.r2().abs() < 1e-9);
        assert!((m.loss() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rmse_and_mae_differ_on_outliers() {
        let mut m = RegressionMetrics::new();
        m.push(0.0, &[0.0, 0.0], &[0.0, 4.0]);
        assert!((m.mae() - 2.0).abs() < 1e-9);
        assert!((m.rmse() - (8.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn accuracy_counts_argmax_matches() {
        let mut m = ClassificationMetrics::new();
        m.push(
            1.0,
            &[vec![0.9, 0.1], vec![0.2, 0.8], vec![0.6, 0.4]],
            &[vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]],
        );
        assert_eq!(m.count(), 3);
        assert!((m.accuracy() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn loss_is_sample_weighted() {
        let mut m = ClassificationMetrics::new();
        m.push(1.0, &[vec![1.0], vec![1.0], vec![1.0]], &[vec![1.0], vec![1.0], vec![1.0]]);
        m.push(4.0, &[vec![1.0]], &[vec![1.0]]);
        assert!((m.loss() - (3.0 + 4.0) / 4.0).abs() < 1e-9);
    }
}
