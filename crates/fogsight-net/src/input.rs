//! Conversion from collated batches to device tensors.

use candle_core::{Device, Result, Tensor};
use fogsight_vision::CollatedBatch;

/// Packs the batch view stack into a (V, N, C, H, W) tensor.
pub fn views_tensor(batch: &CollatedBatch, device: &Device) -> Result<Tensor> {
    let (v, n, c, h, w) = batch.views.dim();
    let data: Vec<f32> = batch.views.iter().copied().collect();
    Tensor::from_vec(data, (v, n, c, h, w), device)
}

/// Packs the batch labels into an (N, K) tensor.
pub fn labels_tensor(batch: &CollatedBatch, device: &Device) -> Result<Tensor> {
    let (n, k) = batch.labels.dim();
    let data: Vec<f32> = batch.labels.iter().copied().collect();
    Tensor::from_vec(data, (n, k), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogsight_core::{Label, ViewKind};
    use fogsight_vision::{collate, MultiViewSample};
    use ndarray::Array3;

    #[test]
    fn tensors_match_batch_geometry() {
        let samples: Vec<_> = (0..2)
            .map(|i| {
                MultiViewSample::new(
                    vec![
                        (ViewKind::Original, Array3::from_elem((3, 6, 8), i as f32)),
                        (ViewKind::Frequency, Array3::from_elem((3, 6, 8), 9.0)),
                    ],
                    Label::scalar(i as f32),
                )
                .unwrap()
            })
            .collect();
        let batch = collate(&samples).unwrap();

        let device = Device::Cpu;
        let views = views_tensor(&batch, &device).unwrap();
        let labels = labels_tensor(&batch, &device).unwrap();
        assert_eq!(views.dims(), &[2, 2, 3, 6, 8]);
        assert_eq!(labels.dims(), &[2, 1]);

        let values: Vec<Vec<f32>> = labels.to_vec2().unwrap();
        assert_eq!(values[0][0], 0.0);
        assert_eq!(values[1][0], 1.0);
    }
}
