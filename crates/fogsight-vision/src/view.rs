//! Multi-view sample packing and batch collation.
//!
//! A sample stacks up to three equally shaped representations of one image
//! along a view axis, in the fixed order {original, pseudo-color,
//! frequency}. Collation concatenates N samples into one
//! (views, samples, channels, height, width) batch, with labels kept in
//! input order. Every sample in a batch must carry the same view set; a
//! mismatch is a batch-assembly error, never a silent truncation.

use fogsight_core::{Error, Label, Result, ViewKind};
use ndarray::{s, Array2, Array3, Array5};

/// One preprocessed image packed as an ordered stack of views plus its
/// label.
#[derive(Debug, Clone)]
pub struct MultiViewSample {
    kinds: Vec<ViewKind>,
    views: Vec<Array3<f32>>,
    label: Label,
}

impl MultiViewSample {
    /// Packs `views` in their given order. The order must follow
    /// [`ViewKind`] ordering, start with the original view, and all views
    /// must share one shape.
    pub fn new(views: Vec<(ViewKind, Array3<f32>)>, label: Label) -> Result<Self> {
        if views.is_empty() {
            return Err(Error::BatchAssembly("a sample needs at least one view".into()));
        }
        if views[0].0 != ViewKind::Original {
            return Err(Error::BatchAssembly(
                "the first view of a sample must be the original image".into(),
            ));
        }
        for pair in views.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(Error::BatchAssembly(format!(
                    "views must be packed in {:?} < {:?} < {:?} order",
                    ViewKind::Original,
                    ViewKind::PseudoColor,
                    ViewKind::Frequency
                )));
            }
        }

        let shape = views[0].1.dim();
        for (kind, view) in &views {
            if view.dim() != shape {
                return Err(Error::BatchAssembly(format!(
                    "view {kind:?} has shape {:?}, expected {shape:?}",
                    view.dim()
                )));
            }
        }

        let (kinds, views) = views.into_iter().unzip();
        Ok(Self {
            kinds,
            views,
            label,
        })
    }

    pub fn kinds(&self) -> &[ViewKind] {
        &self.kinds
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Common (channels, height, width) of every view.
    pub fn view_shape(&self) -> (usize, usize, usize) {
        self.views[0].dim()
    }

    pub fn views(&self) -> &[Array3<f32>] {
        &self.views
    }

    pub fn label(&self) -> &Label {
        &self.label
    }
}

/// A collated batch: views stacked as (V, N, C, H, W), labels as (N, K) in
/// sample order.
#[derive(Debug, Clone)]
pub struct CollatedBatch {
    pub kinds: Vec<ViewKind>,
    pub views: Array5<f32>,
    pub labels: Array2<f32>,
}

impl CollatedBatch {
    pub fn view_count(&self) -> usize {
        self.views.dim().0
    }

    pub fn sample_count(&self) -> usize {
        self.views.dim().1
    }
}

/// Concatenates per-sample view stacks into one batch stack.
pub fn collate(samples: &[MultiViewSample]) -> Result<CollatedBatch> {
    let first = samples
        .first()
        .ok_or_else(|| Error::BatchAssembly("cannot collate an empty batch".into()))?;

    let kinds = first.kinds().to_vec();
    let (c, h, w) = first.view_shape();
    let label_len = first.label().len();
    let v = kinds.len();
    let n = samples.len();

    for (i, sample) in samples.iter().enumerate() {
        if sample.kinds() != kinds.as_slice() {
            return Err(Error::BatchAssembly(format!(
                "sample {i} carries views {:?}, but the batch was started with {:?}",
                sample.kinds(),
                kinds
            )));
        }
        if sample.view_shape() != (c, h, w) {
            return Err(Error::BatchAssembly(format!(
                "sample {i} has view shape {:?}, expected ({c}, {h}, {w})",
                sample.view_shape()
            )));
        }
        if sample.label().len() != label_len {
            return Err(Error::BatchAssembly(format!(
                "sample {i} has a {}-element label, expected {label_len}",
                sample.label().len()
            )));
        }
    }

    let mut views = Array5::<f32>::zeros((v, n, c, h, w));
    let mut labels = Array2::<f32>::zeros((n, label_len));

    for (i, sample) in samples.iter().enumerate() {
        for (vi, view) in sample.views().iter().enumerate() {
            views.slice_mut(s![vi, i, .., .., ..]).assign(view);
        }
        for (k, &value) in sample.label().values().iter().enumerate() {
            labels[[i, k]] = value;
        }
    }

    Ok(CollatedBatch {
        kinds,
        views,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn view(fill: f32, c: usize, h: usize, w: usize) -> Array3<f32> {
        Array3::from_elem((c, h, w), fill)
    }

    fn full_sample(fill: f32) -> MultiViewSample {
        MultiViewSample::new(
            vec![
                (ViewKind::Original, view(fill, 3, 8, 10)),
                (ViewKind::PseudoColor, view(fill + 0.1, 3, 8, 10)),
                (ViewKind::Frequency, view(fill + 0.2, 3, 8, 10)),
            ],
            Label::scalar(fill),
        )
        .unwrap()
    }

    #[test]
    fn three_views_pack_in_order() {
        let sample = full_sample(0.5);
        assert_eq!(
            sample.kinds(),
            &[ViewKind::Original, ViewKind::PseudoColor, ViewKind::Frequency]
        );
        assert_eq!(sample.view_count(), 3);
    }

    #[test]
    fn disabled_pseudo_color_preserves_order() {
        let sample = MultiViewSample::new(
            vec![
                (ViewKind::Original, view(0.1, 3, 8, 10)),
                (ViewKind::Frequency, view(0.2, 3, 8, 10)),
            ],
            Label::scalar(1.0),
        )
        .unwrap();
        assert_eq!(sample.kinds(), &[ViewKind::Original, ViewKind::Frequency]);
    }

    #[test]
    fn out_of_order_views_are_rejected() {
        let result = MultiViewSample::new(
            vec![
                (ViewKind::Original, view(0.1, 3, 8, 10)),
                (ViewKind::Frequency, view(0.2, 3, 8, 10)),
                (ViewKind::PseudoColor, view(0.3, 3, 8, 10)),
            ],
            Label::scalar(1.0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn mismatched_view_shapes_are_rejected() {
        let result = MultiViewSample::new(
            vec![
                (ViewKind::Original, view(0.1, 3, 8, 10)),
                (ViewKind::PseudoColor, view(0.2, 1, 8, 10)),
            ],
            Label::scalar(1.0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn collate_shape_is_exact() {
        // N=4 samples, V=2 views of (3, 120, 160) -> (2, 4, 3, 120, 160).
        let samples: Vec<_> = (0..4)
            .map(|i| {
                MultiViewSample::new(
                    vec![
                        (ViewKind::Original, view(i as f32, 3, 120, 160)),
                        (ViewKind::Frequency, view(i as f32 + 0.5, 3, 120, 160)),
                    ],
                    Label::scalar(i as f32),
                )
                .unwrap()
            })
            .collect();

        let batch = collate(&samples).unwrap();
        assert_eq!(batch.views.dim(), (2, 4, 3, 120, 160));
        assert_eq!(batch.labels.dim(), (4, 1));
    }

    #[test]
    fn collate_preserves_label_order() {
        let samples: Vec<_> = [2.5f32, 0.1, 7.0].iter().map(|&v| full_sample(v)).collect();
        let batch = collate(&samples).unwrap();
        assert_eq!(batch.labels[[0, 0]], 2.5);
        assert_eq!(batch.labels[[1, 0]], 0.1);
        assert_eq!(batch.labels[[2, 0]], 7.0);

        // View data lands at the matching (view, sample) coordinates.
        assert_eq!(batch.views[[0, 1, 0, 0, 0]], 0.1);
        assert_eq!(batch.views[[2, 1, 0, 0, 0]], 0.1 + 0.2);
    }

    #[test]
    fn mixed_view_sets_are_rejected() {
        let full = full_sample(0.5);
        let partial = MultiViewSample::new(
            vec![(ViewKind::Original, view(0.5, 3, 8, 10))],
            Label::scalar(0.5),
        )
        .unwrap();

        let err = collate(&[full, partial]).unwrap_err();
        assert!(matches!(err, Error::BatchAssembly(_)));
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(collate(&[]).is_err());
    }
}
