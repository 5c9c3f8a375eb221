//! Batch iteration: per-epoch index shuffling plus collation.

use fogsight_core::Result;
use fogsight_vision::{collate, CollatedBatch};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::VisionDataset;

/// Iterates a dataset in batches. Construct one per epoch; passing a seed
/// shuffles the visit order deterministically, `None` keeps dataset order
/// (evaluation).
pub struct BatchIter<'a> {
    dataset: &'a dyn VisionDataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> BatchIter<'a> {
    pub fn new(
        dataset: &'a dyn VisionDataset,
        batch_size: usize,
        shuffle_seed: Option<u64>,
    ) -> Self {
        assert!(batch_size > 0, "batch size must be positive");

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if let Some(seed) = shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }

        Self {
            dataset,
            order,
            batch_size,
            cursor: 0,
        }
    }

    /// Number of batches this iterator will yield.
    pub fn batch_count(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }
}

impl Iterator for BatchIter<'_> {
    type Item = Result<CollatedBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indices = &self.order[self.cursor..end];
        self.cursor = end;

        let samples: Result<Vec<_>> = indices
            .iter()
            .map(|&idx| self.dataset.sample(idx))
            .collect();

        Some(samples.and_then(|samples| collate(&samples)))
    }
}
