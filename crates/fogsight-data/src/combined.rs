//! Combined dataset: the union of SSF, FROSI and Foggy Cityscapes under a
//! common root, all regression-labeled in miles.
//!
//! Layout: `<root>/SSF`, `<root>/FROSI` and `<root>/FCS`, each with the
//! usual per-source structure. Sources that teach the network different
//! fog regimes are deliberately mixed into one sample list.

use std::path::Path;

use fogsight_core::{Result, Split, Task};
use fogsight_vision::{FramePipeline, MultiViewSample};

use crate::dataset::{load_sample, LabeledFile, VisionDataset};
use crate::{cityscapes, frosi, ssf};

pub struct CombinedDataset {
    records: Vec<LabeledFile>,
    pipeline: FramePipeline,
}

impl CombinedDataset {
    pub fn new(
        root: &Path,
        split: Split,
        clear_sky_cap: Option<usize>,
        pipeline: FramePipeline,
    ) -> Result<Self> {
        let mut records =
            ssf::load_records(&root.join("SSF"), split, Task::Regression, clear_sky_cap)?;
        records.extend(frosi::load_records(&root.join("FROSI"), split)?);
        records.extend(cityscapes::load_records(&root.join("FCS"), split)?);

        tracing::info!(
            split = split.dir_name(),
            samples = records.len(),
            "loaded combined dataset"
        );
        Ok(Self { records, pipeline })
    }
}

impl VisionDataset for CombinedDataset {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn sample(&self, idx: usize) -> Result<MultiViewSample> {
        load_sample(&self.pipeline, &self.records[idx])
    }
}
