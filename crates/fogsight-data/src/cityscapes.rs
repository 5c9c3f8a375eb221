//! Foggy Cityscapes: synthetic fog overlays on urban street scenes,
//! labels encoded in the attenuation-coefficient file suffix.

use std::path::Path;

use fogsight_core::{Error, Label, Result, Split};
use fogsight_vision::{FramePipeline, MultiViewSample};

use crate::dataset::{load_sample, walk_images, LabeledFile, VisionDataset};

/// Attenuation-coefficient suffixes and their visibility distances in
/// miles.
const ATTENUATION_SUFFIXES: [(&str, f32); 3] = [
    ("0.02.png", 0.093),
    ("0.01.png", 0.186),
    ("0.005.png", 0.373),
];

pub struct CityscapesDataset {
    records: Vec<LabeledFile>,
    pipeline: FramePipeline,
}

impl CityscapesDataset {
    pub fn new(root: &Path, split: Split, pipeline: FramePipeline) -> Result<Self> {
        let records = load_records(root, split)?;
        tracing::info!(
            split = split.dir_name(),
            samples = records.len(),
            "loaded Foggy Cityscapes dataset"
        );
        Ok(Self { records, pipeline })
    }
}

impl VisionDataset for CityscapesDataset {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn sample(&self, idx: usize) -> Result<MultiViewSample> {
        load_sample(&self.pipeline, &self.records[idx])
    }
}

pub(crate) fn load_records(root: &Path, split: Split) -> Result<Vec<LabeledFile>> {
    let mut files = walk_images(&root.join(split.dir_name()), "png")?;
    files.sort();

    files
        .into_iter()
        .map(|path| {
            let vis = attenuation_label(&path)?;
            Ok(LabeledFile {
                path,
                label: Label::scalar(vis),
            })
        })
        .collect()
}

fn attenuation_label(path: &Path) -> Result<f32> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    for (suffix, vis) in ATTENUATION_SUFFIXES {
        if name.ends_with(suffix) {
            return Ok(vis);
        }
    }
    Err(Error::MissingLabel {
        path: path.display().to_string(),
    })
}
