//! FROSI: synthetic fog over road scenes, labels encoded in directory
//! names.
//!
//! Renderings are grouped by fog density (`fog_50` through `fog_400`,
//! meters of simulated visibility); each group maps to a fixed visibility
//! distance in miles.

use std::path::Path;

use fogsight_core::{Error, Label, Result, Split};
use fogsight_vision::{FramePipeline, MultiViewSample};

use crate::dataset::{load_sample, walk_images, LabeledFile, VisionDataset};

/// Simulated fog levels and their visibility distances in miles.
const FOG_LEVELS: [(&str, f32); 7] = [
    ("fog_50", 0.031),
    ("fog_100", 0.062),
    ("fog_150", 0.093),
    ("fog_200", 0.124),
    ("fog_250", 0.155),
    ("fog_300", 0.186),
    ("fog_400", 0.249),
];

pub struct FrosiDataset {
    records: Vec<LabeledFile>,
    pipeline: FramePipeline,
}

impl FrosiDataset {
    pub fn new(root: &Path, split: Split, pipeline: FramePipeline) -> Result<Self> {
        let records = load_records(root, split)?;
        tracing::info!(
            split = split.dir_name(),
            samples = records.len(),
            "loaded FROSI dataset"
        );
        Ok(Self { records, pipeline })
    }
}

impl VisionDataset for FrosiDataset {
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
            let vis = fog_label(&path)?;
            Ok(LabeledFile {
                path,
                label: Label::scalar(vis),
            })
        })
        .collect()
}

fn fog_label(path: &Path) -> Result<f32> {
    let text = path.to_string_lossy();
    for (tag, vis) in FOG_LEVELS {
        if text.contains(tag) {
            return Ok(vis);
        }
    }
    Err(Error::MissingLabel {
        path: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fog_levels_map_to_visibility() {
        assert_eq!(
            fog_label(Path::new("frosi/train/fog_50/scene1.png")).unwrap(),
            0.031
        );
        assert_eq!(
            fog_label(Path::new("frosi/train/fog_400/scene9.png")).unwrap(),
            0.249
        );
        assert_eq!(
            fog_label(Path::new("frosi/val/fog_150/x.png")).unwrap(),
            0.093
        );
    }

    #[test]
    fn unknown_fog_level_is_reported() {
        assert!(matches!(
            fog_label(Path::new("frosi/train/clear/scene1.png")),
            Err(Error::MissingLabel { .. })
        ));
    }
}
