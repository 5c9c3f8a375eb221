//! SSF: real fog camera imagery with CSV-joined visibility labels.
//!
//! Images live under `<root>/<split>/*.jpg`; the sidecar `<root>/label.csv`
//! maps the trailing 19 characters of each file name to a visibility
//! distance in miles. The file list is sorted, then shuffled with a fixed
//! seed so that split membership is reproducible across runs. Clear-sky
//! samples (visibility of ten miles or more) dominate the raw captures, so
//! an optional cap bounds how many of them enter the set.

use std::collections::HashMap;
use std::path::Path;

use fogsight_core::{Error, Label, Result, Split, Task};
use fogsight_vision::{FramePipeline, MultiViewSample};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::{list_images, load_sample, LabeledFile, VisionDataset};

/// Fixed shuffle seed; changing it reshuffles which clear-sky samples
/// survive the cap.
const SHUFFLE_SEED: u64 = 37;

/// Visibility at or above this value counts as clear sky.
const CLEAR_SKY_MILES: f32 = 10.0;

/// Number of classification bins: one per whole mile below ten, plus a
/// clear-sky bucket.
pub const VISIBILITY_CLASSES: usize = 11;

pub struct SsfDataset {
    records: Vec<LabeledFile>,
    pipeline: FramePipeline,
}

impl SsfDataset {
    pub fn new(
        root: &Path,
        split: Split,
        task: Task,
        clear_sky_cap: Option<usize>,
        pipeline: FramePipeline,
    ) -> Result<Self> {
        let records = load_records(root, split, task, clear_sky_cap)?;
        tracing::info!(
            split = split.dir_name(),
            samples = records.len(),
            "loaded SSF dataset"
        );
        Ok(Self { records, pipeline })
    }
}

impl VisionDataset for SsfDataset {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn sample(&self, idx: usize) -> Result<MultiViewSample> {
        load_sample(&self.pipeline, &self.records[idx])
    }
}

pub(crate) fn load_records(
    root: &Path,
    split: Split,
    task: Task,
    clear_sky_cap: Option<usize>,
) -> Result<Vec<LabeledFile>> {
    let labels = read_label_csv(&root.join("label.csv"))?;

    let mut files = list_images(&root.join(split.dir_name()), "jpg")?;
    files.sort();
    let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
    files.shuffle(&mut rng);

    let mut records = Vec::with_capacity(files.len());
    let mut clear_count = 0usize;
    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Dataset(format!("unusable file name: {}", path.display())))?;
        let key = trailing_key(name);
        let vis = *labels.get(key).ok_or_else(|| Error::MissingLabel {
            path: path.display().to_string(),
        })?;

        if vis >= CLEAR_SKY_MILES {
            clear_count += 1;
            if clear_sky_cap.is_some_and(|cap| clear_count > cap) {
                continue;
            }
        }

        records.push(LabeledFile {
            path,
            label: make_label(task, vis)?,
        });
    }

    Ok(records)
}

fn make_label(task: Task, vis: f32) -> Result<Label> {
    match task {
        Task::Regression => Ok(Label::scalar(vis)),
        Task::Classification { classes } => {
            if classes != VISIBILITY_CLASSES {
                return Err(Error::Config(format!(
                    "SSF classification uses {VISIBILITY_CLASSES} bins, got {classes} classes"
                )));
            }
            Ok(Label::one_hot(visibility_class(vis), classes))
        }
    }
}

/// Bins a visibility distance: one class per whole mile below ten, and a
/// shared clear-sky class at ten miles and beyond.
pub fn visibility_class(vis: f32) -> usize {
    (vis.max(0.0).floor() as usize).min(VISIBILITY_CLASSES - 1)
}

/// The label key: the trailing 19 characters of the image file name, the
/// capture timestamp portion.
fn trailing_key(name: &str) -> &str {
    let start = name.len().saturating_sub(19);
    name.get(start..).unwrap_or(name)
}

fn read_label_csv(path: &Path) -> Result<HashMap<String, f32>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Dataset(format!("cannot read {}: {e}", path.display())))?;

    let mut labels = HashMap::new();
    for (lineno, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        let raw = fields.get(7).ok_or_else(|| {
            Error::Dataset(format!(
                "{} line {}: expected at least 8 columns, found {}",
                path.display(),
                lineno + 1,
                fields.len()
            ))
        })?;
        let vis = raw.trim().parse::<f32>().map_err(|e| {
            Error::Dataset(format!(
                "{} line {}: bad visibility value {raw:?}: {e}",
                path.display(),
                lineno + 1
            ))
        })?;
        labels.insert(fields[0].to_string(), vis);
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_bins_cover_the_range() {
        assert_eq!(visibility_class(0.0), 0);
        assert_eq!(visibility_class(0.99), 0);
        assert_eq!(visibility_class(1.0), 1);
        assert_eq!(visibility_class(9.99), 9);
        assert_eq!(visibility_class(10.0), 10);
        assert_eq!(visibility_class(42.0), 10);
        assert_eq!(visibility_class(-1.0), 0);
    }

    #[test]
    fn trailing_key_takes_last_19_characters() {
        assert_eq!(trailing_key("cam3-2023-01-07T08-15-00.jpg").len(), 19);
        assert_eq!(trailing_key("short.jpg"), "short.jpg");
    }

    #[test]
    fn label_csv_joins_on_first_column() {
        let dir = std::env::temp_dir().join("fogsight-ssf-csv-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("label.csv");
        std::fs::write(
            &path,
            "name,a,b,c,d,e,f,visibility\n\
             img-a.jpg,0,0,0,0,0,0,2.5\n\
             img-b.jpg,0,0,0,0,0,0,10.0\n",
        )
        .unwrap();

        let labels = read_label_csv(&path).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["img-a.jpg"], 2.5);
        assert_eq!(labels["img-b.jpg"], 10.0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn short_rows_are_reported() {
        let dir = std::env::temp_dir().join("fogsight-ssf-shortrow-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("label.csv");
        std::fs::write(&path, "name,visibility\nimg-a.jpg,2.5\n").unwrap();

        assert!(matches!(read_label_csv(&path), Err(Error::Dataset(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn classification_requires_eleven_bins() {
        assert!(make_label(Task::Classification { classes: 5 }, 3.0).is_err());
        let label = make_label(Task::Classification { classes: 11 }, 3.0).unwrap();
        assert_eq!(label.values()[3], 1.0);
        assert_eq!(label.values().iter().sum::<f32>(), 1.0);
    }
}
