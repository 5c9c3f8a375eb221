//! Dataset abstraction shared by the concrete loaders.

use std::path::{Path, PathBuf};

use fogsight_core::{Error, Label, Result};
use fogsight_vision::{FramePipeline, MultiViewSample};

use crate::decode::decode_image;

/// Random-access source of preprocessed multi-view samples. Images are
/// decoded per access; nothing is cached between calls.
pub trait VisionDataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes, preprocesses and packs the sample at `idx`.
    fn sample(&self, idx: usize) -> Result<MultiViewSample>;
}

/// One enumerated image file with its joined label.
#[derive(Debug, Clone)]
pub(crate) struct LabeledFile {
    pub path: PathBuf,
    pub label: Label,
}

pub(crate) fn load_sample(
    pipeline: &FramePipeline,
    record: &LabeledFile,
) -> Result<MultiViewSample> {
    let img = decode_image(&record.path)?;
    pipeline.process(img, record.label.clone())
}

/// Non-recursive listing of files with the given extension.
pub(crate) fn list_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::Dataset(format!("cannot read {}: {e}", dir.display()))
    })?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extension) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Recursive listing of files with the given extension.
pub(crate) fn walk_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(dir, extension, &mut files)?;
    Ok(files)
}

fn walk_into(dir: &Path, extension: &str, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::Dataset(format!("cannot read {}: {e}", dir.display()))
    })?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            walk_into(&path, extension, files)?;
        } else if has_extension(&path, extension) {
            files.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_matching_is_case_insensitive() {
        assert!(has_extension(Path::new("a/b.JPG"), "jpg"));
        assert!(has_extension(Path::new("a/b.png"), "png"));
        assert!(!has_extension(Path::new("a/b.png"), "jpg"));
        assert!(!has_extension(Path::new("a/noext"), "jpg"));
    }

    #[test]
    fn walk_finds_nested_files() {
        let root = std::env::temp_dir().join("fogsight-walk-test");
        std::fs::create_dir_all(root.join("deep/deeper")).unwrap();
        std::fs::write(root.join("top.png"), b"x").unwrap();
        std::fs::write(root.join("deep/mid.png"), b"x").unwrap();
        std::fs::write(root.join("deep/deeper/low.png"), b"x").unwrap();
        std::fs::write(root.join("deep/skip.jpg"), b"x").unwrap();

        let mut found = walk_images(&root, "png").unwrap();
        found.sort();
        assert_eq!(found.len(), 3);

        let flat = list_images(&root, "png").unwrap();
        assert_eq!(flat.len(), 1);

        std::fs::remove_dir_all(&root).ok();
    }
}
