//! Dataset registry: a discriminant enum resolved to a constructor once at
//! startup, instead of string comparisons scattered through the run paths.

use std::path::Path;

use fogsight_core::{Error, Result, Split, Task};
use fogsight_vision::FramePipeline;
use serde::{Deserialize, Serialize};

use crate::cityscapes::CityscapesDataset;
use crate::combined::CombinedDataset;
use crate::dataset::VisionDataset;
use crate::frosi::FrosiDataset;
use crate::ssf::SsfDataset;

/// The supported dataset families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetKind {
    Ssf,
    Frosi,
    FoggyCityscapes,
    Combined,
}

impl DatasetKind {
    /// Builds the dataset for one split. Only SSF knows how to bin labels
    /// into classes; the synthetic sets carry fixed regression labels.
    pub fn build(
        &self,
        root: &Path,
        split: Split,
        task: Task,
        clear_sky_cap: Option<usize>,
        pipeline: FramePipeline,
    ) -> Result<Box<dyn VisionDataset>> {
        match self {
            DatasetKind::Ssf => Ok(Box::new(SsfDataset::new(
                root,
                split,
                task,
                clear_sky_cap,
                pipeline,
            )?)),
            DatasetKind::Frosi => {
                require_regression(task, "FROSI")?;
                Ok(Box::new(FrosiDataset::new(root, split, pipeline)?))
            }
            DatasetKind::FoggyCityscapes => {
                require_regression(task, "FOGGY_CITYSCAPES")?;
                Ok(Box::new(CityscapesDataset::new(root, split, pipeline)?))
            }
            DatasetKind::Combined => {
                require_regression(task, "COMBINED")?;
                Ok(Box::new(CombinedDataset::new(
                    root,
                    split,
                    clear_sky_cap,
                    pipeline,
                )?))
            }
        }
    }
}

fn require_regression(task: Task, name: &str) -> Result<()> {
    match task {
        Task::Regression => Ok(()),
        Task::Classification { classes } => Err(Error::Config(format!(
            "dataset {name} carries regression labels and cannot train a \
             {classes}-class model"
        ))),
    }
}
