//! Training and evaluation loops.
//!
//! One epoch walks the dataset in seeded-shuffled batches, steps the
//! optimizer on the task loss, then runs an unshuffled validation pass.
//! Per-epoch metrics are appended to `results.csv`; the latest weights are
//! checkpointed every epoch and the best validation score keeps its own
//! checkpoint.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use candle_core::Device;
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use fogsight_core::{Error, Result, Task};
use fogsight_data::{BatchIter, VisionDataset};

use crate::input::{labels_tensor, views_tensor};
use crate::loss::{cross_entropy_one_hot, smooth_l1};
use crate::metrics::{ClassificationMetrics, RegressionMetrics};
use crate::model::VisibilityModel;

pub(crate) trait CandleExt<T> {
    fn model_err(self) -> Result<T>;
}

impl<T> CandleExt<T> for candle_core::Result<T> {
    fn model_err(self) -> Result<T> {
        self.map_err(|e| Error::Model(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Base seed for per-epoch shuffling; epoch index is folded in.
    pub shuffle_seed: u64,
    /// Directory receiving checkpoints and the metrics log.
    pub output_dir: PathBuf,
}

/// Metrics of one full pass over a dataset.
pub enum EpochMetrics {
    Regression(RegressionMetrics),
    Classification(ClassificationMetrics),
}

impl EpochMetrics {
    pub fn log(&self, stage: &str) {
        match self {
            EpochMetrics::Regression(m) => tracing::info!(
                stage,
                samples = m.count(),
                mae = m.mae(),
                r2 = m.r2(),
                rmse = m.rmse(),
                "epoch metrics"
            ),
            EpochMetrics::Classification(m) => tracing::info!(
                stage,
                samples = m.count(),
                loss = m.loss(),
                accuracy = m.accuracy(),
                "epoch metrics"
            ),
        }
    }

    fn csv_fields(&self) -> String {
        match self {
            EpochMetrics::Regression(m) => format!("{},{},{}", m.mae(), m.r2(), m.rmse()),
            EpochMetrics::Classification(m) => format!("{},{}", m.loss(), m.accuracy()),
        }
    }

    /// (primary score, loss): validation R2 or accuracy, higher is better,
    /// ties broken by lower loss.
    fn score(&self) -> (f64, f64) {
        match self {
            EpochMetrics::Regression(m) => (m.r2(), m.loss()),
            EpochMetrics::Classification(m) => (m.accuracy(), m.loss()),
        }
    }

    fn improves(&self, best: Option<(f64, f64)>) -> bool {
        let (score, loss) = self.score();
        match best {
            None => true,
            Some((best_score, best_loss)) => {
                score > best_score || (score == best_score && loss < best_loss)
            }
        }
    }
}

fn csv_header(task: Task) -> &'static str {
    match task {
        Task::Regression => {
            "training MAE,training R2,training RMSE,validation MAE,validation R2,validation RMSE"
        }
        Task::Classification { .. } => {
            "training loss,training accuracy,validation loss,validation accuracy"
        }
    }
}

fn best_checkpoint_name(task: Task) -> &'static str {
    match task {
        Task::Regression => "best-r2.safetensors",
        Task::Classification { .. } => "best-acc.safetensors",
    }
}

/// Trains `model` for the configured number of epochs, validating after
/// each one.
pub fn train(
    model: &dyn VisibilityModel,
    varmap: &VarMap,
    task: Task,
    train_set: &dyn VisionDataset,
    val_set: &dyn VisionDataset,
    options: &TrainOptions,
    device: &Device,
) -> Result<()> {
    let mut optimizer = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: options.learning_rate,
            ..Default::default()
        },
    )
    .model_err()?;

    let results_path = options.output_dir.join("results.csv");
    append_line(&results_path, csv_header(task))?;

    let mut best: Option<(f64, f64)> = None;
    for epoch in 0..options.epochs {
        tracing::info!(epoch = epoch + 1, total = options.epochs, "starting epoch");

        let seed = options.shuffle_seed.wrapping_add(epoch as u64);
        let train_metrics = run_epoch(
            model,
            Some(&mut optimizer),
            task,
            train_set,
            options.batch_size,
            Some(seed),
            device,
        )?;
        train_metrics.log("train");

        let val_metrics = run_epoch(
            model,
            None,
            task,
            val_set,
            options.batch_size,
            None,
            device,
        )?;
        val_metrics.log("val");

        append_line(
            &results_path,
            &format!("{},{}", train_metrics.csv_fields(), val_metrics.csv_fields()),
        )?;

        save_weights(varmap, &options.output_dir.join("last.safetensors"))?;
        if val_metrics.improves(best) {
            best = Some(val_metrics.score());
            let path = options.output_dir.join(best_checkpoint_name(task));
            save_weights(varmap, &path)?;
            tracing::info!(path = %path.display(), "validation improved, checkpointed");
        }
    }

    Ok(())
}

/// Runs a single evaluation pass. With `record_path` set, regression
/// predictions are dumped as (observed, true) CSV rows.
pub fn evaluate(
    model: &dyn VisibilityModel,
    task: Task,
    dataset: &dyn VisionDataset,
    batch_size: usize,
    device: &Device,
    record_path: Option<&Path>,
) -> Result<EpochMetrics> {
    let metrics = run_epoch(model, None, task, dataset, batch_size, None, device)?;
    metrics.log("eval");

    if let (Some(path), EpochMetrics::Regression(reg)) = (record_path, &metrics) {
        let mut text = String::from("observed,true\n");
        for (observed, truth) in reg.pairs() {
            text.push_str(&format!("{observed},{truth}\n"));
        }
        std::fs::write(path, text)?;
        tracing::info!(path = %path.display(), "recorded predictions");
    }

    Ok(metrics)
}

fn run_epoch(
    model: &dyn VisibilityModel,
    mut optimizer: Option<&mut AdamW>,
    task: Task,
    dataset: &dyn VisionDataset,
    batch_size: usize,
    shuffle_seed: Option<u64>,
    device: &Device,
) -> Result<EpochMetrics> {
    let training = optimizer.is_some();
    let mut regression = RegressionMetrics::new();
    let mut classification = ClassificationMetrics::new();

    for batch in BatchIter::new(dataset, batch_size, shuffle_seed) {
        let batch = batch?;
        let views = views_tensor(&batch, device).model_err()?;
        let labels = labels_tensor(&batch, device).model_err()?;

        let output = model.forward(&views, training).model_err()?;
        let loss = match task {
            Task::Regression => smooth_l1(&output, &labels),
            Task::Classification { .. } => cross_entropy_one_hot(&output, &labels),
        }
        .model_err()?;

        if let Some(optimizer) = optimizer.as_deref_mut() {
            optimizer.backward_step(&loss).model_err()?;
        }

        let loss_value = loss.to_scalar::<f32>().model_err()?;
        let outputs: Vec<Vec<f32>> = output.to_vec2().model_err()?;
        match task {
            Task::Regression => {
                let predicted: Vec<f32> = outputs.iter().map(|row| row[0]).collect();
                let truth: Vec<f32> = batch.labels.column(0).to_vec();
                regression.push(loss_value, &predicted, &truth);
            }
            Task::Classification { .. } => {
                let truth: Vec<Vec<f32>> = batch
                    .labels
                    .rows()
                    .into_iter()
                    .map(|row| row.to_vec())
                    .collect();
                classification.push(loss_value, &outputs, &truth);
            }
        }
    }

    Ok(match task {
        Task::Regression => EpochMetrics::Regression(regression),
        Task::Classification { .. } => EpochMetrics::Classification(classification),
    })
}

pub fn save_weights(varmap: &VarMap, path: &Path) -> Result<()> {
    varmap
        .save(path)
        .map_err(|e| Error::Checkpoint(format!("cannot save {}: {e}", path.display())))
}

pub fn load_weights(varmap: &mut VarMap, path: &Path) -> Result<()> {
    varmap
        .load(path)
        .map_err(|e| Error::Checkpoint(format!("cannot load {}: {e}", path.display())))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarBuilder;
    use fogsight_core::{ImageDim, Label, ViewKind};
    use fogsight_vision::MultiViewSample;
    use ndarray::Array3;

    use crate::model::{ModelConfig, ModelKind};

    /// Tiny in-memory dataset with three constant views per sample.
    struct ToyDataset {
        count: usize,
    }

    impl VisionDataset for ToyDataset {
        fn len(&self) -> usize {
            self.count
        }

        fn sample(&self, idx: usize) -> Result<MultiViewSample> {
            let fill = idx as f32 / self.count as f32;
            let view = |offset: f32| Array3::from_elem((3, 32, 48), fill + offset);
            MultiViewSample::new(
                vec![
                    (ViewKind::Original, view(0.0)),
                    (ViewKind::PseudoColor, view(0.1)),
                    (ViewKind::Frequency, view(0.2)),
                ],
                Label::scalar(fill),
            )
        }
    }

    #[test]
    fn regression_training_writes_artifacts() -> Result<()> {
        let out_dir = std::env::temp_dir().join("fogsight-train-test");
        std::fs::remove_dir_all(&out_dir).ok();
        std::fs::create_dir_all(&out_dir)?;

        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = ModelConfig::new(ImageDim::new(32, 48), 3, 1);
        let model = ModelKind::VisNetReduced
            .build(&config, vb)
            .map_err(|e| Error::Model(e.to_string()))?;

        let train_set = ToyDataset { count: 4 };
        let val_set = ToyDataset { count: 2 };
        let options = TrainOptions {
            epochs: 1,
            batch_size: 2,
            learning_rate: 1e-4,
            shuffle_seed: 7,
            output_dir: out_dir.clone(),
        };

        train(
            model.as_ref(),
            &varmap,
            Task::Regression,
            &train_set,
            &val_set,
            &options,
            &device,
        )?;

        let results = std::fs::read_to_string(out_dir.join("results.csv"))?;
        assert!(results.starts_with("training MAE"));
        assert_eq!(results.lines().count(), 2);
        assert!(out_dir.join("last.safetensors").exists());
        assert!(out_dir.join("best-r2.safetensors").exists());

        let record = out_dir.join("observed_truth.csv");
        evaluate(
            model.as_ref(),
            Task::Regression,
            &val_set,
            2,
            &device,
            Some(&record),
        )?;
        let recorded = std::fs::read_to_string(&record)?;
        assert_eq!(recorded.lines().count(), 3); // header + 2 samples

        std::fs::remove_dir_all(&out_dir).ok();
        Ok(())
    }
}
