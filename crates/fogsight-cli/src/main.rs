//! fogsight CLI — trains and evaluates visibility estimation models from a
//! TOML run configuration.

use std::path::PathBuf;

use candle_core::DType;
use candle_nn::{VarBuilder, VarMap};
use clap::Parser;
use serde::Deserialize;

use fogsight_core::{
    ColorChannels, Colormap, Error, GraySource, ImageDim, MaskDim, PipelineConfig, Result,
    SpectralMask, Split, Task,
};
use fogsight_data::DatasetKind;
use fogsight_net::{
    evaluate, load_weights, resolve_device, train, ModelConfig, ModelKind, TrainOptions,
};
use fogsight_vision::{FramePipeline, MaskCache};

#[derive(Parser)]
#[command(name = "fogsight")]
#[command(about = "Estimate atmospheric visibility from camera images")]
#[command(version)]
struct Cli {
    /// Path to the run configuration (TOML). Keys can be overridden with
    /// FOGSIGHT_* environment variables.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum Mode {
    Train,
    Validate,
    Test,
}

/// One training or evaluation run, fully described by its configuration
/// file; no ambient state.
#[derive(Debug, Clone, Deserialize)]
struct RunConfig {
    mode: Mode,
    model: ModelKind,
    dataset: DatasetKind,
    /// Dataset root directory.
    data_path: PathBuf,
    /// Directory receiving checkpoints and metric logs.
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,
    /// Weights to load: required for evaluation, optional resume point for
    /// training.
    checkpoint: Option<PathBuf>,

    /// Normalized image grid, height first.
    img_dim: ImageDim,
    /// High-pass notch extent; omitting both mask keys disables the
    /// frequency view.
    mask_dim: Option<MaskDim>,
    /// Soft radial mask radius, as a fraction of each spectrum axis.
    /// Mutually exclusive with `mask_dim`.
    mask_radius: Option<f32>,
    #[serde(default = "default_channels")]
    channels: usize,
    #[serde(default = "default_gray_source")]
    gray_source: GraySource,
    /// Disables the pseudo-color view when false.
    #[serde(default = "default_true")]
    pseudo_color: bool,
    /// Custom gradient anchors for 3-channel pseudo-color views; the stock
    /// visibility ramp is used when omitted.
    colormap_anchors: Option<Vec<[f32; 3]>>,

    /// 1 trains a regression model, anything larger a classifier.
    #[serde(default = "default_num_classes")]
    num_classes: usize,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default = "default_learning_rate")]
    learning_rate: f64,
    #[serde(default = "default_epochs")]
    epochs: usize,
    #[serde(default = "default_shuffle_seed")]
    shuffle_seed: u64,
    #[serde(default = "default_true")]
    try_cuda: bool,
    /// Dump (observed, true) pairs at evaluation time.
    #[serde(default)]
    record_values: bool,
    /// Bounds the number of clear-sky samples per split.
    clear_sky_cap: Option<usize>,

    /// Per-channel input statistics for models that normalize their input.
    normalize_mean: Option<Vec<f32>>,
    normalize_std: Option<Vec<f32>>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_channels() -> usize {
    3
}
fn default_gray_source() -> GraySource {
    GraySource::Blue
}
fn default_true() -> bool {
    true
}
fn default_num_classes() -> usize {
    1
}
fn default_batch_size() -> usize {
    16
}
fn default_learning_rate() -> f64 {
    1e-4
}
fn default_epochs() -> usize {
    30
}
fn default_shuffle_seed() -> u64 {
    37
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let run_config = load_config(&cli.config)?;
    run(run_config)
}

fn load_config(path: &std::path::Path) -> Result<RunConfig> {
    config::Config::builder()
        .add_source(config::File::from(path.to_path_buf()))
        .add_source(config::Environment::with_prefix("FOGSIGHT"))
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}

fn pipeline_config(run: &RunConfig) -> Result<PipelineConfig> {
    let channels = ColorChannels::from_count(run.channels)?;
    let colormap = run.pseudo_color.then(|| match channels {
        ColorChannels::Rgb => match &run.colormap_anchors {
            Some(anchors) => Colormap::Anchors(anchors.clone()),
            None => Colormap::VisibilityRamp,
        },
        ColorChannels::Gray => Colormap::FogHighlight,
    });

    let mask = match (run.mask_dim, run.mask_radius) {
        (Some(_), Some(_)) => {
            return Err(Error::Config(
                "mask_dim and mask_radius are mutually exclusive".into(),
            ));
        }
        (Some(mask_dim), None) => Some(SpectralMask::Notch(mask_dim)),
        (None, Some(radius)) => Some(SpectralMask::RadialHighpass { radius }),
        (None, None) => None,
    };

    Ok(PipelineConfig {
        img_dim: run.img_dim,
        channels,
        gray_source: run.gray_source,
        colormap,
        mask,
    })
}

fn model_config(run: &RunConfig) -> Result<ModelConfig> {
    let config = ModelConfig::new(run.img_dim, run.channels, run.num_classes);
    match (&run.normalize_mean, &run.normalize_std) {
        (Some(mean), Some(std)) => Ok(config.with_normalization(mean.clone(), std.clone())),
        (None, None) => Ok(config),
        _ => Err(Error::Config(
            "normalize_mean and normalize_std must be given together".into(),
        )),
    }
}

fn run(run_config: RunConfig) -> Result<()> {
    let task = Task::from_class_count(run_config.num_classes)?;
    let device = resolve_device(run_config.try_cuda);
    let masks = MaskCache::new();

    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = run_config
        .model
        .build(&model_config(&run_config)?, vb)
        .map_err(|e| Error::Model(e.to_string()))?;

    match run_config.mode {
        Mode::Train => {
            if let Some(checkpoint) = &run_config.checkpoint {
                tracing::info!(path = %checkpoint.display(), "resuming from checkpoint");
                load_weights(&mut varmap, checkpoint)?;
            }

            let train_set = run_config.dataset.build(
                &run_config.data_path,
                Split::Train,
                task,
                run_config.clear_sky_cap,
                FramePipeline::new(pipeline_config(&run_config)?, &masks)?,
            )?;
            let val_set = run_config.dataset.build(
                &run_config.data_path,
                Split::Val,
                task,
                run_config.clear_sky_cap,
                FramePipeline::new(pipeline_config(&run_config)?, &masks)?,
            )?;

            std::fs::create_dir_all(&run_config.output_dir)?;
            let options = TrainOptions {
                epochs: run_config.epochs,
                batch_size: run_config.batch_size,
                learning_rate: run_config.learning_rate,
                shuffle_seed: run_config.shuffle_seed,
                output_dir: run_config.output_dir.clone(),
            };
            train(
                model.as_ref(),
                &varmap,
                task,
                train_set.as_ref(),
                val_set.as_ref(),
                &options,
                &device,
            )
        }
        Mode::Validate | Mode::Test => {
            let checkpoint = run_config.checkpoint.as_ref().ok_or_else(|| {
                Error::Config("evaluation needs a checkpoint path".into())
            })?;
            load_weights(&mut varmap, checkpoint)?;

            let split = match run_config.mode {
                Mode::Validate => Split::Val,
                _ => Split::Test,
            };
            let dataset = run_config.dataset.build(
                &run_config.data_path,
                split,
                task,
                run_config.clear_sky_cap,
                FramePipeline::new(pipeline_config(&run_config)?, &masks)?,
            )?;

            let record = if run_config.record_values {
                std::fs::create_dir_all(&run_config.output_dir)?;
                Some(run_config.output_dir.join("observed_truth.csv"))
            } else {
                None
            };

            evaluate(
                model.as_ref(),
                task,
                dataset.as_ref(),
                run_config.batch_size,
                &device,
                record.as_deref(),
            )?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_toml(text: &str) -> RunConfig {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let run = parse_toml(
            r#"
            mode = "TRAIN"
            model = "VISNET"
            dataset = "SSF"
            data_path = "/data/ssf"
            img_dim = [120, 160]
            mask_dim = [20, 40]
            "#,
        );

        assert_eq!(run.mode, Mode::Train);
        assert_eq!(run.model, ModelKind::VisNet);
        assert_eq!(run.dataset, DatasetKind::Ssf);
        assert_eq!(run.img_dim, ImageDim::new(120, 160));
        assert_eq!(run.mask_dim, Some(MaskDim::new(20, 40)));
        assert_eq!(run.channels, 3);
        assert_eq!(run.num_classes, 1);
        assert_eq!(run.gray_source, GraySource::Blue);
        assert!(run.pseudo_color);
        assert!(run.try_cuda);
        assert!(!run.record_values);
    }

    #[test]
    fn pipeline_config_maps_channel_modes() {
        let run = parse_toml(
            r#"
            mode = "TEST"
            model = "VISNET_REDUCED"
            dataset = "COMBINED"
            data_path = "/data/all"
            img_dim = [120, 160]
            channels = 1
            "#,
        );

        let pipeline = pipeline_config(&run).unwrap();
        assert_eq!(pipeline.channels, ColorChannels::Gray);
        assert_eq!(pipeline.colormap, Some(Colormap::FogHighlight));
        assert_eq!(pipeline.mask, None);
    }

    #[test]
    fn radial_mask_is_selectable() {
        let run = parse_toml(
            r#"
            mode = "TRAIN"
            model = "VISNET"
            dataset = "SSF"
            data_path = "/data/ssf"
            img_dim = [120, 160]
            mask_radius = 0.1
            "#,
        );
        let pipeline = pipeline_config(&run).unwrap();
        assert_eq!(
            pipeline.mask,
            Some(SpectralMask::RadialHighpass { radius: 0.1 })
        );
    }

    #[test]
    fn conflicting_mask_keys_are_rejected() {
        let run = parse_toml(
            r#"
            mode = "TRAIN"
            model = "VISNET"
            dataset = "SSF"
            data_path = "/data/ssf"
            img_dim = [120, 160]
            mask_dim = [20, 40]
            mask_radius = 0.1
            "#,
        );
        assert!(pipeline_config(&run).is_err());
    }

    #[test]
    fn half_specified_normalization_is_rejected() {
        let run = parse_toml(
            r#"
            mode = "TRAIN"
            model = "VISNET_REDUCED"
            dataset = "SSF"
            data_path = "/data/ssf"
            img_dim = [120, 160]
            normalize_mean = [0.5, 0.5, 0.5]
            "#,
        );
        assert!(model_config(&run).is_err());
    }
}
