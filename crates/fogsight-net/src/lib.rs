//! # Fogsight-Net
//!
//! Multi-branch convolutional networks for visibility estimation, built on
//! candle.
//!
//! The networks consume the (views, samples, channels, height, width)
//! batch stack produced by `fogsight-vision` and split it by view index:
//! one convolutional branch per view, additive cross-view fusion between
//! stages, and a shared linear head producing either a visibility distance
//! or class scores. Training, evaluation, metrics and checkpointing live
//! here too.

pub mod input;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod reduced;
pub mod train;
pub mod visnet;

pub use input::*;
pub use loss::*;
pub use metrics::*;
pub use model::*;
pub use reduced::*;
pub use train::*;
pub use visnet::*;
