//! # Fogsight-Vision
//!
//! Image preprocessing and multi-view tensor assembly for camera-based
//! visibility estimation.
//!
//! The pipeline builds three parallel representations of every input image:
//!
//! 1. **Original**: aspect-preserving centered crop, bicubic resize to the
//!    configured grid, unit-scaled.
//! 2. **Pseudo-color**: a designated grayscale channel mapped through a
//!    false-color gradient (or an exponential fog-highlight curve in
//!    single-channel mode).
//! 3. **Frequency**: the same grayscale channel passed through an FFT-based
//!    high-pass filter that notches out low and mid frequencies near DC,
//!    emphasizing whatever edge and texture content the fog has not
//!    swallowed.
//!
//! Per-sample stacks are collated into (views, samples, channels, height,
//! width) batches consumed by the multi-branch networks in `fogsight-net`.

pub mod colormap;
pub mod geometry;
pub mod mask;
pub mod pipeline;
pub mod spectral;
pub mod view;

pub use colormap::*;
pub use geometry::*;
pub use mask::*;
pub use pipeline::*;
pub use spectral::*;
pub use view::*;
