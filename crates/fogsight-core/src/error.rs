//! Error types for the fogsight system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("channel mismatch: expected {expected} channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error(
        "frequency mask {mask_h}x{mask_w} exceeds spectrum bounds {spectrum_h}x{spectrum_w}"
    )]
    MaskOutOfBounds {
        mask_h: usize,
        mask_w: usize,
        spectrum_h: usize,
        spectrum_w: usize,
    },

    #[error("batch assembly error: {0}")]
    BatchAssembly(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("no label found for image {path}")]
    MissingLabel { path: String },

    #[error("image decode error: {0}")]
    Decode(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
