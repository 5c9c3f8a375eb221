//! # Fogsight-Core
//!
//! Core types and utilities for the fogsight camera-based atmospheric
//! visibility estimation system.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
