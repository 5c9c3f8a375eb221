//! # Fogsight-Data
//!
//! Labeled fog-image dataset loaders and batch assembly.
//!
//! Every loader enumerates image files for one split, joins visibility
//! labels from its source-specific scheme (CSV sidecar, directory name or
//! file suffix), and hands decoded images through the shared preprocessing
//! pipeline. Datasets are random-access and stateless between accesses;
//! `BatchIter` drives per-epoch shuffling and collation.

pub mod cityscapes;
pub mod combined;
pub mod dataset;
pub mod decode;
pub mod frosi;
pub mod loader;
pub mod registry;
pub mod ssf;

pub use cityscapes::CityscapesDataset;
pub use combined::CombinedDataset;
pub use dataset::VisionDataset;
pub use decode::decode_image;
pub use frosi::FrosiDataset;
pub use loader::BatchIter;
pub use registry::DatasetKind;
pub use ssf::{visibility_class, SsfDataset, VISIBILITY_CLASSES};
