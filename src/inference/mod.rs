//! Model loading and inference.
//!
//! Both classifiers are opaque artifacts produced by an external training
//! pipeline and deserialized once at startup. Gateway module (EMBP): `main.rs`
//! sees the two classifier types and the preprocessor, not their internals.

mod crop;
mod preprocess;
mod soil;

pub use crop::{CropClassifier, FEATURE_COUNT};
pub use preprocess::{image_to_input, IMAGE_SIZE};
pub use soil::{top_class, SoilClassifier};
