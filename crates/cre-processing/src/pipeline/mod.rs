//! Pipeline module.
//!
//! The cleaning pipeline and the stages that only it runs: outlier filtering
//! and min-max normalization.

mod builder;
pub mod normalizer;
pub mod outliers;
mod stage;

pub use builder::{Pipeline, PipelineBuilder};
pub use normalizer::MinMaxNormalizer;
pub use outliers::{IqrBounds, OutlierFilter};
pub use stage::CleaningStage;
