pub mod binner;
pub mod cleaner;
pub mod combiner;
pub mod error;
pub mod experiment_config;
pub mod merger;
pub mod outputs;
pub mod paths;
pub mod pipelines;
pub mod quality_filters;
pub mod reformatter;
pub mod report;
pub mod table;
pub mod trimmer;

pub use error::{PipelineError, Result};
pub use experiment_config::ExperimentConfig;
pub use merger::RunOrdering;
pub use outputs::RunManifest;
pub use pipelines::{run_pipeline, PipelineInputs, PipelineParams};
pub use report::{SkippedFile, StageReport};
pub use trimmer::StartPhase;
