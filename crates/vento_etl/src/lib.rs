pub mod pipeline;

pub use pipeline::{transform, EtlPipeline, RunReport, Transformed};
