pub mod api;
pub mod config;
pub mod error;
pub mod fact;
pub mod operation;
pub mod record;
pub mod reshape;
pub mod resolve;
pub mod signal;
pub mod synthetic;
pub mod window;

pub use api::*;
pub use config::{PipelineConfig, SourceConfig};
pub use error::{VentoError, VentoResult};
pub use fact::*;
pub use operation::AggregationOp;
pub use record::*;
pub use reshape::*;
pub use resolve::*;
pub use signal::*;
pub use window::*;
