//! Sources of raw turbine records.

pub mod file;
pub mod http;
pub mod payload;

pub use file::{FileSource, StaticSource};
pub use http::HttpSource;
pub use payload::{records_to_json, SourceResponse};
