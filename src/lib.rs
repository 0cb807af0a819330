pub mod cloud;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod schema;

pub use config::PipelineConfig;
pub use pipeline::Pipeline;
