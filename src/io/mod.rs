//! IO module - job input and default settings.

mod config;
pub mod defaults;

pub use config::{parse_job_config, read_job_config, AftJkConfig, CellConfig, JobConfig};
