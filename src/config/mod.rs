//! Job configuration: placeholders, TOML file and CLI overrides.

mod job;

pub use job::{parse_key_value, JobArgs, JobConfig};
