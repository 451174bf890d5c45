//! Run-scoped pipeline configuration

use std::path::PathBuf;

/// Configuration for one pipeline run, passed explicitly into each stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Season years to ingest, in processing order.
    pub years: Vec<i32>,
    /// Directory holding the per-season tables.
    pub raw_dir: PathBuf,
    /// Directory receiving the final training table.
    pub processed_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            years: vec![2022, 2023, 2024],
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
        }
    }
}
