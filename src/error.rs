use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::source::SourceError;

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Filesystem failure while reading or writing tables
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Table operation failed
    #[error("dataframe operation failed: {0}")]
    Frame(#[from] PolarsError),

    /// Timing-data provider failure
    #[error("data source error: {0}")]
    Source(#[from] SourceError),

    /// The feature stage found nothing to work with
    #[error("no season files found in {}. Run the ingest stage first.", .0.display())]
    NoInput(PathBuf),
}
