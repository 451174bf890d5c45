//! Timing-data provider abstraction

pub mod livetiming;

use thiserror::Error;

use crate::models::{RaceEvent, RaceSession};

pub use livetiming::{LiveTimingSource, SourceConfig};

/// Provider errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request to {url} failed after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },
}

/// Season-schedule and per-round session queries against a timing-data
/// provider.
///
/// The pipeline only ever talks to this trait, so the ingestion logic runs
/// unchanged against synthetic in-memory data in tests.
pub trait SessionDataSource {
    /// All events scheduled for a season, in round order.
    fn season_schedule(&self, year: i32) -> Result<Vec<RaceEvent>, SourceError>;

    /// Lap and weather records for one race session.
    fn race_session(&self, year: i32, round_number: u32) -> Result<RaceSession, SourceError>;
}
