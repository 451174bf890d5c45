//! Tyrewear - F1 lap-time degradation dataset pipeline
//!
//! This library provides:
//! - Season ingestion: per-round lap and weather records from a timing
//!   archive, cleaned and merged into one Parquet table per season
//! - Weather-to-lap interpolation at lap boundaries
//! - Feature engineering: fuel-mass estimation, compound softness encoding,
//!   track-temperature imputation and lap-time outlier rejection
//!
//! # Example
//!
//! ```no_run
//! use tyrewear::config::PipelineConfig;
//! use tyrewear::source::{LiveTimingSource, SourceConfig};
//!
//! let config = PipelineConfig::default();
//! let source = LiveTimingSource::new(SourceConfig::new("https://timing.example/v1"));
//!
//! let written = tyrewear::ingest::run(&source, &config).unwrap();
//! println!("{} seasons ingested", written.len());
//!
//! let (path, rows) = tyrewear::features::run(&config).unwrap();
//! println!("{} training rows at {}", rows, path.display());
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod models;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use features::FeatureEngineer;
pub use ingest::weather::WeatherEnricher;
pub use ingest::SeasonIngestor;
pub use models::{EnrichedLap, LapRecord, RaceEvent, RaceSession, WeatherSample};
pub use source::{LiveTimingSource, SessionDataSource, SourceConfig};
pub use store::{ProcessedStore, RawStore};
