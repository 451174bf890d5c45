//! Parquet persistence for season tables and the training table

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::PipelineError;

/// File name of the final training table.
pub const TRAINING_FILE: &str = "f1_training_data.parquet";

/// Per-season tables, one Parquet file per year.
pub struct RawStore {
    dir: PathBuf,
}

impl RawStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File path for one season's table.
    pub fn season_path(&self, year: i32) -> PathBuf {
        self.dir.join(format!("f1_laps_{}.parquet", year))
    }

    /// Writes a season table, replacing any previous ingestion of that year.
    pub fn write_season(&self, year: i32, df: &mut DataFrame) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.season_path(year);
        let file = File::create(&path)?;
        ParquetWriter::new(file).finish(df)?;
        Ok(path)
    }

    /// All season tables in the store, in file-name order. A missing
    /// directory reads as an empty store.
    pub fn read_seasons(&self) -> Result<Vec<DataFrame>, PipelineError> {
        let mut paths: Vec<PathBuf> = match fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "parquet"))
                .collect(),
            Err(_) => Vec::new(),
        };
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let file = File::open(&path)?;
            frames.push(ParquetReader::new(file).finish()?);
            info!("Loaded {}", path.display());
        }
        Ok(frames)
    }
}

/// The final training table.
pub struct ProcessedStore {
    dir: PathBuf,
}

impl ProcessedStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn training_path(&self) -> PathBuf {
        self.dir.join(TRAINING_FILE)
    }

    /// Writes the training table, creating the directory when needed.
    pub fn write_training(&self, df: &mut DataFrame) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.training_path();
        let file = File::create(&path)?;
        ParquetWriter::new(file).finish(df)?;
        Ok(path)
    }
}
