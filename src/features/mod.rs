//! Feature engineering
//!
//! Turns the persisted season tables into one training table for the
//! dry-tire degradation model. The five steps run in a fixed order: fuel
//! mass and compound filtering come before outlier rejection, so the
//! per-race medians are computed over dry laps only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::store::{ProcessedStore, RawStore};

/// Fuel burned per lap, in kg.
const FUEL_BURN_RATE_KG: f64 = 1.7;
/// Fuel carried beyond the computed requirement, in kg.
const FUEL_SAFETY_MARGIN_KG: f64 = 5.0;
/// Estimated fuel never drops below this, in kg.
const FUEL_FLOOR_KG: f64 = 2.0;
/// Race length assumed for groups missing from the lookup.
const DEFAULT_RACE_LAPS: i64 = 55;
/// Laps slower than this multiple of the race median are incidents, not
/// degradation.
const OUTLIER_MEDIAN_RATIO: f64 = 1.20;

/// Compound name to softness score. Softer compounds grip better and wear
/// faster. Unknown compounds map to nothing and are dropped with the
/// wet-weather laps.
pub fn compound_softness(compound: &str) -> Option<i32> {
    match compound {
        "HARD" => Some(1),
        "MEDIUM" => Some(2),
        "SOFT" => Some(3),
        "INTERMEDIATE" | "WET" => Some(0),
        _ => None,
    }
}

/// Estimated onboard fuel for a lap, from laps remaining in the race.
pub fn fuel_mass(total_laps: f64, lap_number: f64) -> f64 {
    ((total_laps - lap_number) * FUEL_BURN_RATE_KG + FUEL_SAFETY_MARGIN_KG).max(FUEL_FLOOR_KG)
}

fn median(values: &mut Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Group key for per-race aggregates.
type RaceKey = (i32, String);

/// Sequential feature pipeline over one in-memory training table.
///
/// The table is exclusively owned for the duration of a run; steps mutate it
/// in place and must be invoked in declaration order.
#[derive(Debug)]
pub struct FeatureEngineer {
    df: DataFrame,
}

impl FeatureEngineer {
    /// Loads and merges every season table under `raw_dir`.
    ///
    /// Seasons written by older versions may lack optional columns, so the
    /// concatenation takes the column union and fills gaps with nulls.
    pub fn load_raw_data(raw_dir: &Path) -> Result<Self, PipelineError> {
        let frames = RawStore::new(raw_dir).read_seasons()?;
        if frames.is_empty() {
            return Err(PipelineError::NoInput(raw_dir.to_path_buf()));
        }

        let df = polars::functions::concat_df_diagonal(&frames)?;
        info!("Total raw samples: {}", df.height());
        Ok(Self { df })
    }

    /// Wraps an already-loaded table, taking ownership for the run.
    pub fn from_frame(df: DataFrame) -> Self {
        Self { df }
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    /// Derives `FuelMass` from laps remaining in each race.
    ///
    /// Total race length is the maximum lap number seen per (year, event)
    /// group, which absorbs the different lengths of e.g. Spa and Monaco.
    pub fn calculate_fuel_mass(&mut self) -> Result<(), PipelineError> {
        let keys = self.group_keys()?;
        let lap_numbers = int_column(&self.df, "LapNumber")?;

        let mut race_lengths: HashMap<RaceKey, i64> = HashMap::new();
        for (key, lap) in keys.iter().zip(&lap_numbers) {
            if let Some(lap) = lap {
                let total = race_lengths.entry(key.clone()).or_insert(*lap);
                if *lap > *total {
                    *total = *lap;
                }
            }
        }

        let fuel: Vec<Option<f64>> = keys
            .iter()
            .zip(&lap_numbers)
            .map(|(key, lap)| {
                lap.map(|lap| {
                    let total = race_lengths.get(key).copied().unwrap_or(DEFAULT_RACE_LAPS);
                    fuel_mass(total as f64, lap as f64)
                })
            })
            .collect();

        self.df.with_column(Series::new("FuelMass", fuel))?;
        info!("Feature engineered: FuelMass");
        Ok(())
    }

    /// Encodes compound softness, drops wet-weather rows, derives `TyreAge`
    /// and imputes `TrackTemp` with per-race medians.
    ///
    /// Returns the number of rows dropped by the compound filter.
    pub fn encode_physics_features(&mut self) -> Result<usize, PipelineError> {
        let softness: Vec<Option<i32>> = optional_str_column(&self.df, "Compound")?
            .iter()
            .map(|c| c.as_deref().and_then(compound_softness))
            .collect();
        let keep: Vec<bool> = softness
            .iter()
            .map(|s| matches!(s, Some(score) if *score > 0))
            .collect();

        self.df.with_column(Series::new("Compound_Softness", softness))?;

        // The model targets dry-tire degradation only, so intermediate and
        // wet laps (softness 0) go, along with unmapped compounds.
        let before = self.df.height();
        self.df = self.df.filter(&BooleanChunked::from_slice("keep", &keep))?;
        let dropped = before - self.df.height();
        info!("Filtered wet/intermediate laps. Dropped {} laps.", dropped);

        let tyre_age: Vec<i64> = optional_f64_column(&self.df, "TyreLife")?
            .iter()
            .map(|life| (life.unwrap_or(1.0).trunc() as i64).max(0))
            .collect();
        self.df.with_column(Series::new("TyreAge", tyre_age))?;

        // Fill missing track temperature with the race median; a race with
        // no readings at all stays missing.
        let keys = self.group_keys()?;
        let track_temp = optional_f64_column(&self.df, "TrackTemp")?;

        let mut grouped: HashMap<RaceKey, Vec<f64>> = HashMap::new();
        for (key, value) in keys.iter().zip(&track_temp) {
            if let Some(value) = value {
                grouped.entry(key.clone()).or_default().push(*value);
            }
        }
        let medians: HashMap<RaceKey, f64> = grouped
            .into_iter()
            .filter_map(|(key, mut values)| median(&mut values).map(|m| (key, m)))
            .collect();

        let imputed: Vec<Option<f64>> = keys
            .iter()
            .zip(&track_temp)
            .map(|(key, value)| match value {
                Some(value) => Some(*value),
                None => medians.get(key).copied(),
            })
            .collect();
        self.df.with_column(Series::new("TrackTemp", imputed))?;

        info!("Feature engineered: Compound_Softness, TyreAge, TrackTemp");
        Ok(dropped)
    }

    /// Rejects laps slower than the race-median threshold, along with laps
    /// missing a timed target entirely.
    ///
    /// Returns the number of rows removed. Fast outliers stay in: the slow
    /// tail is spins and damage, not degradation.
    pub fn create_target_variable(&mut self) -> Result<usize, PipelineError> {
        let keys = self.group_keys()?;
        let lap_times = {
            let series = self.df.column("LapTimeSeconds")?.cast(&DataType::Float64)?;
            series.f64()?.into_iter().collect::<Vec<Option<f64>>>()
        };

        let mut grouped: HashMap<RaceKey, Vec<f64>> = HashMap::new();
        for (key, value) in keys.iter().zip(&lap_times) {
            if let Some(value) = value {
                grouped.entry(key.clone()).or_default().push(*value);
            }
        }
        let medians: HashMap<RaceKey, f64> = grouped
            .into_iter()
            .filter_map(|(key, mut values)| median(&mut values).map(|m| (key, m)))
            .collect();

        let keep: Vec<bool> = keys
            .iter()
            .zip(&lap_times)
            .map(|(key, value)| match (value, medians.get(key)) {
                (Some(value), Some(median)) => *value <= median * OUTLIER_MEDIAN_RATIO,
                _ => false,
            })
            .collect();

        let before = self.df.height();
        self.df = self.df.filter(&BooleanChunked::from_slice("keep", &keep))?;
        let removed = before - self.df.height();
        info!("Removed {} slow outliers (spins/damage).", removed);
        Ok(removed)
    }

    /// Persists the training table, creating the directory when needed.
    pub fn save_processed_data(&mut self, processed_dir: &Path) -> Result<PathBuf, PipelineError> {
        let rows = self.df.height();
        let path = ProcessedStore::new(processed_dir).write_training(&mut self.df)?;
        info!("Saved processed data to {} ({} rows)", path.display(), rows);
        Ok(path)
    }

    /// Per-row (Year, EventName) keys, the grouping behind every aggregate.
    fn group_keys(&self) -> Result<Vec<RaceKey>, PipelineError> {
        let year_series = self.df.column("Year")?.cast(&DataType::Int32)?;
        let years = year_series.i32()?;
        let event_series = self.df.column("EventName")?;
        let events = event_series.str()?;

        Ok(years
            .into_iter()
            .zip(events.into_iter())
            .map(|(year, event)| (year.unwrap_or(0), event.unwrap_or("").to_string()))
            .collect())
    }
}

/// Feature stage entry point: raw season tables in, training table out.
pub fn run(config: &PipelineConfig) -> Result<(PathBuf, usize), PipelineError> {
    let mut engineer = FeatureEngineer::load_raw_data(&config.raw_dir)?;
    engineer.calculate_fuel_mass()?;
    engineer.encode_physics_features()?;
    engineer.create_target_variable()?;
    let path = engineer.save_processed_data(&config.processed_dir)?;
    let rows = engineer.height();
    Ok((path, rows))
}

/// Reads an integer column, tolerating type drift in older season files.
fn int_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, PipelineError> {
    let series = df.column(name)?.cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

/// Reads a float column that may be absent or differently typed in older
/// season files; absence reads as all-missing.
fn optional_f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, PipelineError> {
    match df.column(name) {
        Ok(series) => {
            let series = series.cast(&DataType::Float64)?;
            Ok(series.f64()?.into_iter().collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

/// Reads a string column; absence reads as all-missing.
fn optional_str_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, PipelineError> {
    match df.column(name) {
        Ok(series) => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect()),
        Err(_) => Ok(vec![None; df.height()]),
    }
}
