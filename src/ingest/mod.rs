//! Season ingestion
//!
//! Drives the session data source across all rounds of a season, filters out
//! unusable laps, merges weather onto lap boundaries, attaches race metadata
//! and derives the numeric lap-time target.

pub mod weather;

use std::path::PathBuf;

use polars::prelude::*;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{delta_seconds, EnrichedLap, RaceEvent};
use crate::source::SessionDataSource;
use crate::store::RawStore;
use weather::WeatherEnricher;

/// Column set persisted per season, in writing order. Duration columns hold
/// integer milliseconds.
pub const SEASON_COLUMNS: [&str; 20] = [
    "Driver",
    "LapTime",
    "LapNumber",
    "Stint",
    "PitOutTime",
    "PitInTime",
    "Compound",
    "TyreLife",
    "FreshTyre",
    "Team",
    "Year",
    "RoundNumber",
    "EventName",
    "CircuitLocation",
    "AirTemp",
    "TrackTemp",
    "Humidity",
    "Rainfall",
    "TrackStatus",
    "LapTimeSeconds",
];

/// Schedule entries with this format are not points-scoring races.
const NON_RACE_FORMAT: &str = "testing";

/// Builds one table per season from the session data source.
pub struct SeasonIngestor<'a, S: SessionDataSource> {
    source: &'a S,
}

impl<'a, S: SessionDataSource> SeasonIngestor<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Ingests every race round of `year` into one season table.
    ///
    /// Rounds that fail to load or yield no clean laps are skipped with a
    /// log line; the season result is `None` when no round contributed
    /// anything, which is distinct from an empty table.
    pub fn ingest_season(&self, year: i32) -> Result<Option<DataFrame>, PipelineError> {
        info!("Starting ingestion for season {}", year);

        let schedule = self.source.season_schedule(year)?;
        let races: Vec<RaceEvent> = schedule
            .into_iter()
            .filter(|e| e.event_format != NON_RACE_FORMAT)
            .collect();

        let mut season_laps: Vec<EnrichedLap> = Vec::new();

        for event in &races {
            info!(
                "  -> Processing round {}: {}",
                event.round_number, event.event_name
            );

            let session = match self.source.race_session(year, event.round_number) {
                Ok(session) => session,
                Err(e) => {
                    error!("     Failed to process {}: {}", event.event_name, e);
                    continue;
                }
            };

            let clean: Vec<_> = session
                .laps
                .iter()
                .filter(|lap| lap.is_clean())
                .cloned()
                .collect();
            if clean.is_empty() {
                warn!("     No clean laps found for {}. Skipping.", event.event_name);
                continue;
            }

            let readings = WeatherEnricher::enrich(&clean, &session.weather);

            season_laps.extend(clean.into_iter().zip(readings).map(|(lap, readings)| {
                let lap_time_seconds = lap.lap_time.map(delta_seconds);
                EnrichedLap {
                    lap,
                    weather: readings,
                    year,
                    round_number: event.round_number,
                    event_name: event.event_name.clone(),
                    circuit_location: event.circuit_location.clone(),
                    lap_time_seconds,
                }
            }));
        }

        if season_laps.is_empty() {
            return Ok(None);
        }

        Ok(Some(season_frame(&season_laps)?))
    }
}

/// Builds the season table with the documented column subset.
pub fn season_frame(laps: &[EnrichedLap]) -> PolarsResult<DataFrame> {
    let millis = |d: Option<chrono::TimeDelta>| d.map(|d| d.num_milliseconds());

    DataFrame::new(vec![
        Series::new(
            "Driver",
            laps.iter().map(|l| l.lap.driver.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "LapTime",
            laps.iter().map(|l| millis(l.lap.lap_time)).collect::<Vec<_>>(),
        ),
        Series::new(
            "LapNumber",
            laps.iter().map(|l| l.lap.lap_number as i64).collect::<Vec<_>>(),
        ),
        Series::new(
            "Stint",
            laps.iter()
                .map(|l| l.lap.stint.map(|s| s as i64))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "PitOutTime",
            laps.iter().map(|l| millis(l.lap.pit_out_time)).collect::<Vec<_>>(),
        ),
        Series::new(
            "PitInTime",
            laps.iter().map(|l| millis(l.lap.pit_in_time)).collect::<Vec<_>>(),
        ),
        Series::new(
            "Compound",
            laps.iter().map(|l| l.lap.compound.as_deref()).collect::<Vec<_>>(),
        ),
        Series::new(
            "TyreLife",
            laps.iter().map(|l| l.lap.tyre_life).collect::<Vec<_>>(),
        ),
        Series::new(
            "FreshTyre",
            laps.iter().map(|l| l.lap.fresh_tyre).collect::<Vec<_>>(),
        ),
        Series::new(
            "Team",
            laps.iter().map(|l| l.lap.team.as_deref()).collect::<Vec<_>>(),
        ),
        Series::new("Year", laps.iter().map(|l| l.year).collect::<Vec<_>>()),
        Series::new(
            "RoundNumber",
            laps.iter().map(|l| l.round_number as i64).collect::<Vec<_>>(),
        ),
        Series::new(
            "EventName",
            laps.iter().map(|l| l.event_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "CircuitLocation",
            laps.iter()
                .map(|l| l.circuit_location.as_str())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "AirTemp",
            laps.iter().map(|l| l.weather.air_temp).collect::<Vec<_>>(),
        ),
        Series::new(
            "TrackTemp",
            laps.iter().map(|l| l.weather.track_temp).collect::<Vec<_>>(),
        ),
        Series::new(
            "Humidity",
            laps.iter().map(|l| l.weather.humidity).collect::<Vec<_>>(),
        ),
        Series::new(
            "Rainfall",
            laps.iter().map(|l| l.weather.rainfall).collect::<Vec<_>>(),
        ),
        Series::new(
            "TrackStatus",
            laps.iter()
                .map(|l| l.lap.track_status.as_deref())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "LapTimeSeconds",
            laps.iter().map(|l| l.lap_time_seconds).collect::<Vec<_>>(),
        ),
    ])
}

/// Ingestion stage entry point: one Parquet file per season that yielded
/// data. Per-season failures are logged and do not stop the run.
pub fn run<S: SessionDataSource>(
    source: &S,
    config: &PipelineConfig,
) -> Result<Vec<(i32, PathBuf)>, PipelineError> {
    let store = RawStore::new(&config.raw_dir);
    let ingestor = SeasonIngestor::new(source);
    let mut written = Vec::new();

    for &year in &config.years {
        match ingestor.ingest_season(year) {
            Ok(Some(mut df)) => {
                let path = store.write_season(year, &mut df)?;
                info!("Saved {} data to {}", year, path.display());
                written.push((year, path));
            }
            Ok(None) => warn!("Season {} produced no usable laps", year),
            Err(e) => error!("Season {} ingestion failed: {}", year, e),
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::{seconds_delta, LapRecord, RaceSession, WeatherSample};
    use crate::source::SourceError;

    struct StubSource {
        schedule: Vec<RaceEvent>,
        sessions: HashMap<u32, RaceSession>,
    }

    impl SessionDataSource for StubSource {
        fn season_schedule(&self, _year: i32) -> Result<Vec<RaceEvent>, SourceError> {
            Ok(self.schedule.clone())
        }

        fn race_session(
            &self,
            _year: i32,
            round_number: u32,
        ) -> Result<RaceSession, SourceError> {
            self.sessions
                .get(&round_number)
                .cloned()
                .ok_or_else(|| SourceError::RetriesExhausted {
                    url: format!("stub://session/{}", round_number),
                    attempts: 1,
                })
        }
    }

    fn event(round: u32, name: &str, format: &str) -> RaceEvent {
        RaceEvent {
            year: 2024,
            round_number: round,
            event_name: name.to_string(),
            circuit_location: "Sakhir".to_string(),
            event_format: format.to_string(),
        }
    }

    fn clean_lap(driver: &str, lap_number: u32, end_secs: f64, lap_secs: f64) -> LapRecord {
        LapRecord {
            driver: driver.to_string(),
            lap_number,
            time: Some(seconds_delta(end_secs)),
            lap_time: Some(seconds_delta(lap_secs)),
            stint: Some(1),
            pit_out_time: None,
            pit_in_time: None,
            compound: Some("SOFT".to_string()),
            tyre_life: Some(lap_number as f64),
            fresh_tyre: Some(lap_number == 1),
            team: Some("Red Bull Racing".to_string()),
            track_status: Some("1".to_string()),
            is_accurate: true,
        }
    }

    fn sample_at(secs: f64, air_temp: f64) -> WeatherSample {
        WeatherSample {
            time: seconds_delta(secs),
            air_temp: Some(air_temp),
            track_temp: Some(air_temp + 12.0),
            humidity: Some(45.0),
            rainfall: Some(0.0),
        }
    }

    #[test]
    fn test_filters_and_enriches() {
        let mut in_lap = clean_lap("VER", 2, 190.0, 95.0);
        in_lap.pit_in_time = Some(seconds_delta(188.0));
        let mut inaccurate = clean_lap("VER", 3, 300.0, 110.0);
        inaccurate.is_accurate = false;

        let session = RaceSession {
            laps: vec![clean_lap("VER", 1, 50.0, 92.5), in_lap, inaccurate],
            weather: vec![sample_at(0.0, 20.0), sample_at(100.0, 30.0)],
        };

        let source = StubSource {
            schedule: vec![event(1, "Bahrain Grand Prix", "conventional")],
            sessions: HashMap::from([(1, session)]),
        };

        let df = SeasonIngestor::new(&source)
            .ingest_season(2024)
            .unwrap()
            .unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(df.column("Year").unwrap().i32().unwrap().get(0), Some(2024));
        assert_eq!(
            df.column("RoundNumber").unwrap().i64().unwrap().get(0),
            Some(1)
        );
        assert_eq!(
            df.column("EventName").unwrap().str().unwrap().get(0),
            Some("Bahrain Grand Prix")
        );
        assert_eq!(
            df.column("CircuitLocation").unwrap().str().unwrap().get(0),
            Some("Sakhir")
        );
        // Lap ends at t=50 between samples at t=0 (20°C) and t=100 (30°C).
        assert_eq!(
            df.column("AirTemp").unwrap().f64().unwrap().get(0),
            Some(25.0)
        );
        assert_eq!(
            df.column("LapTimeSeconds").unwrap().f64().unwrap().get(0),
            Some(92.5)
        );
    }

    #[test]
    fn test_testing_rounds_excluded() {
        let race = RaceSession {
            laps: vec![clean_lap("VER", 1, 50.0, 92.5)],
            weather: vec![sample_at(0.0, 20.0)],
        };
        let testing = RaceSession {
            laps: vec![clean_lap("HAM", 1, 60.0, 99.0)],
            weather: vec![],
        };

        let source = StubSource {
            schedule: vec![
                event(0, "Pre-Season Testing", "testing"),
                event(1, "Bahrain Grand Prix", "conventional"),
            ],
            sessions: HashMap::from([(0, testing), (1, race)]),
        };

        let df = SeasonIngestor::new(&source)
            .ingest_season(2024)
            .unwrap()
            .unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(
            df.column("Driver").unwrap().str().unwrap().get(0),
            Some("VER")
        );
    }

    #[test]
    fn test_failed_round_is_skipped() {
        let session = RaceSession {
            laps: vec![clean_lap("LEC", 1, 55.0, 93.1)],
            weather: vec![sample_at(0.0, 24.0)],
        };

        // Round 1 has no session registered, so it errors out.
        let source = StubSource {
            schedule: vec![
                event(1, "Bahrain Grand Prix", "conventional"),
                event(2, "Saudi Arabian Grand Prix", "conventional"),
            ],
            sessions: HashMap::from([(2, session)]),
        };

        let df = SeasonIngestor::new(&source)
            .ingest_season(2024)
            .unwrap()
            .unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(
            df.column("RoundNumber").unwrap().i64().unwrap().get(0),
            Some(2)
        );
    }

    #[test]
    fn test_no_usable_rounds_yields_none() {
        let mut dirty = clean_lap("VER", 1, 50.0, 92.5);
        dirty.is_accurate = false;
        let session = RaceSession {
            laps: vec![dirty],
            weather: vec![],
        };

        let source = StubSource {
            schedule: vec![
                event(1, "Bahrain Grand Prix", "conventional"),
                event(2, "Saudi Arabian Grand Prix", "conventional"),
            ],
            sessions: HashMap::from([(1, session)]),
        };

        let result = SeasonIngestor::new(&source).ingest_season(2024).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_schedule_yields_none() {
        let source = StubSource {
            schedule: vec![],
            sessions: HashMap::new(),
        };

        let result = SeasonIngestor::new(&source).ingest_season(2024).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_season_frame_columns() {
        let session = RaceSession {
            laps: vec![clean_lap("VER", 1, 50.0, 92.5)],
            weather: vec![sample_at(0.0, 20.0)],
        };
        let source = StubSource {
            schedule: vec![event(1, "Bahrain Grand Prix", "conventional")],
            sessions: HashMap::from([(1, session)]),
        };

        let df = SeasonIngestor::new(&source)
            .ingest_season(2024)
            .unwrap()
            .unwrap();

        assert_eq!(df.get_column_names(), SEASON_COLUMNS);
    }
}
