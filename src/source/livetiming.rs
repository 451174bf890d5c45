//! HTTP client for a live-timing archive service
//!
//! Fetches season schedules and per-session lap/weather records as JSON:
//!
//! - `GET {base}/schedule?season={year}` returns the season's events
//! - `GET {base}/session?season={year}&round={n}` returns `{laps, weather}`
//!   for that round's race session, with timestamps as seconds since
//!   session start
//!
//! Requests are spaced out and retried with linear backoff so batch runs
//! stay polite toward the archive.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use serde::Deserialize;

use super::{SessionDataSource, SourceError};
use crate::models::{seconds_delta, LapRecord, RaceEvent, RaceSession, WeatherSample};

/// Client configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the archive API, without a trailing slash
    pub base_url: String,
    /// Delay between requests in milliseconds
    pub delay_ms: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Max retry attempts
    pub max_retries: u32,
    /// User agent string
    pub user_agent: String,
}

impl SourceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            delay_ms: 1000,
            timeout_secs: 30,
            max_retries: 3,
            user_agent: format!("tyrewear/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Schedule entry as served by the archive
#[derive(Debug, Deserialize)]
struct ScheduleEntryDto {
    round: u32,
    name: String,
    location: String,
    format: String,
}

impl ScheduleEntryDto {
    fn into_event(self, year: i32) -> RaceEvent {
        RaceEvent {
            year,
            round_number: self.round,
            event_name: self.name,
            circuit_location: self.location,
            event_format: self.format,
        }
    }
}

/// Session payload as served by the archive
#[derive(Debug, Deserialize)]
struct SessionDto {
    #[serde(default)]
    laps: Vec<LapDto>,
    #[serde(default)]
    weather: Vec<WeatherDto>,
}

#[derive(Debug, Deserialize)]
struct LapDto {
    driver: String,
    lap_number: u32,
    time: Option<f64>,
    lap_time: Option<f64>,
    stint: Option<u32>,
    pit_out_time: Option<f64>,
    pit_in_time: Option<f64>,
    compound: Option<String>,
    tyre_life: Option<f64>,
    fresh_tyre: Option<bool>,
    team: Option<String>,
    track_status: Option<String>,
    /// Missing in older archive payloads; such laps are not trusted.
    #[serde(default)]
    is_accurate: bool,
}

impl LapDto {
    fn into_record(self) -> LapRecord {
        LapRecord {
            driver: self.driver,
            lap_number: self.lap_number,
            time: self.time.map(seconds_delta),
            lap_time: self.lap_time.map(seconds_delta),
            stint: self.stint,
            pit_out_time: self.pit_out_time.map(seconds_delta),
            pit_in_time: self.pit_in_time.map(seconds_delta),
            compound: self.compound,
            tyre_life: self.tyre_life,
            fresh_tyre: self.fresh_tyre,
            team: self.team,
            track_status: self.track_status,
            is_accurate: self.is_accurate,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherDto {
    time: f64,
    air_temp: Option<f64>,
    track_temp: Option<f64>,
    humidity: Option<f64>,
    rainfall: Option<f64>,
}

impl WeatherDto {
    fn into_sample(self) -> WeatherSample {
        WeatherSample {
            time: seconds_delta(self.time),
            air_temp: self.air_temp,
            track_temp: self.track_temp,
            humidity: self.humidity,
            rainfall: self.rainfall,
        }
    }
}

/// Blocking archive client with request spacing and bounded retry
pub struct LiveTimingSource {
    client: reqwest::blocking::Client,
    config: SourceConfig,
    last_request: RefCell<Instant>,
}

impl LiveTimingSource {
    /// Create a new client with the given configuration
    pub fn new(config: SourceConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            last_request: RefCell::new(Instant::now()),
        }
    }

    /// Wait for the inter-request spacing
    fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.borrow_mut();
        let elapsed = last.elapsed();
        let delay = Duration::from_millis(self.config.delay_ms);

        if elapsed < delay {
            std::thread::sleep(delay - elapsed);
        }

        *last = Instant::now();
    }

    fn schedule_url(&self, year: i32) -> String {
        format!("{}/schedule?season={}", self.config.base_url, year)
    }

    fn session_url(&self, year: i32, round_number: u32) -> String {
        format!(
            "{}/session?season={}&round={}",
            self.config.base_url, year, round_number
        )
    }

    /// Fetch a JSON body with request spacing and retry
    fn fetch_json(&self, url: &str) -> Result<String, SourceError> {
        for attempt in 0..self.config.max_retries {
            self.wait_for_rate_limit();

            match self.client.get(url).send() {
                Ok(response) => {
                    if response.status().is_success() {
                        return response.text().map_err(SourceError::Request);
                    }
                    tracing::warn!(
                        "Request failed with status {} (attempt {}/{})",
                        response.status(),
                        attempt + 1,
                        self.config.max_retries
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.config.max_retries,
                        e
                    );
                }
            }

            if attempt + 1 < self.config.max_retries {
                let backoff = Duration::from_millis(self.config.delay_ms * (attempt as u64 + 1));
                std::thread::sleep(backoff);
            }
        }

        Err(SourceError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.config.max_retries,
        })
    }
}

impl SessionDataSource for LiveTimingSource {
    fn season_schedule(&self, year: i32) -> Result<Vec<RaceEvent>, SourceError> {
        let url = self.schedule_url(year);
        tracing::info!("Fetching schedule: {}", url);

        let body = self.fetch_json(&url)?;
        let entries: Vec<ScheduleEntryDto> = serde_json::from_str(&body)?;

        Ok(entries.into_iter().map(|e| e.into_event(year)).collect())
    }

    fn race_session(&self, year: i32, round_number: u32) -> Result<RaceSession, SourceError> {
        let url = self.session_url(year, round_number);
        tracing::info!("Fetching session: {}", url);

        let body = self.fetch_json(&url)?;
        let session: SessionDto = serde_json::from_str(&body)?;

        Ok(RaceSession {
            laps: session.laps.into_iter().map(LapDto::into_record).collect(),
            weather: session
                .weather
                .into_iter()
                .map(WeatherDto::into_sample)
                .collect(),
        })
    }
}
