use chrono::TimeDelta;

/// One race event from a season schedule.
#[derive(Debug, Clone)]
pub struct RaceEvent {
    pub year: i32,
    pub round_number: u32,
    pub event_name: String,
    pub circuit_location: String,
    /// Provider event format, e.g. "conventional", "sprint" or "testing".
    pub event_format: String,
}

/// One driver's completed lap as reported by the timing provider.
///
/// All timestamps are relative to the start of the session.
#[derive(Debug, Clone)]
pub struct LapRecord {
    pub driver: String,
    pub lap_number: u32,
    /// End-of-lap timestamp.
    pub time: Option<TimeDelta>,
    pub lap_time: Option<TimeDelta>,
    pub stint: Option<u32>,
    pub pit_out_time: Option<TimeDelta>,
    pub pit_in_time: Option<TimeDelta>,
    pub compound: Option<String>,
    /// Laps this tire set has run, including this one.
    pub tyre_life: Option<f64>,
    pub fresh_tyre: Option<bool>,
    pub team: Option<String>,
    pub track_status: Option<String>,
    /// Set by the provider when the lap is free of safety-car phases and
    /// timing anomalies.
    pub is_accurate: bool,
}

impl LapRecord {
    /// A lap usable for pace analysis: accurate and not adjacent to a pit stop.
    pub fn is_clean(&self) -> bool {
        self.is_accurate && self.pit_in_time.is_none() && self.pit_out_time.is_none()
    }
}

/// A timestamped environmental reading within a session.
#[derive(Debug, Clone)]
pub struct WeatherSample {
    pub time: TimeDelta,
    pub air_temp: Option<f64>,
    pub track_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall: Option<f64>,
}

/// Lap and weather records for one race session.
#[derive(Debug, Clone)]
pub struct RaceSession {
    pub laps: Vec<LapRecord>,
    pub weather: Vec<WeatherSample>,
}

/// Interpolated weather at one lap's end time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherReadings {
    pub air_temp: Option<f64>,
    pub track_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall: Option<f64>,
}

/// A clean lap with interpolated weather and race context attached.
#[derive(Debug, Clone)]
pub struct EnrichedLap {
    pub lap: LapRecord,
    pub weather: WeatherReadings,
    pub year: i32,
    pub round_number: u32,
    pub event_name: String,
    pub circuit_location: String,
    pub lap_time_seconds: Option<f64>,
}

/// Session-relative timestamp to fractional seconds.
pub fn delta_seconds(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

/// Fractional seconds to a session-relative timestamp (millisecond precision).
pub fn seconds_delta(seconds: f64) -> TimeDelta {
    TimeDelta::milliseconds((seconds * 1000.0).round() as i64)
}
