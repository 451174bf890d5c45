//! Weather-to-lap interpolation
//!
//! Maps a session's irregularly spaced weather time-series onto lap
//! boundaries by piecewise-linear interpolation at each lap's end time.

use crate::models::{delta_seconds, LapRecord, WeatherReadings, WeatherSample};

/// Merges weather channels onto laps by nearest-time linear interpolation.
pub struct WeatherEnricher;

impl WeatherEnricher {
    /// Interpolated readings for each lap, in lap order.
    ///
    /// Lap end times are the alignment point. End-of-lap conditions are a
    /// proxy for the whole lap; an average over the lap would be closer, but
    /// the boundary value is the standard choice.
    pub fn enrich(laps: &[LapRecord], samples: &[WeatherSample]) -> Vec<WeatherReadings> {
        let air = channel_series(samples, |s| s.air_temp);
        let track = channel_series(samples, |s| s.track_temp);
        let humidity = channel_series(samples, |s| s.humidity);
        let rainfall = channel_series(samples, |s| s.rainfall);

        laps.iter()
            .map(|lap| match lap.time {
                Some(time) => {
                    let at = delta_seconds(time);
                    WeatherReadings {
                        air_temp: interpolate(&air, at),
                        track_temp: interpolate(&track, at),
                        humidity: interpolate(&humidity, at),
                        rainfall: interpolate(&rainfall, at),
                    }
                }
                // No end-of-lap timestamp, nothing to align against.
                None => WeatherReadings::default(),
            })
            .collect()
    }
}

/// (time, value) pairs for one channel, sorted by time. Samples missing the
/// channel are skipped. The sort is stable, so the earlier of two samples
/// sharing a timestamp stays first.
fn channel_series(
    samples: &[WeatherSample],
    channel: impl Fn(&WeatherSample) -> Option<f64>,
) -> Vec<(f64, f64)> {
    let mut series: Vec<(f64, f64)> = samples
        .iter()
        .filter_map(|s| channel(s).map(|v| (delta_seconds(s.time), v)))
        .collect();
    series.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    series
}

/// Piecewise-linear interpolation at `x`, clamped to the endpoint values
/// outside the series' time range. An empty series yields a missing value;
/// a single sample is broadcast to every query point.
fn interpolate(series: &[(f64, f64)], x: f64) -> Option<f64> {
    if series.is_empty() {
        return None;
    }

    let i = series.partition_point(|&(t, _)| t < x);
    if i == 0 {
        return Some(series[0].1);
    }
    if i == series.len() {
        return Some(series[series.len() - 1].1);
    }

    let (t0, v0) = series[i - 1];
    let (t1, v1) = series[i];
    Some(v0 + (v1 - v0) * (x - t0) / (t1 - t0))
}
