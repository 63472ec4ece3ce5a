//! Whole-recording average message rates.

use reduce_api::LogStatistics;

pub const NANOS_PER_SECOND: f64 = 1e9;

/// Log-wide span in seconds, `(end - start) / 1e9`.
pub fn span_seconds(stats: &LogStatistics) -> f64 {
    stats.raw_span() as f64 / NANOS_PER_SECOND
}

/// Log-wide span as the bare timestamp difference, no unit conversion.
/// Only the threshold-toggle classification uses it.
pub fn raw_span(stats: &LogStatistics) -> f64 {
    stats.raw_span() as f64
}

/// Average messages per span unit over the whole recording.
///
/// A channel without messages has rate 0. With messages but a zero,
/// negative or NaN span the rate is unbounded and `f64::INFINITY` is
/// returned.
pub fn estimate_rate(count: u64, span: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    if span.is_nan() || span <= 0.0 {
        return f64::INFINITY;
    }
    count as f64 / span
}
