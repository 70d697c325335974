//! Clock drift estimation.
//!
//! The origin's clock is compared against the midpoint of the request,
//! i.e. one-way latency is taken as half the round trip. Asymmetric paths
//! skew the result; there is no better data from a single request.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// `server_time - (start + elapsed / 2)`. Positive means the origin runs ahead.
pub fn estimate_drift(start: DateTime<Utc>, elapsed: Duration, server_time: DateTime<Utc>) -> TimeDelta {
    let half = TimeDelta::from_std(elapsed / 2).unwrap_or_else(|_| TimeDelta::zero());
    server_time - (start + half)
}

pub fn parse_server_time(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

/// Fractional seconds, for gauges.
pub fn as_secs_f64(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        parse_server_time("2024-05-01T12:00:00Z").unwrap()
    }

    #[test]
    fn test_midpoint_drift() {
        let server_time = t0() + TimeDelta::seconds(3);
        let drift = estimate_drift(t0(), Duration::from_secs(2), server_time);
        assert_eq!(drift, TimeDelta::seconds(2));
        assert_eq!(as_secs_f64(drift), 2.0);
    }

    #[test]
    fn test_origin_behind() {
        let server_time = t0() - TimeDelta::milliseconds(1500);
        let drift = estimate_drift(t0(), Duration::from_secs(1), server_time);
        assert_eq!(as_secs_f64(drift), -2.0);
    }

    #[test]
    fn test_parse_offsets_normalized() {
        let with_offset = parse_server_time("2024-05-01T14:00:00+02:00").unwrap();
        assert_eq!(with_offset, t0());
        assert!(parse_server_time("yesterday").is_err());
    }
}
