//! Bounded-area observation source backed by a live flight-position feed.
//!
//! The feed answers `GET <url>?bounds=<n>,<s>,<w>,<e>` with one JSON object.
//! Aircraft are the values that are arrays whose second and third elements
//! are numbers (latitude, longitude); bookkeeping keys like `full_count`,
//! `version` and `stats` are skipped.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use heatmap_core::{Bounds, Observation};

#[derive(Debug)]
pub enum SourceError {
    Http(reqwest::Error),
    Status(u16),
    Malformed(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Http(e) => write!(f, "feed request failed: {e}"),
            SourceError::Status(code) => write!(f, "feed returned HTTP {code}"),
            SourceError::Malformed(msg) => write!(f, "malformed feed response: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Http(e)
    }
}

/// Anything that can answer "what is inside these bounds right now".
pub trait ObservationSource {
    fn fetch(
        &self,
        bounds: &Bounds,
        now: i64,
    ) -> impl Future<Output = Result<Vec<Observation>, SourceError>> + Send;
}

pub struct FeedSource {
    client: reqwest::Client,
    url: String,
}

impl FeedSource {
    pub fn new(url: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("heatmap-engine/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl ObservationSource for FeedSource {
    fn fetch(
        &self,
        bounds: &Bounds,
        now: i64,
    ) -> impl Future<Output = Result<Vec<Observation>, SourceError>> + Send {
        let bounds = bounds.as_query();
        async move {
            let response = self
                .client
                .get(&self.url)
                .query(&[
                    ("bounds", bounds.as_str()),
                    ("faa", "1"),
                    ("satellite", "1"),
                    ("mlat", "1"),
                    ("adsb", "1"),
                    ("gnd", "0"),
                    ("air", "1"),
                    ("vehicles", "0"),
                    ("estimated", "1"),
                    ("gliders", "1"),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status(status.as_u16()));
            }

            let body: serde_json::Value = response.json().await?;
            parse_feed(&body, now)
        }
    }
}

/// Extract aircraft positions from a feed body. Every observation is
/// stamped with the fetch time.
pub fn parse_feed(body: &serde_json::Value, now: i64) -> Result<Vec<Observation>, SourceError> {
    let object = body
        .as_object()
        .ok_or_else(|| SourceError::Malformed("expected a JSON object".to_string()))?;

    Ok(object
        .values()
        .filter_map(|value| {
            let fields = value.as_array()?;
            let lat = fields.get(1)?.as_f64()?;
            let lon = fields.get(2)?.as_f64()?;
            Some(Observation::new(lat, lon, now))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feed_extracts_aircraft() {
        let body = serde_json::json!({
            "full_count": 14302,
            "version": 4,
            "3a1c9f2e": ["A1B2C3", 40.12, -100.5, 270, 35000, 450, "1234", "F-KDEN1", "B738"],
            "3a1ca001": ["C3D4E5", 33.9, -84.2, 90, 12000, 300],
            "stats": {"total": {"ads-b": 9000}}
        });

        let mut obs = parse_feed(&body, 1000).unwrap();
        obs.sort_by(|a, b| a.latitude.total_cmp(&b.latitude));
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0], Observation::new(33.9, -84.2, 1000));
        assert_eq!(obs[1], Observation::new(40.12, -100.5, 1000));
    }

    #[test]
    fn test_parse_feed_skips_short_or_non_numeric_rows() {
        let body = serde_json::json!({
            "a": ["X", 40.0],
            "b": ["X", "40.0", "-100.0"],
            "c": [],
        });
        assert!(parse_feed(&body, 0).unwrap().is_empty());
    }

    #[test]
    fn test_parse_feed_rejects_non_object() {
        let err = parse_feed(&serde_json::json!([1, 2, 3]), 0).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn test_parse_feed_integer_coordinates() {
        let body = serde_json::json!({"a": ["X", 40, -100]});
        let obs = parse_feed(&body, 5).unwrap();
        assert_eq!(obs, vec![Observation::new(40.0, -100.0, 5)]);
    }
}
