use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::GpsRecord;

/// Map-matching request errors
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("No records with lat, lng and timeStamp")]
    NoCoordinates,

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Network timeout")]
    NetworkTimeout,

    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("OSRM API error {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Failed to decode JSON response: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// OSRM match service settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    /// host[:port] of the OSRM server
    pub host: String,
    pub profile: String,
    /// Search radius per point, meters
    pub radius: u32,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            host: "localhost:5050".to_string(),
            profile: "foot".to_string(),
            radius: 20,
            timeout_secs: 30,
        }
    }
}

/// Build the match URL for `records`.
///
/// # URL Format
/// ```text
/// http://{host}/match/v1/{profile}/{lng,lat;lng,lat;...}?steps=true&radiuses={r;r;...}&timestamps={t;t;...}
/// ```
///
/// Records without a `timeStamp` are skipped with a warning.
pub fn build_match_url(records: &[GpsRecord], config: &OsrmConfig) -> Result<String, MatchError> {
    let mut coords = Vec::with_capacity(records.len());
    let mut timestamps = Vec::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        let Some(ts) = record.timestamp() else {
            log::warn!("Record {} missing timeStamp, skipped", idx + 1);
            continue;
        };
        coords.push(format!("{},{}", record.lng(), record.lat()));
        timestamps.push(ts);
    }

    if coords.is_empty() {
        return Err(MatchError::NoCoordinates);
    }

    let radiuses = vec![config.radius.to_string(); coords.len()].join(";");
    let raw = format!(
        "http://{}/match/v1/{}/{}?steps=true&radiuses={}&timestamps={}",
        config.host,
        config.profile,
        coords.join(";"),
        radiuses,
        timestamps.join(";")
    );

    // Parsing percent-encodes anything outside the URL character sets
    let url = reqwest::Url::parse(&raw).map_err(|e| MatchError::InvalidUrl(e.to_string()))?;
    Ok(url.to_string())
}

/// OSRM match API client
///
/// Single GET per call, no retries. Any non-2xx status is returned as
/// `HttpError` together with the response body.
pub struct OsrmClient {
    client: reqwest::Client,
    config: OsrmConfig,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("track_smoother/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        OsrmClient { client, config }
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    /// Request a map match for `records` and return the raw response JSON.
    pub async fn request_match(&self, records: &[GpsRecord]) -> Result<Value, MatchError> {
        let url = build_match_url(records, &self.config)?;
        log::info!("Requesting OSRM match for {} records", records.len());
        log::debug!("GET {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    return Err(MatchError::NetworkTimeout);
                }
                return Err(MatchError::Network(e.to_string()));
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MatchError::Network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(MatchError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| MatchError::Parse(e.to_string()))
    }
}

impl Default for OsrmClient {
    fn default() -> Self {
        Self::new(OsrmConfig::default())
    }
}

/// Write the response as pretty-printed JSON.
pub fn save_response(response: &Value, path: &Path) -> Result<(), MatchError> {
    let json = serde_json::to_string_pretty(response).map_err(|e| MatchError::Parse(e.to_string()))?;
    std::fs::write(path, json)?;
    log::info!("Saved OSRM response to {}", path.display());
    Ok(())
}

/// Matched (lat, lng) points from a response's `tracepoints`.
///
/// OSRM reports `null` for unmatched inputs; those and any entry without a
/// two-element numeric `location` are dropped.
pub fn tracepoints(response: &Value) -> Vec<(f64, f64)> {
    let Some(points) = response.get("tracepoints").and_then(Value::as_array) else {
        return Vec::new();
    };
    points
        .iter()
        .filter_map(|tp| {
            let location = tp.get("location")?.as_array()?;
            match location.as_slice() {
                [lng, lat] => Some((lat.as_f64()?, lng.as_f64()?)),
                _ => None,
            }
        })
        .collect()
}
