//! Map-ready output: GeoJSON track layers and a smoothing summary.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use geo::{HaversineDistance, HaversineLength, LineString, Point};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Which stage a track layer comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackLayer {
    Raw,
    Smoothed,
    Matched,
}

impl TrackLayer {
    pub fn name(&self) -> &'static str {
        match self {
            TrackLayer::Raw => "raw",
            TrackLayer::Smoothed => "smoothed",
            TrackLayer::Matched => "matched",
        }
    }

    pub fn stroke(&self) -> &'static str {
        match self {
            TrackLayer::Raw => "#d62728",
            TrackLayer::Smoothed => "#1f77b4",
            TrackLayer::Matched => "#2ca02c",
        }
    }
}

/// GeoJSON `FeatureCollection` with one `LineString` per non-empty layer.
///
/// Points are (lat, lng); GeoJSON coordinates are written `[lng, lat]`.
pub fn feature_collection(layers: &[(TrackLayer, &[(f64, f64)])]) -> Value {
    let features: Vec<Value> = layers
        .iter()
        .filter(|(_, points)| !points.is_empty())
        .map(|(layer, points)| {
            let coordinates: Vec<[f64; 2]> = points.iter().map(|&(lat, lng)| [lng, lat]).collect();
            json!({
                "type": "Feature",
                "properties": {
                    "kind": layer.name(),
                    "stroke": layer.stroke(),
                    "points": points.len(),
                },
                "geometry": {
                    "type": "LineString",
                    "coordinates": coordinates,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

pub fn write_geojson(collection: &Value, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(collection)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote GeoJSON to {}", path.display());
    Ok(())
}

fn line_string(points: &[(f64, f64)]) -> LineString<f64> {
    points.iter().map(|&(lat, lng)| (lng, lat)).collect::<Vec<_>>().into()
}

/// Before/after statistics for one smoothing run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackSummary {
    pub points: usize,
    /// Path length of the raw fixes [meters]
    pub raw_length_m: f64,
    /// Path length of the smoothed track [meters]
    pub smoothed_length_m: f64,
    /// Mean raw-to-smoothed displacement [meters]
    pub mean_shift_m: f64,
    /// Largest raw-to-smoothed displacement [meters]
    pub max_shift_m: f64,
    pub generated_at: String,
}

impl TrackSummary {
    /// `raw` and `smoothed` are paired (lat, lng) sequences of equal length.
    pub fn compute(raw: &[(f64, f64)], smoothed: &[(f64, f64)]) -> Self {
        let shifts: Vec<f64> = raw
            .iter()
            .zip(smoothed)
            .map(|(&(lat_a, lng_a), &(lat_b, lng_b))| {
                Point::new(lng_a, lat_a).haversine_distance(&Point::new(lng_b, lat_b))
            })
            .collect();

        let mean_shift_m = if shifts.is_empty() {
            0.0
        } else {
            shifts.iter().sum::<f64>() / shifts.len() as f64
        };

        TrackSummary {
            points: shifts.len(),
            raw_length_m: line_string(raw).haversine_length(),
            smoothed_length_m: line_string(smoothed).haversine_length(),
            mean_shift_m,
            max_shift_m: shifts.iter().cloned().fold(0.0, f64::max),
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}
