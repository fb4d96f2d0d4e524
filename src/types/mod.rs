pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One GPS fix from a tracking session.
///
/// Only `lat`/`lng` are interpreted; every other field (`timeStamp`, `pace`,
/// `bpm`, ...) is carried through untouched and in its original order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct GpsRecord {
    lat: f64,
    lng: f64,
    fields: Map<String, Value>,
}

impl GpsRecord {
    /// `lat` and `lng` must be finite; JSON has no encoding for NaN or infinity.
    pub fn new(lat: f64, lng: f64) -> Self {
        debug_assert!(lat.is_finite() && lng.is_finite(), "non-finite coordinate");
        let mut fields = Map::new();
        fields.insert("lat".to_string(), Value::from(lat));
        fields.insert("lng".to_string(), Value::from(lng));
        Self { lat, lng, fields }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// (lat, lng)
    pub fn position(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn observation(&self) -> ObsVec {
        ObsVec::new(self.lat, self.lng)
    }

    /// Copy of this record with the coordinates replaced.
    pub fn with_position(&self, lat: f64, lng: f64) -> Self {
        debug_assert!(lat.is_finite() && lng.is_finite(), "non-finite coordinate");
        let mut fields = self.fields.clone();
        fields.insert("lat".to_string(), Value::from(lat));
        fields.insert("lng".to_string(), Value::from(lng));
        Self { lat, lng, fields }
    }

    /// Builder-style setter for pass-through fields.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        if key != "lat" && key != "lng" {
            self.fields.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The `timeStamp` field rendered as text (strings verbatim, numbers via Display).
    pub fn timestamp(&self) -> Option<String> {
        match self.fields.get("timeStamp")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Map<String, Value>> for GpsRecord {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let lat = coordinate(&fields, "lat")?;
        let lng = coordinate(&fields, "lng")?;
        Ok(Self { lat, lng, fields })
    }
}

impl From<GpsRecord> for Map<String, Value> {
    fn from(record: GpsRecord) -> Self {
        record.fields
    }
}

fn coordinate(fields: &Map<String, Value>, key: &str) -> Result<f64, String> {
    match fields.get(key) {
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("field `{}` is not a finite number", key)),
        None => Err(format!("missing field `{}`", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_field_order() {
        let line = r#"{"timeStamp":"2025-05-01T07:00:00Z","lat":37.5,"lng":127.0,"pace":5.2,"isRunning":true}"#;
        let record: GpsRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.position(), (37.5, 127.0));

        let out = serde_json::to_string(&record).unwrap();
        assert_eq!(out, line);
    }

    #[test]
    fn test_missing_coordinate_rejected() {
        let err = serde_json::from_str::<GpsRecord>(r#"{"lat":37.5}"#).unwrap_err();
        assert!(err.to_string().contains("lng"));
    }

    #[test]
    fn test_non_numeric_coordinate_rejected() {
        assert!(serde_json::from_str::<GpsRecord>(r#"{"lat":"37.5","lng":127.0}"#).is_err());
    }

    #[test]
    fn test_with_position_leaves_original_untouched() {
        let original = GpsRecord::new(37.5, 127.0).with_field("bpm", 150);
        let moved = original.with_position(37.6, 127.1);

        assert_eq!(original.position(), (37.5, 127.0));
        assert_eq!(moved.position(), (37.6, 127.1));
        assert_eq!(moved.get("lat"), Some(&Value::from(37.6)));
        assert_eq!(moved.get("bpm"), Some(&Value::from(150)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "non-finite coordinate")]
    fn test_new_rejects_nan() {
        let _ = GpsRecord::new(f64::NAN, 127.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "non-finite coordinate")]
    fn test_with_position_rejects_infinite() {
        let _ = GpsRecord::new(37.5, 127.0).with_position(37.5, f64::INFINITY);
    }

    #[test]
    fn test_timestamp_string_and_number() {
        let s = GpsRecord::new(0.0, 0.0).with_field("timeStamp", "1714546800");
        let n = GpsRecord::new(0.0, 0.0).with_field("timeStamp", 1714546800u64);
        let none = GpsRecord::new(0.0, 0.0);

        assert_eq!(s.timestamp().as_deref(), Some("1714546800"));
        assert_eq!(n.timestamp().as_deref(), Some("1714546800"));
        assert_eq!(none.timestamp(), None);
    }
}
