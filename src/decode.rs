//! Payload decoder for tenant sensor readings.
//!
//! The reading tables store one opaque text blob per row (`revText`), written
//! by two generations of ingestion firmware:
//!
//! - **Structured**: a JSON object, e.g. `{"PIR":5,"NH3":1.2}`
//! - **Flat**: comma-separated `Key:Value` pairs, e.g.
//!   `"PeopleCount:38,H2S_PPM:0.62,H2S_AQI:79,Category:Satisfactory,"`
//!
//! The encoding is detected from the first non-whitespace character and the
//! payload is classified into an explicit [`Payload`] variant before any
//! field extraction happens, so downstream code never branches on raw text.
//!
//! Decoding never fails the batch: a malformed payload produces an all-zero
//! record tagged [`DecodeStatus::Degraded`] and a warning in the logs. The
//! odour index is a text pattern search over the whole blob, independent of
//! which encoding carried it.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::models::DecodeStatus;

// ---

/// `Odour Index:<number>` anywhere in the payload, any casing.
static ODOUR_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Odour Index:([0-9]+(?:\.[0-9]+)?)").expect("odour index pattern is valid")
});

/// Payload fields extracted from one raw reading.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReading {
    // ---
    pub people_count: i64,
    pub nh3_ppm: f64,
    pub h2s_aqi: f64,
    pub h2s_ppm: f64,
    pub category: Option<String>,
    pub odour_index: f64,
    pub status: DecodeStatus,
}

impl DecodedReading {
    fn zeroed(status: DecodeStatus, odour_index: f64) -> Self {
        // ---
        DecodedReading {
            people_count: 0,
            nh3_ppm: 0.0,
            h2s_aqi: 0.0,
            h2s_ppm: 0.0,
            category: None,
            odour_index,
            status,
        }
    }
}

/// The two wire encodings, plus everything else.
enum Payload<'a> {
    Structured(&'a str),
    Flat(&'a str),
    Unrecognized,
}

fn classify(raw: Option<&str>) -> Payload<'_> {
    // ---
    match raw.map(str::trim) {
        Some(text) if text.starts_with('{') => Payload::Structured(text),
        Some(text) if !text.is_empty() => Payload::Flat(text),
        _ => Payload::Unrecognized,
    }
}

// ---

/// Decode one raw payload blob into normalized numeric fields.
///
/// Total: every input yields a record. Missing keys default to zero; a
/// payload that fails to parse yields a zeroed record with
/// `DecodeStatus::Degraded` rather than aborting the batch. The odour index
/// survives even for degraded rows because it is extracted by pattern
/// search, not by either structured parser.
pub fn decode(raw: Option<&str>) -> DecodedReading {
    // ---
    let odour_index = raw.map(extract_odour_index).unwrap_or(0.0);

    let result = match classify(raw) {
        Payload::Structured(text) => decode_structured(text, odour_index),
        Payload::Flat(text) => decode_flat(text, odour_index),
        Payload::Unrecognized => return DecodedReading::zeroed(DecodeStatus::Ok, odour_index),
    };

    result.unwrap_or_else(|err| {
        warn!("failed to decode payload {:?}: {}", raw, err);
        DecodedReading::zeroed(DecodeStatus::Degraded, odour_index)
    })
}

/// JSON object encoding. Recognized keys: `PIR`, `NH3`.
fn decode_structured(text: &str, odour_index: f64) -> Result<DecodedReading, String> {
    // ---
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;

    let mut decoded = DecodedReading::zeroed(DecodeStatus::Ok, odour_index);
    decoded.people_count = json_number(&value, "PIR") as i64;
    decoded.nh3_ppm = json_number(&value, "NH3");
    Ok(decoded)
}

/// Numeric JSON field, tolerating numbers stored as strings. Anything else
/// counts as absent.
fn json_number(value: &serde_json::Value, key: &str) -> f64 {
    // ---
    match value.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Flat `Key:Value` pair encoding. Pairs missing a key or value (including
/// the trailing empty segment left by a terminal comma) are skipped; a value
/// that should be numeric but is not degrades the whole row.
fn decode_flat(text: &str, odour_index: f64) -> Result<DecodedReading, String> {
    // ---
    let mut decoded = DecodedReading::zeroed(DecodeStatus::Ok, odour_index);

    for part in text.split(',') {
        let mut pieces = part.splitn(2, ':');
        let (Some(key), Some(value)) = (pieces.next(), pieces.next()) else {
            continue;
        };
        let key = key.trim();
        // Values may themselves contain colons; only the leading number or
        // word matters for the recognized keys.
        let value = value.split(':').next().unwrap_or("").trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }

        match key {
            "PeopleCount" => decoded.people_count = parse_number(key, value)? as i64,
            "H2S_PPM" => decoded.h2s_ppm = parse_number(key, value)?,
            "H2S_AQI" => decoded.h2s_aqi = parse_number(key, value)?,
            "NH3" => decoded.nh3_ppm = parse_number(key, value)?,
            "Category" => decoded.category = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(decoded)
}

fn parse_number(key: &str, value: &str) -> Result<f64, String> {
    // ---
    value
        .parse::<f64>()
        .map_err(|_| format!("non-numeric value {value:?} for key {key:?}"))
}

/// Pattern search for `Odour Index:<number>` anywhere in the raw text.
/// Absent or unparseable yields 0.
pub fn extract_odour_index(raw: &str) -> f64 {
    // ---
    ODOUR_INDEX_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn structured_payload_decodes_pir_and_nh3() {
        // ---
        let d = decode(Some(r#"{"PIR":5,"NH3":1.2}"#));

        assert_eq!(d.people_count, 5);
        assert_eq!(d.nh3_ppm, 1.2);
        assert_eq!(d.h2s_aqi, 0.0);
        assert_eq!(d.h2s_ppm, 0.0);
        assert_eq!(d.category, None);
        assert_eq!(d.status, DecodeStatus::Ok);
    }

    #[test]
    fn structured_payload_accepts_numeric_strings() {
        // ---
        let d = decode(Some(r#"{"PIR":"12","NH3":"0.8"}"#));

        assert_eq!(d.people_count, 12);
        assert_eq!(d.nh3_ppm, 0.8);
        assert_eq!(d.status, DecodeStatus::Ok);
    }

    #[test]
    fn flat_payload_decodes_recognized_keys() {
        // ---
        let d = decode(Some(
            "PeopleCount:38,H2S_PPM:0.62,H2S_AQI:79,Category:Satisfactory,",
        ));

        assert_eq!(d.people_count, 38);
        assert_eq!(d.h2s_ppm, 0.62);
        assert_eq!(d.h2s_aqi, 79.0);
        assert_eq!(d.category.as_deref(), Some("Satisfactory"));
        assert_eq!(d.nh3_ppm, 0.0);
        assert_eq!(d.status, DecodeStatus::Ok);
    }

    #[test]
    fn flat_payload_skips_malformed_pairs() {
        // ---
        let d = decode(Some("garbage,PeopleCount:4,:,NH3:2.5,,trailing"));

        assert_eq!(d.people_count, 4);
        assert_eq!(d.nh3_ppm, 2.5);
        assert_eq!(d.status, DecodeStatus::Ok);
    }

    #[test]
    fn odour_index_is_extracted_from_either_encoding() {
        // ---
        let flat = decode(Some("PeopleCount:3,Odour Index:42.5,"));
        assert_eq!(flat.odour_index, 42.5);
        assert_eq!(flat.people_count, 3);

        let json = decode(Some(r#"{"PIR":1,"note":"Odour Index:42.5"}"#));
        assert_eq!(json.odour_index, 42.5);

        let lower = decode(Some("odour index:7"));
        assert_eq!(lower.odour_index, 7.0);

        let absent = decode(Some("PeopleCount:3,"));
        assert_eq!(absent.odour_index, 0.0);
    }

    #[test]
    fn malformed_json_degrades_to_zeroed_record() {
        // ---
        let d = decode(Some(r#"{"PIR":5,"#));

        assert_eq!(d.people_count, 0);
        assert_eq!(d.nh3_ppm, 0.0);
        assert_eq!(d.status, DecodeStatus::Degraded);
    }

    #[test]
    fn non_numeric_flat_value_degrades_to_zeroed_record() {
        // ---
        let d = decode(Some("PeopleCount:lots,H2S_PPM:0.5,"));

        assert_eq!(d.people_count, 0);
        assert_eq!(d.h2s_ppm, 0.0);
        assert_eq!(d.status, DecodeStatus::Degraded);
    }

    #[test]
    fn empty_or_missing_payload_is_zeroed_but_not_degraded() {
        // ---
        for raw in [None, Some(""), Some("   ")] {
            let d = decode(raw);
            assert_eq!(d, DecodedReading::zeroed(DecodeStatus::Ok, 0.0));
        }
    }
}
