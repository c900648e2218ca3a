//! Data models for the dashboard pipeline.
//!
//! Raw rows come out of a tenant's reading table; normalization attaches the
//! decoded payload fields (see `decode`) plus a per-row status so degraded
//! rows are distinguishable from genuine zero readings.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::decode;

// ---

/// One stored row from a tenant's reading table, exactly as fetched.
///
/// `rev_text` is the opaque payload blob; both the JSON and the flat
/// `Key:Value` encodings live in this column. Nullable columns stay optional
/// because tenant schemas are not under our control.
#[derive(Debug, sqlx::FromRow)]
pub struct RawReadingRow {
    // ---
    pub id: i64,
    #[sqlx(rename = "deviceid")]
    pub device_id: String,
    pub location: Option<String>,
    #[sqlx(rename = "revText")]
    pub rev_text: Option<String>,
    #[sqlx(rename = "receivedon")]
    pub received_on: NaiveDateTime,
}

/// Whether a row's payload decoded cleanly or was zero-filled after a
/// parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeStatus {
    Ok,
    Degraded,
}

/// A decoded reading as served to the dashboard, one per raw row.
///
/// Never mutated after creation; lives for one request/response cycle.
/// The raw payload is retained for traceability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReading {
    // ---
    pub id: i64,
    pub device_id: String,
    pub location: Option<String>,
    pub received_on: NaiveDateTime,
    pub pir: i64,
    pub nh3: f64,
    #[serde(rename = "h2s_aqi")]
    pub h2s_aqi: f64,
    #[serde(rename = "h2s_ppm")]
    pub h2s_ppm: f64,
    pub category: Option<String>,
    pub odour_index: f64,
    pub rev_text: Option<String>,
    pub status: DecodeStatus,
}

impl RawReadingRow {
    /// Decode the payload blob and fold the result into a served reading.
    ///
    /// Never fails: a malformed payload yields zeroed numeric fields with
    /// `DecodeStatus::Degraded` (see `decode::decode`).
    pub fn normalize(self) -> NormalizedReading {
        // ---
        let decoded = decode::decode(self.rev_text.as_deref());

        NormalizedReading {
            id: self.id,
            device_id: self.device_id,
            location: self.location,
            received_on: self.received_on,
            pir: decoded.people_count,
            nh3: decoded.nh3_ppm,
            h2s_aqi: decoded.h2s_aqi,
            h2s_ppm: decoded.h2s_ppm,
            category: decoded.category,
            odour_index: decoded.odour_index,
            rev_text: self.rev_text,
            status: decoded.status,
        }
    }
}

// ---

/// One hourly aggregate bucket, keyed by (device, calendar date, hour).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBucket {
    // ---
    pub slno: usize,
    pub device_id: String,
    pub date: NaiveDate,
    pub hour: u32,
    pub location: Option<String>,
    pub avg_nh3: f64,
    pub min_nh3: f64,
    pub max_nh3: f64,
    pub avg_h2s_aqi: f64,
    pub avg_h2s_ppm: f64,
    pub total_pir: i64,
    pub hour_label: String,
}

/// One entry from a tenant's device/location registry table.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DeviceEntry {
    // ---
    #[sqlx(rename = "deviceid")]
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub location: Option<String>,
}

/// Combined dashboard response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub raw_data: Vec<NormalizedReading>,
    pub hourly_data: Vec<HourlyBucket>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;

    fn row(payload: Option<&str>) -> RawReadingRow {
        // ---
        RawReadingRow {
            id: 7,
            device_id: "D1".to_string(),
            location: Some("Block A".to_string()),
            rev_text: payload.map(String::from),
            received_on: NaiveDate::from_ymd_opt(2025, 3, 26)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap(),
        }
    }

    #[test]
    fn normalize_preserves_row_identity_and_payload() {
        // ---
        let n = row(Some(r#"{"PIR":5,"NH3":1.2}"#)).normalize();

        assert_eq!(n.id, 7);
        assert_eq!(n.device_id, "D1");
        assert_eq!(n.location.as_deref(), Some("Block A"));
        assert_eq!(n.rev_text.as_deref(), Some(r#"{"PIR":5,"NH3":1.2}"#));
        assert_eq!(n.pir, 5);
        assert_eq!(n.nh3, 1.2);
        assert_eq!(n.status, DecodeStatus::Ok);
    }

    #[test]
    fn normalize_missing_payload_yields_zeros() {
        // ---
        let n = row(None).normalize();

        assert_eq!(n.pir, 0);
        assert_eq!(n.nh3, 0.0);
        assert_eq!(n.h2s_aqi, 0.0);
        assert_eq!(n.h2s_ppm, 0.0);
        assert_eq!(n.odour_index, 0.0);
        assert_eq!(n.category, None);
        assert_eq!(n.status, DecodeStatus::Ok);
    }

    #[test]
    fn reading_serializes_with_dashboard_field_names() {
        // ---
        let n = row(Some("PeopleCount:38,H2S_PPM:0.62,H2S_AQI:79,")).normalize();
        let json = serde_json::to_value(&n).unwrap();

        assert_eq!(json["deviceId"], "D1");
        assert_eq!(json["h2s_ppm"], 0.62);
        assert_eq!(json["h2s_aqi"], 79.0);
        assert_eq!(json["pir"], 38);
        assert_eq!(json["status"], "ok");
        assert!(json.get("revText").is_some());
    }
}
