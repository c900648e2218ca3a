//! The tenant data pipeline: bounded raw feed query plus hourly aggregation.
//!
//! One query feeds both outputs. `fetch_raw` pulls a time-ordered, filtered,
//! capped slice of the tenant's reading table and decodes every row;
//! `aggregate` folds those same decoded rows into hourly buckets. Earlier
//! generations of this dashboard ran two near-identical queries per request
//! (one capped for the table, one unbounded for the chart) with separately
//! maintained parsing; both outputs now come from the single decoded batch.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use sqlx::MySqlPool;
use tracing::debug;

use crate::error::DataSourceError;
use crate::models::{HourlyBucket, NormalizedReading, RawReadingRow};
use crate::registry::ReadingDialect;

// ---

/// Rows returned when the caller does not ask for a limit.
pub const DEFAULT_LIMIT: u32 = 1000;

/// Hard cap on caller-requested row counts.
pub const MAX_LIMIT: u32 = 50_000;

/// Row cap for one raw feed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimit {
    Rows(u32),
    All,
}

impl RowLimit {
    /// Parse a caller-supplied limit string.
    ///
    /// `None` and anything unparseable or non-positive fall back to
    /// [`DEFAULT_LIMIT`]; the literal `"all"` (any casing) lifts the cap;
    /// explicit values are clamped to [`MAX_LIMIT`].
    pub fn parse(raw: Option<&str>) -> RowLimit {
        // ---
        let Some(raw) = raw else {
            return RowLimit::Rows(DEFAULT_LIMIT);
        };
        if raw.trim().eq_ignore_ascii_case("all") {
            return RowLimit::All;
        }
        match raw.trim().parse::<i64>() {
            Ok(n) if n > 0 => RowLimit::Rows(n.min(i64::from(MAX_LIMIT)) as u32),
            _ => RowLimit::Rows(DEFAULT_LIMIT),
        }
    }
}

// ---

/// Fetch and decode the raw reading feed for one tenant, newest first.
///
/// Builds one SELECT against the dialect's reading table: optional exact
/// device match, optional inclusive `receivedon` range (the caller enforces
/// the both-or-neither rule before this point), soft-delete filtering when
/// the dialect requires it, descending receive-time order, optional LIMIT.
///
/// Decoding is per-row and total, so the batch either returns in full or the
/// query itself failed; there is no partially decoded result.
pub async fn fetch_raw(
    pool: &MySqlPool,
    dialect: ReadingDialect,
    device_id: Option<&str>,
    range: Option<(NaiveDateTime, NaiveDateTime)>,
    limit: RowLimit,
) -> Result<Vec<NormalizedReading>, DataSourceError> {
    // ---
    let mut sql = format!(
        "SELECT id, deviceid, location, revText, receivedon FROM {} WHERE 1=1",
        dialect.table()
    );
    if dialect.filters_soft_deleted() {
        sql.push_str(" AND isDeleted = 0");
    }
    if device_id.is_some() {
        sql.push_str(" AND deviceid = ?");
    }
    if range.is_some() {
        sql.push_str(" AND receivedon BETWEEN ? AND ?");
    }
    sql.push_str(" ORDER BY receivedon DESC");
    if let RowLimit::Rows(n) = limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }

    debug!("raw feed query: {sql}");

    let mut query = sqlx::query_as::<_, RawReadingRow>(&sql);
    if let Some(device) = device_id {
        query = query.bind(device);
    }
    if let Some((from, to)) = range {
        query = query.bind(from).bind(to);
    }

    let rows = query.fetch_all(pool).await?;
    debug!("raw feed query returned {} rows", rows.len());

    Ok(rows.into_iter().map(RawReadingRow::normalize).collect())
}

// ---

/// Running totals for one (device, date, hour) bucket.
struct BucketAccum {
    device_id: String,
    date: NaiveDate,
    hour: u32,
    location: Option<String>,
    count: u32,
    total_nh3: f64,
    min_nh3: f64,
    max_nh3: f64,
    total_h2s_aqi: f64,
    total_h2s_ppm: f64,
    first_time: NaiveDateTime,
    last_time: NaiveDateTime,
    first_pir: i64,
    last_pir: i64,
}

/// Fold decoded readings into hourly buckets, sorted chronologically.
///
/// Buckets are keyed by (device, calendar date, hour of day) on the stored
/// timestamp; they exist only once a reading contributes to them. The
/// people-count delta is `last_pir - first_pir` by receive timestamp, with a
/// negative delta reported as `last_pir` (covers PIR counter resets). Output
/// order is a true sort by (date, hour, device), independent of the order
/// readings were scanned in; serial numbers are assigned after the sort.
///
/// Pure function of its input: same readings, same buckets.
pub fn aggregate(readings: &[NormalizedReading]) -> Vec<HourlyBucket> {
    // ---
    let mut buckets: HashMap<(String, NaiveDate, u32), BucketAccum> = HashMap::new();

    for r in readings {
        let date = r.received_on.date();
        let hour = r.received_on.time().hour();

        let entry = buckets
            .entry((r.device_id.clone(), date, hour))
            .or_insert_with(|| BucketAccum {
                device_id: r.device_id.clone(),
                date,
                hour,
                location: r.location.clone(),
                count: 0,
                total_nh3: 0.0,
                min_nh3: r.nh3,
                max_nh3: r.nh3,
                total_h2s_aqi: 0.0,
                total_h2s_ppm: 0.0,
                first_time: r.received_on,
                last_time: r.received_on,
                first_pir: r.pir,
                last_pir: r.pir,
            });

        entry.count += 1;
        entry.total_nh3 += r.nh3;
        entry.min_nh3 = entry.min_nh3.min(r.nh3);
        entry.max_nh3 = entry.max_nh3.max(r.nh3);
        entry.total_h2s_aqi += r.h2s_aqi;
        entry.total_h2s_ppm += r.h2s_ppm;

        // Boundary values track receive time, not scan order.
        if r.received_on < entry.first_time {
            entry.first_time = r.received_on;
            entry.first_pir = r.pir;
        }
        if r.received_on > entry.last_time {
            entry.last_time = r.received_on;
            entry.last_pir = r.pir;
        }
    }

    let mut accums: Vec<BucketAccum> = buckets.into_values().collect();
    accums.sort_by(|a, b| (a.date, a.hour, &a.device_id).cmp(&(b.date, b.hour, &b.device_id)));

    accums
        .into_iter()
        .enumerate()
        .map(|(index, b)| {
            // ---
            let mut total_pir = b.last_pir - b.first_pir;
            if total_pir < 0 {
                total_pir = b.last_pir;
            }

            let count = f64::from(b.count);
            HourlyBucket {
                slno: index + 1,
                hour_label: format!("{:02}:00 - {:02}:00", b.hour, b.hour + 1),
                device_id: b.device_id,
                date: b.date,
                hour: b.hour,
                location: b.location,
                avg_nh3: round2(b.total_nh3 / count),
                min_nh3: b.min_nh3,
                max_nh3: b.max_nh3,
                avg_h2s_aqi: round2(b.total_h2s_aqi / count),
                avg_h2s_ppm: round2(b.total_h2s_ppm / count),
                total_pir,
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::DecodeStatus;
    use chrono::NaiveDate;

    fn reading(device: &str, day: u32, hour: u32, minute: u32, pir: i64) -> NormalizedReading {
        // ---
        NormalizedReading {
            id: 0,
            device_id: device.to_string(),
            location: Some("Block A".to_string()),
            received_on: NaiveDate::from_ymd_opt(2025, 3, day)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
            pir,
            nh3: 0.0,
            h2s_aqi: 0.0,
            h2s_ppm: 0.0,
            category: None,
            odour_index: 0.0,
            rev_text: None,
            status: DecodeStatus::Ok,
        }
    }

    #[test]
    fn limit_defaults_to_1000() {
        assert_eq!(RowLimit::parse(None), RowLimit::Rows(1000));
    }

    #[test]
    fn limit_all_is_unbounded_any_casing() {
        // ---
        assert_eq!(RowLimit::parse(Some("all")), RowLimit::All);
        assert_eq!(RowLimit::parse(Some("ALL")), RowLimit::All);
        assert_eq!(RowLimit::parse(Some(" All ")), RowLimit::All);
    }

    #[test]
    fn limit_is_clamped_to_50000() {
        // ---
        assert_eq!(RowLimit::parse(Some("10000000")), RowLimit::Rows(50_000));
        assert_eq!(RowLimit::parse(Some("50000")), RowLimit::Rows(50_000));
        assert_eq!(RowLimit::parse(Some("25")), RowLimit::Rows(25));
        assert_eq!(RowLimit::parse(Some("1")), RowLimit::Rows(1));
    }

    #[test]
    fn garbage_limits_fall_back_to_default() {
        // ---
        for raw in ["0", "-5", "abc", "1.5", ""] {
            assert_eq!(RowLimit::parse(Some(raw)), RowLimit::Rows(1000), "{raw:?}");
        }
    }

    #[test]
    fn pir_delta_is_last_minus_first_by_receive_time() {
        // ---
        // Chronological pir values [10, 12, 9, 15] within hour 9, scanned in
        // reverse (newest first, as fetch_raw returns them).
        let readings = vec![
            reading("D1", 26, 9, 45, 15),
            reading("D1", 26, 9, 30, 9),
            reading("D1", 26, 9, 15, 12),
            reading("D1", 26, 9, 0, 10),
        ];

        let buckets = aggregate(&readings);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].total_pir, 5); // 15 - 10
        assert_eq!(buckets[0].slno, 1);
    }

    #[test]
    fn negative_pir_delta_falls_back_to_last_value() {
        // ---
        // Counter reset inside the hour: last (3) < first (10).
        let readings = vec![
            reading("D1", 26, 9, 0, 10),
            reading("D1", 26, 9, 50, 3),
        ];

        let buckets = aggregate(&readings);
        assert_eq!(buckets[0].total_pir, 3);
    }

    #[test]
    fn buckets_sort_chronologically_regardless_of_scan_order() {
        // ---
        let readings = vec![
            reading("D1", 26, 10, 0, 1),
            reading("D1", 26, 9, 10, 1),
            reading("D1", 26, 9, 20, 2),
        ];

        let buckets = aggregate(&readings);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].hour, 9);
        assert_eq!(buckets[1].hour, 10);
        assert_eq!(buckets[0].slno, 1);
        assert_eq!(buckets[1].slno, 2);
        assert_eq!(buckets[0].hour_label, "09:00 - 10:00");
        assert_eq!(buckets[1].hour_label, "10:00 - 11:00");
    }

    #[test]
    fn buckets_sort_across_dates_before_hours() {
        // ---
        let readings = vec![
            reading("D1", 27, 1, 0, 1),
            reading("D1", 26, 23, 0, 1),
        ];

        let buckets = aggregate(&readings);
        assert_eq!(
            (buckets[0].date.to_string().as_str(), buckets[0].hour),
            ("2025-03-26", 23)
        );
        assert_eq!(
            (buckets[1].date.to_string().as_str(), buckets[1].hour),
            ("2025-03-27", 1)
        );
    }

    #[test]
    fn nh3_stats_average_min_max_rounding() {
        // ---
        let mut readings = vec![
            reading("D1", 26, 9, 0, 0),
            reading("D1", 26, 9, 10, 0),
            reading("D1", 26, 9, 20, 0),
        ];
        readings[0].nh3 = 1.0;
        readings[1].nh3 = 2.0;
        readings[2].nh3 = 2.005;

        let buckets = aggregate(&readings);
        assert_eq!(buckets[0].min_nh3, 1.0);
        assert_eq!(buckets[0].max_nh3, 2.005);
        // (1.0 + 2.0 + 2.005) / 3 = 1.668…, rounded to 2 decimals
        assert_eq!(buckets[0].avg_nh3, 1.67);
    }

    #[test]
    fn h2s_averages_are_per_bucket() {
        // ---
        let mut readings = vec![reading("D1", 26, 9, 0, 0), reading("D1", 26, 9, 30, 0)];
        readings[0].h2s_ppm = 0.62;
        readings[0].h2s_aqi = 79.0;
        readings[1].h2s_ppm = 0.38;
        readings[1].h2s_aqi = 81.0;

        let buckets = aggregate(&readings);
        assert_eq!(buckets[0].avg_h2s_ppm, 0.5);
        assert_eq!(buckets[0].avg_h2s_aqi, 80.0);
    }

    #[test]
    fn devices_bucket_independently() {
        // ---
        let readings = vec![
            reading("D2", 26, 9, 0, 1),
            reading("D1", 26, 9, 0, 1),
        ];

        let buckets = aggregate(&readings);
        assert_eq!(buckets.len(), 2);
        // Same (date, hour): device id breaks the tie deterministically.
        assert_eq!(buckets[0].device_id, "D1");
        assert_eq!(buckets[1].device_id, "D2");
    }

    #[test]
    fn aggregate_is_pure() {
        // ---
        let readings = vec![
            reading("D1", 26, 9, 0, 10),
            reading("D1", 26, 9, 30, 15),
            reading("D1", 26, 10, 0, 20),
            reading("D2", 26, 9, 5, 7),
        ];

        let first = aggregate(&readings);
        let second = aggregate(&readings);
        assert_eq!(first, second);
    }

    #[test]
    fn no_readings_means_no_buckets() {
        assert!(aggregate(&[]).is_empty());
    }
}
