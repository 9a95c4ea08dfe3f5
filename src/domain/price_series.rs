//! Price points, resampling frequency and the validated `PriceSeries`.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::VoltraderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// Fixed resampling frequency, e.g. `1D`, `4H`, `15min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    pub const DAILY: Frequency = Frequency { seconds: 86_400 };
    /// Longest accepted bucket: one leap year.
    pub const MAX_SECONDS: i64 = 366 * 86_400;

    pub fn from_seconds(seconds: i64) -> Option<Self> {
        (seconds > 0 && seconds <= Self::MAX_SECONDS).then_some(Self { seconds })
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Start of the bucket containing `ts`. Buckets are aligned to the Unix
    /// epoch, which for divisors of a day means midnight-aligned.
    pub fn floor(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let secs = ts.and_utc().timestamp();
        let start = secs.div_euclid(self.seconds) * self.seconds;
        from_unix(start)
    }
}

fn from_unix(secs: i64) -> NaiveDateTime {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid frequency '{0}' (expected e.g. 1D, 4H, 15min)")]
pub struct FrequencyParseError(pub String);

impl FromStr for Frequency {
    type Err = FrequencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count, unit) = trimmed.split_at(split);
        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| FrequencyParseError(s.to_string()))?
        };
        let unit_secs = match unit.to_ascii_lowercase().as_str() {
            "d" => 86_400,
            "h" => 3_600,
            "min" | "t" => 60,
            "s" => 1,
            _ => return Err(FrequencyParseError(s.to_string())),
        };
        count
            .checked_mul(unit_secs)
            .and_then(Frequency::from_seconds)
            .ok_or_else(|| FrequencyParseError(s.to_string()))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % 86_400 == 0 {
            write!(f, "{}D", s / 86_400)
        } else if s % 3_600 == 0 {
            write!(f, "{}H", s / 3_600)
        } else if s % 60 == 0 {
            write!(f, "{}min", s / 60)
        } else {
            write!(f, "{}s", s)
        }
    }
}

/// Output of [`resample_last`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    pub points: Vec<PricePoint>,
    /// Buckets that carry a forward-filled close instead of their own.
    pub filled: usize,
}

/// Bucket raw points by `frequency`, keep the last defined close in each
/// bucket (labelled by bucket start) and forward-fill empty buckets.
/// Buckets before the first defined close stay NaN.
pub fn resample_last(points: &[PricePoint], frequency: Frequency) -> Resampled {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.timestamp);

    let mut buckets: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    for p in &sorted {
        let bucket = frequency.floor(p.timestamp);
        if !p.close.is_nan() {
            buckets.insert(bucket, p.close);
        } else {
            buckets.entry(bucket).or_insert(f64::NAN);
        }
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Resampled {
            points: Vec::new(),
            filled: 0,
        };
    };

    let step = chrono::Duration::seconds(frequency.seconds());
    let mut out = Vec::with_capacity(buckets.len());
    let mut filled = 0;
    let mut prev = f64::NAN;
    let mut ts = first;
    while ts <= last {
        let close = match buckets.get(&ts) {
            Some(c) if !c.is_nan() => *c,
            _ => {
                if !prev.is_nan() {
                    filled += 1;
                }
                prev
            }
        };
        prev = close;
        out.push(PricePoint::new(ts, close));
        ts += step;
    }
    Resampled {
        points: out,
        filled,
    }
}

/// An immutable, validated close-price history at a fixed frequency.
///
/// Invariants: non-empty, strictly increasing timestamps spaced exactly one
/// frequency apart, finite positive closes, nothing dated in the future.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    frequency: Frequency,
    timestamps: Vec<NaiveDateTime>,
    closes: Vec<f64>,
}

impl PriceSeries {
    pub fn new(
        symbol: &str,
        frequency: Frequency,
        points: Vec<PricePoint>,
    ) -> Result<Self, VoltraderError> {
        Self::new_as_of(symbol, frequency, points, Utc::now().naive_utc())
    }

    /// Validate against an explicit "now" so future-dated checks are
    /// deterministic.
    pub fn new_as_of(
        symbol: &str,
        frequency: Frequency,
        points: Vec<PricePoint>,
        now: NaiveDateTime,
    ) -> Result<Self, VoltraderError> {
        validate_points(symbol, frequency, &points, now)?;
        let (timestamps, closes) = points.into_iter().map(|p| (p.timestamp, p.close)).unzip();
        Ok(Self {
            symbol: symbol.to_string(),
            frequency,
            timestamps,
            closes,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn points(&self) -> impl Iterator<Item = PricePoint> + '_ {
        self.timestamps
            .iter()
            .zip(&self.closes)
            .map(|(&timestamp, &close)| PricePoint { timestamp, close })
    }

    pub fn last_close(&self) -> Option<f64> {
        self.closes.last().copied()
    }
}

fn validate_points(
    symbol: &str,
    frequency: Frequency,
    points: &[PricePoint],
    now: NaiveDateTime,
) -> Result<(), VoltraderError> {
    if points.is_empty() {
        return Err(VoltraderError::integrity(symbol, "price series is empty"));
    }

    for (i, p) in points.iter().enumerate() {
        if !p.close.is_finite() {
            return Err(VoltraderError::integrity(
                symbol,
                format!("undefined close at {}", p.timestamp),
            ));
        }
        if p.close <= 0.0 {
            return Err(VoltraderError::integrity(
                symbol,
                format!("non-positive close {} at {}", p.close, p.timestamp),
            ));
        }
        if i == 0 {
            continue;
        }
        let prev = points[i - 1].timestamp;
        if p.timestamp == prev {
            return Err(VoltraderError::integrity(
                symbol,
                format!("duplicate timestamp {}", p.timestamp),
            ));
        }
        if p.timestamp < prev {
            return Err(VoltraderError::integrity(
                symbol,
                format!("timestamps not increasing at {}", p.timestamp),
            ));
        }
        let spacing = (p.timestamp - prev).num_seconds();
        if spacing != frequency.seconds() {
            return Err(VoltraderError::integrity(
                symbol,
                format!(
                    "gap of {}s before {} does not match frequency {}",
                    spacing, p.timestamp, frequency
                ),
            ));
        }
    }

    if let Some(last) = points.last() {
        if last.timestamp > now {
            return Err(VoltraderError::integrity(
                symbol,
                format!("future-dated close at {}", last.timestamp),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn daily(closes: &[f64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(ts(2024, 1, 1 + i as u32, 0), c))
            .collect()
    }

    fn now() -> NaiveDateTime {
        ts(2025, 1, 1, 0)
    }

    #[test]
    fn parse_frequencies() {
        assert_eq!("1D".parse::<Frequency>().unwrap(), Frequency::DAILY);
        assert_eq!("4H".parse::<Frequency>().unwrap().seconds(), 14_400);
        assert_eq!("15min".parse::<Frequency>().unwrap().seconds(), 900);
        assert_eq!("D".parse::<Frequency>().unwrap(), Frequency::DAILY);
        assert!("0D".parse::<Frequency>().is_err());
        assert!("1W".parse::<Frequency>().is_err());
        assert!("abc".parse::<Frequency>().is_err());
    }

    #[test]
    fn oversized_frequency_is_a_parse_error() {
        for s in ["9999999999999999D", "99999999999999999999D", "367D"] {
            assert_eq!(
                s.parse::<Frequency>(),
                Err(FrequencyParseError(s.to_string()))
            );
        }
        assert_eq!("366D".parse::<Frequency>().unwrap().seconds(), Frequency::MAX_SECONDS);
    }

    #[test]
    fn frequency_display_round_trips() {
        for s in ["1D", "4H", "15min"] {
            assert_eq!(s.parse::<Frequency>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn floor_aligns_to_bucket_start() {
        let f = "4H".parse::<Frequency>().unwrap();
        assert_eq!(f.floor(ts(2024, 1, 1, 5)), ts(2024, 1, 1, 4));
        assert_eq!(Frequency::DAILY.floor(ts(2024, 1, 1, 23)), ts(2024, 1, 1, 0));
    }

    #[test]
    fn resample_keeps_last_and_forward_fills() {
        let raw = vec![
            PricePoint::new(ts(2024, 1, 1, 3), 100.0),
            PricePoint::new(ts(2024, 1, 1, 20), 101.0),
            PricePoint::new(ts(2024, 1, 3, 12), 103.0),
        ];
        let Resampled { points: out, filled } = resample_last(&raw, Frequency::DAILY);

        assert_eq!(filled, 1);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], PricePoint::new(ts(2024, 1, 1, 0), 101.0));
        assert_eq!(out[1], PricePoint::new(ts(2024, 1, 2, 0), 101.0));
        assert_eq!(out[2], PricePoint::new(ts(2024, 1, 3, 0), 103.0));
    }

    #[test]
    fn resample_sorts_unordered_input() {
        let raw = vec![
            PricePoint::new(ts(2024, 1, 2, 0), 2.0),
            PricePoint::new(ts(2024, 1, 1, 0), 1.0),
        ];
        let out = resample_last(&raw, Frequency::DAILY).points;
        assert_eq!(out[0].close, 1.0);
        assert_eq!(out[1].close, 2.0);
    }

    #[test]
    fn resample_empty() {
        let out = resample_last(&[], Frequency::DAILY);
        assert!(out.points.is_empty());
        assert_eq!(out.filled, 0);
    }

    #[test]
    fn filled_counts_empty_buckets_not_row_surplus() {
        // Hourly rows on days 1 and 4; days 2 and 3 have nothing.
        let mut raw: Vec<PricePoint> = (0..24)
            .map(|h| PricePoint::new(ts(2024, 1, 1, h), 100.0 + h as f64))
            .collect();
        raw.extend((0..24).map(|h| PricePoint::new(ts(2024, 1, 4, h), 200.0 + h as f64)));

        let out = resample_last(&raw, Frequency::DAILY);
        assert_eq!(out.points.len(), 4);
        assert_eq!(out.filled, 2);
        assert_eq!(out.points[2].close, 123.0);
    }

    #[test]
    fn leading_undefined_buckets_are_not_counted_as_filled() {
        let raw = vec![
            PricePoint::new(ts(2024, 1, 1, 0), f64::NAN),
            PricePoint::new(ts(2024, 1, 2, 0), 5.0),
        ];
        let out = resample_last(&raw, Frequency::DAILY);
        assert!(out.points[0].close.is_nan());
        assert_eq!(out.filled, 0);
    }

    #[test]
    fn valid_series_builds() {
        let series =
            PriceSeries::new_as_of("BTC", Frequency::DAILY, daily(&[1.0, 2.0, 3.0]), now()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), &[1.0, 2.0, 3.0]);
        assert_eq!(series.symbol(), "BTC");
        assert_eq!(series.last_close(), Some(3.0));
        assert_eq!(series.points().count(), 3);
    }

    #[test]
    fn empty_series_rejected() {
        let err = PriceSeries::new_as_of("BTC", Frequency::DAILY, vec![], now()).unwrap_err();
        assert!(matches!(err, VoltraderError::DataIntegrity { .. }));
    }

    #[test]
    fn non_positive_and_nan_rejected() {
        for bad in [0.0, -1.0, f64::NAN] {
            let err =
                PriceSeries::new_as_of("BTC", Frequency::DAILY, daily(&[1.0, bad]), now())
                    .unwrap_err();
            assert!(matches!(err, VoltraderError::DataIntegrity { .. }));
        }
    }

    #[test]
    fn duplicate_and_decreasing_timestamps_rejected() {
        let mut points = daily(&[1.0, 2.0]);
        points[1].timestamp = points[0].timestamp;
        let err = PriceSeries::new_as_of("BTC", Frequency::DAILY, points, now()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let mut points = daily(&[1.0, 2.0]);
        points.swap(0, 1);
        let err = PriceSeries::new_as_of("BTC", Frequency::DAILY, points, now()).unwrap_err();
        assert!(err.to_string().contains("not increasing"));
    }

    #[test]
    fn gaps_rejected() {
        let points = vec![
            PricePoint::new(ts(2024, 1, 1, 0), 1.0),
            PricePoint::new(ts(2024, 1, 3, 0), 1.0),
        ];
        let err = PriceSeries::new_as_of("BTC", Frequency::DAILY, points, now()).unwrap_err();
        assert!(err.to_string().contains("frequency"));
    }

    #[test]
    fn future_dated_rejected() {
        let points = daily(&[1.0, 2.0]);
        let err =
            PriceSeries::new_as_of("BTC", Frequency::DAILY, points, ts(2024, 1, 1, 12)).unwrap_err();
        assert!(err.to_string().contains("future"));
    }
}
