// Telemetry domain models - monthly battery samples and canonical series
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type VehicleId = u32;

/// Calendar month key, ordered chronologically and rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised month key: {0:?}")]
pub struct ParseMonthError(pub String);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Calendar month number, 1-12
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Whole months from `origin` to `self` (negative when `self` is earlier)
    pub fn months_since(&self, origin: MonthKey) -> i64 {
        i64::from(self.year - origin.year) * 12 + i64::from(self.month) - i64::from(origin.month)
    }

    /// Accepts `YYYY-MM`, `YYYY-MM-DD`, RFC 3339 timestamps and
    /// `YYYY-MM-DD HH:MM:SS` (the exported feature table stores month starts
    /// as naive timestamps).
    pub fn parse(value: &str) -> Result<Self, ParseMonthError> {
        let s = value.trim();
        let date = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
            .map_err(|_| ParseMonthError(value.to_string()))?;

        Ok(Self {
            year: date.year(),
            month: date.month(),
        })
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One ingestion record as delivered by a telemetry store.
///
/// Column names follow the exported feature table. `month_ts` is the only
/// accepted month field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub vehicle: Option<VehicleId>,
    #[serde(default)]
    pub month_ts: Option<String>,
    #[serde(default, rename = "Ca")]
    pub capacity: Option<f64>,
    #[serde(default, rename = "Vpack_ave")]
    pub voltage_avg: Option<f64>,
    #[serde(default, rename = "SOC_ave")]
    pub soc_avg: Option<f64>,
    #[serde(default, rename = "Tmax_ave")]
    pub temp_max: Option<f64>,
    #[serde(default, rename = "Tmin_ave")]
    pub temp_min: Option<f64>,
}

/// One monthly observation for a vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub month: MonthKey,
    /// Ah
    pub capacity: f64,
    pub voltage_avg: Option<f64>,
    pub soc_avg: Option<f64>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
}

/// Data-quality problems found while ingesting raw samples.
///
/// Indices refer to positions in the raw input, not the sorted series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("telemetry for vehicle {vehicle_id} is empty")]
    Empty { vehicle_id: VehicleId },

    #[error("samples {indices:?} have no month_ts")]
    MissingMonth { indices: Vec<usize> },

    #[error("samples {indices:?} have an unparsable month_ts")]
    UnparsableMonth { indices: Vec<usize> },

    #[error("samples {indices:?} have a missing, negative or non-finite capacity")]
    InvalidCapacity { indices: Vec<usize> },

    #[error("duplicate months {months:?} at samples {indices:?}")]
    DuplicateMonths {
        months: Vec<MonthKey>,
        indices: Vec<usize>,
    },
}

impl SeriesError {
    pub fn indices(&self) -> &[usize] {
        match self {
            SeriesError::Empty { .. } => &[],
            SeriesError::MissingMonth { indices }
            | SeriesError::UnparsableMonth { indices }
            | SeriesError::InvalidCapacity { indices }
            | SeriesError::DuplicateMonths { indices, .. } => indices,
        }
    }
}

/// Ordered, immutable per-vehicle sequence of monthly samples.
///
/// Always non-empty with strictly increasing months; the only constructor is
/// [`TelemetrySeries::ingest`].
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySeries {
    vehicle_id: VehicleId,
    samples: Vec<Sample>,
}

impl TelemetrySeries {
    pub fn ingest(vehicle_id: VehicleId, raw: Vec<RawSample>) -> Result<Self, SeriesError> {
        if raw.is_empty() {
            return Err(SeriesError::Empty { vehicle_id });
        }

        let mut missing = Vec::new();
        let mut unparsable = Vec::new();
        let mut invalid_capacity = Vec::new();
        let mut indexed: Vec<(usize, Sample)> = Vec::with_capacity(raw.len());

        for (idx, record) in raw.into_iter().enumerate() {
            let month = match record.month_ts.as_deref().map(str::trim) {
                None | Some("") => {
                    missing.push(idx);
                    continue;
                }
                Some(value) => match MonthKey::parse(value) {
                    Ok(month) => month,
                    Err(_) => {
                        unparsable.push(idx);
                        continue;
                    }
                },
            };

            let capacity = match record.capacity {
                Some(c) if c.is_finite() && c >= 0.0 => c,
                _ => {
                    invalid_capacity.push(idx);
                    continue;
                }
            };

            indexed.push((
                idx,
                Sample {
                    month,
                    capacity,
                    voltage_avg: record.voltage_avg,
                    soc_avg: record.soc_avg,
                    temp_max: record.temp_max,
                    temp_min: record.temp_min,
                },
            ));
        }

        if !missing.is_empty() {
            return Err(SeriesError::MissingMonth { indices: missing });
        }
        if !unparsable.is_empty() {
            return Err(SeriesError::UnparsableMonth { indices: unparsable });
        }
        if !invalid_capacity.is_empty() {
            return Err(SeriesError::InvalidCapacity {
                indices: invalid_capacity,
            });
        }

        indexed.sort_by_key(|(idx, sample)| (sample.month, *idx));

        let mut months = Vec::new();
        let mut indices = Vec::new();
        for group in indexed.chunk_by(|a, b| a.1.month == b.1.month) {
            if group.len() > 1 {
                months.push(group[0].1.month);
                indices.extend(group.iter().map(|(idx, _)| *idx));
            }
        }
        if !indices.is_empty() {
            indices.sort_unstable();
            return Err(SeriesError::DuplicateMonths { months, indices });
        }

        Ok(Self {
            vehicle_id,
            samples: indexed.into_iter().map(|(_, sample)| sample).collect(),
        })
    }

    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn first(&self) -> &Sample {
        &self.samples[0]
    }

    pub fn last(&self) -> &Sample {
        &self.samples[self.samples.len() - 1]
    }

    /// Index of the sample recorded for `month`
    pub fn position(&self, month: MonthKey) -> Option<usize> {
        self.samples.binary_search_by_key(&month, |s| s.month).ok()
    }

    /// The earliest `count` samples (clamped to the series length)
    pub fn prefix(&self, count: usize) -> &[Sample] {
        &self.samples[..count.min(self.samples.len())]
    }
}
