//! Date-indexed return series.
//!
//! A [`ReturnSeries`] is validated once at construction and never mutated
//! afterwards; every engine in this crate reads it through slices.

use crate::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A single periodic return observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReturnPoint {
    /// Observation date (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Fractional period return (0.01 = 1%)
    pub value: f64,
}

impl ReturnPoint {
    /// Create a new observation.
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// An ordered sequence of periodic returns with strictly increasing dates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<ReturnPoint>", into = "Vec<ReturnPoint>")]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Build a series from typed points.
    ///
    /// Rejects empty input, non-increasing or duplicate dates, and non-finite returns.
    pub fn new(points: Vec<ReturnPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::Validation(
                "Return series must contain at least one observation".to_string(),
            ));
        }

        let mut dates = Vec::with_capacity(points.len());
        let mut values = Vec::with_capacity(points.len());

        for (i, point) in points.iter().enumerate() {
            if !point.value.is_finite() {
                return Err(Error::Validation(format!(
                    "Non-finite return {} on {}",
                    point.value, point.date
                )));
            }
            if i > 0 && point.date <= points[i - 1].date {
                return Err(Error::Validation(format!(
                    "Dates must be strictly increasing: {} follows {}",
                    point.date,
                    points[i - 1].date
                )));
            }
            dates.push(point.date);
            values.push(point.value);
        }

        Ok(Self { dates, values })
    }

    /// Build a series from `(YYYY-MM-DD, return)` records.
    pub fn from_records<S: AsRef<str>>(records: &[(S, f64)]) -> Result<Self> {
        let points = records
            .iter()
            .map(|(date, value)| {
                let date = NaiveDate::parse_from_str(date.as_ref(), "%Y-%m-%d").map_err(|e| {
                    Error::Validation(format!("Invalid date '{}': {}", date.as_ref(), e))
                })?;
                Ok(ReturnPoint::new(date, *value))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(points)
    }

    /// Build a series on a consecutive daily calendar starting at `start`.
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Result<Self> {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                start
                    .checked_add_signed(Duration::days(i as i64))
                    .map(|date| ReturnPoint::new(date, value))
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "Date {} days after {} is out of range",
                            i, start
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(points)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed series; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return values in date order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Observation dates in ascending order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// First observation date.
    pub fn start_date(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last observation date.
    pub fn end_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Iterate over the observations.
    pub fn points(&self) -> impl Iterator<Item = ReturnPoint> + '_ {
        self.dates
            .iter()
            .zip(&self.values)
            .map(|(&date, &value)| ReturnPoint { date, value })
    }

    /// Inner-join this series with `other` on date.
    ///
    /// Returns the shared dates and the two value vectors, all of equal length.
    /// The result is empty when the date ranges do not overlap.
    pub fn align(&self, other: &ReturnSeries) -> (Vec<NaiveDate>, Vec<f64>, Vec<f64>) {
        let mut dates = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();

        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.dates[i].cmp(&other.dates[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dates.push(self.dates[i]);
                    left.push(self.values[i]);
                    right.push(other.values[j]);
                    i += 1;
                    j += 1;
                }
            }
        }

        (dates, left, right)
    }
}

impl TryFrom<Vec<ReturnPoint>> for ReturnSeries {
    type Error = Error;

    fn try_from(points: Vec<ReturnPoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<ReturnSeries> for Vec<ReturnPoint> {
    fn from(series: ReturnSeries) -> Self {
        series.points().collect()
    }
}

/// Several assets' return series aligned on their common dates.
///
/// The first asset is the primary (portfolio) column. Alignment is an
/// inner join: only dates present in every series are kept.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultiAssetReturnSeries {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl MultiAssetReturnSeries {
    /// Align the given series on their common dates.
    pub fn new(series: Vec<(String, ReturnSeries)>) -> Result<Self> {
        if series.is_empty() {
            return Err(Error::Validation(
                "At least one asset series is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (asset, _) in &series {
            if !seen.insert(asset.as_str()) {
                return Err(Error::Validation(format!("Duplicate asset id: {}", asset)));
            }
        }

        let mut common: BTreeSet<NaiveDate> = series[0].1.dates().iter().copied().collect();
        for (_, s) in &series[1..] {
            let dates: BTreeSet<NaiveDate> = s.dates().iter().copied().collect();
            common = common.intersection(&dates).copied().collect();
        }

        if common.is_empty() {
            return Err(Error::InsufficientData(
                "Asset series share no common dates".to_string(),
            ));
        }

        let dates: Vec<NaiveDate> = common.into_iter().collect();
        let columns = series
            .iter()
            .map(|(_, s)| {
                s.points()
                    .filter(|p| dates.binary_search(&p.date).is_ok())
                    .map(|p| p.value)
                    .collect()
            })
            .collect();
        let assets = series.into_iter().map(|(asset, _)| asset).collect();

        Ok(Self {
            assets,
            dates,
            columns,
        })
    }

    /// Wrap a single series as a one-column frame.
    pub fn single(asset: impl Into<String>, series: ReturnSeries) -> Self {
        Self {
            assets: vec![asset.into()],
            dates: series.dates().to_vec(),
            columns: vec![series.values().to_vec()],
        }
    }

    /// Asset identifiers in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Number of asset columns.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Common dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of aligned observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when no dates are shared (never for a constructed frame).
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Values of the column at `index`.
    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    /// Values of the named asset.
    pub fn column_by_name(&self, asset: &str) -> Result<&[f64]> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| Error::UnknownAsset(asset.to_string()))
    }

    /// All columns in asset order.
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// The primary (first) column as a standalone series.
    pub fn primary(&self) -> ReturnSeries {
        ReturnSeries {
            dates: self.dates.clone(),
            values: self.columns[0].clone(),
        }
    }

    /// Identifier of the primary column.
    pub fn primary_asset(&self) -> &str {
        &self.assets[0]
    }
}
