use crate::models::DataPoint;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Target bucket size chosen by the user. `Daily` means "as loaded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Daily => "Diaria",
            Granularity::Weekly => "Semanal",
            Granularity::Monthly => "Mensual",
            Granularity::Quarterly => "Trimestral",
            Granularity::Yearly => "Anual",
        }
    }

    pub fn all() -> &'static [Granularity] {
        &[
            Granularity::Daily,
            Granularity::Weekly,
            Granularity::Monthly,
            Granularity::Quarterly,
            Granularity::Yearly,
        ]
    }

    /// Last calendar day of the bucket containing `date`.
    /// Weeks end on Sunday; the other buckets end on month, quarter or year end.
    pub fn bucket_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => date,
            Granularity::Weekly => {
                let to_sunday = 6 - date.weekday().num_days_from_monday() as i64;
                date + Duration::days(to_sunday)
            }
            Granularity::Monthly => month_end(date.year(), date.month()),
            Granularity::Quarterly => {
                let quarter_end_month = ((date.month() - 1) / 3 + 1) * 3;
                month_end(date.year(), quarter_end_month)
            }
            Granularity::Yearly => month_end(date.year(), 12),
        }
    }
}

/// Native sampling frequency of a source series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Semiannual,
    Yearly,
}

impl Frequency {
    /// Observations per year, used to resolve a year-over-year lookback.
    /// Daily data has no fixed count (business days vary) so it has none.
    pub fn periods_per_year(&self) -> Option<usize> {
        match self {
            Frequency::Daily => None,
            Frequency::Weekly => Some(52),
            Frequency::Monthly => Some(12),
            Frequency::Quarterly => Some(4),
            Frequency::Semiannual => Some(2),
            Frequency::Yearly => Some(1),
        }
    }

    /// Frequency of the series after resampling to `granularity`.
    pub fn after(&self, granularity: Granularity) -> Frequency {
        match granularity {
            Granularity::Daily => *self,
            Granularity::Weekly => Frequency::Weekly,
            Granularity::Monthly => Frequency::Monthly,
            Granularity::Quarterly => Frequency::Quarterly,
            Granularity::Yearly => Frequency::Yearly,
        }
    }
}

/// Stock variables are measured at a point in time, flows accumulate over an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Stock,
    Flow,
}

impl SeriesKind {
    pub fn reduction(&self) -> Reduction {
        match self {
            SeriesKind::Stock => Reduction::Last,
            SeriesKind::Flow => Reduction::Sum,
        }
    }
}

/// How the observations inside one resampling bucket collapse into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Last,
    Sum,
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Keeps points whose calendar date lies in `[start, end]` (both inclusive).
/// A range outside the data, or an inverted one, yields an empty series.
pub fn filter_range(series: &[DataPoint], start: NaiveDate, end: NaiveDate) -> Vec<DataPoint> {
    series
        .iter()
        .filter(|dp| {
            let date = dp.timestamp.date_naive();
            start <= date && date <= end
        })
        .cloned()
        .collect()
}

/// Resamples an ascending series into calendar buckets.
///
/// Each output point is labelled with its bucket end date (00:00 UTC). Buckets
/// without observations produce nothing. `Daily` returns the input unchanged.
pub fn resample(series: &[DataPoint], granularity: Granularity, reduction: Reduction) -> Vec<DataPoint> {
    if granularity == Granularity::Daily {
        return series.to_vec();
    }

    let mut result: Vec<DataPoint> = Vec::new();
    let mut current: Option<(NaiveDate, f64)> = None;

    for dp in series {
        let bucket = granularity.bucket_end(dp.timestamp.date_naive());

        current = match current {
            Some((open, acc)) if open == bucket => Some((open, reduce(acc, dp.value, reduction))),
            Some((open, acc)) => {
                result.push(DataPoint::new(midnight_utc(open), acc));
                Some((bucket, dp.value))
            }
            None => Some((bucket, dp.value)),
        };
    }

    if let Some((open, acc)) = current {
        result.push(DataPoint::new(midnight_utc(open), acc));
    }

    result
}

fn reduce(acc: f64, value: f64, reduction: Reduction) -> f64 {
    match reduction {
        Reduction::Last => value,
        Reduction::Sum => acc + value,
    }
}

/// Union of all timestamps across several series, ascending.
pub fn union_index(series_list: &[&[DataPoint]]) -> Vec<DateTime<Utc>> {
    let mut all: BTreeSet<DateTime<Utc>> = BTreeSet::new();
    for series in series_list {
        for dp in *series {
            all.insert(dp.timestamp);
        }
    }
    all.into_iter().collect()
}

/// Aligns several series on the union of their timestamps without filling:
/// a series with no observation at a timestamp yields `None` there.
pub fn align_outer(series_list: &[&[DataPoint]]) -> Vec<(DateTime<Utc>, Vec<Option<f64>>)> {
    let index = union_index(series_list);
    let mut iters: Vec<_> = series_list.iter().map(|s| s.iter().peekable()).collect();
    let mut rows = Vec::with_capacity(index.len());

    for ts in index {
        let mut values = vec![None; iters.len()];
        for (i, iter) in iters.iter_mut().enumerate() {
            while let Some(dp) = iter.peek() {
                if dp.timestamp < ts {
                    iter.next();
                } else if dp.timestamp == ts {
                    // Duplicate timestamps: the last one wins the cell.
                    values[i] = Some(dp.value);
                    iter.next();
                } else {
                    break;
                }
            }
        }
        rows.push((ts, values));
    }

    rows
}
