//! Filter → resample → transform, the one computation every dashboard shares.
//!
//! Each step takes a slice and returns a fresh vector, so the cached load a
//! series came from is never touched. The pipeline does not fail: an empty
//! selection simply produces an empty series, and the caller decides how to
//! present "no data".

use crate::core::timeseries::{filter_range, resample, Frequency, Granularity, Reduction};
use crate::models::DataPoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Concrete value transform applied after resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transform {
    Levels,
    /// `(v[i] - v[i-periods]) / v[i-periods] * 100`
    PercentChange { periods: usize },
}

impl Transform {
    pub fn is_change(&self) -> bool {
        matches!(self, Transform::PercentChange { periods } if *periods > 0)
    }
}

/// Transform as offered to the user. Resolves to a [`Transform`] once the
/// effective frequency of the series is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformChoice {
    Levels,
    /// Year over year.
    Yoy,
    /// Month over month; only meaningful on monthly data.
    Mom,
    /// Generic one-period change.
    Change,
}

impl TransformChoice {
    pub fn label(&self) -> &'static str {
        match self {
            TransformChoice::Levels => "Niveles",
            TransformChoice::Yoy => "Variación Interanual",
            TransformChoice::Mom => "Variación Mensual",
            TransformChoice::Change => "Cambio Porcentual",
        }
    }

    pub fn resolve(&self, effective: Frequency) -> Option<Transform> {
        match self {
            TransformChoice::Levels => Some(Transform::Levels),
            TransformChoice::Change => Some(Transform::PercentChange { periods: 1 }),
            TransformChoice::Yoy => effective
                .periods_per_year()
                .map(|periods| Transform::PercentChange { periods }),
            TransformChoice::Mom => match effective {
                Frequency::Monthly => Some(Transform::PercentChange { periods: 1 }),
                _ => None,
            },
        }
    }
}

/// Everything the pipeline needs besides the series itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
    pub reduction: Reduction,
    pub transform: Transform,
}

/// Runs the full pipeline on an ascending series.
pub fn run(series: &[DataPoint], request: &PipelineRequest) -> Vec<DataPoint> {
    let filtered = filter_range(series, request.start, request.end);
    let resampled = resample(&filtered, request.granularity, request.reduction);
    let output = apply(&resampled, request.transform);

    debug!(
        "Pipeline: {} -> {} filtered -> {} resampled ({:?}) -> {} out",
        series.len(),
        filtered.len(),
        resampled.len(),
        request.granularity,
        output.len()
    );

    output
}

pub fn apply(series: &[DataPoint], transform: Transform) -> Vec<DataPoint> {
    match transform {
        Transform::Levels | Transform::PercentChange { periods: 0 } => series.to_vec(),
        Transform::PercentChange { periods } => percent_change(series, periods),
    }
}

/// Positional percent change with lookback `periods`.
///
/// The first `periods` points have no baseline and are dropped. Points whose
/// baseline is zero (or whose result is not finite) are dropped as well rather
/// than charted as infinities.
pub fn percent_change(series: &[DataPoint], periods: usize) -> Vec<DataPoint> {
    if periods == 0 || series.len() <= periods {
        return Vec::new();
    }

    let mut undefined = 0usize;
    let result: Vec<DataPoint> = series
        .iter()
        .skip(periods)
        .zip(series.iter())
        .filter_map(|(current, base)| {
            let change = (current.value - base.value) / base.value * 100.0;
            if base.value == 0.0 || !change.is_finite() {
                undefined += 1;
                None
            } else {
                Some(DataPoint::new(current.timestamp, change))
            }
        })
        .collect();

    if undefined > 0 {
        warn!("Percent change: dropped {} point(s) with a zero or undefined baseline", undefined);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dp(date: &str, value: f64) -> DataPoint {
        DataPoint::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc(),
            value,
        )
    }

    fn d(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_percent_change_one_period() {
        let s = vec![dp("2023-01-01", 100.0), dp("2023-02-01", 110.0), dp("2023-03-01", 90.0)];
        let pc = percent_change(&s, 1);

        assert_eq!(pc.len(), 2);
        assert_eq!(pc[0].timestamp, s[1].timestamp);
        assert!((pc[0].value - 10.0).abs() < 1e-9);
        assert!((pc[1].value - (-18.181818181818183)).abs() < 1e-9);
    }

    #[test]
    fn test_percent_change_short_series_is_empty() {
        assert!(percent_change(&[dp("2023-01-01", 100.0)], 1).is_empty());
        assert!(percent_change(&[], 12).is_empty());
    }

    #[test]
    fn test_percent_change_drops_zero_baseline() {
        let s = vec![dp("2023-01-01", 0.0), dp("2023-02-01", 5.0), dp("2023-03-01", 10.0)];
        let pc = percent_change(&s, 1);

        assert_eq!(pc.len(), 1);
        assert_eq!(pc[0].timestamp, s[2].timestamp);
        assert!((pc[0].value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_choices() {
        assert_eq!(
            TransformChoice::Yoy.resolve(Frequency::Monthly),
            Some(Transform::PercentChange { periods: 12 })
        );
        assert_eq!(
            TransformChoice::Mom.resolve(Frequency::Monthly),
            Some(Transform::PercentChange { periods: 1 })
        );
        assert_eq!(TransformChoice::Mom.resolve(Frequency::Quarterly), None);
        assert_eq!(TransformChoice::Yoy.resolve(Frequency::Daily), None);
    }

    #[test]
    fn test_run_full_pipeline() {
        let s = vec![
            dp("2022-12-31", 50.0),
            dp("2023-01-31", 100.0),
            dp("2023-02-28", 105.0),
            dp("2023-03-31", 110.0),
            dp("2023-04-30", 90.0),
        ];
        let request = PipelineRequest {
            start: d("2023-01-01"),
            end: d("2023-12-31"),
            granularity: Granularity::Quarterly,
            reduction: Reduction::Last,
            transform: Transform::PercentChange { periods: 1 },
        };

        let out = run(&s, &request);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timestamp, dp("2023-06-30", 0.0).timestamp);
        assert!((out[0].value - (90.0 - 110.0) / 110.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_empty_selection() {
        let s = vec![dp("2023-01-31", 100.0)];
        let request = PipelineRequest {
            start: d("2030-01-01"),
            end: d("2030-12-31"),
            granularity: Granularity::Monthly,
            reduction: Reduction::Sum,
            transform: Transform::Levels,
        };
        assert!(run(&s, &request).is_empty());
    }
}
