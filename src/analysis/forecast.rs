//! Forecast viewer: compares actual consumption with model predictions over a
//! user-chosen datetime window. Models are opaque; they only have to produce a
//! sequence of values aligned with the test rows.

use crate::dashboard::view::{ChartKind, View, ViewPoint, ViewSeries};
use crate::error::DashboardError;
use crate::fetcher::table::{parse_date, parse_number, DecimalStyle};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub trait Forecaster: Send + Sync {
    fn name(&self) -> &str;
    /// Predictions for the first `steps` test rows (fewer if the model has fewer).
    fn predict(&self, steps: usize) -> Result<Vec<f64>>;
}

/// Maps values scaled to `[0, 1]` back to the original units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: f64,
    pub data_max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Option<Self> {
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
        Some(Self { data_min: min, data_max: max })
    }

    pub fn inverse_transform(&self, scaled: &[f64]) -> Vec<f64> {
        let range = self.data_max - self.data_min;
        scaled.iter().map(|v| v * range + self.data_min).collect()
    }
}

/// Predictions computed offline and stored next to the test data.
#[derive(Debug, Clone)]
pub struct PrecomputedForecast {
    name: String,
    values: Vec<f64>,
    scaler: Option<MinMaxScaler>,
}

impl PrecomputedForecast {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self { name: name.into(), values, scaler: None }
    }

    /// The stored values are scaled and must be mapped back with `scaler`.
    pub fn scaled(name: impl Into<String>, values: Vec<f64>, scaler: MinMaxScaler) -> Self {
        Self { name: name.into(), values, scaler: Some(scaler) }
    }
}

impl Forecaster for PrecomputedForecast {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        let take = steps.min(self.values.len());
        let raw = &self.values[..take];
        Ok(match &self.scaler {
            Some(scaler) => scaler.inverse_transform(raw),
            None => raw.to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMode {
    /// One prediction per row.
    Point,
    /// Running sum of predictions, anchored at the first actual value.
    Cumulative,
}

impl ForecastMode {
    pub fn label(&self) -> &'static str {
        match self {
            ForecastMode::Point => "Pronóstico Puntual",
            ForecastMode::Cumulative => "Pronóstico Acumulado",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub timestamp: DateTime<Utc>,
    pub actual: f64,
    pub forecast: f64,
}

/// Test rows plus the models that predict them.
pub struct ForecastFrame {
    /// Header of the actual-values column, used as the unit label.
    pub actual_column: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub actual: Vec<f64>,
    pub models: Vec<Box<dyn Forecaster>>,
}

impl ForecastFrame {
    /// Reads a CSV with a `dt` column, the actual column and one column per model.
    /// A model column listed in `scaled_models` is inverse-scaled with a scaler
    /// fitted on the actual values.
    pub fn from_csv(text: &str, actual_column: &str, scaled_models: &[&str]) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        let headers = rdr.headers()?.clone();

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow!("Forecast file has no '{}' column", name))
        };
        let dt_idx = find("dt")?;
        let actual_idx = find(actual_column)?;
        let model_idx: Vec<usize> = (0..headers.len()).filter(|i| *i != dt_idx && *i != actual_idx).collect();

        let mut timestamps = Vec::new();
        let mut actual = Vec::new();
        let mut model_values: Vec<Vec<f64>> = vec![Vec::new(); model_idx.len()];

        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let ts = record
                .get(dt_idx)
                .and_then(parse_date)
                .ok_or_else(|| anyhow!("Invalid 'dt' at record {}", line + 1))?;
            let value = record
                .get(actual_idx)
                .and_then(|c| parse_number(c, DecimalStyle::Dot))
                .ok_or_else(|| anyhow!("Invalid '{}' at record {}", actual_column, line + 1))?;

            timestamps.push(ts);
            actual.push(value);
            for (values, &i) in model_values.iter_mut().zip(&model_idx) {
                // A model may cover fewer rows than the test set; stop at the first gap
                if let Some(v) = record.get(i).and_then(|c| parse_number(c, DecimalStyle::Dot)) {
                    if values.len() == line {
                        values.push(v);
                    }
                }
            }
        }

        let scaler = MinMaxScaler::fit(&actual);
        let models = model_idx
            .iter()
            .zip(model_values)
            .map(|(&i, values)| {
                let name = headers[i].trim().to_string();
                let model: Box<dyn Forecaster> = match scaler {
                    Some(s) if scaled_models.contains(&name.as_str()) => {
                        Box::new(PrecomputedForecast::scaled(name, values, s))
                    }
                    _ => Box::new(PrecomputedForecast::new(name, values)),
                };
                model
            })
            .collect::<Vec<_>>();

        info!(
            "Loaded forecast frame: {} rows, models {:?}",
            timestamps.len(),
            models.iter().map(|m| m.name()).collect::<Vec<_>>()
        );

        Ok(Self { actual_column: actual_column.to_string(), timestamps, actual, models })
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    pub fn model(&self, name: &str) -> Option<&dyn Forecaster> {
        self.models.iter().find(|m| m.name() == name).map(|m| m.as_ref())
    }

    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((*self.timestamps.iter().min()?, *self.timestamps.iter().max()?))
    }

    /// Rows within `[start, end]` with the chosen model's predictions.
    ///
    /// Predictions are indexed by position in the full test set, so the
    /// window is translated to positions first. The result is truncated to the
    /// shortest of the three sequences.
    pub fn slice(
        &self,
        model: &dyn Forecaster,
        start: NaiveDateTime,
        end: NaiveDateTime,
        mode: ForecastMode,
    ) -> std::result::Result<Vec<ForecastRow>, DashboardError> {
        let start = start.and_utc();
        let end = end.and_utc();

        let start_pos = self.timestamps.iter().position(|ts| *ts >= start && *ts <= end);
        let end_pos = self.timestamps.iter().rposition(|ts| *ts >= start && *ts <= end);
        let (Some(start_pos), Some(end_pos)) = (start_pos, end_pos) else {
            return Err(DashboardError::NoData);
        };
        let end_pos = end_pos + 1;

        let all_preds = model.predict(self.timestamps.len())?;
        let preds_end = end_pos.min(all_preds.len());
        let mut preds: Vec<f64> = all_preds.get(start_pos..preds_end).map(<[f64]>::to_vec).unwrap_or_default();

        if mode == ForecastMode::Cumulative {
            let anchor = self.actual[start_pos];
            let mut running = 0.0;
            for p in preds.iter_mut() {
                running += *p;
                *p = running + anchor;
            }
        }

        let n = (end_pos - start_pos).min(preds.len());
        debug!("Forecast slice {}..{} -> {} rows ({})", start_pos, end_pos, n, model.name());

        Ok((0..n)
            .map(|i| ForecastRow {
                timestamp: self.timestamps[start_pos + i],
                actual: self.actual[start_pos + i],
                forecast: preds[i],
            })
            .collect())
    }
}

pub fn render(rows: &[ForecastRow], model_name: &str, mode: ForecastMode, unit: &str) -> View {
    let title = format!("{} - {}", model_name, mode.label());
    if rows.is_empty() {
        return View::empty(title, "No hay datos en el rango de fechas seleccionado");
    }

    let x = |ts: &DateTime<Utc>| ts.format("%Y-%m-%d %H:%M").to_string();
    let actual = rows.iter().map(|r| ViewPoint { x: x(&r.timestamp), y: r.actual }).collect();
    let forecast = rows.iter().map(|r| ViewPoint { x: x(&r.timestamp), y: r.forecast }).collect();

    View {
        title,
        chart: ChartKind::Line,
        x_label: "Datetime".to_string(),
        y_label: unit.to_string(),
        series: vec![ViewSeries::new("Actual", actual), ViewSeries::new("Forecast", forecast)],
        table: None,
        notice: None,
    }
}
