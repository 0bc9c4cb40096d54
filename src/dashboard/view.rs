//! Front-end agnostic description of what to draw.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Histogram,
    Scatter,
}

/// One x/y point. `x` is already formatted for display (date label or number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPoint {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSeries {
    pub name: String,
    /// Overrides the view's chart for this series (e.g. a regression line over a scatter).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartKind>,
    pub points: Vec<ViewPoint>,
}

impl ViewSeries {
    pub fn new(name: impl Into<String>, points: Vec<ViewPoint>) -> Self {
        Self { name: name.into(), chart: None, points }
    }

    pub fn with_chart(mut self, chart: ChartKind) -> Self {
        self.chart = Some(chart);
        self
    }
}

/// Small label/value table shown next to a chart (descriptive statistics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsTable {
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub title: String,
    pub chart: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<ViewSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<StatsTable>,
    /// Message shown instead of (or above) the chart, e.g. an empty selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl View {
    pub fn empty(title: impl Into<String>, notice: impl Into<String>) -> Self {
        View {
            title: title.into(),
            chart: ChartKind::Line,
            x_label: String::new(),
            y_label: String::new(),
            series: Vec::new(),
            table: None,
            notice: Some(notice.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}
