//! Explicit application state. Every widget interaction becomes an [`Action`];
//! [`update`] validates it against the indicator registry and [`render`] turns
//! the resulting state into a [`View`] without side effects.

use crate::analysis::forecast::{self, ForecastFrame, ForecastMode};
use crate::analysis::listings::{self, ListingVisual, PropertyType};
use crate::core::pipeline::{self, PipelineRequest, TransformChoice};
use crate::core::timeseries::Granularity;
use crate::dashboard::view::{ChartKind, View, ViewPoint, ViewSeries};
use crate::error::{DashboardError, Result};
use crate::indicators::registry::{IndicatorMetadata, Registry};
use crate::models::{DataPoint, Dataset, Listing};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::debug;

pub const NO_DATA_NOTICE: &str = "No hay datos para el rango seleccionado";

/// Which dashboard is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Series,
    Listings,
    Forecast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub page: Page,
    pub indicator: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub granularity: Granularity,
    pub transform: TransformChoice,
    /// Column of a multi-column dataset; `None` means the first one.
    pub column: Option<String>,
    pub remove_outliers: bool,
    pub property: PropertyType,
    pub subtype: Option<String>,
    pub visual: ListingVisual,
    pub forecast_model: Option<String>,
    pub forecast_mode: ForecastMode,
    pub forecast_start: Option<NaiveDateTime>,
    pub forecast_end: Option<NaiveDateTime>,
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            page: Page::Series,
            indicator: None,
            start: None,
            end: None,
            granularity: Granularity::Daily,
            transform: TransformChoice::Levels,
            column: None,
            remove_outliers: true,
            property: PropertyType::Apartment,
            subtype: None,
            visual: ListingVisual::Prices,
            forecast_model: None,
            forecast_mode: ForecastMode::Point,
            forecast_start: None,
            forecast_end: None,
        }
    }
}

#[derive(Default)]
pub struct AppState {
    pub selection: Selection,
    pub dataset: Option<Arc<Dataset>>,
    pub listings: Arc<Vec<Listing>>,
    pub forecast: Option<ForecastFrame>,
}

pub enum Action {
    /// A freshly loaded (or cached) dataset for `slug`.
    SelectIndicator { slug: String, dataset: Arc<Dataset> },
    SetRange { start: NaiveDate, end: NaiveDate },
    SetGranularity(Granularity),
    SetTransform(TransformChoice),
    SelectColumn(String),
    SetRemoveOutliers(bool),
    SelectProperty { property: PropertyType, listings: Arc<Vec<Listing>> },
    /// `None` shows every subtype.
    SelectSubtype(Option<String>),
    SelectVisual(ListingVisual),
    LoadForecast(ForecastFrame),
    SelectModel(String),
    SetForecastMode(ForecastMode),
    SetForecastRange { start: NaiveDateTime, end: NaiveDateTime },
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> Option<&'static IndicatorMetadata> {
        self.selection.indicator.as_deref().and_then(Registry::get_metadata)
    }

    fn require_metadata(&self) -> Result<&'static IndicatorMetadata> {
        self.metadata().ok_or(DashboardError::NoData)
    }

    /// Name of the column the series views read from.
    pub fn active_column(&self) -> Option<String> {
        let dataset = self.dataset.as_ref()?;
        match &self.selection.column {
            Some(name) => Some(name.clone()),
            None => dataset.columns.first().map(|c| c.name.clone()),
        }
    }
}

pub fn update(state: &mut AppState, action: Action) -> Result<()> {
    match action {
        Action::SelectIndicator { slug, dataset } => {
            let meta = Registry::get_metadata(&slug).ok_or_else(|| DashboardError::UnknownIndicator(slug.clone()))?;
            let bounds = dataset.bounds().map(|(first, last)| (first.date_naive(), last.date_naive()));

            let sel = &mut state.selection;
            sel.page = Page::Series;
            sel.indicator = Some(slug);
            sel.granularity = meta.default_granularity();
            sel.transform = TransformChoice::Levels;
            sel.column = None;
            sel.start = bounds.map(|(s, _)| s);
            sel.end = bounds.map(|(_, e)| e);
            state.dataset = Some(dataset);
        }
        Action::SetRange { start, end } => {
            if start > end {
                return Err(DashboardError::InvalidRange { start, end });
            }
            state.selection.start = Some(start);
            state.selection.end = Some(end);
        }
        Action::SetGranularity(granularity) => {
            let meta = state.require_metadata()?;
            if !meta.allows_granularity(granularity) {
                return Err(DashboardError::unsupported(granularity.label(), &meta.name));
            }
            state.selection.granularity = granularity;

            // A lookback that only made sense at the old frequency falls back to levels
            if state.selection.transform.resolve(meta.frequency.after(granularity)).is_none() {
                debug!("{} is undefined at {}, reverting to levels", state.selection.transform.label(), granularity.label());
                state.selection.transform = TransformChoice::Levels;
            }
        }
        Action::SetTransform(choice) => {
            let meta = state.require_metadata()?;
            let effective = meta.frequency.after(state.selection.granularity);
            if !meta.allows_transform(choice) || choice.resolve(effective).is_none() {
                return Err(DashboardError::unsupported(choice.label(), &meta.name));
            }
            state.selection.transform = choice;
        }
        Action::SelectColumn(name) => {
            let dataset = state.dataset.as_ref().ok_or(DashboardError::NoData)?;
            if dataset.column(&name).is_none() {
                let context = state.metadata().map(|m| m.name.clone()).unwrap_or_default();
                return Err(DashboardError::unsupported(name, context));
            }
            state.selection.column = Some(name);
        }
        Action::SetRemoveOutliers(on) => state.selection.remove_outliers = on,
        Action::SelectProperty { property, listings } => {
            state.selection.page = Page::Listings;
            state.selection.property = property;
            state.selection.subtype = None;
            state.listings = listings;
        }
        Action::SelectSubtype(subtype) => {
            if let Some(label) = &subtype {
                if !listings::subtypes(&state.listings).contains(label) {
                    return Err(DashboardError::unsupported(label, state.selection.property.label()));
                }
            }
            state.selection.page = Page::Listings;
            state.selection.subtype = subtype;
        }
        Action::SelectVisual(visual) => {
            state.selection.page = Page::Listings;
            state.selection.visual = visual;
        }
        Action::LoadForecast(frame) => {
            let sel = &mut state.selection;
            sel.page = Page::Forecast;
            sel.forecast_model = frame.model_names().first().map(|n| n.to_string());
            let bounds = frame.bounds();
            sel.forecast_start = bounds.map(|(s, _)| s.naive_utc());
            sel.forecast_end = bounds.map(|(_, e)| e.naive_utc());
            state.forecast = Some(frame);
        }
        Action::SelectModel(name) => {
            let frame = state.forecast.as_ref().ok_or(DashboardError::NoData)?;
            if frame.model(&name).is_none() {
                return Err(DashboardError::unsupported(name, "forecast"));
            }
            state.selection.forecast_model = Some(name);
        }
        Action::SetForecastMode(mode) => state.selection.forecast_mode = mode,
        Action::SetForecastRange { start, end } => {
            if start > end {
                return Err(DashboardError::InvalidRange { start: start.date(), end: end.date() });
            }
            state.selection.forecast_start = Some(start);
            state.selection.forecast_end = Some(end);
        }
    }
    Ok(())
}

/// Post-pipeline series for the current indicator selection, with its column name.
pub fn current_series(state: &AppState) -> Result<(String, Vec<DataPoint>)> {
    let meta = state.require_metadata()?;
    let dataset = state.dataset.as_ref().ok_or(DashboardError::NoData)?;
    let column = state.active_column().ok_or(DashboardError::NoData)?;
    let series = dataset
        .series(&column)
        .ok_or_else(|| DashboardError::unsupported(&column, &meta.name))?;

    let sel = &state.selection;
    let (Some(start), Some(end)) = (sel.start, sel.end) else {
        return Ok((column, Vec::new()));
    };

    let effective = meta.frequency.after(sel.granularity);
    let transform = sel
        .transform
        .resolve(effective)
        .ok_or_else(|| DashboardError::unsupported(sel.transform.label(), &meta.name))?;

    let request = PipelineRequest {
        start,
        end,
        granularity: sel.granularity,
        reduction: meta.kind.reduction(),
        transform,
    };
    Ok((column, pipeline::run(&series, &request)))
}

pub fn render(state: &AppState) -> View {
    match state.selection.page {
        Page::Series => render_series(state),
        Page::Listings => render_listings(state),
        Page::Forecast => render_forecast(state),
    }
}

fn render_series(state: &AppState) -> View {
    let Some(meta) = state.metadata() else {
        return View::empty("Indicadores", "Seleccione un indicador");
    };

    let sel = &state.selection;
    let mut title = meta.name.clone();
    if meta.multi_column {
        if let Some(column) = state.active_column() {
            title = format!("{} - {}", title, column);
        }
    }
    if sel.transform != TransformChoice::Levels {
        title = format!("{} ({})", title, sel.transform.label());
    }

    let (column, points) = match current_series(state) {
        Ok(result) => result,
        Err(e) => return View::empty(title, e.to_string()),
    };
    if points.is_empty() {
        return View::empty(title, NO_DATA_NOTICE);
    }

    let is_change = sel
        .transform
        .resolve(meta.frequency.after(sel.granularity))
        .is_some_and(|t| t.is_change());
    let chart = if is_change { ChartKind::Bar } else { meta.chart };
    let x_format = if chart == ChartKind::Bar { "%b %Y" } else { "%Y-%m-%d" };

    let view_points = points
        .iter()
        .map(|dp| ViewPoint { x: dp.timestamp.format(x_format).to_string(), y: dp.value })
        .collect();

    View {
        title,
        chart,
        x_label: "Fecha".to_string(),
        y_label: if is_change { "%".to_string() } else { meta.unit.clone() },
        series: vec![ViewSeries::new(column, view_points)],
        table: None,
        notice: None,
    }
}

fn render_listings(state: &AppState) -> View {
    let sel = &state.selection;
    let filtered = listings::filter_subtype(&state.listings, sel.subtype.as_deref());
    let mut view = listings::render(&filtered, sel.visual, sel.remove_outliers);
    view.title = format!("{} - {}", sel.property.label(), view.title);
    view
}

fn render_forecast(state: &AppState) -> View {
    let sel = &state.selection;
    let Some(frame) = &state.forecast else {
        return View::empty("Pronóstico", "No hay un pronóstico cargado");
    };
    let Some(model) = sel.forecast_model.as_deref().and_then(|name| frame.model(name)) else {
        return View::empty("Pronóstico", "Seleccione un modelo");
    };
    let rows = match (sel.forecast_start, sel.forecast_end) {
        (Some(start), Some(end)) => frame.slice(model, start, end, sel.forecast_mode).unwrap_or_default(),
        _ => Vec::new(),
    };
    forecast::render(&rows, model.name(), sel.forecast_mode, &frame.actual_column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;
    use chrono::{TimeZone, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn reserves() -> Arc<Dataset> {
        let points = (1..=31)
            .map(|day| DataPoint::new(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(), 20_000.0 + day as f64))
            .collect();
        Arc::new(Dataset::from_points("valor", points))
    }

    fn ipc() -> Arc<Dataset> {
        let index: Vec<_> = (1..=12).map(|m| Utc.with_ymd_and_hms(2023, m, 1, 0, 0, 0).unwrap()).collect();
        Arc::new(Dataset {
            index,
            columns: vec![
                Column { name: "General".to_string(), values: (1..=12).map(|v| Some(100.0 + v as f64)).collect() },
                Column { name: "Alimentos".to_string(), values: (1..=12).map(|v| Some(200.0 + v as f64)).collect() },
            ],
        })
    }

    fn trade_balance() -> Arc<Dataset> {
        // Two quarters of month-end flows
        let points = [(1, 31, 100.0), (2, 28, -40.0), (3, 31, 25.0), (4, 30, 10.0), (5, 31, 20.0), (6, 30, 30.0)]
            .into_iter()
            .map(|(m, day, v)| DataPoint::new(Utc.with_ymd_and_hms(2023, m, day, 0, 0, 0).unwrap(), v))
            .collect();
        Arc::new(Dataset::from_points("Balanza Comercial", points))
    }

    fn with_indicator(slug: &str, dataset: Arc<Dataset>) -> AppState {
        let mut state = AppState::new();
        update(&mut state, Action::SelectIndicator { slug: slug.to_string(), dataset }).unwrap();
        state
    }

    #[test]
    fn test_select_indicator_resets_range() {
        let mut state = with_indicator("reservas", reserves());
        update(&mut state, Action::SetRange { start: d(2024, 1, 10), end: d(2024, 1, 12) }).unwrap();

        update(&mut state, Action::SelectIndicator { slug: "base_monetaria".to_string(), dataset: reserves() }).unwrap();
        assert_eq!(state.selection.start, Some(d(2024, 1, 1)));
        assert_eq!(state.selection.end, Some(d(2024, 1, 31)));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let mut state = with_indicator("reservas", reserves());
        let err = update(&mut state, Action::SetRange { start: d(2024, 2, 1), end: d(2024, 1, 1) });
        assert!(matches!(err, Err(DashboardError::InvalidRange { .. })));
        assert_eq!(state.selection.start, Some(d(2024, 1, 1)));
    }

    #[test]
    fn test_unknown_indicator_is_rejected() {
        let mut state = AppState::new();
        let err = update(&mut state, Action::SelectIndicator { slug: "nope".to_string(), dataset: reserves() });
        assert!(matches!(err, Err(DashboardError::UnknownIndicator(_))));
    }

    #[test]
    fn test_options_validated_against_registry() {
        let mut state = with_indicator("reservas", reserves());
        assert!(update(&mut state, Action::SetGranularity(Granularity::Weekly)).is_ok());
        assert!(matches!(
            update(&mut state, Action::SetTransform(TransformChoice::Yoy)),
            Err(DashboardError::UnsupportedOption { .. })
        ));

        let mut ipc_state = with_indicator("ipc_py", ipc());
        assert!(update(&mut ipc_state, Action::SetGranularity(Granularity::Weekly)).is_err());
        assert!(update(&mut ipc_state, Action::SetTransform(TransformChoice::Mom)).is_ok());
        assert!(update(&mut ipc_state, Action::SelectColumn("Alimentos".to_string())).is_ok());
        assert!(update(&mut ipc_state, Action::SelectColumn("Vivienda".to_string())).is_err());
    }

    #[test]
    fn test_render_weekly_levels() {
        let mut state = with_indicator("reservas", reserves());
        update(&mut state, Action::SetGranularity(Granularity::Weekly)).unwrap();

        let view = render(&state);
        assert_eq!(view.chart, ChartKind::Line);
        // 2024-01-01 is a Monday: weeks end 7, 14, 21, 28 and a partial one ending Feb 4
        let points = &view.series[0].points;
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].x, "2024-01-07");
        assert_eq!(points[0].y, 20_007.0);
        assert_eq!(points[4].x, "2024-02-04");
        assert_eq!(points[4].y, 20_031.0);
    }

    #[test]
    fn test_render_change_as_bars() {
        let mut state = with_indicator("ipc_py", ipc());
        update(&mut state, Action::SelectColumn("Alimentos".to_string())).unwrap();
        update(&mut state, Action::SetTransform(TransformChoice::Mom)).unwrap();

        let view = render(&state);
        assert_eq!(view.chart, ChartKind::Bar);
        assert_eq!(view.y_label, "%");
        assert_eq!(view.title, "Inflación - Alimentos (Variación Mensual)");
        assert_eq!(view.series[0].points.len(), 11);
        assert_eq!(view.series[0].points[0].x, "Feb 2023");
    }

    #[test]
    fn test_render_empty_range_notice() {
        let mut state = with_indicator("reservas", reserves());
        update(&mut state, Action::SetRange { start: d(2030, 1, 1), end: d(2030, 12, 31) }).unwrap();

        let view = render(&state);
        assert!(view.series.is_empty());
        assert_eq!(view.notice.as_deref(), Some(NO_DATA_NOTICE));
    }

    #[test]
    fn test_flow_indicator_sums_each_quarter() {
        let mut state = with_indicator("balanza_comercial", trade_balance());
        update(&mut state, Action::SetGranularity(Granularity::Quarterly)).unwrap();

        let (_, points) = current_series(&state).unwrap();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![85.0, 60.0]);
        assert_eq!(points[0].timestamp, Utc.with_ymd_and_hms(2023, 3, 31, 0, 0, 0).unwrap());

        let view = render(&state);
        assert_eq!(view.chart, ChartKind::Line);
        assert_eq!(view.series[0].points.len(), 2);
        assert_eq!(view.series[0].points[0].y, 85.0);
    }

    #[test]
    fn test_listings_subtype_validation() {
        let listings = Arc::new(
            listings::parse_listings("Precio_USD,Superficie_m2,habitaciones\n100000,50,1 dormitorio\n").unwrap(),
        );
        let mut state = AppState::new();
        update(&mut state, Action::SelectProperty { property: PropertyType::Apartment, listings }).unwrap();

        assert!(update(&mut state, Action::SelectSubtype(Some("4 dormitorios".to_string()))).is_err());
        update(&mut state, Action::SelectSubtype(Some("1 dormitorio".to_string()))).unwrap();

        let view = render(&state);
        assert!(view.title.starts_with("Departamento"));
        assert!(view.table.is_some());
    }
}
