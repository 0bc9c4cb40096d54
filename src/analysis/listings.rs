//! Property listings: price, surface and price per m² exploration.

use crate::analysis::statistics::{self, Describe};
use crate::dashboard::view::{ChartKind, StatsTable, View, ViewPoint, ViewSeries};
use crate::models::Listing;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
}

impl PropertyType {
    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "Departamento",
            PropertyType::House => "Casa",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "departamentos.csv",
            PropertyType::House => "casas.csv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingVisual {
    Prices,
    Surface,
    PricePerM2,
    PriceVsSurface,
}

impl ListingVisual {
    pub fn label(&self) -> &'static str {
        match self {
            ListingVisual::Prices => "Precios",
            ListingVisual::Surface => "Superficie",
            ListingVisual::PricePerM2 => "Precio por m²",
            ListingVisual::PriceVsSurface => "Precios y Superficie",
        }
    }
}

/// Parses a listings CSV (`Precio_USD`, `Superficie_m2`, `habitaciones`).
pub fn parse_listings(text: &str) -> Result<Vec<Listing>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut listings = Vec::new();
    for (idx, result) in rdr.deserialize::<Listing>().enumerate() {
        let mut listing = result.map_err(|e| anyhow!("Error reading listing at line {}: {}", idx + 2, e))?;
        if listing.rooms.as_deref().map(str::trim) == Some("") {
            listing.rooms = None;
        }
        listings.push(listing);
    }

    info!("Parsed {} listings", listings.len());
    Ok(listings)
}

/// Distinct room labels in first-seen order.
pub fn subtypes(listings: &[Listing]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for l in listings {
        if let Some(r) = &l.rooms {
            if !seen.contains(r) {
                seen.push(r.clone());
            }
        }
    }
    seen
}

/// `None` keeps every listing ("Todos").
pub fn filter_subtype(listings: &[Listing], subtype: Option<&str>) -> Vec<Listing> {
    match subtype {
        None => listings.to_vec(),
        Some(label) => listings
            .iter()
            .filter(|l| l.rooms.as_deref() == Some(label))
            .cloned()
            .collect(),
    }
}

fn prices(listings: &[Listing]) -> Vec<f64> {
    listings.iter().map(|l| l.price_usd).collect()
}

fn surfaces(listings: &[Listing]) -> Vec<f64> {
    listings.iter().map(|l| l.surface_m2).collect()
}

fn prices_per_m2(listings: &[Listing]) -> Vec<f64> {
    listings.iter().filter_map(Listing::price_per_m2).collect()
}

/// Descriptive statistics for price, surface and price per m², side by side.
pub fn stats_table(listings: &[Listing]) -> StatsTable {
    let columns = vec![
        ("Precio en USD", statistics::describe(&prices(listings))),
        ("Superficie (m²)", statistics::describe(&surfaces(listings))),
        ("Precio por m² (USD/m²)", statistics::describe(&prices_per_m2(listings))),
    ];

    let rows = Describe::LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let values = columns
                .iter()
                .map(|(_, d)| d.as_ref().and_then(|d| d.rounded_row()[i]))
                .collect();
            (label.to_string(), values)
        })
        .collect();

    StatsTable {
        columns: columns.iter().map(|(name, _)| name.to_string()).collect(),
        rows,
    }
}

fn histogram_view(title: &str, x_label: &str, values: &[f64]) -> View {
    let bins = statistics::histogram(values, HISTOGRAM_BINS);
    let precision = bins.first().map_or(0, |b| edge_precision(b.upper - b.lower));
    let points = bins
        .into_iter()
        .map(|b| ViewPoint {
            x: format!("{:.*}-{:.*}", precision, b.lower, precision, b.upper),
            y: b.count as f64,
        })
        .collect();

    View {
        title: title.to_string(),
        chart: ChartKind::Histogram,
        x_label: x_label.to_string(),
        y_label: "Frecuencia".to_string(),
        series: vec![ViewSeries::new("Frecuencia", points)],
        table: None,
        notice: None,
    }
}

/// Decimals needed so consecutive bin edges `width` apart print differently.
fn edge_precision(width: f64) -> usize {
    if !(width.is_finite() && width > 0.0) {
        return 0;
    }
    (-width.log10()).ceil().clamp(0.0, 6.0) as usize
}

/// Price against surface, with an OLS line; optionally drops surface outliers first.
pub fn scatter_view(listings: &[Listing], remove_outliers: bool) -> View {
    let data = if remove_outliers {
        let kept = statistics::iqr_filter(listings, |l| l.surface_m2);
        debug!("Outlier filter kept {} of {} listings", kept.len(), listings.len());
        kept
    } else {
        listings.to_vec()
    };

    let xs = surfaces(&data);
    let ys = prices(&data);

    let scatter = ViewSeries::new(
        "Listados",
        xs.iter().zip(&ys).map(|(x, y)| ViewPoint { x: x.to_string(), y: *y }).collect(),
    );

    let mut series = vec![scatter];
    if let Some((slope, intercept)) = statistics::linear_fit(&xs, &ys) {
        let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let line = vec![
            ViewPoint { x: lo.to_string(), y: slope * lo + intercept },
            ViewPoint { x: hi.to_string(), y: slope * hi + intercept },
        ];
        let name = match statistics::pearson(&xs, &ys) {
            Some(r) => format!("Regresión (r = {:.2})", r),
            None => "Regresión".to_string(),
        };
        series.push(ViewSeries::new(name, line).with_chart(ChartKind::Line));
    }

    let suffix = if remove_outliers { " (sin outliers)" } else { "" };
    View {
        title: format!("Precio vs. Superficie{}", suffix),
        chart: ChartKind::Scatter,
        x_label: "Superficie (m²)".to_string(),
        y_label: "Precio (USD)".to_string(),
        series,
        table: None,
        notice: None,
    }
}

pub fn render(listings: &[Listing], visual: ListingVisual, remove_outliers: bool) -> View {
    if listings.is_empty() {
        return View::empty(visual.label(), "No hay propiedades para el filtro seleccionado");
    }

    let mut view = match visual {
        ListingVisual::Prices => histogram_view("Distribución de Precios (USD)", "Precio (USD)", &prices(listings)),
        ListingVisual::Surface => histogram_view("Distribución de Superficies (m²)", "Superficie (m²)", &surfaces(listings)),
        ListingVisual::PricePerM2 => histogram_view("Distribución de Precio por m²", "USD por m²", &prices_per_m2(listings)),
        ListingVisual::PriceVsSurface => scatter_view(listings, remove_outliers),
    };
    view.table = Some(stats_table(listings));
    view
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Precio_USD,Superficie_m2,habitaciones\n\
        120000,60,2 dormitorios\n\
        90000,45,1 dormitorio\n\
        150000,75,2 dormitorios\n\
        80000,40,\n\
        2000000,900,3 dormitorios\n";

    #[test]
    fn test_parse_and_subtypes() {
        let listings = parse_listings(CSV).unwrap();
        assert_eq!(listings.len(), 5);
        assert_eq!(listings[3].rooms, None);
        assert_eq!(subtypes(&listings), vec!["2 dormitorios", "1 dormitorio", "3 dormitorios"]);

        let two = filter_subtype(&listings, Some("2 dormitorios"));
        assert_eq!(two.len(), 2);
        assert_eq!(filter_subtype(&listings, None).len(), 5);
    }

    #[test]
    fn test_stats_table_shape() {
        let listings = parse_listings(CSV).unwrap();
        let table = stats_table(&listings);
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.rows.len(), 8);
        assert_eq!(table.rows[0], ("count".to_string(), vec![Some(5.0), Some(5.0), Some(5.0)]));
        // price per m²: 2000 for every listing except the outlier (2222.22)
        assert_eq!(table.rows[3].1[2], Some(2000.0));
    }

    #[test]
    fn test_scatter_outlier_removal() {
        let listings = parse_listings(CSV).unwrap();

        let with = render(&listings, ListingVisual::PriceVsSurface, true);
        assert!(with.title.ends_with("(sin outliers)"));
        assert_eq!(with.series[0].points.len(), 4);
        assert_eq!(with.series[1].chart, Some(ChartKind::Line));

        let without = render(&listings, ListingVisual::PriceVsSurface, false);
        assert_eq!(without.series[0].points.len(), 5);
    }

    #[test]
    fn test_narrow_histogram_labels_stay_distinct() {
        // price per m² spans 2000..2004, so bins are 0.2 wide
        let csv = "Precio_USD,Superficie_m2,habitaciones\n\
            100000,50,1 dormitorio\n\
            100100,50,1 dormitorio\n\
            100200,50,1 dormitorio\n";
        let listings = parse_listings(csv).unwrap();
        let view = render(&listings, ListingVisual::PricePerM2, true);

        let labels: Vec<&str> = view.series[0].points.iter().map(|p| p.x.as_str()).collect();
        assert_eq!(labels.len(), HISTOGRAM_BINS);
        assert_eq!(labels[0], "2000.0-2000.2");
        let unique: std::collections::HashSet<&str> = labels.iter().copied().collect();
        assert_eq!(unique.len(), labels.len());
    }

    #[test]
    fn test_edge_precision() {
        assert_eq!(edge_precision(11.1), 0);
        assert_eq!(edge_precision(0.2), 1);
        assert_eq!(edge_precision(0.05), 2);
        assert_eq!(edge_precision(0.0), 0);
    }

    #[test]
    fn test_empty_listings_notice() {
        let view = render(&[], ListingVisual::Prices, true);
        assert!(view.notice.is_some());
        assert!(view.is_empty());
    }
}
