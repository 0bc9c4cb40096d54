use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use crate::core::pipeline::TransformChoice;
use crate::core::timeseries::{Frequency, Granularity, SeriesKind};
use crate::dashboard::view::ChartKind;
use crate::fetcher::table::{DecimalStyle, TableSpec};

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SourceType {
    /// BCRA monetary statistics API, by numeric variable id
    Bcra { variable_id: u32 },
    /// CSV export of a published spreadsheet
    Table(TableSpec),
}

impl SourceType {
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Bcra { .. } => "BCRA",
            SourceType::Table(_) => "Table",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Country {
    Argentina,
    Paraguay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Monetary,   // Reservas, base monetaria
    Prices,     // Inflación
    Social,     // Pobreza
    External,   // Balanza comercial
    Activity,   // IMAEP
}

// ============================================================================
// METADATA STRUCT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorMetadata {
    pub slug: String,
    pub name: String,
    pub country: Country,
    pub category: Category,
    pub source: SourceType,
    /// Stock or flow; decides the resampling reduction.
    pub kind: SeriesKind,
    pub frequency: Frequency,
    pub unit: String,
    pub granularities: Vec<Granularity>,
    pub transforms: Vec<TransformChoice>,
    /// Chart used for levels. Percent changes are always drawn as bars.
    pub chart: ChartKind,
    /// True when the user picks one of several columns (categories).
    pub multi_column: bool,
}

impl IndicatorMetadata {
    pub fn allows_granularity(&self, granularity: Granularity) -> bool {
        self.granularities.contains(&granularity)
    }

    pub fn allows_transform(&self, choice: TransformChoice) -> bool {
        self.transforms.contains(&choice)
    }

    /// First offered granularity; the dashboards default to the finest one.
    /// Sources offering only `Daily` are shown as loaded, without a selector.
    pub fn default_granularity(&self) -> Granularity {
        self.granularities.first().copied().unwrap_or(Granularity::Daily)
    }

    /// Cache/fetch parameter that identifies this series at its source.
    pub fn source_params(&self) -> String {
        match &self.source {
            SourceType::Bcra { variable_id } => variable_id.to_string(),
            SourceType::Table(spec) => spec.file.clone(),
        }
    }
}

// Helper macro to reduce boilerplate
macro_rules! ind {
    ($slug:expr, $name:expr, $country:expr, $cat:expr, $source:expr, $kind:expr, $freq:expr, $unit:expr, $grans:expr, $transforms:expr, $chart:expr, $multi:expr) => {
        IndicatorMetadata {
            slug: $slug.to_string(),
            name: $name.to_string(),
            country: $country,
            category: $cat,
            source: $source,
            kind: $kind,
            frequency: $freq,
            unit: $unit.to_string(),
            granularities: $grans.to_vec(),
            transforms: $transforms.to_vec(),
            chart: $chart,
            multi_column: $multi,
        }
    };
}

use Granularity::*;
use TransformChoice as T;

const ALL_GRANULARITIES: [Granularity; 5] = [Daily, Weekly, Monthly, Quarterly, Yearly];
const MONTHLY_GRANULARITIES: [Granularity; 3] = [Monthly, Quarterly, Yearly];

// ============================================================================
// STATIC INDICATOR REGISTRY (Lazy initialization, O(1) lookup)
// ============================================================================

static INDICATORS: Lazy<Vec<IndicatorMetadata>> = Lazy::new(|| {
    vec![
        // =====================================================================
        // ARGENTINA - BCRA monetary series (stocks, daily)
        // =====================================================================
        ind!("reservas", "Reservas Internacionales (USD mn)", Country::Argentina, Category::Monetary,
            SourceType::Bcra { variable_id: 1 }, SeriesKind::Stock, Frequency::Daily, "USD mn",
            ALL_GRANULARITIES, [T::Levels, T::Change], ChartKind::Line, false),
        ind!("base_monetaria", "Base Monetaria (ARS mn)", Country::Argentina, Category::Monetary,
            SourceType::Bcra { variable_id: 15 }, SeriesKind::Stock, Frequency::Daily, "ARS mn",
            ALL_GRANULARITIES, [T::Levels, T::Change], ChartKind::Line, false),

        // =====================================================================
        // ARGENTINA - INDEC / Economía spreadsheets
        // =====================================================================
        ind!("inflacion", "Inflación Mensual (%)", Country::Argentina, Category::Prices,
            SourceType::Table(TableSpec::dated("inflacion_mensual.csv", "fecha").with_columns(&["Inflación Mensual (%)"])),
            SeriesKind::Stock, Frequency::Monthly, "%",
            [Daily], [T::Levels], ChartKind::Bar, false),
        ind!("pobreza", "Pobreza Hogares (%)", Country::Argentina, Category::Social,
            SourceType::Table(TableSpec::generated(
                "pobreza_hogares.csv",
                chrono::NaiveDate::from_ymd_opt(2016, 12, 1).unwrap_or_default(),
                6,
            ).with_columns(&["Hogares"])),
            SeriesKind::Stock, Frequency::Semiannual, "%",
            [Daily], [T::Levels], ChartKind::Bar, false),
        ind!("balanza_comercial", "Balanza Comercial (USD mn)", Country::Argentina, Category::External,
            SourceType::Table(TableSpec::dated("balanza_comercial.csv", "fecha").with_columns(&["Balanza Comercial"])),
            SeriesKind::Flow, Frequency::Monthly, "USD mn",
            MONTHLY_GRANULARITIES, [T::Levels, T::Change], ChartKind::Line, false),

        // =====================================================================
        // PARAGUAY - BCP statistical annex
        // =====================================================================
        ind!("imaep", "IMAEP", Country::Paraguay, Category::Activity,
            SourceType::Table(TableSpec::dated("imaep.csv", "Fecha").with_decimal(DecimalStyle::Comma)),
            SeriesKind::Stock, Frequency::Monthly, "Índice",
            [Daily], [T::Levels, T::Yoy, T::Mom], ChartKind::Line, true),
        ind!("ipc_py", "Inflación", Country::Paraguay, Category::Prices,
            SourceType::Table(TableSpec::dated("ipc_py.csv", "Fecha").with_decimal(DecimalStyle::Comma)),
            SeriesKind::Stock, Frequency::Monthly, "Índice",
            [Daily], [T::Levels, T::Yoy, T::Mom], ChartKind::Line, true),
    ]
});

static INDICATOR_MAP: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    INDICATORS
        .iter()
        .enumerate()
        .map(|(i, meta)| (meta.slug.clone(), i))
        .collect()
});

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub bcra: usize,
    pub table: usize,
    pub stocks: usize,
    pub flows: usize,
}

pub struct Registry;

impl Registry {
    pub fn get_metadata(slug: &str) -> Option<&'static IndicatorMetadata> {
        INDICATOR_MAP.get(slug).map(|&i| &INDICATORS[i])
    }

    pub fn get_all_indicators() -> &'static [IndicatorMetadata] {
        &INDICATORS
    }

    pub fn by_country(country: Country) -> Vec<&'static IndicatorMetadata> {
        INDICATORS.iter().filter(|m| m.country == country).collect()
    }

    pub fn get_stats() -> RegistryStats {
        let count = |pred: &dyn Fn(&IndicatorMetadata) -> bool| INDICATORS.iter().filter(|m| pred(m)).count();

        RegistryStats {
            total: INDICATORS.len(),
            bcra: count(&|m| matches!(m.source, SourceType::Bcra { .. })),
            table: count(&|m| matches!(m.source, SourceType::Table(_))),
            stocks: count(&|m| m.kind == SeriesKind::Stock),
            flows: count(&|m| m.kind == SeriesKind::Flow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_slug() {
        let meta = Registry::get_metadata("base_monetaria").unwrap();
        assert_eq!(meta.source, SourceType::Bcra { variable_id: 15 });
        assert_eq!(meta.source_params(), "15");
        assert!(Registry::get_metadata("unknown").is_none());
    }

    #[test]
    fn test_trade_balance_is_a_flow() {
        let meta = Registry::get_metadata("balanza_comercial").unwrap();
        assert_eq!(meta.kind, SeriesKind::Flow);
        assert!(!meta.allows_granularity(Granularity::Weekly));
        assert!(meta.allows_granularity(Granularity::Quarterly));
    }

    #[test]
    fn test_stats_add_up() {
        let stats = Registry::get_stats();
        assert_eq!(stats.total, stats.bcra + stats.table);
        assert_eq!(stats.total, stats.stocks + stats.flows);
        assert_eq!(stats.flows, 1);
    }
}
