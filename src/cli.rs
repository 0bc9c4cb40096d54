//! Command-line front end for the dashboards.

use crate::analysis::forecast::ForecastMode;
use crate::analysis::listings::{ListingVisual, PropertyType};
use crate::config::AppConfig;
use crate::core::orchestrator::{self, Orchestrator};
use crate::core::pipeline::TransformChoice;
use crate::core::timeseries::Granularity;
use crate::dashboard::state::{self, render, update, Action, AppState};
use crate::dashboard::view::View;
use crate::export::{self, ExportColumn};
use crate::indicators::registry::{Country, Registry};

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Econ Dashboards - macro and real-estate dashboards for Paraguay and Argentina.
#[derive(Parser)]
#[command(name = "econ-dashboards")]
#[command(version)]
#[command(about = "Macro and real-estate dashboards for Paraguay and Argentina")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level (RUST_LOG overrides it)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the available indicators
    Indicators {
        /// Only indicators of this country
        #[arg(short, long, value_enum)]
        country: Option<CountryArg>,
    },

    /// Load an indicator and run it through the transform pipeline
    Series {
        /// Indicator slug (see `indicators`)
        slug: String,

        /// First date, inclusive (YYYY-MM-DD). Defaults to the first observation
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date, inclusive (YYYY-MM-DD). Defaults to the last observation
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Resampling granularity
        #[arg(short, long, value_enum)]
        granularity: Option<GranularityArg>,

        /// Value transform
        #[arg(short, long, value_enum, default_value = "levels")]
        transform: TransformArg,

        /// Column of a multi-column indicator
        #[arg(long)]
        column: Option<String>,

        /// Also write the resulting table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Explore property listings
    Listings {
        /// Property type
        #[arg(value_enum)]
        property: PropertyArg,

        /// Room subtype label, e.g. "2 dormitorios"
        #[arg(short, long)]
        subtype: Option<String>,

        /// What to show
        #[arg(long, value_enum, default_value = "prices")]
        visual: VisualArg,

        /// Keep surface outliers in the price vs. surface chart
        #[arg(long)]
        keep_outliers: bool,
    },

    /// Compare model forecasts against actual values
    Forecast {
        /// CSV with a `dt` column, the actual column and one column per model
        file: PathBuf,

        /// Header of the actual-values column
        #[arg(long, default_value = "Global_active_power")]
        actual: String,

        /// Model columns stored in min-max scaled units
        #[arg(long, value_delimiter = ',', default_value = "LSTM")]
        scaled: Vec<String>,

        /// Model to show. Defaults to the first one in the file
        #[arg(short, long)]
        model: Option<String>,

        /// Point or cumulative forecast
        #[arg(long, value_enum, default_value = "point")]
        mode: ModeArg,

        /// Window start (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        start: Option<NaiveDateTime>,

        /// Window end (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        end: Option<NaiveDateTime>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CountryArg {
    Argentina,
    Paraguay,
}

impl From<CountryArg> for Country {
    fn from(arg: CountryArg) -> Self {
        match arg {
            CountryArg::Argentina => Country::Argentina,
            CountryArg::Paraguay => Country::Paraguay,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum GranularityArg {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Daily => Granularity::Daily,
            GranularityArg::Weekly => Granularity::Weekly,
            GranularityArg::Monthly => Granularity::Monthly,
            GranularityArg::Quarterly => Granularity::Quarterly,
            GranularityArg::Yearly => Granularity::Yearly,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum TransformArg {
    Levels,
    Yoy,
    Mom,
    Change,
}

impl From<TransformArg> for TransformChoice {
    fn from(arg: TransformArg) -> Self {
        match arg {
            TransformArg::Levels => TransformChoice::Levels,
            TransformArg::Yoy => TransformChoice::Yoy,
            TransformArg::Mom => TransformChoice::Mom,
            TransformArg::Change => TransformChoice::Change,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PropertyArg {
    Apartment,
    House,
}

impl From<PropertyArg> for PropertyType {
    fn from(arg: PropertyArg) -> Self {
        match arg {
            PropertyArg::Apartment => PropertyType::Apartment,
            PropertyArg::House => PropertyType::House,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum VisualArg {
    Prices,
    Surface,
    PricePerM2,
    PriceVsSurface,
}

impl From<VisualArg> for ListingVisual {
    fn from(arg: VisualArg) -> Self {
        match arg {
            VisualArg::Prices => ListingVisual::Prices,
            VisualArg::Surface => ListingVisual::Surface,
            VisualArg::PricePerM2 => ListingVisual::PricePerM2,
            VisualArg::PriceVsSurface => ListingVisual::PriceVsSurface,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Point,
    Cumulative,
}

impl From<ModeArg> for ForecastMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Point => ForecastMode::Point,
            ModeArg::Cumulative => ForecastMode::Cumulative,
        }
    }
}

impl Cli {
    /// Initialize logging from the verbosity count unless `RUST_LOG` is set.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        // A second init (e.g. from tests) keeps the first subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    let config = AppConfig::from_env();

    match cli.command {
        Commands::Indicators { country } => {
            list_indicators(country.map(Country::from), cli.output)?;
            Ok(())
        }
        Commands::Series { slug, start, end, granularity, transform, column, csv } => {
            let orch = Orchestrator::new(config);
            let mut state = AppState::new();

            let dataset = orch.load_indicator(&slug).await?;
            update(&mut state, Action::SelectIndicator { slug, dataset })?;

            if let Some(g) = granularity {
                update(&mut state, Action::SetGranularity(g.into()))?;
            }
            update(&mut state, Action::SetTransform(transform.into()))?;
            if let Some(name) = column {
                update(&mut state, Action::SelectColumn(name))?;
            }
            if start.is_some() || end.is_some() {
                let start = start.or(state.selection.start).unwrap_or(NaiveDate::MIN);
                let end = end.or(state.selection.end).unwrap_or(NaiveDate::MAX);
                update(&mut state, Action::SetRange { start, end })?;
            }

            if let Some(path) = csv {
                let (name, points) = state::current_series(&state)?;
                export::write_csv(&path, &[ExportColumn::new(&name, &points)])?;
            }

            print_view(&render(&state), cli.output)
        }
        Commands::Listings { property, subtype, visual, keep_outliers } => {
            let orch = Orchestrator::new(config);
            let mut state = AppState::new();

            let property: PropertyType = property.into();
            let listings = orch.load_listings(property).await?;
            update(&mut state, Action::SelectProperty { property, listings })?;
            update(&mut state, Action::SelectSubtype(subtype))?;
            update(&mut state, Action::SelectVisual(visual.into()))?;
            update(&mut state, Action::SetRemoveOutliers(!keep_outliers))?;

            print_view(&render(&state), cli.output)
        }
        Commands::Forecast { file, actual, scaled, model, mode, start, end } => {
            info!("Loading forecast file: {}", file.display());
            let scaled: Vec<&str> = scaled.iter().map(String::as_str).collect();
            let frame = orchestrator::load_forecast(&file, &actual, &scaled).await?;

            let mut state = AppState::new();
            update(&mut state, Action::LoadForecast(frame))?;
            if let Some(name) = model {
                update(&mut state, Action::SelectModel(name))?;
            }
            update(&mut state, Action::SetForecastMode(mode.into()))?;
            if start.is_some() || end.is_some() {
                let start = start.or(state.selection.forecast_start).unwrap_or(NaiveDateTime::MIN);
                let end = end.or(state.selection.forecast_end).unwrap_or(NaiveDateTime::MAX);
                update(&mut state, Action::SetForecastRange { start, end })?;
            }

            print_view(&render(&state), cli.output)
        }
    }
}

fn list_indicators(country: Option<Country>, output: OutputFormat) -> Result<()> {
    let indicators = match country {
        Some(c) => Registry::by_country(c),
        None => Registry::get_all_indicators().iter().collect(),
    };

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&indicators)?),
        OutputFormat::Text => {
            println!("\nAvailable Indicators:\n");
            for meta in &indicators {
                let grans: Vec<&str> = meta.granularities.iter().map(|g| g.label()).collect();
                let transforms: Vec<&str> = meta.transforms.iter().map(|t| t.label()).collect();
                println!("  {:<18} {} [{:?}, {}]", meta.slug, meta.name, meta.country, meta.source.label());
                println!("  {:<18} granularidad: {} | transformación: {}", "", grans.join(", "), transforms.join(", "));
            }
            let stats = Registry::get_stats();
            println!("\n{} indicators ({} BCRA, {} tables)", stats.total, stats.bcra, stats.table);
        }
    }
    Ok(())
}

fn print_view(view: &View, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(view)?),
        OutputFormat::Text => {
            println!("\n{}\n", view.title);
            if let Some(notice) = &view.notice {
                println!("{}", notice);
            }
            for series in &view.series {
                println!("[{}] {} vs {}", series.name, view.y_label, view.x_label);
                for p in &series.points {
                    println!("  {:<20} {:>14.2}", p.x, p.y);
                }
            }
            if let Some(table) = &view.table {
                println!("\n{:<8} {}", "", table.columns.join(" | "));
                for (label, values) in &table.rows {
                    let cells: Vec<String> = values
                        .iter()
                        .map(|v| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string()))
                        .collect();
                    println!("{:<8} {}", label, cells.join(" | "));
                }
            }
        }
    }
    Ok(())
}
