use async_trait::async_trait;
use crate::config::AppConfig;
use crate::models::{Column, Dataset};
use super::DataSource;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Number formatting used by a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecimalStyle {
    /// `1,234.56`
    Dot,
    /// `1.234,56`
    Comma,
}

/// Index for tables that carry values but no dates: `start`, then every `step_months`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedIndex {
    pub start: NaiveDate,
    pub step_months: u32,
}

/// How to read one exported sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// File name, resolved against the configured data location.
    pub file: String,
    /// Lines to drop before the header row.
    pub skip_rows: usize,
    /// Date column header; ignored when `generated_index` is set.
    pub date_column: Option<String>,
    /// Value columns to keep. Empty means every non-date column.
    pub value_columns: Vec<String>,
    pub decimal: DecimalStyle,
    pub delimiter: u8,
    pub generated_index: Option<GeneratedIndex>,
}

impl TableSpec {
    pub fn dated(file: &str, date_column: &str) -> Self {
        Self {
            file: file.to_string(),
            skip_rows: 0,
            date_column: Some(date_column.to_string()),
            value_columns: Vec::new(),
            decimal: DecimalStyle::Dot,
            delimiter: b',',
            generated_index: None,
        }
    }

    pub fn generated(file: &str, start: NaiveDate, step_months: u32) -> Self {
        Self {
            file: file.to_string(),
            skip_rows: 0,
            date_column: None,
            value_columns: Vec::new(),
            decimal: DecimalStyle::Dot,
            delimiter: b',',
            generated_index: Some(GeneratedIndex { start, step_months }),
        }
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.value_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_decimal(mut self, decimal: DecimalStyle) -> Self {
        self.decimal = decimal;
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }
}

/// Loads CSV exports of the spreadsheet sources, from disk or over HTTP.
pub struct TableFetcher {
    config: AppConfig,
    spec: TableSpec,
    client: Client,
}

impl TableFetcher {
    pub fn new(config: &AppConfig, spec: TableSpec) -> Self {
        let client = super::build_client(config.http_timeout_secs, false);
        Self { config: config.clone(), spec, client }
    }

    pub fn location(&self) -> String {
        self.config.data_location(&self.spec.file)
    }
}

#[async_trait]
impl DataSource for TableFetcher {
    fn name(&self) -> &str {
        "table"
    }

    async fn fetch_data(&self, series_id: &str) -> Result<Dataset> {
        let location = self.location();
        info!("Loading table '{}' from {}", series_id, location);

        let text = super::read_text(&self.client, &location).await?;
        let dataset = parse_table(&text, &self.spec)?;

        info!("Table '{}': {} rows, columns {:?}", series_id, dataset.len(), dataset.column_names());
        Ok(dataset)
    }
}

/// Parses a number in the given style. Empty cells, "-", "." and "s/d" are gaps.
pub fn parse_number(raw: &str, style: DecimalStyle) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" || s == "." || s.eq_ignore_ascii_case("s/d") {
        return None;
    }

    let normalized = match style {
        DecimalStyle::Dot => s.replace(',', ""),
        DecimalStyle::Comma => s.replace('.', "").replace(',', "."),
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accepts the date layouts the exports use.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(chrono::NaiveTime::MIN).and_utc());
        }
    }

    // Month-only labels like "2023-04" or "04/2023"
    for (fmt, prefix_day) in [("%Y-%m-%d", true), ("%d/%m/%Y", false)] {
        let candidate = if prefix_day { format!("{}-01", s) } else { format!("01/{}", s) };
        if let Ok(d) = NaiveDate::parse_from_str(&candidate, fmt) {
            return Some(d.and_time(chrono::NaiveTime::MIN).and_utc());
        }
    }

    None
}

fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("Column '{}' not found (have {:?})", name, headers.iter().collect::<Vec<_>>()))
}

/// Parses CSV text into a dataset according to `spec`.
///
/// Rows whose date does not parse (notes, footers) are skipped, as are rows
/// where every value cell is empty. The result is sorted by time.
pub fn parse_table(text: &str, spec: &TableSpec) -> Result<Dataset> {
    let body = skip_lines(text, spec.skip_rows);
    let mut rdr = ReaderBuilder::new()
        .delimiter(spec.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = rdr.headers()?.clone();

    let date_idx = match (&spec.generated_index, &spec.date_column) {
        (None, Some(name)) => Some(column_index(&headers, name)?),
        (None, None) => return Err(anyhow!("Table '{}' has neither a date column nor a generated index", spec.file)),
        (Some(_), _) => None,
    };

    let value_idx: Vec<usize> = if spec.value_columns.is_empty() {
        (0..headers.len())
            .filter(|i| Some(*i) != date_idx && !headers[*i].trim().is_empty())
            .collect()
    } else {
        spec.value_columns
            .iter()
            .map(|name| column_index(&headers, name))
            .collect::<Result<_>>()?
    };

    if value_idx.is_empty() {
        return Err(anyhow!("Table '{}' has no value columns", spec.file));
    }

    let mut dataset = Dataset {
        index: Vec::new(),
        columns: value_idx
            .iter()
            .map(|&i| Column { name: headers[i].trim().to_string(), values: Vec::new() })
            .collect(),
    };

    let mut generated_row = 0u32;

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| anyhow!("Error reading '{}' at record {}: {}", spec.file, line + 1, e))?;

        let values: Vec<Option<f64>> = value_idx
            .iter()
            .map(|&i| record.get(i).and_then(|cell| parse_number(cell, spec.decimal)))
            .collect();

        // Generated slots are positional, so a gap row still consumes its date
        let timestamp = match &spec.generated_index {
            Some(gen) => {
                let date = gen
                    .start
                    .checked_add_months(Months::new(gen.step_months * generated_row))
                    .ok_or_else(|| anyhow!("Generated index overflow in '{}'", spec.file))?;
                generated_row += 1;
                date.and_time(chrono::NaiveTime::MIN).and_utc()
            }
            None => match date_idx.and_then(|i| record.get(i)).and_then(parse_date) {
                Some(ts) => ts,
                None => {
                    debug!("Skipping record {} of '{}': no parseable date", line + 1, spec.file);
                    continue;
                }
            },
        };

        if values.iter().all(Option::is_none) {
            continue;
        }

        dataset.index.push(timestamp);
        for (column, value) in dataset.columns.iter_mut().zip(values) {
            column.values.push(value);
        }
    }

    dataset.sort_by_time();
    Ok(dataset)
}
