//! CSV export of the table behind a chart.

use crate::core::timeseries::align_outer;
use crate::error::{DashboardError, Result};
use crate::models::DataPoint;
use chrono::{DateTime, NaiveTime, Utc};
use std::path::Path;
use tracing::info;

pub const DATE_HEADER: &str = "fecha";

/// One exported column: a header and its post-pipeline series.
#[derive(Debug, Clone, Copy)]
pub struct ExportColumn<'a> {
    pub name: &'a str,
    pub points: &'a [DataPoint],
}

impl<'a> ExportColumn<'a> {
    pub fn new(name: &'a str, points: &'a [DataPoint]) -> Self {
        Self { name, points }
    }
}

/// Writes `fecha` plus one column per series, over the union of timestamps.
/// Cells a series has no value for stay empty.
pub fn to_csv(columns: &[ExportColumn<'_>]) -> Result<Vec<u8>> {
    let series: Vec<&[DataPoint]> = columns.iter().map(|c| c.points).collect();
    let rows = align_outer(&series);
    let date_only = rows.iter().all(|(ts, _)| ts.time() == NaiveTime::MIN);

    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec![DATE_HEADER];
    header.extend(columns.iter().map(|c| c.name));
    wtr.write_record(&header)?;

    for (ts, values) in &rows {
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(format_timestamp(ts, date_only));
        record.extend(values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        wtr.write_record(&record)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| DashboardError::Io(e.into_error()))?;
    Ok(bytes)
}

pub fn write_csv(path: &Path, columns: &[ExportColumn<'_>]) -> Result<()> {
    let bytes = to_csv(columns)?;
    std::fs::write(path, &bytes)?;
    info!("Exported {} column(s) to {}", columns.len(), path.display());
    Ok(())
}

fn format_timestamp(ts: &DateTime<Utc>, date_only: bool) -> String {
    if date_only {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dp(y: i32, m: u32, d: u32, value: f64) -> DataPoint {
        DataPoint::new(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(), value)
    }

    #[test]
    fn test_union_with_empty_cells() {
        let a = vec![dp(2023, 1, 31, 1.5), dp(2023, 2, 28, 2.0)];
        let b = vec![dp(2023, 2, 28, -3.0), dp(2023, 3, 31, 4.0)];

        let bytes = to_csv(&[ExportColumn::new("General", &a), ExportColumn::new("Alimentos", &b)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "fecha,General,Alimentos\n2023-01-31,1.5,\n2023-02-28,2,-3\n2023-03-31,,4\n"
        );
    }

    #[test]
    fn test_intraday_timestamps_keep_time() {
        let points = vec![DataPoint::new(Utc.with_ymd_and_hms(2010, 1, 1, 0, 1, 0).unwrap(), 1.0)];
        let text = String::from_utf8(to_csv(&[ExportColumn::new("kw", &points)]).unwrap()).unwrap();
        assert!(text.contains("2010-01-01 00:01:00,1"));
    }

    #[test]
    fn test_write_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let points = vec![dp(2024, 1, 1, 10.0)];

        write_csv(&path, &[ExportColumn::new("valor", &points)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("fecha,valor\n"));
    }
}
