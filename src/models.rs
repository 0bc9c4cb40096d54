use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A loaded table: one shared time index and one or more named value columns.
/// Cells can be missing (`None`), e.g. a category that starts later than the others.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Dataset {
    pub index: Vec<DateTime<Utc>>,
    pub columns: Vec<Column>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Dataset {
    /// Builds a single-column dataset from points.
    pub fn from_points(name: &str, points: Vec<DataPoint>) -> Self {
        let (index, values) = points
            .into_iter()
            .map(|dp| (dp.timestamp, Some(dp.value)))
            .unzip();

        Self {
            index,
            columns: vec![Column { name: name.to_string(), values }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Extracts one column as a series, skipping gaps.
    pub fn series(&self, name: &str) -> Option<Vec<DataPoint>> {
        let column = self.column(name)?;
        Some(
            self.index
                .iter()
                .zip(column.values.iter())
                .filter_map(|(ts, v)| v.map(|value| DataPoint::new(*ts, value)))
                .collect(),
        )
    }

    /// The first column as a series. Most sources only carry one.
    pub fn primary_series(&self) -> Vec<DataPoint> {
        self.columns
            .first()
            .and_then(|c| self.series(&c.name))
            .unwrap_or_default()
    }

    /// Stable sort of rows by timestamp; duplicate timestamps keep their load order.
    pub fn sort_by_time(&mut self) {
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by_key(|&i| self.index[i]);

        self.index = order.iter().map(|&i| self.index[i]).collect();
        for column in &mut self.columns {
            column.values = order.iter().map(|&i| column.values[i]).collect();
        }
    }

    /// Earliest and latest timestamp, if any.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let min = self.index.iter().min()?;
        let max = self.index.iter().max()?;
        Some((*min, *max))
    }
}

/// One row of a property listings file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Listing {
    #[serde(rename = "Precio_USD")]
    pub price_usd: f64,
    #[serde(rename = "Superficie_m2")]
    pub surface_m2: f64,
    #[serde(rename = "habitaciones", default)]
    pub rooms: Option<String>,
}

impl Listing {
    /// Price per square metre; undefined for non-positive surfaces.
    pub fn price_per_m2(&self) -> Option<f64> {
        if self.surface_m2 > 0.0 {
            Some(self.price_usd / self.surface_m2)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_series_skips_gaps() {
        let ds = Dataset {
            index: vec![ts(2023, 1, 1), ts(2023, 2, 1), ts(2023, 3, 1)],
            columns: vec![Column {
                name: "a".to_string(),
                values: vec![Some(1.0), None, Some(3.0)],
            }],
        };

        let series = ds.series("a").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].value, 3.0);
        assert!(ds.series("missing").is_none());
    }

    #[test]
    fn test_sort_by_time_is_stable() {
        let mut ds = Dataset {
            index: vec![ts(2023, 3, 1), ts(2023, 1, 1), ts(2023, 3, 1)],
            columns: vec![Column {
                name: "a".to_string(),
                values: vec![Some(3.0), Some(1.0), Some(4.0)],
            }],
        };
        ds.sort_by_time();

        assert_eq!(ds.index[0], ts(2023, 1, 1));
        assert_eq!(ds.columns[0].values, vec![Some(1.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_price_per_m2() {
        let l = Listing { price_usd: 100_000.0, surface_m2: 50.0, rooms: None };
        assert_eq!(l.price_per_m2(), Some(2000.0));

        let zero = Listing { price_usd: 100_000.0, surface_m2: 0.0, rooms: None };
        assert_eq!(zero.price_per_m2(), None);
    }
}
