use serde::Serialize;

/// Quantile with linear interpolation between closest ranks (the pandas default).
/// Non-finite values are ignored.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Summary statistics in the shape of a `describe()` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined for fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl Describe {
    pub const LABELS: [&'static str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    /// Values in `LABELS` order, rounded to two decimals for display.
    pub fn rounded_row(&self) -> Vec<Option<f64>> {
        let r = |v: f64| (v * 100.0).round() / 100.0;
        vec![
            Some(self.count as f64),
            Some(r(self.mean)),
            self.std.map(r),
            Some(r(self.min)),
            Some(r(self.q25)),
            Some(r(self.median)),
            Some(r(self.q75)),
            Some(r(self.max)),
        ]
    }
}

pub fn describe(values: &[f64]) -> Option<Describe> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len();
    if n == 0 {
        return None;
    }

    let mean = finite.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Some(variance.sqrt())
    } else {
        None
    };

    Some(Describe {
        count: n,
        mean,
        std,
        min: quantile(&finite, 0.0)?,
        q25: quantile(&finite, 0.25)?,
        median: quantile(&finite, 0.5)?,
        q75: quantile(&finite, 0.75)?,
        max: quantile(&finite, 1.0)?,
    })
}

/// `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`
pub fn iqr_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - 1.5 * iqr, q3 + 1.5 * iqr))
}

/// Keeps the items whose key falls inside the IQR bounds (inclusive), in input order.
pub fn iqr_filter<T, F>(items: &[T], key: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    let keys: Vec<f64> = items.iter().map(&key).collect();
    let Some((lower, upper)) = iqr_bounds(&keys) else {
        return Vec::new();
    };

    items
        .iter()
        .zip(keys)
        .filter(|(_, k)| *k >= lower && *k <= upper)
        .map(|(item, _)| item.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over `[min, max]`; the last bin includes `max`.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in &finite {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

/// Ordinary least squares fit `y = slope * x + intercept`.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        sxy += dx * (ys[i] - mean_y);
        sxx += dx * dx;
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

/// Pearson correlation of paired samples.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut numer = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;

    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;

        numer += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    if denom_x == 0.0 || denom_y == 0.0 {
        return None;
    }

    // Clamp result to [-1.0, 1.0] to handle floating point errors
    Some((numer / (denom_x.sqrt() * denom_y.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0];
        // pos = 0.25 * 3 = 0.75 -> 1 + 0.75
        assert!((quantile(&v, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert!((quantile(&v, 0.5).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_describe() {
        let d = describe(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(d.count, 3);
        assert_eq!(d.mean, 20.0);
        assert!((d.std.unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(d.median, 20.0);
        assert_eq!(d.q25, 15.0);

        let single = describe(&[5.0]).unwrap();
        assert_eq!(single.std, None);
        assert_eq!(single.rounded_row()[2], None);
    }

    #[test]
    fn test_iqr_filter_removes_extreme_outlier() {
        let mut values: Vec<f64> = vec![48.0, 50.0, 52.0, 49.0, 51.0, 47.0, 53.0, 50.0, 46.0, 54.0];
        values.insert(4, 540.0); // 10x the next highest

        let kept = iqr_filter(&values, |v| *v);
        assert_eq!(kept.len(), values.len() - 1);
        assert!(!kept.contains(&540.0));
        // Order preserved
        assert_eq!(&kept[..4], &[48.0, 50.0, 52.0, 49.0]);
        assert_eq!(kept[4], 51.0);
    }

    #[test]
    fn test_histogram_counts_everything() {
        let v: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let bins = histogram(&v, 20);
        assert_eq!(bins.len(), 20);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 100);
        assert_eq!(bins[19].count, 5); // 95..=99, max lands in the last bin

        let flat = histogram(&[3.0, 3.0], 4);
        assert_eq!(flat.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn test_linear_fit_and_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let (slope, intercept) = linear_fit(&xs, &ys).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &ys).unwrap() - 1.0).abs() < 1e-12);

        let neg = [9.0, 7.0, 5.0, 3.0];
        assert!((pearson(&xs, &neg).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(linear_fit(&[1.0, 1.0], &[2.0, 3.0]), None);
    }
}
