use crate::data::{column_as_f64, column_as_labels, is_numeric, unique_in_order};
use crate::error::{ExplorerError, Result};
use polars::prelude::DataFrame;

pub const GRID_SIZE: usize = 100;
/// Bandwidths the density extends past the extreme observations.
pub const CUT: f64 = 2.0;
/// Half-width of the widest violin, in category units.
pub const MAX_HALF_WIDTH: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

#[derive(Debug, Clone)]
pub struct Violin {
    pub label: String,
    pub n: usize,
    /// `(value, half_width)` pairs along the value axis.
    pub outline: Vec<(f64, f64)>,
    pub stats: BoxStats,
}

#[derive(Debug, Clone)]
pub struct ViolinPlot {
    pub group_column: String,
    pub value_column: String,
    pub violins: Vec<Violin>,
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Linear-interpolation quantile of already sorted data.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn box_stats(sorted: &[f64]) -> BoxStats {
    let q1 = quantile(sorted, 0.25);
    let median = quantile(sorted, 0.5);
    let q3 = quantile(sorted, 0.75);
    let reach = 1.5 * (q3 - q1);
    let lower_whisker = sorted
        .iter()
        .copied()
        .find(|v| *v >= q1 - reach)
        .unwrap_or(q1);
    let upper_whisker = sorted
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= q3 + reach)
        .unwrap_or(q3);
    BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
    }
}

/// Gaussian kernel density with Scott's rule bandwidth, evaluated on `grid_size`
/// points spanning the data extended by `cut` bandwidths. Degenerate samples
/// (one value, or no spread) collapse to a single point of density 1.
pub fn gaussian_kde(values: &[f64], grid_size: usize, cut: f64) -> Vec<(f64, f64)> {
    let n = values.len();
    let std = sample_std(values);
    if n == 0 {
        return Vec::new();
    }
    if std == 0.0 || grid_size < 2 {
        return vec![(values[0], 1.0)];
    }

    let bw = std * (n as f64).powf(-0.2);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lo = min - cut * bw;
    let hi = max + cut * bw;
    let norm = 1.0 / (n as f64 * bw * (2.0 * std::f64::consts::PI).sqrt());

    (0..grid_size)
        .map(|i| {
            let y = lo + (hi - lo) * i as f64 / (grid_size - 1) as f64;
            let density: f64 = values
                .iter()
                .map(|v| {
                    let z = (y - v) / bw;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm;
            (y, density)
        })
        .collect()
}

fn group_order(labels: &[String], numeric: bool) -> Vec<String> {
    let mut order = unique_in_order(labels);
    if numeric {
        order.sort_by(|a, b| {
            let a = a.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.parse::<f64>().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });
    }
    order
}

impl ViolinPlot {
    pub fn build(df: &DataFrame, group_column: &str, value_column: &str) -> Result<Self> {
        let values = column_as_f64(df, value_column)?;
        let labels = column_as_labels(df, group_column)?;
        let numeric = df
            .column(group_column)
            .map(|c| is_numeric(c.dtype()))
            .map_err(|_| ExplorerError::MissingColumn(group_column.to_string()))?;
        Ok(Self::from_groups(group_column, value_column, &labels, &values, numeric))
    }

    pub fn from_groups(
        group_column: &str,
        value_column: &str,
        labels: &[String],
        values: &[f64],
        numeric_groups: bool,
    ) -> Self {
        let mut violins: Vec<Violin> = group_order(labels, numeric_groups)
            .into_iter()
            .map(|label| {
                let mut group: Vec<f64> = labels
                    .iter()
                    .zip(values)
                    .filter(|(l, _)| **l == label)
                    .map(|(_, v)| *v)
                    .collect();
                group.sort_by(f64::total_cmp);
                Violin {
                    n: group.len(),
                    outline: gaussian_kde(&group, GRID_SIZE, CUT),
                    stats: box_stats(&group),
                    label,
                }
            })
            .collect();

        // One shared density scale keeps the area of every violin equal. Degenerate
        // groups carry a placeholder density and stay out of the shared peak.
        let peak = violins
            .iter()
            .filter(|v| v.outline.len() > 1)
            .flat_map(|v| v.outline.iter().map(|(_, d)| *d))
            .fold(0.0_f64, f64::max);
        if peak > 0.0 {
            for violin in violins.iter_mut().filter(|v| v.outline.len() > 1) {
                for point in &mut violin.outline {
                    point.1 = point.1 / peak * MAX_HALF_WIDTH;
                }
            }
        }

        Self {
            group_column: group_column.to_string(),
            value_column: value_column.to_string(),
            violins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_interpolate_linearly() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&data, 0.0), 1.0);
        assert_eq!(quantile(&data, 0.5), 2.5);
        assert_eq!(quantile(&data, 0.25), 1.75);
        assert_eq!(quantile(&data, 1.0), 4.0);
    }

    #[test]
    fn whiskers_stop_at_data_inside_reach() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let stats = box_stats(&data);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.upper_whisker, 5.0);
        assert!(stats.q1 <= stats.median && stats.median <= stats.q3);
    }

    #[test]
    fn kde_integrates_to_about_one() {
        let data: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin() * 10.0 + 60.0).collect();
        let curve = gaussian_kde(&data, 400, 3.0);
        let area: f64 = curve
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum();
        assert!((area - 1.0).abs() < 0.02, "area {area}");
    }

    #[test]
    fn constant_group_collapses() {
        assert_eq!(gaussian_kde(&[5.0, 5.0, 5.0], GRID_SIZE, CUT), vec![(5.0, 1.0)]);
        assert!(gaussian_kde(&[], GRID_SIZE, CUT).is_empty());
    }

    #[test]
    fn groups_and_scaling() {
        let labels: Vec<String> = ["YES", "NO", "YES", "NO", "YES"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let values = [10.0, 80.0, 20.0, 95.0, 30.0];
        let plot = ViolinPlot::from_groups("Chemotherapy", "Overall Survival (Months)", &labels, &values, false);
        assert_eq!(plot.violins.len(), 2);
        assert_eq!(plot.violins[0].label, "YES");
        assert_eq!(plot.violins[0].n, 3);
        let widest = plot
            .violins
            .iter()
            .flat_map(|v| v.outline.iter().map(|(_, w)| *w))
            .fold(0.0_f64, f64::max);
        assert!((widest - MAX_HALF_WIDTH).abs() < 1e-12);
    }

    #[test]
    fn single_patient_group_keeps_others_full_width() {
        let labels: Vec<String> = ["A", "A", "A", "A", "B", "C", "C"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let values = [20.0, 80.0, 140.0, 200.0, 50.0, 70.0, 70.0];
        let plot = ViolinPlot::from_groups("Tumor Other Histologic Subtype", "Overall Survival (Months)", &labels, &values, false);
        assert_eq!(plot.violins.len(), 3);
        let widest_a = plot.violins[0]
            .outline
            .iter()
            .map(|(_, w)| *w)
            .fold(0.0_f64, f64::max);
        assert!((widest_a - MAX_HALF_WIDTH).abs() < 1e-12, "widest {widest_a}");
        assert_eq!(plot.violins[1].outline, vec![(50.0, 1.0)]);
        assert_eq!(plot.violins[1].n, 1);
        assert_eq!(plot.violins[2].outline, vec![(70.0, 1.0)]);
        assert_eq!(plot.violins[2].stats.median, 70.0);
    }

    #[test]
    fn numeric_groups_are_sorted() {
        let labels: Vec<String> = ["10", "2", "10", "1"].iter().map(|s| s.to_string()).collect();
        let plot = ViolinPlot::from_groups("Cohort", "Age at Diagnosis", &labels, &[1.0, 2.0, 3.0, 4.0], true);
        let order: Vec<&str> = plot.violins.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "10"]);
    }
}
