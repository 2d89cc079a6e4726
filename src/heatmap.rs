use crate::data::{column_as_f64, numeric_column_names};
use crate::error::Result;
use polars::prelude::DataFrame;

/// Pairwise Pearson correlation over the numeric columns of a table.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major, `labels.len()` squared.
    pub values: Vec<f64>,
}

/// Pearson correlation; NaN when either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

impl CorrelationMatrix {
    pub fn from_table(df: &DataFrame) -> Result<Self> {
        let labels = numeric_column_names(df);
        let columns = labels
            .iter()
            .map(|name| column_as_f64(df, name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_columns(labels, &columns))
    }

    pub fn from_columns(labels: Vec<String>, columns: &[Vec<f64>]) -> Self {
        let k = labels.len();
        let mut values = vec![f64::NAN; k * k];
        for i in 0..k {
            values[i * k + i] = 1.0;
            for j in (i + 1)..k {
                let r = pearson(&columns[i], &columns[j]);
                values[i * k + j] = r;
                values[j * k + i] = r;
            }
        }
        Self { labels, values }
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.size() + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn perfect_and_inverse_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &[4.0, 3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
        assert!(pearson(&x, &[5.0, 5.0, 5.0, 5.0]).is_nan());
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let df = df!(
            "Age at Diagnosis" => &[45.0, 61.5, 70.1, 38.0, 52.3],
            "Overall Survival (Months)" => &[140.0, 88.2, 20.5, 200.1, 97.0],
            "Cellularity" => &["High", "Low", "High", "Moderate", "Low"],
            "Cohort" => &[1i64, 1, 2, 3, 2],
        )
        .unwrap();
        let m = CorrelationMatrix::from_table(&df).unwrap();
        assert_eq!(m.labels, vec!["Age at Diagnosis", "Overall Survival (Months)", "Cohort"]);
        for i in 0..m.size() {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..m.size() {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert!(m.get(0, 1) < 0.0);
    }
}
