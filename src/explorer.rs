use crate::data::{column_as_f64, column_as_labels, is_numeric};
use crate::error::{ExplorerError, Result};
use polars::prelude::DataFrame;
use std::collections::HashMap;

/// Most category names printed along one axis.
pub const MAX_CATEGORY_TICKS: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum AxisKind {
    Numeric { min: f64, max: f64 },
    Categorical { levels: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Axis {
    pub name: String,
    pub kind: AxisKind,
    /// Per patient position along the axis, 0 = bottom, 1 = top.
    pub positions: Vec<f64>,
}

/// Normalized `(low, high)` range per brushed axis name.
pub type Brushes = HashMap<String, (f64, f64)>;

/// Parallel-coordinates view: one axis per column, one polyline per patient.
#[derive(Debug, Clone)]
pub struct ParallelCoordinates {
    pub axes: Vec<Axis>,
    pub rows: usize,
}

impl Axis {
    fn numeric(name: &str, values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let positions = values
            .iter()
            .map(|v| if max > min { (v - min) / (max - min) } else { 0.5 })
            .collect();
        Self {
            name: name.to_string(),
            kind: AxisKind::Numeric { min, max },
            positions,
        }
    }

    fn categorical(name: &str, labels: &[String]) -> Self {
        let mut levels: Vec<String> = labels.to_vec();
        levels.sort();
        levels.dedup();
        let slot = |label: &String| match levels.binary_search(label) {
            Ok(i) if levels.len() > 1 => i as f64 / (levels.len() - 1) as f64,
            _ => 0.5,
        };
        let positions = labels.iter().map(slot).collect();
        Self {
            name: name.to_string(),
            kind: AxisKind::Categorical { levels },
            positions,
        }
    }

    /// Value shown at a normalized axis position.
    pub fn value_at(&self, t: f64) -> String {
        let t = t.clamp(0.0, 1.0);
        match &self.kind {
            AxisKind::Numeric { min, max } => format!("{:.1}", min + t * (max - min)),
            AxisKind::Categorical { levels } => {
                if levels.is_empty() {
                    return String::new();
                }
                let i = (t * (levels.len() - 1) as f64).round() as usize;
                levels[i.min(levels.len() - 1)].clone()
            }
        }
    }

    pub fn ticks(&self) -> Vec<(f64, String)> {
        match &self.kind {
            AxisKind::Numeric { .. } => (0..=4)
                .map(|i| {
                    let t = i as f64 / 4.0;
                    (t, self.value_at(t))
                })
                .collect(),
            AxisKind::Categorical { levels } => {
                let step = levels.len().div_ceil(MAX_CATEGORY_TICKS).max(1);
                let denom = levels.len().saturating_sub(1).max(1) as f64;
                levels
                    .iter()
                    .enumerate()
                    .step_by(step)
                    .map(|(i, l)| {
                        let t = if levels.len() > 1 { i as f64 / denom } else { 0.5 };
                        (t, l.clone())
                    })
                    .collect()
            }
        }
    }
}

impl ParallelCoordinates {
    pub fn build(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let axes = columns
            .iter()
            .map(|name| -> Result<Axis> {
                let numeric = df
                    .column(name)
                    .map(|c| is_numeric(c.dtype()))
                    .map_err(|_| ExplorerError::MissingColumn(name.clone()))?;
                if numeric {
                    Ok(Axis::numeric(name, &column_as_f64(df, name)?))
                } else {
                    Ok(Axis::categorical(name, &column_as_labels(df, name)?))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            axes,
            rows: df.height(),
        })
    }

    /// Rows inside every active brush.
    pub fn selected_rows(&self, brushes: &Brushes) -> Vec<bool> {
        let active: Vec<(&Axis, (f64, f64))> = self
            .axes
            .iter()
            .filter_map(|axis| brushes.get(&axis.name).map(|range| (axis, *range)))
            .collect();
        (0..self.rows)
            .map(|row| {
                active.iter().all(|(axis, (lo, hi))| {
                    let p = axis.positions[row];
                    p >= lo.min(*hi) && p <= lo.max(*hi)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn table() -> DataFrame {
        df!(
            "Age at Diagnosis" => &[40.0, 50.0, 60.0, 80.0],
            "Cellularity" => &["Low", "High", "Moderate", "High"],
        )
        .unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_without_touching_the_table() {
        let df = table();
        let before = df.clone();
        let view = ParallelCoordinates::build(&df, &cols(&["Age at Diagnosis", "Cellularity"])).unwrap();
        assert!(df.equals(&before));
        assert_eq!(view.axes.len(), 2);
        assert_eq!(view.rows, 4);
        assert_eq!(view.axes[0].positions, vec![0.0, 0.25, 0.5, 1.0]);
        assert_eq!(
            view.axes[1].kind,
            AxisKind::Categorical { levels: cols(&["High", "Low", "Moderate"]) }
        );
        assert_eq!(view.axes[1].positions, vec![0.5, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn brushes_filter_rows() {
        let view = ParallelCoordinates::build(&table(), &cols(&["Age at Diagnosis", "Cellularity"])).unwrap();
        assert_eq!(view.selected_rows(&Brushes::new()), vec![true; 4]);

        let mut brushes = Brushes::new();
        brushes.insert("Age at Diagnosis".to_string(), (0.6, 0.2));
        assert_eq!(view.selected_rows(&brushes), vec![false, true, true, false]);

        brushes.insert("Cellularity".to_string(), (0.9, 1.0));
        assert_eq!(view.selected_rows(&brushes), vec![false, false, true, false]);
    }

    #[test]
    fn missing_column_is_reported() {
        assert!(matches!(
            ParallelCoordinates::build(&table(), &cols(&["Sex"])),
            Err(ExplorerError::MissingColumn(_))
        ));
    }

    #[test]
    fn axis_labels() {
        let view = ParallelCoordinates::build(&table(), &cols(&["Age at Diagnosis", "Cellularity"])).unwrap();
        assert_eq!(view.axes[0].value_at(0.5), "60.0");
        assert_eq!(view.axes[0].ticks().len(), 5);
        assert_eq!(view.axes[1].value_at(1.0), "Moderate");
        assert_eq!(view.axes[1].ticks().len(), 3);
    }
}
