//! Clustered heatmap of selected numeric variables across patients.
//!
//! Variables become matrix rows and patients become columns. Every row is
//! z-scored, then both axes are clustered with Ward linkage and reordered by
//! their dendrogram leaves. Patients carry a color keyed by intrinsic subtype.

use crate::colormap::{SUBTYPE_PALETTE, parse_color};
use crate::data::{column_as_f64, column_as_labels, unique_in_order};
use crate::error::{ExplorerError, Result};
use eframe::egui::Color32;
use polars::prelude::DataFrame;

pub const MIN_COLUMNS: usize = 2;
/// Heatmap color range, in standard deviations.
pub const Z_LIMIT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
}

/// Ward linkage result. Leaves are `0..n_leaves`; merge `i` creates node `n_leaves + i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    pub n_leaves: usize,
    pub merges: Vec<Merge>,
}

impl Dendrogram {
    pub fn leaf_order(&self) -> Vec<usize> {
        if self.n_leaves == 0 {
            return Vec::new();
        }
        let mut order = Vec::with_capacity(self.n_leaves);
        let mut stack = vec![self.n_leaves + self.merges.len() - 1];
        while let Some(node) = stack.pop() {
            if node < self.n_leaves {
                order.push(node);
            } else {
                let merge = &self.merges[node - self.n_leaves];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        order
    }

    /// `(position, height)` of every node; leaves sit at their index in
    /// `leaf_order` and height 0, merges midway between their children.
    pub fn node_positions(&self) -> Vec<(f64, f64)> {
        let mut positions = vec![(0.0, 0.0); self.n_leaves + self.merges.len()];
        for (slot, leaf) in self.leaf_order().into_iter().enumerate() {
            positions[leaf] = (slot as f64, 0.0);
        }
        for (i, merge) in self.merges.iter().enumerate() {
            let x = (positions[merge.left].0 + positions[merge.right].0) / 2.0;
            positions[self.n_leaves + i] = (x, merge.height);
        }
        positions
    }

    pub fn max_height(&self) -> f64 {
        self.merges.last().map(|m| m.height).unwrap_or(0.0)
    }
}

struct Condensed {
    n: usize,
    d: Vec<f64>,
}

impl Condensed {
    fn euclidean(points: &[Vec<f64>]) -> Self {
        let n = points.len();
        let mut d = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let ss: f64 = points[i]
                    .iter()
                    .zip(&points[j])
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                d.push(ss.sqrt());
            }
        }
        Self { n, d }
    }

    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.n * i - i * (i + 1) / 2 + (j - i - 1)
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.d[self.index(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        let idx = self.index(i, j);
        self.d[idx] = value;
    }
}

/// Ward linkage on Euclidean distances, via the nearest-neighbour chain.
pub fn ward_linkage(points: &[Vec<f64>]) -> Dendrogram {
    let n = points.len();
    if n < 2 {
        return Dendrogram {
            n_leaves: n,
            merges: Vec::new(),
        };
    }

    let mut dist = Condensed::euclidean(points);
    let mut size = vec![1usize; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut raw: Vec<(usize, usize, f64)> = Vec::with_capacity(n - 1);

    for _ in 0..(n - 1) {
        if chain.is_empty() {
            if let Some(first) = (0..n).find(|&i| size[i] > 0) {
                chain.push(first);
            }
        }

        let (x, y, nearest) = loop {
            let x = chain[chain.len() - 1];
            let (mut y, mut nearest) = if chain.len() > 1 {
                let prev = chain[chain.len() - 2];
                (prev, dist.get(x, prev))
            } else {
                (usize::MAX, f64::INFINITY)
            };
            for i in 0..n {
                if i == x || size[i] == 0 {
                    continue;
                }
                let d = dist.get(x, i);
                if d < nearest || y == usize::MAX {
                    nearest = d;
                    y = i;
                }
            }
            if chain.len() > 1 && y == chain[chain.len() - 2] {
                break (x, y, nearest);
            }
            chain.push(y);
        };
        chain.pop();
        chain.pop();

        let (x, y) = if x < y { (x, y) } else { (y, x) };
        raw.push((x, y, nearest));

        let (nx, ny) = (size[x] as f64, size[y] as f64);
        size[x] = 0;
        size[y] = (nx + ny) as usize;
        for i in 0..n {
            if size[i] == 0 || i == y {
                continue;
            }
            let ni = size[i] as f64;
            let dix = dist.get(i, x);
            let diy = dist.get(i, y);
            let updated = (((ni + nx) * dix * dix + (ni + ny) * diy * diy - ni * nearest * nearest)
                / (ni + nx + ny))
                .max(0.0)
                .sqrt();
            dist.set(i, y, updated);
        }
    }

    relabel(n, raw)
}

/// Sorts merges by height and renames slots to dendrogram node ids.
fn relabel(n: usize, mut raw: Vec<(usize, usize, f64)>) -> Dendrogram {
    raw.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut parent: Vec<usize> = (0..(2 * n - 1)).collect();
    let mut sizes = vec![1usize; 2 * n - 1];
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    let merges = raw
        .into_iter()
        .enumerate()
        .map(|(i, (x, y, height))| {
            let rx = find(&mut parent, x);
            let ry = find(&mut parent, y);
            let node = n + i;
            parent[rx] = node;
            parent[ry] = node;
            sizes[node] = sizes[rx] + sizes[ry];
            Merge {
                left: rx.min(ry),
                right: rx.max(ry),
                height,
                size: sizes[node],
            }
        })
        .collect();

    Dendrogram { n_leaves: n, merges }
}

/// Standardises each row to mean 0 and sample standard deviation 1; rows without spread become 0.
pub fn zscore_rows(rows: &mut [Vec<f64>]) {
    for row in rows.iter_mut() {
        let n = row.len();
        if n == 0 {
            continue;
        }
        let mean = row.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        for v in row.iter_mut() {
            *v = if std > 0.0 { (*v - mean) / std } else { 0.0 };
        }
    }
}

/// Subtype to color lookup. Only the first `SUBTYPE_PALETTE.len()` subtypes get a color.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtypePalette {
    pub entries: Vec<(String, Option<Color32>)>,
}

impl SubtypePalette {
    pub fn from_labels(labels: &[String]) -> Self {
        let entries = unique_in_order(labels)
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let color = SUBTYPE_PALETTE.get(i).and_then(|name| parse_color(name));
                (label, color)
            })
            .collect();
        Self { entries }
    }

    pub fn color_of(&self, label: &str) -> Option<Color32> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, c)| *c)
    }

    pub fn legend(&self) -> impl Iterator<Item = (&str, Color32)> {
        self.entries
            .iter()
            .filter_map(|(l, c)| c.map(|c| (l.as_str(), c)))
    }
}

#[derive(Debug, Clone)]
pub struct ClusterMap {
    pub row_labels: Vec<String>,
    /// z-scored values, one row per selected variable, one column per patient.
    pub matrix: Vec<Vec<f64>>,
    pub subtypes: Vec<String>,
    pub palette: SubtypePalette,
    pub row_tree: Dendrogram,
    pub col_tree: Dendrogram,
    pub row_order: Vec<usize>,
    pub col_order: Vec<usize>,
}

impl ClusterMap {
    pub fn build(df: &DataFrame, columns: &[String], subtype_column: &str) -> Result<Self> {
        if columns.len() < MIN_COLUMNS {
            return Err(ExplorerError::TooFewColumns {
                needed: MIN_COLUMNS,
                got: columns.len(),
            });
        }

        let subtypes = column_as_labels(df, subtype_column)?;
        let palette = SubtypePalette::from_labels(&subtypes);

        let mut matrix = columns
            .iter()
            .map(|name| column_as_f64(df, name))
            .collect::<Result<Vec<_>>>()?;
        zscore_rows(&mut matrix);

        let n_patients = subtypes.len();
        let patients: Vec<Vec<f64>> = (0..n_patients)
            .map(|j| matrix.iter().map(|row| row[j]).collect())
            .collect();

        let row_tree = ward_linkage(&matrix);
        let col_tree = ward_linkage(&patients);
        tracing::debug!(
            variables = matrix.len(),
            patients = n_patients,
            "clustered heatmap built"
        );

        Ok(Self {
            row_labels: columns.to_vec(),
            row_order: row_tree.leaf_order(),
            col_order: col_tree.leaf_order(),
            matrix,
            subtypes,
            palette,
            row_tree,
            col_tree,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (
            self.matrix.len(),
            self.matrix.first().map(|r| r.len()).unwrap_or(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn points(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|v| vec![*v]).collect()
    }

    #[test]
    fn ward_on_two_pairs() {
        let tree = ward_linkage(&points(&[0.0, 1.0, 10.0, 11.0]));
        assert_eq!(tree.merges.len(), 3);
        assert_eq!((tree.merges[0].left, tree.merges[0].right), (0, 1));
        assert_eq!((tree.merges[1].left, tree.merges[1].right), (2, 3));
        assert_eq!((tree.merges[2].left, tree.merges[2].right), (4, 5));
        assert!((tree.merges[2].height - 200.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(tree.merges[2].size, 4);
        assert_eq!(tree.leaf_order(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn ward_three_point_update_matches_centroid_formula() {
        let tree = ward_linkage(&points(&[0.0, 1.0, 10.0]));
        // sqrt(2 * n1 * n2 / (n1 + n2)) * |c1 - c2| with c1 = 0.5, c2 = 10
        let expected = (2.0 * 2.0 / 3.0_f64).sqrt() * 9.5;
        assert!((tree.merges[1].height - expected).abs() < 1e-9);
    }

    #[test]
    fn heights_non_decreasing_and_order_is_permutation() {
        let pts: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let t = i as f64;
                vec![(t * 0.7).sin() * 5.0, (t * 1.3).cos() * 3.0 + t * 0.1]
            })
            .collect();
        let tree = ward_linkage(&pts);
        assert_eq!(tree.merges.len(), 39);
        for pair in tree.merges.windows(2) {
            assert!(pair[0].height <= pair[1].height);
        }
        let mut order = tree.leaf_order();
        order.sort_unstable();
        assert_eq!(order, (0..40).collect::<Vec<_>>());
        assert_eq!(tree.merges.last().unwrap().size, 40);
    }

    #[test]
    fn trivial_trees() {
        assert!(ward_linkage(&[]).leaf_order().is_empty());
        assert_eq!(ward_linkage(&points(&[3.0])).leaf_order(), vec![0]);
    }

    #[test]
    fn zscore_rows_standardises() {
        let mut rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 4.0, 4.0]];
        zscore_rows(&mut rows);
        assert_eq!(rows[0], vec![-1.0, 0.0, 1.0]);
        assert_eq!(rows[1], vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn palette_truncates_after_seven_subtypes() {
        let labels: Vec<String> = ["LumA", "LumB", "Her2", "Basal", "claudin-low", "Normal", "NC", "Extra"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let palette = SubtypePalette::from_labels(&labels);
        assert_eq!(palette.color_of("LumA"), Some(Color32::from_rgb(0, 0, 255)));
        assert_eq!(palette.color_of("NC"), Some(Color32::from_rgb(0, 0, 0)));
        assert_eq!(palette.color_of("Extra"), None);
        assert_eq!(palette.legend().count(), 7);
    }

    fn table() -> DataFrame {
        df!(
            "Age at Diagnosis" => &[45.0, 61.5, 70.1, 38.0, 52.3, 66.0],
            "Overall Survival (Months)" => &[140.0, 88.2, 20.5, 200.1, 97.0, 41.3],
            "Lymph nodes examined positive" => &[0i64, 3, 9, 0, 1, 5],
            "Pam50 + Claudin-low subtype" => &["LumA", "LumB", "Basal", "LumA", "Her2", "Basal"],
            "Cellularity" => &["High", "Low", "High", "Moderate", "Low", "High"],
        )
        .unwrap()
    }

    #[test]
    fn two_columns_give_two_by_n_matrix() {
        let df = table();
        let columns = vec![
            "Age at Diagnosis".to_string(),
            "Overall Survival (Months)".to_string(),
        ];
        let map = ClusterMap::build(&df, &columns, "Pam50 + Claudin-low subtype").unwrap();
        assert_eq!(map.shape(), (2, 6));
        assert_eq!(map.row_order.len(), 2);
        assert_eq!(map.col_order.len(), 6);
        assert_eq!(map.subtypes.len(), 6);
        assert_eq!(df.width(), 5);
    }

    #[test]
    fn fewer_than_two_columns_fail() {
        let df = table();
        for columns in [vec![], vec!["Age at Diagnosis".to_string()]] {
            let got = columns.len();
            match ClusterMap::build(&df, &columns, "Pam50 + Claudin-low subtype") {
                Err(ExplorerError::TooFewColumns { needed: 2, got: g }) => assert_eq!(g, got),
                other => panic!("expected TooFewColumns, got {:?}", other.map(|m| m.shape())),
            }
        }
    }

    #[test]
    fn non_numeric_column_fails() {
        let columns = vec!["Age at Diagnosis".to_string(), "Cellularity".to_string()];
        assert!(matches!(
            ClusterMap::build(&table(), &columns, "Pam50 + Claudin-low subtype"),
            Err(ExplorerError::NonNumeric(_))
        ));
    }
}
