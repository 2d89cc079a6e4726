use crate::data::{column_as_labels, unique_in_order};
use crate::error::Result;
use polars::prelude::DataFrame;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowLink {
    pub left: usize,
    pub right: usize,
    pub count: usize,
}

/// Patient counts flowing from the categories of one column to those of another.
#[derive(Debug, Clone)]
pub struct FlowDiagram {
    pub left_column: String,
    pub right_column: String,
    pub left: Vec<FlowNode>,
    pub right: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

/// Vertical extent of a node or band end, in unit height (0 = top).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub top: f64,
    pub bottom: f64,
}

impl Span {
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone)]
pub struct FlowLayout {
    pub left: Vec<Span>,
    pub right: Vec<Span>,
    /// Per link: span on the left node, span on the right node.
    pub bands: Vec<(Span, Span)>,
}

impl FlowDiagram {
    pub fn build(df: &DataFrame, left_column: &str, right_column: &str) -> Result<Self> {
        let left_labels = column_as_labels(df, left_column)?;
        let right_labels = column_as_labels(df, right_column)?;
        Ok(Self::from_labels(
            left_column,
            right_column,
            &left_labels,
            &right_labels,
        ))
    }

    pub fn from_labels(
        left_column: &str,
        right_column: &str,
        left_labels: &[String],
        right_labels: &[String],
    ) -> Self {
        let left_order = unique_in_order(left_labels);
        let right_order = unique_in_order(right_labels);
        let left_index: HashMap<&str, usize> = left_order
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let right_index: HashMap<&str, usize> = right_order
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let mut left_counts = vec![0usize; left_order.len()];
        let mut right_counts = vec![0usize; right_order.len()];
        let mut pair_counts: HashMap<(usize, usize), usize> = HashMap::new();

        for (l, r) in left_labels.iter().zip(right_labels.iter()) {
            let li = left_index[l.as_str()];
            let ri = right_index[r.as_str()];
            left_counts[li] += 1;
            right_counts[ri] += 1;
            *pair_counts.entry((li, ri)).or_insert(0) += 1;
        }

        let mut links: Vec<FlowLink> = pair_counts
            .into_iter()
            .map(|((left, right), count)| FlowLink { left, right, count })
            .collect();
        links.sort_by_key(|link| (link.left, link.right));

        let nodes = |order: Vec<String>, counts: Vec<usize>| {
            order
                .into_iter()
                .zip(counts)
                .map(|(label, count)| FlowNode { label, count })
                .collect::<Vec<_>>()
        };

        Self {
            left_column: left_column.to_string(),
            right_column: right_column.to_string(),
            left: nodes(left_order, left_counts),
            right: nodes(right_order, right_counts),
            links,
        }
    }

    pub fn total(&self) -> usize {
        self.left.iter().map(|n| n.count).sum()
    }

    /// Stacks nodes top to bottom with `gap` (unit height) between them, both sides
    /// sharing one count-to-height scale and centered vertically. The gap shrinks
    /// when a side has too many nodes for it.
    pub fn layout(&self, gap: f64) -> FlowLayout {
        let total = self.total().max(1) as f64;
        let most_nodes = self.left.len().max(self.right.len()).max(1);
        // Gaps never take more than half the height.
        let gap = match most_nodes {
            1 => gap,
            n => gap.min(0.5 / (n - 1) as f64),
        };
        let scale = (1.0 - gap * (most_nodes - 1) as f64) / total;

        let stack = |nodes: &[FlowNode]| {
            let used = nodes.iter().map(|n| n.count as f64 * scale).sum::<f64>()
                + gap * nodes.len().saturating_sub(1) as f64;
            let mut cursor = (1.0 - used) / 2.0;
            nodes
                .iter()
                .map(|n| {
                    let span = Span {
                        top: cursor,
                        bottom: cursor + n.count as f64 * scale,
                    };
                    cursor = span.bottom + gap;
                    span
                })
                .collect::<Vec<_>>()
        };
        let left = stack(&self.left);
        let right = stack(&self.right);

        // Bands leave each left node in right-node order and enter each right node in
        // left-node order, so no two bands overlap at either end.
        let mut left_cursor: Vec<f64> = left.iter().map(|s| s.top).collect();
        let mut left_ends = Vec::with_capacity(self.links.len());
        for link in &self.links {
            let h = link.count as f64 * scale;
            let top = left_cursor[link.left];
            left_cursor[link.left] += h;
            left_ends.push(Span { top, bottom: top + h });
        }

        let mut by_right: Vec<usize> = (0..self.links.len()).collect();
        by_right.sort_by_key(|&i| (self.links[i].right, self.links[i].left));
        let mut right_cursor: Vec<f64> = right.iter().map(|s| s.top).collect();
        let mut right_ends = vec![Span { top: 0.0, bottom: 0.0 }; self.links.len()];
        for i in by_right {
            let link = &self.links[i];
            let h = link.count as f64 * scale;
            let top = right_cursor[link.right];
            right_cursor[link.right] += h;
            right_ends[i] = Span { top, bottom: top + h };
        }

        FlowLayout {
            left,
            right,
            bands: left_ends.into_iter().zip(right_ends).collect(),
        }
    }
}

/// Smooth 0..1 ramp used to shape the bands between the two node columns.
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn diagram() -> FlowDiagram {
        FlowDiagram::from_labels(
            "Pam50 + Claudin-low subtype",
            "Chemotherapy",
            &labels(&["LumA", "Basal", "LumA", "Her2", "Basal", "LumA"]),
            &labels(&["NO", "YES", "YES", "NO", "YES", "NO"]),
        )
    }

    #[test]
    fn counts_are_conserved_per_node() {
        let d = diagram();
        for (i, node) in d.left.iter().enumerate() {
            let out: usize = d.links.iter().filter(|l| l.left == i).map(|l| l.count).sum();
            assert_eq!(out, node.count, "left node {}", node.label);
        }
        for (i, node) in d.right.iter().enumerate() {
            let inflow: usize = d.links.iter().filter(|l| l.right == i).map(|l| l.count).sum();
            assert_eq!(inflow, node.count, "right node {}", node.label);
        }
        assert_eq!(d.total(), 6);
    }

    #[test]
    fn nodes_keep_first_appearance_order() {
        let d = diagram();
        let left: Vec<&str> = d.left.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(left, vec!["LumA", "Basal", "Her2"]);
        assert_eq!(d.left[0].count, 3);
        assert_eq!(d.right[0].label, "NO");
    }

    #[test]
    fn layout_bands_fill_their_nodes() {
        let d = diagram();
        let layout = d.layout(0.05);
        for (i, span) in layout.left.iter().enumerate() {
            let filled: f64 = d
                .links
                .iter()
                .zip(&layout.bands)
                .filter(|(l, _)| l.left == i)
                .map(|(_, (l, _))| l.height())
                .sum();
            assert!((filled - span.height()).abs() < 1e-9);
        }
        for span in layout.left.iter().chain(layout.right.iter()) {
            assert!(span.top >= 0.0 && span.bottom <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn many_categories_stay_inside_the_unit_height() {
        let right: Vec<String> = (0..40).map(|i| format!("grade {i}")).collect();
        let left = vec!["LumA".to_string(); right.len()];
        let d = FlowDiagram::from_labels("Pam50 + Claudin-low subtype", "Grade", &left, &right);
        let layout = d.layout(0.05);
        for span in layout.left.iter().chain(layout.right.iter()) {
            assert!(span.top >= -1e-9 && span.bottom <= 1.0 + 1e-9, "{span:?}");
            assert!(span.height() > 0.0);
        }
        for pair in layout.right.windows(2) {
            assert!(pair[0].bottom < pair[1].top);
        }
    }

    #[test]
    fn smoothstep_is_bounded() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(2.0), 1.0);
    }
}
