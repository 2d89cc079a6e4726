use crate::cluster::{ClusterMap, Dendrogram, Z_LIMIT};
use crate::colormap::{categorical, icefire};
use crate::explorer::{Brushes, ParallelCoordinates};
use crate::flow::{FlowDiagram, smoothstep};
use crate::heatmap::CorrelationMatrix;
use crate::models::BrushDrag;
use crate::violin::{MAX_HALF_WIDTH, ViolinPlot};
use eframe::egui;
use eframe::egui::epaint::TextShape;
use eframe::egui::{Align2, Color32, FontId, Mesh, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2};
use eframe::egui::emath::Rot2;
use egui_plot::{BoxElem, BoxPlot, BoxSpread, Line, Plot, PlotPoint, PlotPoints, Polygon};

const LABEL_FONT: f32 = 12.0;

fn text_color(ui: &Ui) -> Color32 {
    ui.visuals().text_color()
}

fn contrast_on(bg: Color32) -> Color32 {
    let luma = 0.299 * bg.r() as f32 + 0.587 * bg.g() as f32 + 0.114 * bg.b() as f32;
    if luma > 140.0 { Color32::BLACK } else { Color32::WHITE }
}

/// Paints `text` rotated by `degrees` (counter-clockwise on screen) with the top
/// center of its rotated bounding box on `anchor`.
fn rotated_label(painter: &Painter, anchor: Pos2, text: &str, degrees: f32, color: Color32) {
    let galley = painter.layout_no_wrap(text.to_owned(), FontId::proportional(LABEL_FONT), color);
    let angle = -degrees.to_radians();
    let rot = Rot2::from_angle(angle);
    let size = galley.size();
    let corners = [
        Vec2::ZERO,
        rot * Vec2::new(size.x, 0.0),
        rot * Vec2::new(0.0, size.y),
        rot * size,
    ];
    let min_x = corners.iter().map(|c| c.x).fold(f32::INFINITY, f32::min);
    let max_x = corners.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = corners.iter().map(|c| c.y).fold(f32::INFINITY, f32::min);
    let origin = anchor - Vec2::new((min_x + max_x) / 2.0, min_y);
    painter.add(TextShape::new(origin, galley, color).with_angle(angle));
}

fn colorbar(painter: &Painter, rect: Rect, vmin: f64, vmax: f64, color: Color32) {
    let steps = 64;
    let h = rect.height() / steps as f32;
    for i in 0..steps {
        let t = (i as f64 + 0.5) / steps as f64;
        let value = vmax - t * (vmax - vmin);
        if let Some(fill) = icefire(value, vmin, vmax) {
            let top = rect.top() + i as f32 * h;
            painter.rect_filled(
                Rect::from_min_max(Pos2::new(rect.left(), top), Pos2::new(rect.right(), top + h + 0.5)),
                0.0,
                fill,
            );
        }
    }
    for (t, value) in [(0.0, vmax), (0.5, (vmin + vmax) / 2.0), (1.0, vmin)] {
        let y = rect.top() + rect.height() * t;
        painter.text(
            Pos2::new(rect.right() + 4.0, y),
            Align2::LEFT_CENTER,
            format!("{value:.1}"),
            FontId::proportional(LABEL_FONT - 1.0),
            color,
        );
    }
}

pub fn parallel_coordinates(
    ui: &mut Ui,
    view: &ParallelCoordinates,
    brushes: &mut Brushes,
    drag: &mut Option<BrushDrag>,
) {
    let width = ui.available_width().max(300.0);
    let (rect, response) = ui.allocate_exact_size(Vec2::new(width, 380.0), Sense::click_and_drag());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);

    let plot = Rect::from_min_max(rect.min + Vec2::new(70.0, 36.0), rect.max - Vec2::new(70.0, 24.0));
    let n_axes = view.axes.len();
    let axis_x = |i: usize| {
        if n_axes > 1 {
            plot.left() + plot.width() * i as f32 / (n_axes - 1) as f32
        } else {
            plot.center().x
        }
    };
    let to_y = |t: f64| plot.bottom() - plot.height() * t as f32;
    let from_y = |y: f32| (((plot.bottom() - y) / plot.height()) as f64).clamp(0.0, 1.0);
    let nearest_axis = |x: f32| {
        (0..n_axes)
            .min_by(|a, b| (axis_x(*a) - x).abs().total_cmp(&(axis_x(*b) - x).abs()))
            .filter(|i| (axis_x(*i) - x).abs() < 24.0)
    };

    if response.drag_started() {
        if let Some(axis) = response.interact_pointer_pos().and_then(|p| nearest_axis(p.x).map(|i| (i, p))) {
            *drag = Some(BrushDrag {
                axis: view.axes[axis.0].name.clone(),
                start: from_y(axis.1.y),
            });
        }
    }
    if response.dragged() {
        if let (Some(d), Some(pos)) = (drag.as_ref(), response.interact_pointer_pos()) {
            brushes.insert(d.axis.clone(), (d.start, from_y(pos.y)));
        }
    }
    if response.drag_stopped() {
        *drag = None;
    }
    if response.double_clicked() {
        if let Some(i) = response.interact_pointer_pos().and_then(|p| nearest_axis(p.x)) {
            brushes.remove(&view.axes[i].name);
        }
    }

    let selected = view.selected_rows(brushes);
    let polyline = |row: usize| -> Vec<Pos2> {
        view.axes
            .iter()
            .enumerate()
            .map(|(i, axis)| Pos2::new(axis_x(i), to_y(axis.positions[row])))
            .collect()
    };

    let dimmed = Color32::from_rgba_unmultiplied(128, 128, 128, 18);
    for row in (0..view.rows).filter(|r| !selected[*r]) {
        painter.add(Shape::line(polyline(row), Stroke::new(1.0, dimmed)));
    }
    for row in (0..view.rows).filter(|r| selected[*r]) {
        let shade = view.axes.first().map(|a| a.positions[row]).unwrap_or(0.5);
        let color = icefire(shade, 0.0, 1.0).unwrap_or(Color32::LIGHT_BLUE).gamma_multiply(0.55);
        painter.add(Shape::line(polyline(row), Stroke::new(1.0, color)));
    }

    let fg = text_color(ui);
    for (i, axis) in view.axes.iter().enumerate() {
        let x = axis_x(i);
        painter.line_segment([Pos2::new(x, plot.top()), Pos2::new(x, plot.bottom())], Stroke::new(1.5, fg));
        painter.text(
            Pos2::new(x, plot.top() - 10.0),
            Align2::CENTER_BOTTOM,
            &axis.name,
            FontId::proportional(LABEL_FONT),
            fg,
        );
        for (t, label) in axis.ticks() {
            let y = to_y(t);
            painter.line_segment([Pos2::new(x - 4.0, y), Pos2::new(x, y)], Stroke::new(1.0, fg));
            painter.text(
                Pos2::new(x - 6.0, y),
                Align2::RIGHT_CENTER,
                label,
                FontId::proportional(LABEL_FONT - 2.0),
                fg,
            );
        }
        if let Some((lo, hi)) = brushes.get(&axis.name) {
            let band = Rect::from_x_y_ranges(x - 7.0..=x + 7.0, to_y(lo.max(*hi))..=to_y(lo.min(*hi)));
            painter.rect_filled(band, 2.0, Color32::from_rgba_unmultiplied(255, 255, 255, 50));
            painter.rect_stroke(band, 2.0, Stroke::new(1.0, fg), egui::StrokeKind::Outside);
        }
    }

    let kept = selected.iter().filter(|s| **s).count();
    painter.text(
        Pos2::new(rect.right() - 8.0, rect.bottom() - 6.0),
        Align2::RIGHT_BOTTOM,
        format!("{kept} / {} patients", view.rows),
        FontId::proportional(LABEL_FONT - 1.0),
        fg,
    );
}

pub fn flow_diagram(ui: &mut Ui, diagram: &FlowDiagram) {
    let width = ui.available_width().max(400.0);
    let (rect, _) = ui.allocate_exact_size(Vec2::new(width, 460.0), Sense::hover());
    let painter = ui.painter_at(rect);
    let fg = text_color(ui);

    let plot = Rect::from_min_max(rect.min + Vec2::new(200.0, 12.0), rect.max - Vec2::new(200.0, 12.0));
    let node_w = 14.0;
    let layout = diagram.layout(0.02);
    let to_y = |t: f64| plot.top() + plot.height() * t as f32;
    let left_x = plot.left();
    let right_x = plot.right() - node_w;
    let colors: Vec<Color32> = (0..diagram.left.len())
        .map(|i| categorical(i, diagram.left.len()))
        .collect();

    for (link, (from, to)) in diagram.links.iter().zip(&layout.bands) {
        let color = colors[link.left].gamma_multiply(0.45);
        let x0 = left_x + node_w;
        let x1 = right_x;
        let segments = 32;
        let mut mesh = Mesh::default();
        for s in 0..=segments {
            let t = s as f64 / segments as f64;
            let f = smoothstep(t);
            let x = x0 + (x1 - x0) * t as f32;
            let top = from.top + (to.top - from.top) * f;
            let bottom = from.bottom + (to.bottom - from.bottom) * f;
            mesh.colored_vertex(Pos2::new(x, to_y(top)), color);
            mesh.colored_vertex(Pos2::new(x, to_y(bottom)), color);
            if s > 0 {
                let base = (2 * s - 2) as u32;
                mesh.add_triangle(base, base + 1, base + 2);
                mesh.add_triangle(base + 1, base + 2, base + 3);
            }
        }
        painter.add(Shape::mesh(mesh));
    }

    for (i, (node, span)) in diagram.left.iter().zip(&layout.left).enumerate() {
        let r = Rect::from_x_y_ranges(left_x..=left_x + node_w, to_y(span.top)..=to_y(span.bottom));
        painter.rect_filled(r, 0.0, colors[i]);
        painter.text(
            Pos2::new(left_x - 6.0, r.center().y),
            Align2::RIGHT_CENTER,
            format!("{} ({})", node.label, node.count),
            FontId::proportional(LABEL_FONT),
            fg,
        );
    }
    for (node, span) in diagram.right.iter().zip(&layout.right) {
        let r = Rect::from_x_y_ranges(right_x..=right_x + node_w, to_y(span.top)..=to_y(span.bottom));
        painter.rect_filled(r, 0.0, Color32::from_gray(170));
        painter.text(
            Pos2::new(right_x + node_w + 6.0, r.center().y),
            Align2::LEFT_CENTER,
            format!("{} ({})", node.label, node.count),
            FontId::proportional(LABEL_FONT),
            fg,
        );
    }
}

pub fn violin_plot(ui: &mut Ui, plot: &ViolinPlot, tick_rotation: f32) {
    let n = plot.violins.len();
    let response = Plot::new("violin_plot")
        .height(360.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .include_x(-0.6)
        .include_x(n as f64 - 0.4)
        .show_grid([false, true])
        .x_axis_formatter(|_, _| String::new())
        .y_axis_label(plot.value_column.clone())
        .show(ui, |plot_ui| {
            let mut boxes = Vec::with_capacity(n);
            for (i, violin) in plot.violins.iter().enumerate() {
                let x = i as f64;
                let color = categorical(i, n);
                if violin.outline.len() < 2 {
                    if let Some((y, _)) = violin.outline.first() {
                        plot_ui.line(
                            Line::new(PlotPoints::from(vec![[x - MAX_HALF_WIDTH, *y], [x + MAX_HALF_WIDTH, *y]]))
                                .color(color)
                                .name(&violin.label),
                        );
                    }
                    continue;
                }
                let mut outline: Vec<[f64; 2]> =
                    violin.outline.iter().map(|(y, w)| [x + w, *y]).collect();
                outline.extend(violin.outline.iter().rev().map(|(y, w)| [x - w, *y]));
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(outline))
                        .fill_color(color.gamma_multiply(0.6))
                        .stroke(Stroke::new(1.0, color))
                        .name(&violin.label),
                );

                let s = violin.stats;
                boxes.push(
                    BoxElem::new(x, BoxSpread::new(s.lower_whisker, s.q1, s.median, s.q3, s.upper_whisker))
                        .box_width(0.07)
                        .whisker_width(0.0)
                        .fill(Color32::from_gray(40))
                        .stroke(Stroke::new(1.0, Color32::from_gray(210)))
                        .name(format!("{} (n = {})", violin.label, violin.n)),
                );
            }
            plot_ui.box_plot(BoxPlot::new(boxes));
        });

    let (label_rect, _) = ui.allocate_exact_size(Vec2::new(ui.available_width(), 80.0), Sense::hover());
    let painter = ui.painter_at(label_rect);
    let fg = text_color(ui);
    for (i, violin) in plot.violins.iter().enumerate() {
        let x = response.transform.position_from_point(&PlotPoint::new(i as f64, 0.0)).x;
        rotated_label(&painter, Pos2::new(x, label_rect.top() + 4.0), &violin.label, tick_rotation, fg);
    }
    painter.text(
        Pos2::new(label_rect.center().x, label_rect.bottom() - 4.0),
        Align2::CENTER_BOTTOM,
        &plot.group_column,
        FontId::proportional(LABEL_FONT + 1.0),
        fg,
    );
}

/// Draws `tree` as a dendrogram; `along` maps a leaf slot to the screen coordinate
/// along the leaves, `depth` maps a merge height to the coordinate away from them.
fn dendrogram(
    painter: &Painter,
    tree: &Dendrogram,
    stroke: Stroke,
    horizontal_leaves: bool,
    along: impl Fn(f64) -> f32,
    depth: impl Fn(f64) -> f32,
) {
    let positions = tree.node_positions();
    let point = |slot: f64, height: f64| {
        if horizontal_leaves {
            Pos2::new(along(slot), depth(height))
        } else {
            Pos2::new(depth(height), along(slot))
        }
    };
    for (i, merge) in tree.merges.iter().enumerate() {
        let (_, h) = positions[tree.n_leaves + i];
        let (lx, lh) = positions[merge.left];
        let (rx, rh) = positions[merge.right];
        painter.line_segment([point(lx, lh), point(lx, h)], stroke);
        painter.line_segment([point(lx, h), point(rx, h)], stroke);
        painter.line_segment([point(rx, h), point(rx, rh)], stroke);
    }
}

pub fn cluster_map(ui: &mut Ui, map: &ClusterMap) {
    let width = ui.available_width().max(500.0);
    let (rect, _) = ui.allocate_exact_size(Vec2::new(width, 520.0), Sense::hover());
    let painter = ui.painter_at(rect);
    let fg = text_color(ui);
    let (rows, cols) = map.shape();
    if rows == 0 || cols == 0 {
        return;
    }

    let heat = Rect::from_min_max(rect.min + Vec2::new(110.0, 110.0), rect.max - Vec2::new(230.0, 16.0));
    let strip = Rect::from_x_y_ranges(heat.x_range(), heat.top() - 16.0..=heat.top() - 3.0);
    let col_tree = Rect::from_x_y_ranges(heat.x_range(), rect.top() + 8.0..=strip.top() - 4.0);
    let row_tree = Rect::from_x_y_ranges(rect.left() + 8.0..=heat.left() - 4.0, heat.y_range());
    let cell_w = heat.width() / cols as f32;
    let cell_h = heat.height() / rows as f32;

    for (ri, &row) in map.row_order.iter().enumerate() {
        let y = heat.top() + ri as f32 * cell_h;
        for (ci, &col) in map.col_order.iter().enumerate() {
            if let Some(fill) = icefire(map.matrix[row][col], -Z_LIMIT, Z_LIMIT) {
                let x = heat.left() + ci as f32 * cell_w;
                painter.rect_filled(
                    Rect::from_min_size(Pos2::new(x, y), Vec2::new(cell_w + 0.5, cell_h)),
                    0.0,
                    fill,
                );
            }
        }
        painter.text(
            Pos2::new(heat.right() + 6.0, y + cell_h / 2.0),
            Align2::LEFT_CENTER,
            &map.row_labels[row],
            FontId::proportional(LABEL_FONT),
            fg,
        );
    }

    for (ci, &col) in map.col_order.iter().enumerate() {
        let fill = map.palette.color_of(&map.subtypes[col]).unwrap_or(Color32::WHITE);
        let x = heat.left() + ci as f32 * cell_w;
        painter.rect_filled(
            Rect::from_x_y_ranges(x..=x + cell_w + 0.5, strip.y_range()),
            0.0,
            fill,
        );
    }

    let stroke = Stroke::new(1.0, fg.gamma_multiply(0.8));
    let col_max = map.col_tree.max_height().max(f64::EPSILON);
    dendrogram(
        &painter,
        &map.col_tree,
        stroke,
        true,
        |slot| heat.left() + (slot as f32 + 0.5) * cell_w,
        |h| col_tree.bottom() - col_tree.height() * (h / col_max) as f32,
    );
    let row_max = map.row_tree.max_height().max(f64::EPSILON);
    dendrogram(
        &painter,
        &map.row_tree,
        stroke,
        false,
        |slot| heat.top() + (slot as f32 + 0.5) * cell_h,
        |h| row_tree.right() - row_tree.width() * (h / row_max) as f32,
    );

    let legend_left = heat.right() + 110.0;
    painter.text(
        Pos2::new(legend_left, rect.top() + 8.0),
        Align2::LEFT_TOP,
        "Intrinsic Subtype",
        FontId::proportional(LABEL_FONT + 2.0),
        fg,
    );
    for (i, (label, color)) in map.palette.legend().enumerate() {
        let y = rect.top() + 30.0 + i as f32 * 20.0;
        painter.rect_filled(
            Rect::from_min_size(Pos2::new(legend_left, y), Vec2::splat(14.0)),
            2.0,
            color,
        );
        painter.text(
            Pos2::new(legend_left + 20.0, y + 7.0),
            Align2::LEFT_CENTER,
            label,
            FontId::proportional(LABEL_FONT + 1.0),
            fg,
        );
    }

    let bar = Rect::from_min_size(Pos2::new(legend_left, heat.bottom() - 150.0), Vec2::new(14.0, 150.0));
    colorbar(&painter, bar, -Z_LIMIT, Z_LIMIT, fg);
}

pub fn correlation_heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    let k = matrix.size();
    if k == 0 {
        ui.label("No numeric columns to correlate.");
        return;
    }
    let margin_left = 210.0;
    let margin_bottom = 150.0;
    let cell = ((ui.available_width() - margin_left - 90.0) / k as f32).clamp(14.0, 56.0);
    let size = Vec2::new(margin_left + cell * k as f32 + 90.0, cell * k as f32 + margin_bottom + 10.0);
    let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
    let painter = ui.painter_at(rect);
    let fg = text_color(ui);
    let grid = Rect::from_min_size(rect.min + Vec2::new(margin_left, 10.0), Vec2::splat(cell * k as f32));

    for i in 0..k {
        for j in 0..k {
            let value = matrix.get(i, j);
            let r = Rect::from_min_size(
                grid.min + Vec2::new(j as f32 * cell, i as f32 * cell),
                Vec2::splat(cell),
            );
            if let Some(fill) = icefire(value, -1.0, 1.0) {
                painter.rect_filled(r, 0.0, fill);
                if cell >= 34.0 {
                    painter.text(
                        r.center(),
                        Align2::CENTER_CENTER,
                        format!("{value:.2}"),
                        FontId::proportional(LABEL_FONT - 2.0),
                        contrast_on(fill),
                    );
                }
            }
        }
        painter.text(
            Pos2::new(grid.left() - 6.0, grid.top() + (i as f32 + 0.5) * cell),
            Align2::RIGHT_CENTER,
            &matrix.labels[i],
            FontId::proportional(LABEL_FONT),
            fg,
        );
        rotated_label(
            &painter,
            Pos2::new(grid.left() + (i as f32 + 0.5) * cell, grid.bottom() + 6.0),
            &matrix.labels[i],
            90.0,
            fg,
        );
    }

    let bar = Rect::from_min_size(Pos2::new(grid.right() + 16.0, grid.top()), Vec2::new(14.0, grid.height()));
    colorbar(&painter, bar, -1.0, 1.0, fg);

    if let Some(pos) = response.hover_pos().filter(|p| grid.contains(*p)) {
        let j = (((pos.x - grid.left()) / cell) as usize).min(k - 1);
        let i = (((pos.y - grid.top()) / cell) as usize).min(k - 1);
        response.on_hover_text(format!(
            "{} × {}: {:.3}",
            matrix.labels[i],
            matrix.labels[j],
            matrix.get(i, j)
        ));
    }
}
