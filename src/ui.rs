use crate::cluster::{ClusterMap, MIN_COLUMNS};
use crate::columns;
use crate::data::{LoadedTable, cell_text, load_clinical_table};
use crate::error::ExplorerError;
use crate::explorer::ParallelCoordinates;
use crate::flow::FlowDiagram;
use crate::heatmap::CorrelationMatrix;
use crate::models::{AppState, CategoryState, ClusterState, Derived, ExplorerState};
use crate::plots;
use crate::quiz::{self, LIFETIME_DEATH, LIFETIME_DIAGNOSIS};
use crate::violin::ViolinPlot;
use eframe::egui;
use eframe::egui::{Direction, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};
use poll_promise::Promise;
use polars::prelude::DataFrame;
use rfd::FileDialog;
use std::path::PathBuf;
use std::time::Duration;

pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=6gm494IIHxQ";
const VIOLIN_TICK_ROTATION: f32 = 20.0;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn request_table_promise(path: PathBuf, infer_schema_length: usize) -> Promise<Result<LoadedTable, String>> {
    Promise::spawn_thread("table_load", move || {
        load_clinical_table(&path, infer_schema_length).map_err(|e| e.to_string())
    })
}

fn request_cluster_promise(df: DataFrame, selection: Vec<String>) -> Promise<Result<ClusterMap, String>> {
    Promise::spawn_thread("cluster_map", move || {
        ClusterMap::build(&df, &selection, columns::SUBTYPE).map_err(|e| failed("cluster", e))
    })
}

fn failed(section: &str, err: ExplorerError) -> String {
    tracing::warn!(section, error = %err, "view could not be built");
    err.to_string()
}

pub fn start_load(state: &mut AppState) {
    tracing::debug!(path = %state.data_path.display(), "requesting table load");
    state.load_error = None;
    state.load_promise = Some(request_table_promise(
        state.data_path.clone(),
        state.settings.infer_schema_length,
    ));
}

pub fn poll_table_load(ctx: &egui::Context, state: &mut AppState) {
    if let Some(promise) = state.load_promise.take() {
        match promise.try_take() {
            Ok(Ok(table)) => {
                state.set_table(table);
                ctx.request_repaint();
            }
            Ok(Err(err)) => {
                tracing::error!(path = %state.data_path.display(), error = %err, "failed to load clinical table");
                state.load_error = Some(err);
            }
            Err(promise) => {
                state.load_promise = Some(promise);
                ctx.request_repaint_after(POLL_INTERVAL);
            }
        }
    }
}

fn error_label(ui: &mut Ui, message: &str) {
    ui.colored_label(egui::Color32::RED, message);
}

/// Removable chips for the current selection plus a drop-down of the remaining options.
fn multi_select(ui: &mut Ui, id: &str, options: &[&str], selected: &mut Vec<String>) -> bool {
    let mut changed = false;
    ui.horizontal_wrapped(|ui| {
        let mut remove = None;
        for (i, name) in selected.iter().enumerate() {
            if ui.button(format!("{name}  ✖")).clicked() {
                remove = Some(i);
            }
        }
        if let Some(i) = remove {
            selected.remove(i);
            changed = true;
        }

        egui::ComboBox::from_id_salt(id)
            .selected_text("Add column…")
            .width(260.0)
            .show_ui(ui, |ui| {
                let remaining: Vec<&str> = options
                    .iter()
                    .copied()
                    .filter(|o| !selected.iter().any(|s| s.as_str() == *o))
                    .collect();
                for option in remaining {
                    if ui.selectable_label(false, option).clicked() {
                        selected.push(option.to_string());
                        changed = true;
                    }
                }
            });
    });
    changed
}

fn select_box(ui: &mut Ui, id: &str, options: &[&str], selected: &mut String) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected.clone())
        .width(300.0)
        .show_ui(ui, |ui| {
            for option in options {
                ui.selectable_value(selected, option.to_string(), *option);
            }
        });
}

fn number_input(ui: &mut Ui, value: &mut f64) {
    ui.horizontal(|ui| {
        ui.add(
            egui::DragValue::new(value)
                .range(quiz::MIN_GUESS..=quiz::MAX_GUESS)
                .speed(quiz::GUESS_STEP)
                .fixed_decimals(2),
        );
        if ui.small_button("−").clicked() {
            *value = quiz::clamp_guess(*value - quiz::GUESS_STEP);
        }
        if ui.small_button("+").clicked() {
            *value = quiz::clamp_guess(*value + quiz::GUESS_STEP);
        }
    });
}

pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    let idle = state.load_promise.is_none();

    ui.label("Data file:");
    ui.monospace(state.data_path.display().to_string());
    ui.add_space(8.0);

    if let Some(table) = &state.table {
        ui.label(format!("{} patients × {} columns", table.df.height(), table.df.width()));
        ui.label(format!(
            "{} of {} rows dropped (missing values)",
            table.rows_dropped, table.rows_read
        ));
    } else if idle && state.load_error.is_none() {
        ui.label("No table loaded.");
    }

    if !idle {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Loading…");
        });
    }

    ui.separator();

    if ui.add_enabled(idle, egui::Button::new("⟳ Reload")).clicked() {
        start_load(state);
    }
    if ui.add_enabled(idle, egui::Button::new("📂 Open file…")).clicked() {
        if let Some(path) = FileDialog::new()
            .add_filter("Clinical table", &["txt", "tsv"])
            .pick_file()
        {
            state.data_path = path;
            start_load(state);
        }
    }
}

pub fn page(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("METABRIC patient data visualizations").size(28.0).strong());
    ui.label(RichText::new("Created by Carson Broeker").size(18.0));
    ui.add_space(12.0);

    if let Some(err) = &state.load_error {
        error_label(ui, &format!("Could not load {}: {}", state.data_path.display(), err));
        return;
    }

    let Some(table) = state.table.as_ref() else {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Loading patient data…");
        });
        return;
    };
    let df = &table.df;
    let generation = state.generation;

    table_viewer(ui, df, &mut state.show_table);
    ui.separator();
    explorer_section(ui, df, generation, &mut state.explorer);
    ui.separator();
    flow_section(ui, df, generation, &mut state.flow);
    subtype_note(ui);
    ui.separator();
    quiz_section(ui, &mut state.guesses);
    ui.separator();
    violin_section(ui, df, generation, &mut state.violin);
    ui.separator();
    cluster_section(ui, df, generation, &mut state.cluster);
    ui.separator();
    heatmap_section(ui, df, generation, &mut state.heatmap);
}

fn table_viewer(ui: &mut Ui, df: &DataFrame, show: &mut bool) {
    ui.checkbox(show, "Show full METABRIC patient data table.");
    if !*show {
        return;
    }

    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let rows = df.height();

    ui.push_id("patient_table", |ui| {
        egui::ScrollArea::horizontal().show(ui, |ui| {
            let mut builder = TableBuilder::new(ui)
                .striped(true)
                .max_scroll_height(420.0)
                .cell_layout(Layout::centered_and_justified(Direction::LeftToRight));

            for _ in &names {
                builder = builder.column(Column::auto().at_least(60.0));
            }

            builder
                .header(20.0, |mut header| {
                    for name in &names {
                        header.col(|ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, rows, |mut row| {
                        let row_idx = row.index();
                        for name in &names {
                            row.col(|ui| {
                                ui.label(cell_text(df, name, row_idx));
                            });
                        }
                    });
                });
        });
    });
}

fn explorer_section(ui: &mut Ui, df: &DataFrame, generation: u64, st: &mut ExplorerState) {
    ui.label("Explore different associations between variables in the METABRIC dataset.");
    if multi_select(ui, "explorer_columns", &columns::EXPLORER_OPTIONS, &mut st.columns) {
        st.brushes.retain(|name, _| st.columns.contains(name));
    }

    if st.columns.is_empty() {
        ui.label("Select at least one column to draw the explorer.");
        return;
    }

    let key = (generation, st.columns.clone());
    let view = st.view.get_or_update(&key, || {
        tracing::debug!(columns = ?key.1, "building parallel coordinates");
        ParallelCoordinates::build(df, &key.1).map_err(|e| failed("explorer", e))
    });

    match view {
        Ok(view) => {
            ui.horizontal(|ui| {
                ui.small("Drag along an axis to brush, double-click an axis to clear it.");
                if ui.small_button("Clear brushes").clicked() {
                    st.brushes.clear();
                }
            });
            plots::parallel_coordinates(ui, view, &mut st.brushes, &mut st.drag);
        }
        Err(err) => error_label(ui, err),
    }
}

fn flow_section(ui: &mut Ui, df: &DataFrame, generation: u64, st: &mut CategoryState<FlowDiagram>) {
    ui.label(
        "Did you know that there are many different subtypes of breast cancer? Check different \
         options to see how different subtypes funnel to other categories.",
    );
    select_box(ui, "flow_column", &columns::CATEGORY_OPTIONS, &mut st.column);

    let key = (generation, st.column.clone());
    let view = st.view.get_or_update(&key, || {
        tracing::debug!(column = %key.1, "building flow diagram");
        FlowDiagram::build(df, columns::SUBTYPE, &key.1).map_err(|e| failed("flow", e))
    });

    match view {
        Ok(diagram) => plots::flow_diagram(ui, diagram),
        Err(err) => error_label(ui, err),
    }
}

fn subtype_note(ui: &mut Ui) {
    ui.label(
        "These subtypes are referred to as 'intrinsic' subtypes which are determined by examining \
         gene expression signatures of each breast tumor. Most often in the clinic, treatment \
         decisions are based on the protein expression or lack thereof of three different genes: \
         the estrogen receptor, the progesterone receptor, and HER2. If you lack expression of all \
         of these genes, you are referred to as triple-negative. Watch the video below to learn more!",
    );
    ui.hyperlink_to("▶ Breast cancer subtypes explained (video)", VIDEO_URL);
}

fn quiz_section(ui: &mut Ui, guesses: &mut [f64; 2]) {
    for (quiz, guess) in [LIFETIME_DIAGNOSIS, LIFETIME_DEATH].iter().zip(guesses.iter_mut()) {
        ui.add_space(6.0);
        ui.label(quiz.question);
        number_input(ui, guess);
        ui.label(quiz.feedback(*guess));
    }
}

fn violin_section(ui: &mut Ui, df: &DataFrame, generation: u64, st: &mut CategoryState<ViolinPlot>) {
    ui.label(
        "However, odds of survival have increased dramatically in recent history for breast \
         cancer. Odds of survival also depend on subtype of breast cancer diagnosed and other \
         factors. Vary the parameters to view the different rates of survival by different factors.",
    );
    select_box(ui, "violin_column", &columns::CATEGORY_OPTIONS, &mut st.column);

    let key = (generation, st.column.clone());
    let view = st.view.get_or_update(&key, || {
        tracing::debug!(column = %key.1, "building violin plot");
        ViolinPlot::build(df, &key.1, columns::OVERALL_SURVIVAL_MONTHS).map_err(|e| failed("violin", e))
    });

    match view {
        Ok(plot) => plots::violin_plot(ui, plot, VIOLIN_TICK_ROTATION),
        Err(err) => error_label(ui, err),
    }
}

fn cluster_section(ui: &mut Ui, df: &DataFrame, generation: u64, st: &mut ClusterState) {
    ui.label(
        "Explore how the different numeric variables in the dataset cluster together. What \
         interesting associations do you find? Do certain subtypes of breast cancer cluster with \
         different variables? Please use at least two variables.",
    );
    multi_select(ui, "cluster_columns", &columns::CLUSTER_OPTIONS, &mut st.columns);

    st.poll();

    let key = (generation, st.columns.clone());
    if st.needs_request(&key) {
        tracing::debug!(columns = ?key.1, "requesting cluster map");
        if st.columns.len() < MIN_COLUMNS {
            let result = ClusterMap::build(df, &st.columns, columns::SUBTYPE).map_err(|e| failed("cluster", e));
            st.view = Some((key.clone(), result));
        } else {
            st.pending = Some((key.clone(), request_cluster_promise(df.clone(), st.columns.clone())));
        }
    }

    match st.current(&key) {
        Some(Ok(map)) => plots::cluster_map(ui, map),
        Some(Err(err)) => error_label(ui, err),
        None => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Clustering patients…");
            });
            ui.ctx().request_repaint_after(POLL_INTERVAL);
        }
    }
}

fn heatmap_section(
    ui: &mut Ui,
    df: &DataFrame,
    generation: u64,
    cache: &mut Derived<u64, Result<CorrelationMatrix, String>>,
) {
    ui.label(
        "If you are having trouble seeing these correlations, look at the heatmap below that \
         shows the correlation value between each numeric parameter.",
    );
    let view = cache.get_or_update(&generation, || {
        tracing::debug!("building correlation matrix");
        CorrelationMatrix::from_table(df).map_err(|e| failed("heatmap", e))
    });

    match view {
        Ok(matrix) => plots::correlation_heatmap(ui, matrix),
        Err(err) => error_label(ui, err),
    }
}
