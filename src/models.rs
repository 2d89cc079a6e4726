use crate::cluster::ClusterMap;
use crate::columns;
use crate::config::Settings;
use crate::data::LoadedTable;
use crate::explorer::{Brushes, ParallelCoordinates};
use crate::flow::FlowDiagram;
use crate::heatmap::CorrelationMatrix;
use crate::quiz;
use crate::violin::ViolinPlot;
use poll_promise::Promise;
use std::path::PathBuf;

/// A value derived from the table and a widget selection, recomputed only when the key changes.
pub struct Derived<K, V> {
    key: Option<K>,
    value: Option<V>,
}

impl<K, V> Default for Derived<K, V> {
    fn default() -> Self {
        Self {
            key: None,
            value: None,
        }
    }
}

impl<K: PartialEq + Clone, V> Derived<K, V> {
    pub fn get_or_update(&mut self, key: &K, compute: impl FnOnce() -> V) -> &mut V {
        if self.key.as_ref() != Some(key) {
            self.key = Some(key.clone());
            self.value = None;
        }
        self.value.get_or_insert_with(compute)
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.value = None;
    }
}

/// Table generation plus a selection; bumping the generation invalidates every view.
pub type ViewKey<S> = (u64, S);

pub struct BrushDrag {
    pub axis: String,
    pub start: f64,
}

pub struct ExplorerState {
    pub columns: Vec<String>,
    pub brushes: Brushes,
    pub drag: Option<BrushDrag>,
    pub view: Derived<ViewKey<Vec<String>>, Result<ParallelCoordinates, String>>,
}

pub struct CategoryState<V> {
    pub column: String,
    pub view: Derived<ViewKey<String>, Result<V, String>>,
}

impl<V> CategoryState<V> {
    fn new(column: &str) -> Self {
        Self {
            column: column.to_string(),
            view: Derived::default(),
        }
    }
}

pub struct ClusterState {
    pub columns: Vec<String>,
    pub pending: Option<(ViewKey<Vec<String>>, Promise<Result<ClusterMap, String>>)>,
    pub view: Option<(ViewKey<Vec<String>>, Result<ClusterMap, String>)>,
}

impl ClusterState {
    /// Moves a finished background job into `view`.
    pub fn poll(&mut self) {
        if let Some((key, promise)) = self.pending.take() {
            match promise.try_take() {
                Ok(result) => self.view = Some((key, result)),
                Err(promise) => self.pending = Some((key, promise)),
            }
        }
    }

    /// At most one job runs at a time: a stale view is re-requested once the
    /// in-flight job has finished.
    pub fn needs_request(&self, key: &ViewKey<Vec<String>>) -> bool {
        let current = self.view.as_ref().is_some_and(|(k, _)| k == key);
        !current && self.pending.is_none()
    }

    pub fn current(&self, key: &ViewKey<Vec<String>>) -> Option<&Result<ClusterMap, String>> {
        self.view.as_ref().filter(|(k, _)| k == key).map(|(_, v)| v)
    }
}

pub struct AppState {
    pub settings: Settings,
    pub data_path: PathBuf,
    pub table: Option<LoadedTable>,
    pub generation: u64,
    pub load_error: Option<String>,
    pub load_promise: Option<Promise<Result<LoadedTable, String>>>,
    pub show_table: bool,
    pub explorer: ExplorerState,
    pub flow: CategoryState<FlowDiagram>,
    pub guesses: [f64; 2],
    pub violin: CategoryState<ViolinPlot>,
    pub cluster: ClusterState,
    pub heatmap: Derived<u64, Result<CorrelationMatrix, String>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            data_path: settings.data_path.clone(),
            settings,
            table: None,
            generation: 0,
            load_error: None,
            load_promise: None,
            show_table: false,
            explorer: ExplorerState {
                columns: columns::owned(&columns::EXPLORER_DEFAULT),
                brushes: Brushes::new(),
                drag: None,
                view: Derived::default(),
            },
            flow: CategoryState::new(columns::CATEGORY_OPTIONS[0]),
            guesses: [quiz::DEFAULT_GUESS; 2],
            violin: CategoryState::new(columns::CATEGORY_OPTIONS[0]),
            cluster: ClusterState {
                columns: columns::owned(&columns::CLUSTER_DEFAULT),
                pending: None,
                view: None,
            },
            heatmap: Derived::default(),
        }
    }

    /// Installs a freshly loaded table and drops every view built from the previous one.
    pub fn set_table(&mut self, table: LoadedTable) {
        self.table = Some(table);
        self.generation += 1;
        self.load_error = None;
        self.explorer.brushes.clear();
        self.explorer.drag = None;
        self.explorer.view.clear();
        self.flow.view.clear();
        self.violin.view.clear();
        self.cluster.pending = None;
        self.cluster.view = None;
        self.heatmap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn derived_recomputes_only_on_key_change() {
        let mut cache: Derived<u32, usize> = Derived::default();
        let mut calls = 0;
        assert_eq!(*cache.get_or_update(&1, || { calls += 1; 10 }), 10);
        assert_eq!(*cache.get_or_update(&1, || { calls += 1; 20 }), 10);
        assert_eq!(*cache.get_or_update(&2, || { calls += 1; 30 }), 30);
        assert_eq!(calls, 2);
        cache.clear();
        assert_eq!(*cache.get_or_update(&2, || 40), 40);
    }

    #[test]
    fn cluster_jobs_run_one_at_a_time() {
        let mut st = ClusterState {
            columns: columns::owned(&columns::CLUSTER_DEFAULT),
            pending: None,
            view: None,
        };
        let first: ViewKey<Vec<String>> = (1, vec!["Age at Diagnosis".into(), "Cohort".into()]);
        let second: ViewKey<Vec<String>> = (1, vec!["Age at Diagnosis".into(), "Tumor Size".into()]);

        assert!(st.needs_request(&first));
        st.pending = Some((first.clone(), Promise::from_ready(Err("slow".to_string()))));
        assert!(!st.needs_request(&second));
        assert!(st.current(&second).is_none());

        st.poll();
        assert!(st.pending.is_none());
        assert!(matches!(st.current(&first), Some(Err(e)) if e == "slow"));
        assert!(!st.needs_request(&first));
        assert!(st.needs_request(&second));
    }

    #[test]
    fn new_table_bumps_generation_and_clears_brushes() {
        let mut state = AppState::new(Settings::default());
        state.explorer.brushes.insert("Age at Diagnosis".into(), (0.1, 0.4));
        state.set_table(LoadedTable {
            path: PathBuf::from("x.txt"),
            df: df!("Age at Diagnosis" => &[50.0]).unwrap(),
            rows_read: 1,
            rows_dropped: 0,
        });
        assert_eq!(state.generation, 1);
        assert!(state.explorer.brushes.is_empty());
        assert_eq!(state.explorer.columns.len(), 3);
        assert_eq!(state.cluster.columns.len(), 4);
        assert_eq!(state.guesses, [50.0, 50.0]);
    }
}
