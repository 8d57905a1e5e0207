use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::chart::{build_chart, ChartError, ChartKind, ChartOption};
use crate::config::DashboardConfig;
use crate::data::datetime::{normalize, ColumnOutcome};
use crate::data::filter::{apply_filters, init_filter_state, FilterState};
use crate::data::loader::{load_file, table_name};
use crate::data::model::Table;
use crate::data::pivot::pivot;
use crate::data::reduce::Reducer;
use crate::data::types::{classify, ColumnTypes};

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// A message surfaced to the user after an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Selections
// ---------------------------------------------------------------------------

/// Current chart selection. Transient: rebuilt when the dataset changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSelection {
    pub x_axis: Option<String>,
    pub y_axes: Vec<String>,
    pub chart_kind: ChartKind,
    pub reducer: Reducer,
}

/// Pivot columns picked while grouping is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingSelection {
    pub group_column: Option<String>,
    pub value_column: Option<String>,
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Everything one user session owns, independent of rendering.
#[derive(Debug, Default)]
pub struct SessionState {
    pub config: DashboardConfig,

    /// Uploaded tables keyed by file name, normalized once on ingestion.
    pub tables: BTreeMap<String, Table>,

    /// Which uploaded table is shown.
    pub selected_file: Option<String>,

    pub selection: ChartSelection,

    /// Active filters for the selected table.
    pub filters: FilterState,

    pub grouping_enabled: bool,

    /// Pivot index column, only used while grouping is enabled.
    pub index_column: Option<String>,

    pub grouping: GroupingSelection,

    /// Result of the last successful filter / pivot pass.
    pub derived: Option<Table>,

    /// Messages from the most recent interactions, oldest first.
    pub notifications: Vec<Notification>,
}

impl SessionState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.notifications.push(Notification {
            severity,
            message: message.into(),
        });
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    // -- Ingestion ----------------------------------------------------------

    /// Load each file independently. A file that fails is reported and
    /// skipped; the rest are still stored.
    pub fn load_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        let mut loaded = 0;
        for path in paths {
            let path = path.as_ref();
            let name = table_name(path);
            match load_file(path) {
                Ok(table) => {
                    self.ingest(name, table);
                    loaded += 1;
                }
                Err(e) => {
                    log::error!("Failed to load {}: {e:#}", path.display());
                    self.notify(Severity::Error, format!("Failed to load {name}: {e:#}"));
                }
            }
        }
        loaded
    }

    /// Normalize and store a parsed table, then select it.
    pub fn ingest(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        let (table, outcomes) = normalize(table, &self.config);
        for outcome in &outcomes {
            match outcome {
                ColumnOutcome::Converted { column, nulled, .. } => self.notify(
                    Severity::Success,
                    format!("Converted column '{column}' to datetime ({nulled} values unparseable)"),
                ),
                ColumnOutcome::Failed { column, reason } => self.notify(
                    Severity::Warning,
                    format!("Could not convert column '{column}' to datetime: {reason}"),
                ),
            }
        }
        log::info!(
            "Loaded '{name}': {} rows, columns {:?}",
            table.num_rows(),
            table.column_names()
        );
        self.tables.insert(name.clone(), table);
        self.select_file(&name);
    }

    pub fn remove_file(&mut self, name: &str) {
        self.tables.remove(name);
        if self.selected_file.as_deref() == Some(name) {
            let next = self.tables.keys().next().cloned();
            match next {
                Some(next) => self.select_file(&next),
                None => {
                    self.selected_file = None;
                    self.selection = ChartSelection::default();
                    self.filters.clear();
                    self.derived = None;
                }
            }
        }
    }

    // -- Selection ----------------------------------------------------------

    /// Switch datasets: reset filters, grouping and chart selection.
    pub fn select_file(&mut self, name: &str) {
        let Some(table) = self.tables.get(name) else {
            self.notify(Severity::Warning, format!("No dataset named '{name}'"));
            return;
        };
        let types = classify(table);
        self.filters = init_filter_state(table, &types);
        self.selection = ChartSelection {
            x_axis: table.column_names().into_iter().next(),
            y_axes: Vec::new(),
            chart_kind: self.selection.chart_kind,
            reducer: self.selection.reducer,
        };
        self.grouping_enabled = false;
        self.index_column = None;
        self.grouping = GroupingSelection::default();
        self.selected_file = Some(name.to_string());
        self.derived = None;
        self.refresh();
    }

    /// The stored, normalized table currently selected.
    pub fn source_table(&self) -> Option<&Table> {
        self.selected_file
            .as_ref()
            .and_then(|name| self.tables.get(name))
    }

    /// Column types of the table the chart is drawn from.
    pub fn column_types(&self) -> ColumnTypes {
        self.derived
            .as_ref()
            .or_else(|| self.source_table())
            .map(classify)
            .unwrap_or_default()
    }

    pub fn set_grouping(&mut self, enabled: bool) {
        self.grouping_enabled = enabled;
        self.refresh();
    }

    // -- Pipeline -----------------------------------------------------------

    /// Recompute the derived table from the stored source: filters, then the
    /// pivot when grouping is enabled and fully configured. On failure the
    /// previous derived table is kept and the error is reported.
    pub fn refresh(&mut self) {
        let Some(source) = self.source_table() else {
            self.derived = None;
            return;
        };
        let filtered = match apply_filters(source, &self.filters) {
            Ok(t) => t,
            Err(e) => {
                self.notify(Severity::Error, format!("Filter failed: {e}"));
                return;
            }
        };

        let derived = match self.pivot_columns() {
            Some((group, index, value)) => match pivot(
                &filtered,
                &group,
                &index,
                &value,
                self.config.duplicate_policy,
            ) {
                Ok(pivoted) => pivoted.into_table(),
                Err(e) => {
                    log::warn!("Pivot failed: {e}");
                    self.notify(Severity::Error, format!("Pivot failed: {e}"));
                    return;
                }
            },
            None => filtered,
        };

        self.retain_valid_selection(&derived);
        self.derived = Some(derived);
    }

    fn pivot_columns(&self) -> Option<(String, String, String)> {
        if !self.grouping_enabled {
            return None;
        }
        Some((
            self.grouping.group_column.clone()?,
            self.index_column.clone()?,
            self.grouping.value_column.clone()?,
        ))
    }

    /// Drop axis choices that no longer exist after a reshape.
    fn retain_valid_selection(&mut self, table: &Table) {
        let names = table.column_names();
        if let Some(x) = &self.selection.x_axis {
            if !names.contains(x) {
                self.selection.x_axis = names.first().cloned();
            }
        }
        self.selection.y_axes.retain(|y| names.contains(y));
    }

    /// Chart for the current selection, or `None` when nothing to draw yet.
    pub fn chart(&self) -> Option<Result<ChartOption, ChartError>> {
        let table = self.derived.as_ref()?;
        let x = self.selection.x_axis.as_deref()?;
        Some(build_chart(
            table,
            x,
            &self.selection.y_axes,
            &classify(table),
            self.selection.chart_kind,
            self.selection.reducer,
        ))
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub type SessionId = u64;

/// Isolated sessions keyed by id. Nothing is shared between entries.
#[derive(Debug, Default)]
pub struct Sessions {
    config: DashboardConfig,
    sessions: HashMap<SessionId, SessionState>,
    next_id: SessionId,
}

impl Sessions {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn open(&mut self) -> SessionId {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions
            .insert(id, SessionState::new(self.config.clone()));
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionState> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut SessionState> {
        self.sessions.get_mut(&id)
    }

    /// Tear the session down; its tables are dropped with it.
    pub fn close(&mut self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{ColumnFilter, Predicate};
    use crate::data::loader::read_csv;
    use crate::data::model::Value;

    const SALES: &str = "\
日期,region,product,amount
2023-03-01,north,pen,10
2023-01-01,north,ink,5
2023-02-01,south,pen,7
2023-01-01,south,ink,1
";

    fn session() -> SessionState {
        let mut s = SessionState::default();
        s.ingest("sales.csv", read_csv(SALES.as_bytes()).unwrap());
        s
    }

    #[test]
    fn ingest_normalizes_and_selects() {
        let s = session();
        assert_eq!(s.selected_file.as_deref(), Some("sales.csv"));
        assert_eq!(s.selection.x_axis.as_deref(), Some("日期"));
        assert_eq!(s.notifications.len(), 1);
        assert_eq!(s.notifications[0].severity, Severity::Success);
        assert_eq!(s.derived.as_ref().unwrap().num_rows(), 4);
    }

    #[test]
    fn chart_over_datetime_axis() {
        let mut s = session();
        s.selection.y_axes = vec!["amount".into()];
        let option = s.chart().unwrap().unwrap();
        assert_eq!(option.labels(), ["2023-01-01", "2023-02-01", "2023-03-01"]);
        assert_eq!(option.series()[0].values, vec![6.0, 7.0, 10.0]);
    }

    #[test]
    fn filters_feed_the_chart() {
        let mut s = session();
        s.filters = vec![ColumnFilter::new(
            "region",
            Predicate::OneOf([Value::from("north")].into_iter().collect()),
        )];
        s.refresh();
        s.selection.x_axis = Some("product".into());
        s.selection.y_axes = vec!["amount".into()];
        let option = s.chart().unwrap().unwrap();
        assert_eq!(option.labels(), ["pen", "ink"]);
        assert_eq!(option.series()[0].values, vec![10.0, 5.0]);
    }

    #[test]
    fn grouping_pivots_and_failed_pivot_keeps_previous_table() {
        let mut s = session();
        s.index_column = Some("product".into());
        s.grouping.group_column = Some("region".into());
        s.grouping.value_column = Some("amount".into());
        s.set_grouping(true);
        let wide = s.derived.clone().unwrap();
        assert_eq!(wide.column_names(), vec!["product", "north", "south"]);

        // group == index
        s.grouping.group_column = Some("product".into());
        s.refresh();
        assert_eq!(s.derived.as_ref(), Some(&wide));
        assert_eq!(s.notifications.last().unwrap().severity, Severity::Error);
    }

    #[test]
    fn failed_files_do_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.csv");
        std::fs::write(&good, "a,b\n1,2\n").unwrap();
        let bad = dir.path().join("bad.xlsx");
        std::fs::write(&bad, "whatever").unwrap();
        let missing = dir.path().join("missing.csv");

        let mut s = SessionState::default();
        assert_eq!(s.load_paths(&[&bad, &good, &missing]), 1);
        assert_eq!(s.tables.keys().collect::<Vec<_>>(), vec!["good.csv"]);
        let errors = s
            .notifications
            .iter()
            .filter(|n| n.severity == Severity::Error)
            .count();
        assert_eq!(errors, 2);
    }

    #[test]
    fn removing_selected_file_moves_selection() {
        let mut s = session();
        s.ingest("other.csv", read_csv("k,v\na,1\n".as_bytes()).unwrap());
        assert_eq!(s.selected_file.as_deref(), Some("other.csv"));
        s.remove_file("other.csv");
        assert_eq!(s.selected_file.as_deref(), Some("sales.csv"));
        s.remove_file("sales.csv");
        assert!(s.selected_file.is_none());
        assert!(s.chart().is_none());
    }

    #[test]
    fn sessions_are_isolated() {
        let mut sessions = Sessions::default();
        let a = sessions.open();
        let b = sessions.open();
        sessions
            .get_mut(a)
            .unwrap()
            .ingest("t.csv", read_csv("x\n1\n".as_bytes()).unwrap());
        assert_eq!(sessions.get(a).unwrap().tables.len(), 1);
        assert!(sessions.get(b).unwrap().tables.is_empty());
        assert!(sessions.close(a));
        assert!(sessions.get(a).is_none());
        assert_eq!(sessions.len(), 1);
    }
}
