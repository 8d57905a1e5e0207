use chrono::NaiveDateTime;
use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;
use rusty_dashboard::chart::ChartKind;
use rusty_dashboard::data::filter::{datetime_extent, numeric_extent, ColumnFilter, Predicate};
use rusty_dashboard::data::model::{Table, Value};
use rusty_dashboard::data::reduce::Reducer;
use rusty_dashboard::data::types::{columns_of_type, ColumnType};
use rusty_dashboard::state::SessionState;

use crate::color::severity_color;

// ---------------------------------------------------------------------------
// Left side panel – dataset, chart and filter widgets
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut SessionState) {
    ui.heading("Dataset");
    ui.separator();

    if state.tables.is_empty() {
        ui.label("No dataset loaded.");
        return;
    }

    let current = state.selected_file.clone().unwrap_or_default();
    let names: Vec<String> = state.tables.keys().cloned().collect();
    egui::ComboBox::from_id_salt("dataset")
        .selected_text(current.as_str())
        .show_ui(ui, |ui: &mut Ui| {
            for name in &names {
                if ui.selectable_label(current == *name, name.as_str()).clicked() && current != *name {
                    state.select_file(name);
                }
            }
        });

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            chart_controls(ui, state);
            ui.separator();
            grouping_controls(ui, state);
            ui.separator();
            filter_controls(ui, state);
        });
}

fn chart_controls(ui: &mut Ui, state: &mut SessionState) {
    let Some(table) = state.derived.as_ref() else {
        return;
    };
    let columns = table.column_names();
    let types = state.column_types();
    let numeric = columns_of_type(table, &types, ColumnType::Numeric);

    ui.strong("Chart type");
    let kind = &mut state.selection.chart_kind;
    egui::ComboBox::from_id_salt("chart_kind")
        .selected_text(kind.label())
        .show_ui(ui, |ui: &mut Ui| {
            for k in ChartKind::ALL {
                ui.selectable_value(kind, k, k.label());
            }
        });

    ui.strong("X axis");
    let x_axis = &mut state.selection.x_axis;
    egui::ComboBox::from_id_salt("x_axis")
        .selected_text(x_axis.clone().unwrap_or_default())
        .show_ui(ui, |ui: &mut Ui| {
            for col in &columns {
                let label = format!("{col}  ({})", types.get(col).map(ToString::to_string).unwrap_or_default());
                ui.selectable_value(x_axis, Some(col.clone()), label);
            }
        });

    ui.strong("Y axis (numeric)");
    if numeric.is_empty() {
        ui.label("No numeric columns.");
    }
    for col in &numeric {
        let mut checked = state.selection.y_axes.contains(col);
        if ui.checkbox(&mut checked, col.as_str()).changed() {
            if checked {
                state.selection.y_axes.push(col.clone());
            } else {
                state.selection.y_axes.retain(|y| y != col);
            }
        }
    }

    ui.strong("Aggregation");
    let reducer = &mut state.selection.reducer;
    egui::ComboBox::from_id_salt("reducer")
        .selected_text(reducer.label())
        .show_ui(ui, |ui: &mut Ui| {
            for r in Reducer::ALL {
                ui.selectable_value(reducer, r, r.label());
            }
        });
}

fn grouping_controls(ui: &mut Ui, state: &mut SessionState) {
    let mut enabled = state.grouping_enabled;
    if ui.checkbox(&mut enabled, RichText::new("Pivot / regroup").strong()).changed() {
        state.set_grouping(enabled);
    }
    if !state.grouping_enabled {
        return;
    }
    let Some(source) = state.source_table() else {
        return;
    };
    let columns = source.column_names();

    let before = (
        state.index_column.clone(),
        state.grouping.group_column.clone(),
        state.grouping.value_column.clone(),
    );
    // Each picker hides the columns already taken by the other two.
    let taken = [before.0.clone(), before.1.clone(), before.2.clone()];
    column_picker(ui, "Index column", "pivot_index", &columns, &taken, &mut state.index_column);
    column_picker(
        ui,
        "Group column",
        "pivot_group",
        &columns,
        &taken,
        &mut state.grouping.group_column,
    );
    column_picker(
        ui,
        "Value column",
        "pivot_value",
        &columns,
        &taken,
        &mut state.grouping.value_column,
    );
    let after = (
        state.index_column.clone(),
        state.grouping.group_column.clone(),
        state.grouping.value_column.clone(),
    );
    if before != after {
        state.refresh();
    }
}

fn column_picker(
    ui: &mut Ui,
    label: &str,
    id: &str,
    columns: &[String],
    taken: &[Option<String>],
    current: &mut Option<String>,
) {
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.clone().unwrap_or_default())
        .show_ui(ui, |ui: &mut Ui| {
            for col in columns {
                let used_elsewhere =
                    current.as_ref() != Some(col) && taken.iter().any(|t| t.as_ref() == Some(col));
                if !used_elsewhere {
                    ui.selectable_value(current, Some(col.clone()), col.as_str());
                }
            }
        });
}

fn filter_controls(ui: &mut Ui, state: &mut SessionState) {
    ui.heading("Filters");

    let Some(name) = state.selected_file.clone() else {
        return;
    };
    let Some(source) = state.tables.get(&name) else {
        return;
    };

    let mut changed = false;
    for filter in state.filters.iter_mut() {
        let header = RichText::new(&filter.column).strong();
        egui::CollapsingHeader::new(header)
            .id_salt(&filter.column)
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                changed |= filter_widget(ui, source, filter);
            });
    }

    if changed {
        state.refresh();
    }
}

/// Returns true when the user edited the filter.
fn filter_widget(ui: &mut Ui, source: &Table, filter: &mut ColumnFilter) -> bool {
    let Some(column) = source.column(&filter.column) else {
        return false;
    };
    let id = filter.column.clone();
    match &mut filter.predicate {
        Predicate::NumericRange { min, max } => {
            let Some((lo, hi)) = numeric_extent(column) else {
                return false;
            };
            let mut changed = ui.add(egui::Slider::new(min, lo..=hi).text("min")).changed();
            changed |= ui.add(egui::Slider::new(max, lo..=hi).text("max")).changed();
            if *min > *max {
                std::mem::swap(min, max);
            }
            changed
        }
        Predicate::DateRange { start, end } => {
            let Some((lo, hi)) = datetime_extent(column) else {
                return false;
            };
            let mut start_date = start.date();
            let mut end_date = end.date();
            let mut changed = false;
            ui.horizontal(|ui: &mut Ui| {
                ui.label("from");
                changed |= ui
                    .add(DatePickerButton::new(&mut start_date).id_salt(&format!("{id}_start")))
                    .changed();
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("to");
                changed |= ui
                    .add(DatePickerButton::new(&mut end_date).id_salt(&format!("{id}_end")))
                    .changed();
            });
            if changed {
                *start = clamp_date(start_date.and_hms_opt(0, 0, 0), lo, hi);
                *end = clamp_date(end_date.and_hms_opt(23, 59, 59), lo, hi);
                if *start > *end {
                    std::mem::swap(start, end);
                }
            }
            changed
        }
        Predicate::OneOf(selected) => {
            let mut changed = false;
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    selected.extend(column.distinct());
                    changed = true;
                }
                if ui.small_button("None").clicked() {
                    selected.clear();
                    changed = true;
                }
            });
            for value in column.distinct() {
                let mut checked = selected.contains(&value);
                if ui.checkbox(&mut checked, value_label(&value)).changed() {
                    if checked {
                        selected.insert(value);
                    } else {
                        selected.remove(&value);
                    }
                    changed = true;
                }
            }
            changed
        }
    }
}

fn clamp_date(
    picked: Option<NaiveDateTime>,
    lo: NaiveDateTime,
    hi: NaiveDateTime,
) -> NaiveDateTime {
    picked.map_or(lo, |dt| dt.clamp(lo, hi))
}

fn value_label(value: &Value) -> String {
    match value {
        Value::Null => "(missing)".to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut SessionState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let selected = state.selected_file.clone();
            if let Some(name) = selected {
                if ui.button(format!("Close {name}")).clicked() {
                    state.remove_file(&name);
                    ui.close_menu();
                }
            }
        });

        ui.separator();

        if let (Some(source), Some(derived)) = (state.source_table(), state.derived.as_ref()) {
            ui.label(format!(
                "{} rows loaded, {} after filters",
                source.num_rows(),
                derived.num_rows()
            ));
        }
    });
}

/// Notification log with a clear button.
pub fn notifications(ui: &mut Ui, state: &mut SessionState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.strong("Messages");
        if ui.small_button("Clear").clicked() {
            state.clear_notifications();
        }
    });
    ScrollArea::vertical().max_height(100.0).show(ui, |ui: &mut Ui| {
        for n in state.notifications.iter().rev() {
            ui.label(RichText::new(&n.message).color(severity_color(n.severity)));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut SessionState) {
    let files = rfd::FileDialog::new()
        .set_title("Open tabular data")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_files();

    if let Some(paths) = files {
        let loaded = state.load_paths(&paths);
        log::info!("Loaded {loaded} of {} files", paths.len());
    }
}
