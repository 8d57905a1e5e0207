use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use rusty_dashboard::chart::{ChartKind, ChartOption};
use rusty_dashboard::data::model::Table;
use rusty_dashboard::state::SessionState;

use crate::color::series_palette;

/// Total width shared by the bars of one category.
const BAR_GROUP_WIDTH: f64 = 0.8;

// ---------------------------------------------------------------------------
// Chart (central panel)
// ---------------------------------------------------------------------------

/// Render the chart, the ECharts export button and the data preview.
pub fn chart_panel(ui: &mut Ui, state: &SessionState) {
    let Some(derived) = state.derived.as_ref() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Upload a CSV file to start  (File → Open…)");
        });
        return;
    };

    let option = match state.chart() {
        Some(Ok(option)) => option,
        Some(Err(e)) => {
            ui.label(RichText::new(format!("Cannot build chart: {e}")).color(Color32::RED));
            return;
        }
        None => {
            ui.label("Pick an x axis to draw a chart.");
            return;
        }
    };

    ui.horizontal(|ui: &mut Ui| {
        if let Some(name) = &state.selected_file {
            ui.heading(name.as_str());
        }
        if ui.button("Copy ECharts JSON").clicked() {
            match option.to_echarts().and_then(|v| serde_json::to_string_pretty(&v)) {
                Ok(json) => ui.ctx().copy_text(json),
                Err(e) => log::error!("Failed to export chart: {e}"),
            }
        }
    });

    egui::CollapsingHeader::new(format!("Data preview ({} rows)", derived.num_rows()))
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            preview_table(ui, derived, state.config.preview_rows);
        });

    if option.series().is_empty() {
        ui.label("Select one or more y-axis fields.");
    }
    draw_chart(ui, &option);
}

fn draw_chart(ui: &mut Ui, option: &ChartOption) {
    let labels = option.labels().to_vec();
    let colors = series_palette(option.series().len());
    let n_series = option.series().len() as f64;
    let bar_width = BAR_GROUP_WIDTH / n_series.max(1.0);

    Plot::new("chart")
        .legend(Legend::default())
        .y_axis_label("value")
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (si, (series, color)) in option.series().iter().zip(colors).enumerate() {
                match series.kind {
                    ChartKind::Bar => {
                        // Side by side within each category slot.
                        let offset = (si as f64 - (n_series - 1.0) / 2.0) * bar_width;
                        let bars = series
                            .values
                            .iter()
                            .enumerate()
                            .map(|(i, &v)| Bar::new(i as f64 + offset, v).width(bar_width))
                            .collect();
                        plot_ui.bar_chart(BarChart::new(bars).name(&series.name).color(color));
                    }
                    ChartKind::Line => {
                        let points: PlotPoints = series
                            .values
                            .iter()
                            .enumerate()
                            .map(|(i, &v)| [i as f64, v])
                            .collect();
                        plot_ui.line(Line::new(points).name(&series.name).color(color).width(2.0));
                    }
                    ChartKind::Scatter => {
                        let points: PlotPoints = series
                            .values
                            .iter()
                            .enumerate()
                            .map(|(i, &v)| [i as f64, v])
                            .collect();
                        plot_ui.points(Points::new(points).name(&series.name).color(color).radius(4.0));
                    }
                }
            }
        });
}

fn preview_table(ui: &mut Ui, table: &Table, max_rows: usize) {
    ScrollArea::both().max_height(220.0).show(ui, |ui: &mut Ui| {
        egui::Grid::new("preview").striped(true).show(ui, |ui: &mut Ui| {
            for col in table.columns() {
                ui.strong(col.name.as_str());
            }
            ui.end_row();
            for row in 0..table.num_rows().min(max_rows) {
                for col in table.columns() {
                    ui.label(col.values[row].to_string());
                }
                ui.end_row();
            }
        });
    });
}
