use eframe::egui;
use rusty_dashboard::config::DashboardConfig;
use rusty_dashboard::state::SessionState;

use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

/// One window is one session.
pub struct DashboardApp {
    pub state: SessionState,
}

impl DashboardApp {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            state: SessionState::new(config),
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Bottom panel: notifications ----
        if !self.state.notifications.is_empty() {
            egui::TopBottomPanel::bottom("notifications")
                .resizable(true)
                .show(ctx, |ui| {
                    panels::notifications(ui, &mut self.state);
                });
        }

        // ---- Left side panel: dataset, chart and filter controls ----
        egui::SidePanel::left("control_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::chart_panel(ui, &self.state);
        });
    }
}
