mod app;
mod color;
mod ui;

use app::DashboardApp;
use eframe::egui;
use rusty_dashboard::config::DashboardConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::from_env();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Dashboard – Data Visualisation",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(config)))),
    )
}
