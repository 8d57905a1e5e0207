use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};
use rusty_dashboard::state::Severity;

// ---------------------------------------------------------------------------
// Series palette
// ---------------------------------------------------------------------------

/// `n` visually distinct colours using evenly spaced hues, starting from a
/// blue so a single series looks like a default chart.
pub fn series_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = 210.0 + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue % 360.0, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Text colour for a notification.
pub fn severity_color(severity: Severity) -> Color32 {
    match severity {
        Severity::Success => Color32::from_rgb(60, 160, 90),
        Severity::Warning => Color32::from_rgb(220, 150, 30),
        Severity::Error => Color32::RED,
    }
}
