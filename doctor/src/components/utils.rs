use crate::flow::AgriDoctor;

const METER_WIDTH: usize = 20;

/// A fixed-width text bar for a value in `0.0..=1.0`.
pub fn meter(fraction: f32) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * METER_WIDTH as f32).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(METER_WIDTH - filled))
}

pub fn render_error_message(model: &AgriDoctor) -> Option<String> {
    model.error_message().map(|message| format!("! {}", message))
}

pub fn bullet_list(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = format!("{}:\n", title);
    for item in items {
        out.push_str(&format!("  - {}\n", item));
    }
    out
}
