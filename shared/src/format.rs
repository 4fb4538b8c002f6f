use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Visual category for a risk badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SeverityColor {
    Red,
    Yellow,
    Green,
    Gray,
}

impl SeverityColor {
    pub fn css_classes(self) -> &'static str {
        match self {
            SeverityColor::Red => "bg-red-100 text-red-800 border-red-200",
            SeverityColor::Yellow => "bg-yellow-100 text-yellow-800 border-yellow-200",
            SeverityColor::Green => "bg-green-100 text-green-800 border-green-200",
            SeverityColor::Gray => "bg-gray-100 text-gray-800 border-gray-200",
        }
    }
}

/// Turns a raw class id such as `Tomato___Late_blight` into `Tomato - Late Blight`.
pub fn format_disease_name(raw: &str) -> String {
    raw.replace("___", " - ")
        .replace("__", " ")
        .replace('_', " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn get_severity_color(level: &str) -> SeverityColor {
    match level.to_lowercase().as_str() {
        "high" => SeverityColor::Red,
        "medium" => SeverityColor::Yellow,
        "low" => SeverityColor::Green,
        _ => SeverityColor::Gray,
    }
}

pub fn get_risk_icon(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "high" => "🔴",
        "medium" => "🟡",
        "low" => "🟢",
        _ => "⚪",
    }
}

/// Collapses a qualitative risk string ("Moderate risk", "CRITICAL") to a severity.
pub fn map_risk_to_severity(risk: &str) -> Severity {
    let risk = risk.to_lowercase();
    if risk.contains("high") || risk.contains("critical") {
        Severity::High
    } else if risk.contains("medium") || risk.contains("moderate") {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn format_file_size(bytes: usize) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}
