use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::format::{Severity, format_disease_name, map_risk_to_severity};

const DEFAULT_CROP: &str = "Unknown";
const DEFAULT_CLASS: &str = "Unknown";
const DEFAULT_RISK: &str = "Low";
const NO_SUPPLEMENT: &str = "No supplement recommended";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: String,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            overall_risk: DEFAULT_RISK.to_string(),
            risk_factors: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiseaseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub symptoms: Vec<String>,
    pub solutions: Vec<String>,
    pub prevention: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub heatmap_available: bool,
    pub attention_regions: Vec<Vec<f32>>,
    /// Base64 Grad-CAM overlay, empty when the service sent none.
    pub explanation_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplement {
    pub name: String,
    pub image_url: Option<String>,
    pub buy_link: Option<String>,
}

/// A detection response after normalization. Every field is populated no
/// matter which optional keys the service left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub predicted_class: String,
    pub crop: String,
    pub confidence: f32,
    pub risk_assessment: RiskAssessment,
    pub disease_info: DiseaseInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
    pub class_probabilities: BTreeMap<String, f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplement: Option<Supplement>,
    /// Set on batch items: the uploaded file name echoed by the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Set on batch items the service could not process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DetectionResult {
    pub fn from_response(data: &Value) -> Self {
        Self::normalize_at(data, Utc::now())
    }

    pub fn normalize_at(data: &Value, timestamp: DateTime<Utc>) -> Self {
        let confidence = data
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0) as f32;

        Self {
            predicted_class: text(data, "predicted_class")
                .unwrap_or(DEFAULT_CLASS)
                .to_string(),
            crop: text(data, "crop").unwrap_or(DEFAULT_CROP).to_string(),
            confidence,
            risk_assessment: data
                .get("risk_assessment")
                .map(RiskAssessment::from_value)
                .unwrap_or_default(),
            disease_info: data
                .get("disease_info")
                .map(DiseaseInfo::from_value)
                .unwrap_or_default(),
            explanation: data.get("explanation").and_then(Explanation::from_value),
            class_probabilities: data
                .get("class_probabilities")
                .and_then(Value::as_object)
                .map(|probabilities| {
                    probabilities
                        .iter()
                        .filter_map(|(class, p)| p.as_f64().map(|p| (class.clone(), p as f32)))
                        .collect()
                })
                .unwrap_or_default(),
            supplement: data.get("supplement_info").and_then(Supplement::from_value),
            filename: text(data, "filename").map(str::to_string),
            error: text(data, "error").map(str::to_string),
            timestamp,
        }
    }

    pub fn display_name(&self) -> String {
        format_disease_name(&self.predicted_class)
    }

    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }

    pub fn severity(&self) -> Severity {
        map_risk_to_severity(&self.risk_assessment.overall_risk)
    }

    pub fn is_healthy(&self) -> bool {
        self.predicted_class.to_lowercase().contains("healthy")
    }

    /// Highest-probability classes first. Ties fall back to class name order.
    pub fn top_predictions(&self, n: usize) -> Vec<(&str, f32)> {
        let mut ranked: Vec<(&str, f32)> = self
            .class_probabilities
            .iter()
            .map(|(class, p)| (class.as_str(), *p))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(n);
        ranked
    }
}

impl RiskAssessment {
    fn from_value(value: &Value) -> Self {
        Self {
            overall_risk: text(value, "overall_risk")
                .unwrap_or(DEFAULT_RISK)
                .to_string(),
            risk_factors: extract_list(value.get("risk_factors")),
            recommendations: extract_list(value.get("recommendations")),
        }
    }
}

impl DiseaseInfo {
    pub fn from_value(value: &Value) -> Self {
        Self {
            description: text(value, "description").map(str::to_string),
            symptoms: extract_list(value.get("symptoms")),
            solutions: extract_list(value.get("solutions")),
            prevention: extract_list(value.get("prevention")),
        }
    }
}

impl Explanation {
    /// `None` unless the service sent an overlay image or an explanation error.
    fn from_value(value: &Value) -> Option<Self> {
        let image = text(value, "explanation_image");
        let error = text(value, "error");
        if image.is_none() && error.is_none() {
            return None;
        }

        let attention_regions = value
            .get("attention_regions")
            .and_then(Value::as_array)
            .map(|regions| {
                regions
                    .iter()
                    .filter_map(Value::as_array)
                    .map(|region| {
                        region
                            .iter()
                            .filter_map(Value::as_f64)
                            .map(|v| v as f32)
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            heatmap_available: image.is_some(),
            attention_regions,
            explanation_image: image.unwrap_or_default().to_string(),
            error: error.map(str::to_string),
        })
    }

    /// Decodes the overlay, accepting either bare base64 or a `data:` URL.
    pub fn decode_image(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        if self.explanation_image.is_empty() {
            return None;
        }
        let encoded = match self.explanation_image.split_once("base64,") {
            Some((_, data)) => data,
            None => self.explanation_image.as_str(),
        };
        Some(STANDARD.decode(encoded.trim()))
    }
}

impl Supplement {
    fn from_value(value: &Value) -> Option<Self> {
        let name = text(value, "name").filter(|name| *name != NO_SUPPLEMENT)?;
        Some(Self {
            name: name.to_string(),
            image_url: text(value, "image_url").map(str::to_string),
            buy_link: text(value, "buy_link").map(str::to_string),
        })
    }
}

/// Coerces a list field that may arrive as an array, a newline-delimited
/// string, or not at all.
pub fn extract_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
