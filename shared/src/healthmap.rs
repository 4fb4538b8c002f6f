use serde::{Deserialize, Serialize};

use crate::detection::DetectionResult;
use crate::request::ValidationError;

pub const HEALTH_MAP_SOURCE: &str = "AI Detection System";
pub const NEW_REPORT_STATUS: &str = "Active";

/// A community report for the disease health map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMapReport {
    pub pincode: String,
    pub name: String,
    pub status: String,
    pub severity: String,
    pub details: String,
    pub source: String,
    pub crop: String,
    pub confidence: f32,
    pub treatments: Vec<String>,
    pub symptoms: Vec<String>,
}

impl HealthMapReport {
    pub fn from_result(result: &DetectionResult, pincode: &str) -> Result<Self, ValidationError> {
        let pincode = validate_pincode(pincode)?;
        let description = result.disease_info.description.as_deref().unwrap_or_default();
        let details = format!(
            "AI-detected disease with {}% confidence. {}",
            result.confidence_percent(),
            description
        );

        Ok(Self {
            pincode: pincode.to_string(),
            name: result.display_name(),
            status: NEW_REPORT_STATUS.to_string(),
            severity: result.risk_assessment.overall_risk.clone(),
            details: details.trim().to_string(),
            source: HEALTH_MAP_SOURCE.to_string(),
            crop: result.crop.clone(),
            confidence: result.confidence,
            treatments: result.disease_info.solutions.clone(),
            symptoms: result.disease_info.symptoms.clone(),
        })
    }
}

/// Returns the trimmed pincode when it is exactly six ASCII digits.
pub fn validate_pincode(input: &str) -> Result<&str, ValidationError> {
    let pincode = input.trim();
    if pincode.is_empty() {
        return Err(ValidationError::MissingPincode);
    }
    if pincode.len() != 6 || !pincode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidPincode);
    }
    Ok(pincode)
}
