mod detection;
mod format;
mod healthmap;
mod request;

pub use detection::{
    DetectionResult, DiseaseInfo, Explanation, RiskAssessment, Supplement, extract_list,
};
pub use format::{
    Severity, SeverityColor, format_disease_name, format_file_size, get_risk_icon,
    get_severity_color, map_risk_to_severity,
};
pub use healthmap::{HEALTH_MAP_SOURCE, HealthMapReport, NEW_REPORT_STATUS, validate_pincode};
pub use request::{
    DetectionOptions, ImageUpload, MAX_BATCH_SIZE, MAX_IMAGE_SIZE, SUPPORTED_MIME_TYPES,
    ValidationError, validate_batch,
};
