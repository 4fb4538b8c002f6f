use shared::{DetectionResult, format_disease_name, get_risk_icon};

use super::utils::{bullet_list, meter};
use crate::flow::{ReportForm, ReportStatus};

const ALTERNATIVES_SHOWN: usize = 3;

pub fn render_results(result: &DetectionResult) -> String {
    let mut out = String::new();

    let heading = if result.is_healthy() {
        format!("{} (no disease detected)", result.display_name())
    } else {
        result.display_name()
    };
    out.push_str(&format!("{}\n", heading));
    if let Some(filename) = &result.filename {
        out.push_str(&format!("File:       {}\n", filename));
    }
    if let Some(error) = &result.error {
        out.push_str(&format!("Error:      {}\n", error));
        return out;
    }

    out.push_str(&format!(
        "Confidence: {} {}%\n",
        meter(result.confidence),
        result.confidence_percent()
    ));
    out.push_str(&format!("Crop:       {}\n", result.crop));

    let risk = &result.risk_assessment;
    out.push_str(&format!(
        "Risk:       {} {} ({} severity)\n\n",
        get_risk_icon(&risk.overall_risk),
        risk.overall_risk,
        result.severity()
    ));
    out.push_str(&bullet_list("Risk factors", &risk.risk_factors));
    out.push_str(&bullet_list("Recommendations", &risk.recommendations));

    let info = &result.disease_info;
    if let Some(description) = &info.description {
        out.push_str(&format!("About:\n  {}\n", description));
    }
    out.push_str(&bullet_list("Symptoms", &info.symptoms));
    out.push_str(&bullet_list("Treatment", &info.solutions));
    out.push_str(&bullet_list("Prevention", &info.prevention));

    let alternatives = result.top_predictions(ALTERNATIVES_SHOWN);
    if !alternatives.is_empty() {
        out.push_str("Top predictions:\n");
        for (class, probability) in alternatives {
            out.push_str(&format!(
                "  {} {:>5.1}%  {}\n",
                meter(probability),
                probability * 100.0,
                format_disease_name(class)
            ));
        }
    }

    if let Some(explanation) = &result.explanation {
        match &explanation.error {
            Some(error) => out.push_str(&format!("Heatmap unavailable: {}\n", error)),
            None if explanation.heatmap_available => out.push_str(&format!(
                "Heatmap available ({} attention regions)\n",
                explanation.attention_regions.len()
            )),
            None => {}
        }
    }

    if let Some(supplement) = &result.supplement {
        out.push_str(&format!("Suggested supplement: {}\n", supplement.name));
        if let Some(link) = &supplement.buy_link {
            out.push_str(&format!("  Buy: {}\n", link));
        }
    }
    out
}

pub fn render_report_banner(report: &ReportForm) -> Option<String> {
    match &report.status {
        ReportStatus::Idle => None,
        ReportStatus::Submitting => Some("Reporting to the health map...".to_string()),
        ReportStatus::Succeeded { .. } => {
            Some("Disease reported to the health map. Thank you!".to_string())
        }
        ReportStatus::Failed(message) => Some(format!("! {}", message)),
    }
}
