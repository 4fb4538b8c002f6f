use shared::{MAX_IMAGE_SIZE, format_file_size};

use super::utils::render_error_message;
use crate::flow::{AgriDoctor, Stage};

pub fn render_upload_section(model: &AgriDoctor) -> String {
    let mut out = format!("Service: {}\n", model.api_status_text());

    match model.image() {
        Some(image) => {
            out.push_str(&format!(
                "Image:   {} ({}, {})\n",
                image.file_name,
                image.mime_type,
                format_file_size(image.size())
            ));
        }
        None => {
            out.push_str(&format!(
                "Image:   none selected (JPEG, PNG, BMP or TIFF up to {})\n",
                format_file_size(MAX_IMAGE_SIZE)
            ));
        }
    }

    if matches!(model.stage(), Stage::Analyzing { .. }) {
        out.push_str("Analyzing...\n");
    }
    if let Some(error) = render_error_message(model) {
        out.push_str(&error);
        out.push('\n');
    }
    out
}
