use image::ImageFormat;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;
pub const MAX_BATCH_SIZE: usize = 10;
pub const SUPPORTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/bmp",
    "image/tiff",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a valid image file (JPEG, PNG, BMP, or TIFF)")]
    UnsupportedType(String),
    #[error("Image size must be less than 10MB")]
    TooLarge(usize),
    #[error("No images provided")]
    EmptyBatch,
    #[error("Maximum 10 images allowed per batch")]
    BatchTooLarge(usize),
    #[error("Please enter a valid pincode")]
    MissingPincode,
    #[error("Please enter a valid 6-digit pincode")]
    InvalidPincode,
}

/// An image picked by the user, held in memory until it is uploaded.
#[derive(Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: normalize_mime(&mime_type.into()),
            bytes,
        }
    }

    /// The MIME type as sent on the wire, whatever casing or padding the field holds.
    pub fn content_type(&self) -> String {
        normalize_mime(&self.mime_type)
    }

    /// Reads a file from disk. The MIME type is sniffed from the content first
    /// and falls back to the extension, the way a browser fills `File.type`.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime_type = sniff_mime_type(path, &bytes);
        Ok(Self::new(file_name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let supported = SUPPORTED_MIME_TYPES.contains(&self.content_type().as_str());
        if !supported {
            return Err(ValidationError::UnsupportedType(self.mime_type.clone()));
        }

        if self.size() > MAX_IMAGE_SIZE {
            return Err(ValidationError::TooLarge(self.size()));
        }

        Ok(())
    }
}

pub fn validate_batch(images: &[ImageUpload]) -> Result<(), ValidationError> {
    if images.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    if images.len() > MAX_BATCH_SIZE {
        return Err(ValidationError::BatchTooLarge(images.len()));
    }
    images.iter().try_for_each(ImageUpload::validate)
}

fn normalize_mime(mime: &str) -> String {
    mime.trim().to_ascii_lowercase()
}

fn sniff_mime_type(path: &Path, bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .or_else(|_| ImageFormat::from_path(path))
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Optional context forwarded with a `/predict` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionOptions {
    pub include_explanation: Option<bool>,
    pub weather_humidity: Option<f32>,
    pub weather_temperature: Option<f32>,
    pub weather_rainfall: Option<f32>,
    pub growth_stage: Option<String>,
}

impl DetectionOptions {
    pub fn with_explanation() -> Self {
        Self {
            include_explanation: Some(true),
            ..Self::default()
        }
    }

    /// Multipart text fields, in the order the service documents them.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(include) = self.include_explanation {
            fields.push(("include_explanation", include.to_string()));
        }
        if let Some(humidity) = self.weather_humidity {
            fields.push(("weather_humidity", humidity.to_string()));
        }
        if let Some(temperature) = self.weather_temperature {
            fields.push(("weather_temperature", temperature.to_string()));
        }
        if let Some(rainfall) = self.weather_rainfall {
            fields.push(("weather_rainfall", rainfall.to_string()));
        }
        if let Some(stage) = self.growth_stage.as_deref().filter(|s| !s.is_empty()) {
            fields.push(("growth_stage", stage.to_string()));
        }
        fields
    }
}
