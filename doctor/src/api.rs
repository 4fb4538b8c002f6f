use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde_json::Value;
use shared::{DetectionOptions, DetectionResult, DiseaseInfo, ImageUpload, validate_batch};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{ClientError, error_message};

/// Client for the remote disease-detection service.
#[derive(Clone)]
pub struct DiseaseDetectionClient {
    http_client: HttpClient,
    base_url: String,
    health_timeout: Duration,
    request_timeout: Duration,
    metadata_timeout: Duration,
    batch_timeout: Duration,
}

impl DiseaseDetectionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http_client = HttpClient::builder()
            .build()
            .map_err(|e| ClientError::Unexpected(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.disease_api_url.trim_end_matches('/').to_string(),
            health_timeout: config.health_timeout,
            request_timeout: config.request_timeout,
            metadata_timeout: config.metadata_timeout,
            batch_timeout: config.batch_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// True only when the service answers and reports its model as loaded.
    /// Failures are logged and reported as offline.
    pub async fn health_check(&self) -> bool {
        match self.fetch_health().await {
            Ok(healthy) => {
                if !healthy {
                    log::warn!("Disease API at {} is up but the model is not loaded", self.base_url);
                }
                healthy
            }
            Err(e) => {
                log::warn!("Disease API health check failed: {}", e);
                false
            }
        }
    }

    async fn fetch_health(&self) -> Result<bool, ClientError> {
        let request = self
            .http_client
            .get(self.endpoint("/health"))
            .timeout(self.health_timeout);
        let response = send(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message: format!("Health check failed: {}", status.as_u16()),
            });
        }

        let body: Value = response.json().await.map_err(ClientError::from_transport)?;
        Ok(body.get("status").and_then(Value::as_str) == Some("ok")
            && body.get("model_loaded").and_then(Value::as_bool) == Some(true))
    }

    pub async fn detect_disease(
        &self,
        image: &ImageUpload,
        options: &DetectionOptions,
    ) -> Result<DetectionResult, ClientError> {
        image.validate()?;

        let mut form = Form::new().part("file", image_part(image)?);
        for (name, value) in options.form_fields() {
            form = form.text(name, value);
        }

        log::info!(
            "Uploading {} ({} bytes) for disease detection",
            image.file_name,
            image.size()
        );
        let request = self
            .http_client
            .post(self.endpoint("/predict"))
            .multipart(form)
            .timeout(self.request_timeout);
        let response = ensure_success(send(request).await?, "API request failed").await?;

        let body: Value = response.json().await.map_err(ClientError::from_transport)?;
        let result = DetectionResult::from_response(&body);
        log::info!(
            "Detected {} with {}% confidence",
            result.predicted_class,
            result.confidence_percent()
        );
        Ok(result)
    }

    pub async fn get_disease_classes(&self) -> Result<Vec<String>, ClientError> {
        let request = self
            .http_client
            .get(self.endpoint("/classes"))
            .timeout(self.metadata_timeout);
        let response = ensure_success(send(request).await?, "Failed to fetch classes").await?;

        let body: Value = response.json().await.map_err(ClientError::from_transport)?;
        Ok(body
            .get("classes")
            .and_then(Value::as_array)
            .map(|classes| {
                classes
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// The service wraps the details in `disease_info` next to supplement data;
    /// a bare details object is accepted too.
    pub async fn get_disease_info(
        &self,
        crop: &str,
        disease: &str,
    ) -> Result<DiseaseInfo, ClientError> {
        let path = format!(
            "/disease_info/{}/{}",
            urlencoding::encode(crop),
            urlencoding::encode(disease)
        );
        let request = self
            .http_client
            .get(self.endpoint(&path))
            .timeout(self.metadata_timeout);
        let response =
            ensure_success(send(request).await?, "Failed to fetch disease info").await?;

        let body: Value = response.json().await.map_err(ClientError::from_transport)?;
        let details = body
            .get("disease_info")
            .filter(|info| info.is_object())
            .unwrap_or(&body);
        Ok(DiseaseInfo::from_value(details))
    }

    pub async fn batch_detect_disease(
        &self,
        images: &[ImageUpload],
    ) -> Result<Vec<DetectionResult>, ClientError> {
        validate_batch(images)?;

        let mut form = Form::new();
        for image in images {
            form = form.part("files", image_part(image)?);
        }

        log::info!("Uploading batch of {} images", images.len());
        let request = self
            .http_client
            .post(self.endpoint("/batch_predict"))
            .multipart(form)
            .timeout(self.batch_timeout);
        let response =
            ensure_success(send(request).await?, "Batch prediction failed").await?;

        let body: Value = response.json().await.map_err(ClientError::from_transport)?;
        match body {
            Value::Array(items) => Ok(items.iter().map(DetectionResult::from_response).collect()),
            other => Err(ClientError::Unexpected(format!(
                "Expected a list of predictions, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn image_part(image: &ImageUpload) -> Result<Part, ClientError> {
    Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.content_type())
        .map_err(|e| ClientError::Unexpected(format!("Invalid MIME type: {}", e)))
}

pub(crate) async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
    request.send().await.map_err(|e| {
        log::error!("Request failed: {}", e);
        ClientError::from_transport(e)
    })
}

/// Turns a non-2xx response into `Rejected`, using the body's message when it has one.
pub(crate) async fn ensure_success(
    response: Response,
    fallback: &str,
) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    let message = error_message(&body)
        .unwrap_or_else(|| format!("{}: {}", fallback, status.as_u16()));
    log::error!("Server error: {} - {}", status, message);
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
