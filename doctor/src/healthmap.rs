use reqwest::Client as HttpClient;
use shared::HealthMapReport;
use std::time::Duration;

use crate::api::{ensure_success, send};
use crate::config::ClientConfig;
use crate::error::ClientError;

const ADD_DISEASE_PATH: &str = "/api/healthmap/add-disease";

/// Posts community disease reports to the CropAI backend.
#[derive(Clone)]
pub struct HealthMapClient {
    http_client: HttpClient,
    backend_url: String,
    timeout: Duration,
}

impl HealthMapClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http_client = HttpClient::builder()
            .build()
            .map_err(|e| ClientError::Unexpected(e.to_string()))?;

        Ok(Self {
            http_client,
            backend_url: config.backend_url.trim_end_matches('/').to_string(),
            timeout: config.report_timeout,
        })
    }

    pub async fn add_disease(&self, report: &HealthMapReport) -> Result<(), ClientError> {
        log::info!(
            "Reporting {} ({}) to the health map for pincode {}",
            report.name,
            report.severity,
            report.pincode
        );
        let request = self
            .http_client
            .post(format!("{}{}", self.backend_url, ADD_DISEASE_PATH))
            .json(report)
            .timeout(self.timeout);
        ensure_success(send(request).await?, "Failed to report to health map").await?;
        Ok(())
    }
}
