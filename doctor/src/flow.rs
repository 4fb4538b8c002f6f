//! The Agri Doctor page as an explicit state machine.
//!
//! `AgriDoctor::update` is pure: it applies a [`Msg`] and may return an
//! [`Effect`] for the caller to perform. [`AgriDoctorApp`] performs effects
//! against the remote services and feeds the outcome back in, one at a time,
//! so a flow never has two requests in flight.

use shared::{DetectionOptions, DetectionResult, HealthMapReport, ImageUpload};
use std::mem;
use std::time::Duration;
use strum_macros::Display;
use tokio::time::Instant;

use crate::api::DiseaseDetectionClient;
use crate::error::ClientError;
use crate::healthmap::HealthMapClient;

pub const REPORT_BANNER_TTL: Duration = Duration::from_secs(5);
pub const SERVICE_UNAVAILABLE: &str =
    "Disease detection service is currently unavailable. Please try again later.";
pub const SERVICE_CHECKING: &str =
    "Still checking the disease detection service. Please try again in a moment.";

/// What the flow needs from the detection service.
#[allow(async_fn_in_trait)]
pub trait DetectionService {
    async fn health_check(&self) -> bool;

    async fn detect_disease(
        &self,
        image: &ImageUpload,
        options: &DetectionOptions,
    ) -> Result<DetectionResult, ClientError>;
}

#[allow(async_fn_in_trait)]
pub trait HealthMapReporter {
    async fn add_disease(&self, report: &HealthMapReport) -> Result<(), ClientError>;
}

impl DetectionService for DiseaseDetectionClient {
    async fn health_check(&self) -> bool {
        DiseaseDetectionClient::health_check(self).await
    }

    async fn detect_disease(
        &self,
        image: &ImageUpload,
        options: &DetectionOptions,
    ) -> Result<DetectionResult, ClientError> {
        DiseaseDetectionClient::detect_disease(self, image, options).await
    }
}

impl HealthMapReporter for HealthMapClient {
    async fn add_disease(&self, report: &HealthMapReport) -> Result<(), ClientError> {
        HealthMapClient::add_disease(self, report).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ApiStatus {
    #[strum(serialize = "Checking...")]
    Checking,
    #[strum(serialize = "AI Service Online")]
    Online,
    #[strum(serialize = "AI Service Offline")]
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportStatus {
    Idle,
    Submitting,
    Succeeded { expires_at: Instant },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportForm {
    pub pincode: String,
    pub status: ReportStatus,
}

impl Default for ReportForm {
    fn default() -> Self {
        Self {
            pincode: String::new(),
            status: ReportStatus::Idle,
        }
    }
}

impl ReportForm {
    pub fn is_submitting(&self) -> bool {
        self.status == ReportStatus::Submitting
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ReportStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, ReportStatus::Succeeded { .. })
    }
}

/// Each stage owns exactly the data that is valid in it.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Idle,
    /// The last pick was rejected. A previously accepted image is kept.
    ValidationError {
        message: String,
        image: Option<ImageUpload>,
    },
    ImageSelected {
        image: ImageUpload,
    },
    Analyzing {
        image: ImageUpload,
    },
    AnalysisError {
        image: ImageUpload,
        message: String,
    },
    Resulted {
        image: ImageUpload,
        result: DetectionResult,
        report: ReportForm,
    },
}

#[derive(Debug)]
pub enum Msg {
    // Connectivity
    CheckConnectivity,
    ConnectivityChecked(bool),

    // Image operations
    SelectImage(ImageUpload),
    ClearImage,

    // Analysis
    Analyze,
    AnalysisFinished(Result<DetectionResult, ClientError>),

    // Health map reporting
    PincodeChanged(String),
    SubmitReport,
    ReportFinished(Result<(), ClientError>),
    Tick(Instant),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    CheckHealth,
    Detect {
        image: ImageUpload,
        options: DetectionOptions,
    },
    Report(HealthMapReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgriDoctor {
    stage: Stage,
    api_status: ApiStatus,
    options: DetectionOptions,
}

impl Default for AgriDoctor {
    fn default() -> Self {
        Self::new()
    }
}

impl AgriDoctor {
    /// Starts idle with connectivity unknown; explanations are requested by default.
    pub fn new() -> Self {
        Self::with_options(DetectionOptions::with_explanation())
    }

    pub fn with_options(options: DetectionOptions) -> Self {
        Self {
            stage: Stage::Idle,
            api_status: ApiStatus::Checking,
            options,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    pub fn api_status_text(&self) -> String {
        self.api_status.to_string()
    }

    pub fn options(&self) -> &DetectionOptions {
        &self.options
    }

    pub fn image(&self) -> Option<&ImageUpload> {
        match &self.stage {
            Stage::Idle => None,
            Stage::ValidationError { image, .. } => image.as_ref(),
            Stage::ImageSelected { image }
            | Stage::Analyzing { image }
            | Stage::AnalysisError { image, .. }
            | Stage::Resulted { image, .. } => Some(image),
        }
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        match &self.stage {
            Stage::Resulted { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&ReportForm> {
        match &self.stage {
            Stage::Resulted { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.stage {
            Stage::ValidationError { message, .. } | Stage::AnalysisError { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self.stage, Stage::Analyzing { .. })
    }

    /// Whether the analyze control should be enabled.
    pub fn can_analyze(&self) -> bool {
        self.image().is_some() && !self.is_analyzing() && self.api_status == ApiStatus::Online
    }

    /// When the report success banner should disappear, if it is showing.
    pub fn banner_deadline(&self) -> Option<Instant> {
        match self.report().map(|report| &report.status) {
            Some(ReportStatus::Succeeded { expires_at }) => Some(*expires_at),
            _ => None,
        }
    }

    pub fn update(&mut self, msg: Msg) -> Option<Effect> {
        match msg {
            Msg::CheckConnectivity => self.handle_check_connectivity(),
            Msg::ConnectivityChecked(online) => self.handle_connectivity_checked(online),

            Msg::SelectImage(image) => self.handle_select_image(image),
            Msg::ClearImage => {
                if !self.is_analyzing() {
                    self.stage = Stage::Idle;
                }
                None
            }

            Msg::Analyze => self.handle_analyze(),
            Msg::AnalysisFinished(outcome) => self.handle_analysis_finished(outcome),

            Msg::PincodeChanged(pincode) => self.handle_pincode_changed(pincode),
            Msg::SubmitReport => self.handle_submit_report(),
            Msg::ReportFinished(outcome) => self.handle_report_finished(outcome),
            Msg::Tick(now) => self.handle_tick(now),
        }
    }
}

// Handler methods
impl AgriDoctor {
    fn handle_check_connectivity(&mut self) -> Option<Effect> {
        self.api_status = ApiStatus::Checking;
        Some(Effect::CheckHealth)
    }

    fn handle_connectivity_checked(&mut self, online: bool) -> Option<Effect> {
        self.api_status = if online {
            ApiStatus::Online
        } else {
            ApiStatus::Offline
        };
        log::info!("Disease detection service: {}", self.api_status);
        None
    }

    fn handle_select_image(&mut self, image: ImageUpload) -> Option<Effect> {
        // The image is locked while its analysis is in flight.
        if self.is_analyzing() {
            log::debug!("Ignoring {} picked during analysis", image.file_name);
            return None;
        }
        let previous = self.take_image();

        match image.validate() {
            Ok(()) => {
                log::info!("Selected {} ({} bytes)", image.file_name, image.size());
                self.stage = Stage::ImageSelected { image };
            }
            Err(err) => {
                log::warn!("Rejected {}: {}", image.file_name, err);
                self.stage = Stage::ValidationError {
                    message: err.to_string(),
                    image: previous,
                };
            }
        }
        None
    }

    fn handle_analyze(&mut self) -> Option<Effect> {
        if self.is_analyzing() {
            return None;
        }
        let image = self.image()?.clone();

        let refusal = match self.api_status {
            ApiStatus::Online => None,
            ApiStatus::Offline => Some(SERVICE_UNAVAILABLE),
            ApiStatus::Checking => Some(SERVICE_CHECKING),
        };
        if let Some(message) = refusal {
            self.stage = Stage::AnalysisError {
                image,
                message: message.to_string(),
            };
            return None;
        }

        self.stage = Stage::Analyzing {
            image: image.clone(),
        };
        Some(Effect::Detect {
            image,
            options: self.options.clone(),
        })
    }

    fn handle_analysis_finished(
        &mut self,
        outcome: Result<DetectionResult, ClientError>,
    ) -> Option<Effect> {
        if !self.is_analyzing() {
            log::debug!("Ignoring analysis outcome that arrived after the image changed");
            return None;
        }
        let image = self.take_image()?;

        self.stage = match outcome {
            Ok(result) => Stage::Resulted {
                image,
                result,
                report: ReportForm::default(),
            },
            Err(err) => {
                log::error!("Disease detection failed: {}", err);
                Stage::AnalysisError {
                    image,
                    message: err.to_string(),
                }
            }
        };
        None
    }

    fn handle_pincode_changed(&mut self, pincode: String) -> Option<Effect> {
        if let Stage::Resulted { report, .. } = &mut self.stage {
            report.pincode = pincode;
            if report.error().is_some() {
                report.status = ReportStatus::Idle;
            }
        }
        None
    }

    fn handle_submit_report(&mut self) -> Option<Effect> {
        let Stage::Resulted { result, report, .. } = &mut self.stage else {
            return None;
        };
        if report.is_submitting() {
            return None;
        }

        match HealthMapReport::from_result(result, &report.pincode) {
            Ok(payload) => {
                report.status = ReportStatus::Submitting;
                Some(Effect::Report(payload))
            }
            Err(err) => {
                report.status = ReportStatus::Failed(err.to_string());
                None
            }
        }
    }

    fn handle_report_finished(&mut self, outcome: Result<(), ClientError>) -> Option<Effect> {
        let Stage::Resulted { report, .. } = &mut self.stage else {
            return None;
        };
        if !report.is_submitting() {
            return None;
        }

        report.status = match outcome {
            Ok(()) => ReportStatus::Succeeded {
                expires_at: Instant::now() + REPORT_BANNER_TTL,
            },
            Err(err) => {
                log::error!("Health map reporting failed: {}", err);
                ReportStatus::Failed(err.to_string())
            }
        };
        None
    }

    fn handle_tick(&mut self, now: Instant) -> Option<Effect> {
        if let Stage::Resulted { report, .. } = &mut self.stage {
            if let ReportStatus::Succeeded { expires_at } = report.status {
                if now >= expires_at {
                    report.status = ReportStatus::Idle;
                }
            }
        }
        None
    }

    fn take_image(&mut self) -> Option<ImageUpload> {
        match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Idle => None,
            Stage::ValidationError { image, .. } => image,
            Stage::ImageSelected { image }
            | Stage::Analyzing { image }
            | Stage::AnalysisError { image, .. }
            | Stage::Resulted { image, .. } => Some(image),
        }
    }
}

/// Drives an [`AgriDoctor`] against real (or stand-in) services.
pub struct AgriDoctorApp<S, R> {
    model: AgriDoctor,
    service: S,
    reporter: R,
}

impl<S, R> AgriDoctorApp<S, R>
where
    S: DetectionService,
    R: HealthMapReporter,
{
    pub fn new(service: S, reporter: R) -> Self {
        Self::with_model(AgriDoctor::new(), service, reporter)
    }

    pub fn with_model(model: AgriDoctor, service: S, reporter: R) -> Self {
        Self {
            model,
            service,
            reporter,
        }
    }

    pub fn model(&self) -> &AgriDoctor {
        &self.model
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Applies a message and performs any effect it triggers until the flow settles.
    pub async fn dispatch(&mut self, msg: Msg) {
        let mut next = Some(msg);
        while let Some(msg) = next.take() {
            if let Some(effect) = self.model.update(msg) {
                next = Some(self.perform(effect).await);
            }
        }
    }

    /// Sleeps until the report success banner expires, then clears it.
    pub async fn wait_for_banner(&mut self) {
        if let Some(deadline) = self.model.banner_deadline() {
            tokio::time::sleep_until(deadline).await;
            self.dispatch(Msg::Tick(Instant::now())).await;
        }
    }

    async fn perform(&self, effect: Effect) -> Msg {
        match effect {
            Effect::CheckHealth => Msg::ConnectivityChecked(self.service.health_check().await),
            Effect::Detect { image, options } => {
                Msg::AnalysisFinished(self.service.detect_disease(&image, &options).await)
            }
            Effect::Report(report) => Msg::ReportFinished(self.reporter.add_disease(&report).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jpeg(size: usize) -> ImageUpload {
        ImageUpload::new("leaf.jpg", "image/jpeg", vec![0xFF; size])
    }

    fn detection() -> DetectionResult {
        DetectionResult::from_response(&json!({
            "predicted_class": "Tomato___Late_blight",
            "crop": "Tomato",
            "confidence": 0.91,
            "risk_assessment": { "overall_risk": "High" }
        }))
    }

    fn online() -> AgriDoctor {
        let mut model = AgriDoctor::new();
        model.update(Msg::ConnectivityChecked(true));
        model
    }

    fn resulted() -> AgriDoctor {
        let mut model = online();
        model.update(Msg::SelectImage(jpeg(1024)));
        model.update(Msg::Analyze);
        model.update(Msg::AnalysisFinished(Ok(detection())));
        model
    }

    #[test]
    fn connectivity_sub_machine() {
        let mut model = AgriDoctor::new();
        assert_eq!(model.api_status(), ApiStatus::Checking);
        assert_eq!(model.api_status_text(), "Checking...");

        assert_eq!(model.update(Msg::CheckConnectivity), Some(Effect::CheckHealth));
        model.update(Msg::ConnectivityChecked(false));
        assert_eq!(model.api_status(), ApiStatus::Offline);
        assert_eq!(model.api_status_text(), "AI Service Offline");

        assert_eq!(model.update(Msg::CheckConnectivity), Some(Effect::CheckHealth));
        assert_eq!(model.api_status(), ApiStatus::Checking);
        model.update(Msg::ConnectivityChecked(true));
        assert_eq!(model.api_status_text(), "AI Service Online");
    }

    #[test]
    fn invalid_pick_from_idle_holds_no_image() {
        let mut model = online();
        model.update(Msg::SelectImage(ImageUpload::new("a.gif", "image/gif", vec![1])));

        assert_eq!(
            model.error_message(),
            Some("Please select a valid image file (JPEG, PNG, BMP, or TIFF)")
        );
        assert!(model.image().is_none());
        assert_eq!(model.update(Msg::Analyze), None);
    }

    #[test]
    fn oversized_pick_keeps_previous_image_and_drops_result() {
        let mut model = resulted();
        model.update(Msg::SelectImage(jpeg(10 * 1024 * 1024 + 1)));

        assert_eq!(model.error_message(), Some("Image size must be less than 10MB"));
        assert!(model.result().is_none());
        assert_eq!(model.image().map(|i| i.size()), Some(1024));
        assert!(model.can_analyze());
    }

    #[test]
    fn analyze_requires_online_service() {
        let mut model = AgriDoctor::new();
        model.update(Msg::SelectImage(jpeg(10)));
        assert_eq!(model.update(Msg::Analyze), None);
        assert_eq!(model.error_message(), Some(SERVICE_CHECKING));

        model.update(Msg::ConnectivityChecked(false));
        assert_eq!(model.update(Msg::Analyze), None);
        assert_eq!(model.error_message(), Some(SERVICE_UNAVAILABLE));
        assert!(model.image().is_some());
    }

    #[test]
    fn analyze_emits_one_detect_effect() {
        let mut model = online();
        model.update(Msg::SelectImage(jpeg(10)));
        assert!(model.can_analyze());

        let effect = model.update(Msg::Analyze);
        assert!(matches!(
            effect,
            Some(Effect::Detect { ref options, .. }) if options.include_explanation == Some(true)
        ));
        assert!(model.is_analyzing());
        assert!(!model.can_analyze());

        assert_eq!(model.update(Msg::Analyze), None);
    }

    #[test]
    fn image_is_locked_while_analyzing() {
        let mut model = online();
        model.update(Msg::SelectImage(ImageUpload::new("a.jpg", "image/jpeg", vec![1])));
        assert!(model.update(Msg::Analyze).is_some());

        model.update(Msg::SelectImage(ImageUpload::new("b.jpg", "image/jpeg", vec![2])));
        assert_eq!(model.update(Msg::Analyze), None);
        model.update(Msg::ClearImage);
        assert!(model.is_analyzing());

        model.update(Msg::AnalysisFinished(Ok(detection())));
        assert_eq!(model.image().map(|i| i.file_name.as_str()), Some("a.jpg"));
        assert!(model.result().is_some());
    }

    #[test]
    fn failure_keeps_image_for_retry() {
        let mut model = online();
        model.update(Msg::SelectImage(jpeg(10)));
        model.update(Msg::Analyze);
        model.update(Msg::AnalysisFinished(Err(ClientError::Timeout)));

        assert_eq!(
            model.error_message(),
            Some("Request timeout. The AI server might be busy.")
        );
        assert!(model.can_analyze());
        assert!(matches!(model.update(Msg::Analyze), Some(Effect::Detect { .. })));
    }

    #[test]
    fn stale_outcome_is_ignored() {
        let mut model = online();
        model.update(Msg::SelectImage(jpeg(10)));
        model.update(Msg::AnalysisFinished(Ok(detection())));
        assert!(matches!(model.stage(), Stage::ImageSelected { .. }));
    }

    #[test]
    fn new_image_discards_result() {
        let mut model = resulted();
        assert!(model.result().is_some());

        model.update(Msg::SelectImage(jpeg(20)));
        assert!(model.result().is_none());
        assert!(matches!(model.stage(), Stage::ImageSelected { image } if image.size() == 20));

        model.update(Msg::ClearImage);
        assert_eq!(model.stage(), &Stage::Idle);
    }

    #[test]
    fn report_guard_rejects_bad_pincodes_without_effect() {
        let mut model = resulted();

        assert_eq!(model.update(Msg::SubmitReport), None);
        assert_eq!(
            model.report().unwrap().error(),
            Some("Please enter a valid pincode")
        );

        for bad in ["12345", "abcde6"] {
            model.update(Msg::PincodeChanged(bad.into()));
            assert_eq!(model.report().unwrap().error(), None);
            assert_eq!(model.update(Msg::SubmitReport), None);
            assert_eq!(
                model.report().unwrap().error(),
                Some("Please enter a valid 6-digit pincode")
            );
        }

        model.update(Msg::PincodeChanged("560001".into()));
        let effect = model.update(Msg::SubmitReport);
        assert!(matches!(effect, Some(Effect::Report(ref r)) if r.pincode == "560001"));
    }

    #[test]
    fn double_submit_is_a_no_op() {
        let mut model = resulted();
        model.update(Msg::PincodeChanged("560001".into()));
        assert!(model.update(Msg::SubmitReport).is_some());
        assert!(model.report().unwrap().is_submitting());

        assert_eq!(model.update(Msg::SubmitReport), None);
        assert!(model.report().unwrap().is_submitting());
    }

    #[test]
    fn success_banner_clears_after_ttl() {
        let mut model = resulted();
        model.update(Msg::PincodeChanged("560001".into()));
        model.update(Msg::SubmitReport);
        model.update(Msg::ReportFinished(Ok(())));

        let deadline = model.banner_deadline().unwrap();
        assert!(model.report().unwrap().succeeded());

        model.update(Msg::Tick(deadline - Duration::from_millis(1)));
        assert!(model.report().unwrap().succeeded());

        model.update(Msg::Tick(deadline));
        assert_eq!(model.report().unwrap().status, ReportStatus::Idle);
        assert!(model.banner_deadline().is_none());
    }

    #[test]
    fn report_failure_persists_until_input_changes() {
        let mut model = resulted();
        model.update(Msg::PincodeChanged("560001".into()));
        model.update(Msg::SubmitReport);
        model.update(Msg::ReportFinished(Err(ClientError::Rejected {
            status: 500,
            message: "Failed to add disease information".into(),
        })));

        let far_future = Instant::now() + Duration::from_secs(3600);
        model.update(Msg::Tick(far_future));
        assert_eq!(
            model.report().unwrap().error(),
            Some("Failed to add disease information")
        );

        model.update(Msg::PincodeChanged("560002".into()));
        assert_eq!(model.report().unwrap().status, ReportStatus::Idle);
    }

    #[test]
    fn report_outcome_without_submission_is_ignored() {
        let mut model = resulted();
        model.update(Msg::ReportFinished(Ok(())));
        assert_eq!(model.report().unwrap().status, ReportStatus::Idle);
    }
}
