pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod flow;
pub mod healthmap;
pub mod session;

pub use api::DiseaseDetectionClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use flow::{
    AgriDoctor, AgriDoctorApp, ApiStatus, DetectionService, Effect, HealthMapReporter, Msg,
    ReportForm, ReportStatus, Stage,
};
pub use healthmap::HealthMapClient;
pub use session::{Coordinates, Session, SessionError, UserLocation};
