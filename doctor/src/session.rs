use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_STATE: &str = "Maharashtra";
pub const DEFAULT_DISTRICT: &str = "Pune";

const SESSION_FILE: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session file error: {0}")]
    Io(#[from] io::Error),
    #[error("Session data error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    pub state: String,
    pub district: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Default for UserLocation {
    fn default() -> Self {
        Self {
            state: DEFAULT_STATE.to_string(),
            district: DEFAULT_DISTRICT.to_string(),
            coordinates: None,
        }
    }
}

/// Onboarding state persisted between runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub is_first_time: bool,
    #[serde(default)]
    pub has_completed_onboarding: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<UserLocation>,
}

impl Session {
    /// A user nobody has onboarded yet.
    pub fn first_time() -> Self {
        Self {
            is_first_time: true,
            has_completed_onboarding: false,
            user_location: None,
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agri-doctor")
            .join(SESSION_FILE)
    }

    /// Reads the stored session. A missing file means a first-time user,
    /// and a stored location that no longer parses is dropped.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::first_time()),
            Err(e) => return Err(e.into()),
        };

        let mut value: serde_json::Value = serde_json::from_str(&raw)?;
        let location = value
            .as_object_mut()
            .and_then(|fields| fields.remove("userLocation"));

        let mut session: Session = serde_json::from_value(value)?;
        session.user_location = match location {
            None | Some(serde_json::Value::Null) => None,
            Some(location) => match serde_json::from_value(location) {
                Ok(location) => Some(location),
                Err(e) => {
                    log::warn!("Ignoring unreadable saved location in {}: {}", path.display(), e);
                    None
                }
            },
        };
        Ok(session)
    }

    pub fn needs_onboarding(&self) -> bool {
        self.is_first_time && !self.has_completed_onboarding
    }

    pub fn location(&self) -> Option<&UserLocation> {
        self.user_location.as_ref()
    }

    pub fn complete_onboarding(&mut self, location: Option<UserLocation>) {
        self.user_location = Some(location.unwrap_or_default());
        self.has_completed_onboarding = true;
        self.is_first_time = false;
    }

    /// Finishes onboarding with the default location.
    pub fn skip_onboarding(&mut self) {
        self.complete_onboarding(None);
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::debug!("Saved session to {}", path.display());
        Ok(())
    }

    /// Forgets everything stored for this user.
    pub fn sign_out(self, path: &Path) -> Result<Session, SessionError> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Self::first_time())
    }
}
