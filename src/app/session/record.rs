//! Persisted session record and editable settings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{DownloadedIndex, SelectionSet};
use crate::auth::{normalize_endpoint, Credentials};
use crate::errors::{CatalogError, ConfigError};

/// Everything that survives a restart
///
/// Stored as camelCase JSON. Missing fields decode to their defaults so an
/// older or hand-written file still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionRecord {
    pub selected: SelectionSet,
    pub downloaded: DownloadedIndex,
    pub api_key: String,
    pub user_id: String,
    pub download_location: String,
    pub api_endpoint: String,
}

impl SessionRecord {
    /// Stored credentials, without environment overrides
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.api_key, &self.user_id, &self.api_endpoint)
    }

    /// Current value of a setting
    pub fn setting(&self, setting: Setting) -> &str {
        match setting {
            Setting::ApiKey => &self.api_key,
            Setting::UserId => &self.user_id,
            Setting::Endpoint => &self.api_endpoint,
            Setting::DownloadLocation => &self.download_location,
        }
    }

    /// Overwrite a setting; the endpoint loses trailing slashes
    pub fn set_setting(&mut self, setting: Setting, value: &str) {
        let value = value.trim();
        match setting {
            Setting::ApiKey => self.api_key = value.to_string(),
            Setting::UserId => self.user_id = value.to_string(),
            Setting::Endpoint => self.api_endpoint = normalize_endpoint(value),
            Setting::DownloadLocation => self.download_location = value.to_string(),
        }
    }
}

/// A user-editable setting of the session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    ApiKey,
    UserId,
    Endpoint,
    DownloadLocation,
}

impl Setting {
    /// Every setting, in prompt order
    pub const ALL: [Setting; 4] = [
        Setting::Endpoint,
        Setting::ApiKey,
        Setting::UserId,
        Setting::DownloadLocation,
    ];

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Setting::ApiKey => "API key",
            Setting::UserId => "User id",
            Setting::Endpoint => "API endpoint",
            Setting::DownloadLocation => "Download location",
        }
    }

    /// Key accepted by `config set`
    pub fn key(self) -> &'static str {
        match self {
            Setting::ApiKey => "api-key",
            Setting::UserId => "user-id",
            Setting::Endpoint => "endpoint",
            Setting::DownloadLocation => "download-location",
        }
    }

    /// Whether changing the setting invalidates the catalog
    pub fn requires_reload(self) -> bool {
        !matches!(self, Setting::DownloadLocation)
    }

    /// Whether the value must not be echoed
    pub fn is_secret(self) -> bool {
        matches!(self, Setting::ApiKey)
    }

    /// The setting a catalog failure asks the user to correct
    pub fn for_error(error: &CatalogError) -> Option<Setting> {
        match error {
            CatalogError::InvalidCredentials => Some(Setting::ApiKey),
            CatalogError::InvalidUser => Some(Setting::UserId),
            CatalogError::InvalidEndpoint => Some(Setting::Endpoint),
            CatalogError::Other(_) => None,
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Setting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Setting::ALL
            .into_iter()
            .find(|setting| setting.key() == s)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "setting".to_string(),
                value: s.to_string(),
                reason: "Expected one of: endpoint, api-key, user-id, download-location"
                    .to_string(),
            })
    }
}
