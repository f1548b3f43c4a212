//! Jellyfin credential handling
//!
//! Credentials (API key, user id, endpoint) live in the session record.
//! Environment variables can override them for one process without being
//! written back, and the `config setup` command prompts for them
//! interactively.

use std::env;
use std::fmt;
use std::io::{self, Write};

use crate::app::session::Setting;
use crate::constants::env as env_constants;

/// Credentials used for every catalog and download request
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Jellyfin API key
    pub api_key: String,
    /// Jellyfin user id, empty meaning the server default
    pub user_id: String,
    /// Server base URL without trailing slash
    pub endpoint: String,
}

impl Credentials {
    /// Create credentials, normalizing the endpoint
    pub fn new(
        api_key: impl Into<String>,
        user_id: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            user_id: user_id.into(),
            endpoint: normalize_endpoint(&endpoint.into()),
        }
    }

    /// Whether both the key and endpoint are filled in
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.endpoint.is_empty()
    }
}

// The API key must never reach a log line
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask(&self.api_key))
            .field("user_id", &self.user_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Process-level credential overrides read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub endpoint: Option<String>,
}

impl EnvOverrides {
    /// Read `JELLYFIN_API_KEY`, `JELLYFIN_USER_ID` and `JELLYFIN_ENDPOINT`
    ///
    /// Empty variables count as unset.
    pub fn from_env() -> Self {
        let read = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: read(env_constants::API_KEY),
            user_id: read(env_constants::USER_ID),
            endpoint: read(env_constants::ENDPOINT),
        }
    }

    /// Whether any override is set
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.user_id.is_none() && self.endpoint.is_none()
    }

    /// Apply the overrides on top of stored credentials
    pub fn apply(&self, stored: &Credentials) -> Credentials {
        Credentials::new(
            self.api_key.clone().unwrap_or_else(|| stored.api_key.clone()),
            self.user_id.clone().unwrap_or_else(|| stored.user_id.clone()),
            self.endpoint
                .clone()
                .unwrap_or_else(|| stored.endpoint.clone()),
        )
    }

    /// Name of the variable overriding `setting`, if it is set
    pub fn overridden_by(&self, setting: Setting) -> Option<&'static str> {
        match setting {
            Setting::ApiKey if self.api_key.is_some() => Some(env_constants::API_KEY),
            Setting::UserId if self.user_id.is_some() => Some(env_constants::USER_ID),
            Setting::Endpoint if self.endpoint.is_some() => Some(env_constants::ENDPOINT),
            _ => None,
        }
    }
}

/// Trim whitespace and trailing slashes from an endpoint URL
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

/// Mask a secret for display, keeping the last four characters
pub fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

/// Prompt for one setting on the terminal
///
/// The API key is read without echo.
pub fn prompt_setting(setting: Setting, current: &str) -> io::Result<String> {
    let label = setting.label();

    let value = if setting == Setting::ApiKey {
        rpassword::prompt_password(format!("{} (hidden): ", label))?
    } else {
        if current.is_empty() {
            print!("{}: ", label);
        } else {
            print!("{} [{}]: ", label, current);
        }
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        line
    };

    let value = value.trim();
    if value.is_empty() {
        Ok(current.to_string())
    } else {
        Ok(value.to_string())
    }
}
