//! Panel connection settings.
//!
//! # Design
//! Settings come from environment variables so the admin secrets never live
//! in source. `from_lookup` takes any key-to-value function, which lets
//! tests load a config without touching the process environment.

use std::fmt;

use crate::error::ApiError;

pub const ENV_PANEL_URL: &str = "ISP_PANEL_URL";
pub const ENV_SERVICE: &str = "ISP_SERVICE";
pub const ENV_LANG: &str = "ISP_LANG";
pub const ENV_ADMIN_LOGIN: &str = "ISP_ADMIN_LOGIN";
pub const ENV_ADMIN_PASSWORD: &str = "ISP_ADMIN_PASSWORD";

pub const DEFAULT_SERVICE: &str = "billmgr";
pub const DEFAULT_LANG: &str = "ru";

/// Admin login and password used by `auth("admin")`.
///
/// The `Debug` output never shows the password.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AdminCredentials {
    login: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// The `authinfo` value for these credentials.
    pub(crate) fn authinfo(&self) -> String {
        format!("{}:{}", self.login, self.password)
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and how to reach the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    /// Site root with scheme and without a trailing slash.
    pub path: String,
    pub service: String,
    pub lang: String,
    pub admin: AdminCredentials,
}

impl PanelConfig {
    pub fn new(path: &str, admin: AdminCredentials) -> Self {
        Self {
            path: path.trim_end_matches('/').to_string(),
            service: DEFAULT_SERVICE.to_string(),
            lang: DEFAULT_LANG.to_string(),
            admin,
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    ///
    /// Only the panel URL is required. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let path = get(ENV_PANEL_URL).ok_or_else(|| ApiError::Config(format!("{ENV_PANEL_URL} is not set")))?;
        let admin = AdminCredentials::new(
            get(ENV_ADMIN_LOGIN).unwrap_or_default(),
            get(ENV_ADMIN_PASSWORD).unwrap_or_default(),
        );

        let mut config = Self::new(&path, admin);
        if let Some(service) = get(ENV_SERVICE) {
            config.service = service;
        }
        if let Some(lang) = get(ENV_LANG) {
            config.lang = lang;
        }
        Ok(config)
    }
}
