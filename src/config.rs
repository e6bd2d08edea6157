use std::time::Duration;

use crate::session::{Role, SessionContext, SessionError, UserProfile};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_COURT_ID: u64 = 1;
pub const DEFAULT_RATE: u32 = 1000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Startup configuration, read once from `COURTBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub court_id: u64,
    /// Hourly rate sent with each reservation; replaced by the court's own
    /// rate when the court lookup succeeds.
    pub rate: u32,
    pub token: Option<String>,
    pub user_email: Option<String>,
    pub user_role: Role,
    pub metrics_port: Option<u16>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset and empty variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let user_role = match get("COURTBOOK_USER_ROLE") {
            Some(s) => s.parse::<Role>().map_err(ConfigError::Role)?,
            None => Role::Customer,
        };

        Ok(Self {
            api_url: get("COURTBOOK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            court_id: parse_or("COURTBOOK_COURT_ID", get("COURTBOOK_COURT_ID"), DEFAULT_COURT_ID)?,
            rate: parse_or("COURTBOOK_RATE", get("COURTBOOK_RATE"), DEFAULT_RATE)?,
            token: get("COURTBOOK_TOKEN"),
            user_email: get("COURTBOOK_USER_EMAIL"),
            user_role,
            metrics_port: get("COURTBOOK_METRICS_PORT")
                .map(|v| parse_value("COURTBOOK_METRICS_PORT", &v))
                .transpose()?,
            http_timeout: Duration::from_secs(parse_or(
                "COURTBOOK_HTTP_TIMEOUT_SECS",
                get("COURTBOOK_HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        })
    }

    /// Signed in when a user email is configured, anonymous otherwise.
    pub fn session(&self) -> SessionContext {
        match &self.user_email {
            Some(email) => SessionContext::signed_in(
                UserProfile {
                    email: email.clone(),
                    role: self.user_role,
                },
                self.token.clone(),
            ),
            None => SessionContext::anonymous(),
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key, value.to_string()))
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid(&'static str, String),
    Role(SessionError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid(key, value) => write!(f, "invalid {key}: {value:?}"),
            ConfigError::Role(e) => write!(f, "COURTBOOK_USER_ROLE: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.court_id, 1);
        assert_eq!(cfg.rate, 1000);
        assert_eq!(cfg.metrics_port, None);
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert!(cfg.session().user().is_none());
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("COURTBOOK_API_URL", "https://futsal.example.com"),
            ("COURTBOOK_COURT_ID", "4"),
            ("COURTBOOK_RATE", "1500"),
            ("COURTBOOK_METRICS_PORT", "9100"),
            ("COURTBOOK_HTTP_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.api_url, "https://futsal.example.com");
        assert_eq!(cfg.court_id, 4);
        assert_eq!(cfg.rate, 1500);
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.http_timeout, Duration::from_secs(3));
    }

    #[test]
    fn empty_value_means_unset() {
        let cfg = config(&[("COURTBOOK_RATE", " "), ("COURTBOOK_TOKEN", "")]).unwrap();
        assert_eq!(cfg.rate, DEFAULT_RATE);
        assert_eq!(cfg.token, None);
    }

    #[test]
    fn bad_number_rejected() {
        assert_eq!(
            config(&[("COURTBOOK_COURT_ID", "abc")]),
            Err(ConfigError::Invalid("COURTBOOK_COURT_ID", "abc".into()))
        );
        assert!(config(&[("COURTBOOK_METRICS_PORT", "70000")]).is_err());
    }

    #[test]
    fn signed_in_session() {
        let cfg = config(&[
            ("COURTBOOK_USER_EMAIL", "boss@example.com"),
            ("COURTBOOK_USER_ROLE", "manager"),
            ("COURTBOOK_TOKEN", "abc"),
        ])
        .unwrap();
        let session = cfg.session();
        let auth = session.authenticated().unwrap();
        assert_eq!(auth.token(), Some("abc"));
        assert!(session.manager().is_ok());
    }

    #[test]
    fn unknown_role_rejected() {
        assert!(matches!(
            config(&[("COURTBOOK_USER_ROLE", "admin")]),
            Err(ConfigError::Role(SessionError::UnknownRole(_)))
        ));
    }
}
