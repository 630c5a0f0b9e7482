use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authentication provider settings of a database.
///
/// Providers the service knows about are typed; anything else the service
/// returns is kept in `extra` so a fetched config can be written back
/// without losing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Origins allowed to use OAuth redirects and popups.
    #[serde(default)]
    pub domains: Vec<String>,

    /// How long a login session lasts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_length_seconds: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<ProviderConfig>,

    /// Email/password (Simple Login) provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<ProviderConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<ProviderConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<ProviderConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<ProviderConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<ProviderConfig>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Settings of one authentication provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub enabled: bool,

    /// OAuth client id, for the third-party providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// OAuth client secret, for the third-party providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl ProviderConfig {
    fn disabled() -> Self {
        Self::default()
    }

    fn disabled_oauth() -> Self {
        Self {
            enabled: false,
            key: Some(String::new()),
            secret: Some(String::new()),
            scope: None,
        }
    }
}

impl Default for AuthConfig {
    /// The settings a newly provisioned database starts with.
    fn default() -> Self {
        Self {
            domains: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            session_length_seconds: Some(86400),
            anonymous: Some(ProviderConfig::disabled()),
            password: Some(ProviderConfig::disabled()),
            facebook: Some(ProviderConfig::disabled_oauth()),
            github: Some(ProviderConfig::disabled_oauth()),
            google: Some(ProviderConfig::disabled_oauth()),
            twitter: Some(ProviderConfig::disabled_oauth()),
            extra: Map::new(),
        }
    }
}

/// A user of a database's Simple Login (email/password) directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleLoginUser {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
