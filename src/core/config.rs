use url::Url;

use crate::core::Error;

const ADMIN_URL: &str = "https://admin.firebase.com";
const AUTH_URL: &str = "https://auth.firebase.com";
const INSTANCE_URL_TEMPLATE: &str = "https://{name}.firebaseio.com/";

/// Base URLs of the remote services.
///
/// The production hosts are fixed; tests and staging setups point the
/// endpoints somewhere else, either explicitly or through the
/// `FIREBASE_ADMIN_URL`, `FIREBASE_AUTH_URL` and `FIREBASE_INSTANCE_URL`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Account and provisioning host, e.g. `https://admin.firebase.com`.
    pub admin_url: String,
    /// Simple Login host, e.g. `https://auth.firebase.com`.
    pub auth_url: String,
    /// Public data URL of an instance. `{name}` is replaced by the instance name.
    pub instance_url_template: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            admin_url: ADMIN_URL.to_string(),
            auth_url: AUTH_URL.to_string(),
            instance_url_template: INSTANCE_URL_TEMPLATE.to_string(),
        }
    }
}

impl Endpoints {
    /// Production endpoints, with any of them overridden from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            admin_url: std::env::var("FIREBASE_ADMIN_URL").unwrap_or(defaults.admin_url),
            auth_url: std::env::var("FIREBASE_AUTH_URL").unwrap_or(defaults.auth_url),
            instance_url_template: std::env::var("FIREBASE_INSTANCE_URL")
                .unwrap_or(defaults.instance_url_template),
        }
    }

    /// Canonical public URL of an instance, always ending in `/`.
    pub fn instance_url(&self, name: &str) -> String {
        let url = self.instance_url_template.replace("{name}", name);
        if url.ends_with('/') {
            url
        } else {
            format!("{}/", url)
        }
    }

    pub(crate) fn admin(&self, path: &str) -> Result<Url, Error> {
        join(&self.admin_url, path)
    }

    pub(crate) fn auth(&self, path: &str) -> Result<Url, Error> {
        join(&self.auth_url, path)
    }

    pub(crate) fn instance(&self, name: &str, path: &str) -> Result<Url, Error> {
        join(&self.instance_url(name), path)
    }
}

fn join(base: &str, path: &str) -> Result<Url, Error> {
    let url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&url)?)
}
