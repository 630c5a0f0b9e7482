//! A single hosted database.
//!
//! An [`Instance`] is obtained from [`crate::Account::create_database`] or
//! [`crate::Account::get_database`] and is always ready: the exchange of the
//! admin token for the database's personal and instance tokens has already
//! succeeded. Each accessor is one independent remote call.
//!
//! Once the owning account deletes the database, every method except
//! [`Instance::url`] fails with [`Error::DeletedInstance`] without touching
//! the network.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use firebase_account::Account;
//! # async fn run() -> Result<(), firebase_account::Error> {
//! let mut account = Account::from_token("admin-token");
//! let db = account.get_database("my-db").await?;
//!
//! db.set_rules(serde_json::json!({ ".read": true })).await?;
//! let secret = db.add_auth_token().await?;
//! db.remove_auth_token(&secret).await?;
//! # Ok(())
//! # }
//! ```

pub mod models;
mod users;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use url::Url;

use crate::core::config::Endpoints;
use crate::core::{form, push_segment, read_json, token_field, with_query, Error};
use models::AuthConfig;

#[cfg(test)]
mod tests;

/// Handle to one remote database.
pub struct Instance {
    client: ClientWithMiddleware,
    endpoints: Arc<Endpoints>,
    name: String,
    admin_token: String,
    personal_token: String,
    instance_token: String,
    // Local mirror of the remote secret list, filled on first read.
    auth_tokens: Mutex<Option<Vec<String>>>,
    deleted: AtomicBool,
}

impl Instance {
    /// Exchanges the admin token for the database's own tokens.
    pub(crate) async fn connect(
        client: ClientWithMiddleware,
        endpoints: Arc<Endpoints>,
        admin_token: &str,
        name: &str,
    ) -> Result<Self, Error> {
        let url = with_query(
            endpoints.admin(&format!("firebase/{}/token", name))?,
            &[("token", admin_token), ("namespace", name)],
        );

        let response = client.get(url).send().await?;
        let body = read_json(response).await?;

        let personal_token = token_field(&body, "personalToken")?;
        let instance_token = token_field(&body, "firebaseToken")?;

        tracing::debug!(database = name, "database tokens issued");

        Ok(Self {
            client,
            endpoints,
            name: name.to_string(),
            admin_token: admin_token.to_string(),
            personal_token,
            instance_token,
            auth_tokens: Mutex::new(None),
            deleted: AtomicBool::new(false),
        })
    }

    /// The database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical public URL of the database, e.g. `https://my-db.firebaseio.com/`.
    pub fn url(&self) -> String {
        self.endpoints.instance_url(&self.name)
    }

    pub fn personal_token(&self) -> &str {
        &self.personal_token
    }

    pub fn instance_token(&self) -> &str {
        &self.instance_token
    }

    /// Whether the owning account has deleted this database.
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    fn ensure_live(&self) -> Result<(), Error> {
        if self.is_deleted() {
            return Err(Error::DeletedInstance(self.name.clone()));
        }
        Ok(())
    }

    fn settings_url(&self, path: &str) -> Result<Url, Error> {
        let url = self
            .endpoints
            .instance(&self.name, &format!(".settings/{}", path))?;
        Ok(with_query(url, &[("auth", self.personal_token.as_str())]))
    }

    // .settings/secrets/{token}.json, with the token as a single path segment.
    pub(crate) fn secret_url(&self, token: &str) -> Result<Url, Error> {
        let url = self.endpoints.instance(&self.name, ".settings/secrets")?;
        let url = push_segment(url, &format!("{}.json", token))?;
        Ok(with_query(url, &[("auth", self.personal_token.as_str())]))
    }

    /// Lists the database's auth tokens (secrets).
    ///
    /// The first successful call caches the list; later calls answer from the
    /// cache, which [`Instance::add_auth_token`] and
    /// [`Instance::remove_auth_token`] keep up to date.
    pub async fn auth_tokens(&self) -> Result<Vec<String>, Error> {
        self.ensure_live()?;

        if let Some(tokens) = self.auth_tokens.lock().await.as_ref() {
            return Ok(tokens.clone());
        }

        let response = self
            .client
            .get(self.settings_url("secrets.json")?)
            .send()
            .await?;
        let tokens = match read_json(response).await? {
            Value::Null => Vec::new(),
            list @ Value::Array(_) => serde_json::from_value::<Vec<String>>(list)?,
            other => {
                return Err(Error::MalformedResponse(format!(
                    "expected a list of secrets, got {}",
                    other
                )))
            }
        };

        *self.auth_tokens.lock().await = Some(tokens.clone());
        Ok(tokens)
    }

    /// Creates a new auth token and returns it.
    pub async fn add_auth_token(&self) -> Result<String, Error> {
        self.ensure_live()?;

        let response = self
            .client
            .post(self.settings_url("secrets.json")?)
            .send()
            .await?;
        let token = match read_json(response).await? {
            Value::String(token) => token,
            other => {
                return Err(Error::MalformedResponse(format!(
                    "expected the new secret, got {}",
                    other
                )))
            }
        };

        self.auth_tokens
            .lock()
            .await
            .get_or_insert_with(Vec::new)
            .push(token.clone());
        tracing::info!(database = %self.name, "auth token added");
        Ok(token)
    }

    /// Revokes an auth token.
    ///
    /// The token must be in the (possibly cached) token list; otherwise
    /// [`Error::UnknownToken`] is returned and no request is made. A token
    /// added or removed by another client since the list was loaded is not
    /// noticed.
    pub async fn remove_auth_token(&self, token: &str) -> Result<(), Error> {
        self.ensure_live()?;

        let tokens = self.auth_tokens().await?;
        if !tokens.iter().any(|t| t == token) {
            return Err(Error::UnknownToken(token.to_string()));
        }

        let response = self
            .client
            .delete(self.secret_url(token)?)
            .send()
            .await?;
        read_json(response).await?;

        if let Some(tokens) = self.auth_tokens.lock().await.as_mut() {
            if let Some(position) = tokens.iter().position(|t| t == token) {
                tokens.remove(position);
            }
        }
        tracing::info!(database = %self.name, "auth token removed");
        Ok(())
    }

    /// Fetches the security rules, without the `{"rules": ...}` envelope.
    pub async fn rules(&self) -> Result<Value, Error> {
        self.ensure_live()?;

        let response = self
            .client
            .get(self.settings_url("rules.json")?)
            .send()
            .await?;
        let mut body = read_json(response).await?;

        body.get_mut("rules")
            .map(Value::take)
            .ok_or_else(|| Error::MalformedResponse("response has no rules".to_string()))
    }

    /// Replaces the security rules.
    ///
    /// Accepts either a bare rules object or one already wrapped as
    /// `{"rules": {...}}`. Rule expressions are not checked locally; invalid
    /// ones come back as a remote error.
    pub async fn set_rules(&self, rules: Value) -> Result<(), Error> {
        self.ensure_live()?;

        let document = wrap_rules(rules);
        let response = self
            .client
            .put(self.settings_url("rules.json")?)
            .json(&document)
            .send()
            .await?;
        let body = read_json(response).await?;

        match body.get("status").and_then(Value::as_str) {
            Some("ok") => {
                tracing::info!(database = %self.name, "security rules updated");
                Ok(())
            }
            _ => Err(Error::Remote {
                message: format!("rules update was not accepted: {}", body),
                code: None,
            }),
        }
    }

    /// Fetches the auth provider configuration.
    ///
    /// Returns `None` when no configuration has been set yet.
    pub async fn auth_config(&self) -> Result<Option<AuthConfig>, Error> {
        self.ensure_live()?;

        let response = self.client.get(self.settings_url(".json")?).send().await?;
        let body = read_json(response).await?;

        match body.get("authConfig") {
            Some(Value::String(raw)) if raw.is_empty() => Ok(None),
            Some(Value::String(raw)) => Ok(Some(serde_json::from_str(raw)?)),
            Some(config @ Value::Object(_)) => Ok(Some(serde_json::from_value(config.clone())?)),
            _ => Err(Error::MalformedResponse(
                "settings have no authConfig".to_string(),
            )),
        }
    }

    /// Replaces the auth provider configuration.
    pub async fn set_auth_config(&self, config: &AuthConfig) -> Result<(), Error> {
        self.ensure_live()?;

        let url = self
            .endpoints
            .admin(&format!("firebase/{}/authConfig", self.name))?;
        let encoded = serde_json::to_string(config)?;
        let body = form(&[
            ("token", self.admin_token.as_str()),
            ("authConfig", encoded.as_str()),
            ("_method", "put"),
        ]);

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        read_json(response).await?;

        tracing::info!(database = %self.name, "auth config updated");
        Ok(())
    }
}

/// Wraps a rules object in exactly one `{"rules": ...}` envelope.
pub(crate) fn wrap_rules(rules: Value) -> Value {
    let wrapped = matches!(&rules, Value::Object(map) if map.len() == 1 && map.contains_key("rules"));
    if wrapped {
        rules
    } else {
        json!({ "rules": rules })
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("deleted", &self.is_deleted())
            .finish_non_exhaustive()
    }
}
