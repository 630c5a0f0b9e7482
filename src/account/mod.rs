//! Account-level operations: authentication and database provisioning.
//!
//! An [`Account`] holds the admin token and a registry of the databases it
//! has created or opened during this process, keyed by name. Opening a
//! database that is already registered returns the same [`Instance`] handle
//! without a network call; deleting a database marks the handle deleted and
//! drops it from the registry.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use firebase_account::Account;
//! # async fn run() -> Result<(), firebase_account::Error> {
//! let mut account = Account::login("me@example.com", "secret").await?;
//!
//! let db = account.create_database("my-new-db").await?;
//! println!("created {}", db);
//!
//! account.delete_database(&db).await?;
//! assert!(db.is_deleted());
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;

use crate::core::config::Endpoints;
use crate::core::middleware::default_client;
use crate::core::{form, read_json, read_json_ok, token_field, with_query, Error};
use crate::instance::models::AuthConfig;
use crate::instance::Instance;


/// An authenticated account administrator.
pub struct Account {
    client: ClientWithMiddleware,
    endpoints: Arc<Endpoints>,
    admin_token: String,
    instances: HashMap<String, Arc<Instance>>,
}

impl Account {
    /// Creates an account from an existing admin token.
    ///
    /// The token is not checked until it is first used.
    pub fn from_token(admin_token: impl Into<String>) -> Self {
        Self::with_client(default_client(), Endpoints::default(), admin_token)
    }

    /// Creates an account with a custom HTTP client and endpoint set.
    pub fn with_client(
        client: ClientWithMiddleware,
        endpoints: Endpoints,
        admin_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoints: Arc::new(endpoints),
            admin_token: admin_token.into(),
            instances: HashMap::new(),
        }
    }

    /// Logs in with email and password and returns the account.
    ///
    /// Every failure, including a rejected password, is reported as
    /// [`Error::Authentication`].
    pub async fn login(email: &str, password: &str) -> Result<Self, Error> {
        Self::login_with_client(default_client(), Endpoints::default(), email, password).await
    }

    pub async fn login_with_client(
        client: ClientWithMiddleware,
        endpoints: Endpoints,
        email: &str,
        password: &str,
    ) -> Result<Self, Error> {
        let url = with_query(
            endpoints.admin("account/login")?,
            &[("email", email), ("password", password)],
        );

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Authentication(e.to_string()))?;
        let body = read_json(response).await.map_err(authentication_error)?;
        let admin_token = token_field(&body, "adminToken")?;

        tracing::info!(email, "logged in");
        Ok(Self::with_client(client, endpoints, admin_token))
    }

    /// The fixed provider settings a new database starts with.
    pub fn default_auth_config() -> AuthConfig {
        AuthConfig::default()
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// A registered database, if this account has created or opened it.
    pub fn instance(&self, name: &str) -> Option<Arc<Instance>> {
        self.instances.get(name).cloned()
    }

    /// All registered databases, in no particular order.
    pub fn instances(&self) -> impl Iterator<Item = &Arc<Instance>> {
        self.instances.values()
    }

    pub fn contains_database(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Provisions a new database and registers it under `name`.
    ///
    /// The service decides whether the name is available; a taken name comes
    /// back as [`Error::Remote`] or [`Error::CredentialOrServer`].
    pub async fn create_database(&mut self, name: &str) -> Result<Arc<Instance>, Error> {
        let url = self.endpoints.admin(&format!("firebase/{}", name))?;
        let body = form(&[("token", self.admin_token.as_str()), ("appName", name)]);

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        read_json_ok(response).await?;

        let instance = Arc::new(self.connect(name).await?);
        self.instances.insert(name.to_string(), Arc::clone(&instance));

        tracing::info!(database = name, "database created");
        Ok(instance)
    }

    /// Opens an existing database, answering from the registry when possible.
    pub async fn get_database(&mut self, name: &str) -> Result<Arc<Instance>, Error> {
        if let Some(instance) = self.instances.get(name) {
            return Ok(Arc::clone(instance));
        }

        let instance = Arc::new(self.connect(name).await?);
        self.instances.insert(name.to_string(), Arc::clone(&instance));
        Ok(instance)
    }

    /// Deletes a database.
    ///
    /// Fails with [`Error::AlreadyDeleted`] without a request when the handle
    /// is already deleted. On success the handle is marked deleted and
    /// removed from the registry.
    pub async fn delete_database(&mut self, instance: &Instance) -> Result<(), Error> {
        if instance.is_deleted() {
            return Err(Error::AlreadyDeleted(instance.name().to_string()));
        }

        let name = instance.name();
        let url = self.endpoints.admin(&format!("firebase/{}", name))?;
        let body = form(&[
            ("token", self.admin_token.as_str()),
            ("namespace", name),
            ("_method", "DELETE"),
        ]);

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        read_json_ok(response).await?;

        instance.mark_deleted();
        // The remote database is gone, whichever handle is registered for it.
        if let Some(registered) = self.instances.remove(name) {
            registered.mark_deleted();
        }

        tracing::info!(database = name, "database deleted");
        Ok(())
    }

    async fn connect(&self, name: &str) -> Result<Instance, Error> {
        Instance::connect(
            self.client.clone(),
            Arc::clone(&self.endpoints),
            &self.admin_token,
            name,
        )
        .await
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.instances.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Account")
            .field("endpoints", &self.endpoints)
            .field("instances", &names)
            .finish_non_exhaustive()
    }
}

fn authentication_error(error: Error) -> Error {
    match error {
        Error::HttpStatus(status) => Error::Authentication(format!("HTTP {}", status.as_u16())),
        Error::Remote { message, .. } => Error::Authentication(message),
        Error::CredentialOrServer => Error::Authentication(error.to_string()),
        Error::Transport(e) => Error::Authentication(e.to_string()),
        Error::Body(e) => Error::Authentication(e.to_string()),
        Error::Json(e) => Error::Authentication(format!("unreadable login response: {}", e)),
        other => other,
    }
}
