//! Throwaway databases, mostly for test fixtures.

use std::ops::Deref;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest_middleware::ClientWithMiddleware;

use crate::account::Account;
use crate::core::config::Endpoints;
use crate::core::middleware::default_client;
use crate::core::Error;
use crate::instance::Instance;

const NAME_PREFIX: &str = "firebase-account-";
const NAME_SUFFIX_LEN: usize = 12;

/// How to authenticate the account that owns a bootstrapped database.
#[derive(Debug, Clone)]
pub enum Credentials {
    Token(String),
    Login { email: String, password: String },
}

/// A freshly created database together with the account that can delete it.
pub struct BootstrappedInstance {
    account: Account,
    instance: Arc<Instance>,
}

impl BootstrappedInstance {
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Deletes the database.
    pub async fn tear_down(&mut self) -> Result<(), Error> {
        let instance = Arc::clone(&self.instance);
        self.account.delete_database(&instance).await
    }
}

impl Deref for BootstrappedInstance {
    type Target = Instance;

    fn deref(&self) -> &Instance {
        &self.instance
    }
}

impl Account {
    /// Authenticates and creates a database under a random name.
    pub async fn bootstrap_instance(credentials: Credentials) -> Result<BootstrappedInstance, Error> {
        Self::bootstrap_instance_with_client(default_client(), Endpoints::default(), credentials).await
    }

    pub async fn bootstrap_instance_with_client(
        client: ClientWithMiddleware,
        endpoints: Endpoints,
        credentials: Credentials,
    ) -> Result<BootstrappedInstance, Error> {
        let mut account = match credentials {
            Credentials::Token(token) => Self::with_client(client, endpoints, token),
            Credentials::Login { email, password } => {
                Self::login_with_client(client, endpoints, &email, &password).await?
            }
        };

        let name = random_database_name();
        let instance = account.create_database(&name).await?;

        Ok(BootstrappedInstance { account, instance })
    }
}

/// A database name that is very unlikely to be taken.
pub fn random_database_name() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{}", NAME_PREFIX, suffix)
}
