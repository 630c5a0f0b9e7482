//! Client for the Firebase account admin API.
//!
//! Log in as an account holder, provision and delete databases, and manage
//! each database's secrets, security rules, auth provider settings and
//! Simple Login users.
//!
//! ```rust,no_run
//! # use firebase_account::{Account, Credentials};
//! # async fn run() -> Result<(), firebase_account::Error> {
//! let mut fixture = Account::bootstrap_instance(Credentials::Token("admin-token".into())).await?;
//! fixture.set_rules(serde_json::json!({ ".read": true, ".write": true })).await?;
//! fixture.tear_down().await?;
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod core;
pub mod instance;

pub use account::bootstrap::{BootstrappedInstance, Credentials};
pub use account::Account;
pub use crate::core::config::Endpoints;
pub use crate::core::Error;
pub use instance::models::{AuthConfig, ProviderConfig, SimpleLoginUser};
pub use instance::Instance;
