//! Simple Login (email/password) user directory of a database.

use serde_json::Value;
use url::Url;

use crate::core::{push_segment, read_json, with_query, Error};
use crate::instance::models::SimpleLoginUser;
use crate::instance::Instance;

impl Instance {
    fn users_url(&self, email: Option<&str>) -> Result<Url, Error> {
        let mut url = self
            .endpoints
            .auth(&format!("v2/{}/users", self.name))?;
        if let Some(email) = email {
            url = push_segment(url, email)?;
        }
        Ok(with_query(url, &[("token", self.admin_token.as_str())]))
    }

    /// Registers a new email/password user.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<SimpleLoginUser, Error> {
        self.ensure_live()?;

        let url = with_query(
            self.endpoints.auth("auth/firebase/create")?,
            &[
                ("firebase", self.name.as_str()),
                ("email", email),
                ("password", password),
            ],
        );
        let response = self.client.get(url).send().await?;
        let mut body = read_json(response).await?;

        let user = body
            .get_mut("user")
            .map(Value::take)
            .ok_or_else(|| Error::MalformedResponse("response has no user".to_string()))?;
        tracing::info!(database = %self.name, "user created");
        Ok(serde_json::from_value(user)?)
    }

    pub async fn remove_user(&self, email: &str) -> Result<(), Error> {
        self.ensure_live()?;

        let response = self
            .client
            .delete(self.users_url(Some(email))?)
            .send()
            .await?;
        read_json(response).await?;

        tracing::info!(database = %self.name, "user removed");
        Ok(())
    }

    pub async fn change_user_password(&self, email: &str, new_password: &str) -> Result<(), Error> {
        self.ensure_live()?;
        self.reset_password(email, Some(new_password)).await
    }

    /// Lists the users of the directory. An empty directory yields an empty list.
    pub async fn list_users(&self) -> Result<Vec<SimpleLoginUser>, Error> {
        self.ensure_live()?;

        let response = self.client.get(self.users_url(None)?).send().await?;
        let mut body = read_json(response).await?;

        let users = body
            .get_mut("users")
            .map(Value::take)
            .ok_or_else(|| Error::MalformedResponse("response has no users".to_string()))?;
        Ok(serde_json::from_value(users)?)
    }

    /// Asks the service to email the user a password reset link.
    pub async fn send_reset_email(&self, email: &str) -> Result<(), Error> {
        self.ensure_live()?;
        self.reset_password(email, None).await
    }

    async fn reset_password(&self, email: &str, new_password: Option<&str>) -> Result<(), Error> {
        let mut params = vec![("firebase", self.name.as_str()), ("email", email)];
        if let Some(password) = new_password {
            params.push(("newPassword", password));
        }

        let url = with_query(self.endpoints.auth("auth/firebase/reset_password")?, &params);
        let response = self.client.get(url).send().await?;
        read_json(response).await?;
        Ok(())
    }
}
