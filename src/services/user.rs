//! User service: account records and their live-connection attribute.

use std::sync::Arc;

use tracing::debug;

use super::{new_id, now_millis, require, Result, ServiceError};
use crate::codec::{self, RecordKey};
use crate::index;
use crate::model::User;
use crate::store::TableStore;

pub struct UserService {
    store: Arc<dyn TableStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Create a user record. Does not check email uniqueness; use
    /// [`register`](Self::register) for the registration flow.
    pub async fn create(
        &self,
        user_name: &str,
        email: &str,
        date_of_birth: &str,
        password: &str,
        user_image_url: Option<String>,
    ) -> Result<User> {
        require(user_name, "user name")?;
        require(email, "email")?;
        require(password, "password")?;

        let user = User {
            user_id: new_id(),
            user_name: user_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            date_of_birth: date_of_birth.to_string(),
            created_at: now_millis(),
            user_image_url,
            wss_id: None,
        };
        self.store.put(codec::encode_user(&user)).await?;
        debug!(user_id = %user.user_id, "created user");
        Ok(user)
    }

    /// Registration: email must not already be taken.
    pub async fn register(
        &self,
        user_name: &str,
        email: &str,
        date_of_birth: &str,
        password: &str,
        user_image_url: Option<String>,
    ) -> Result<User> {
        if self.get_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "user with email '{email}' already exists"
            )));
        }
        self.create(user_name, email, date_of_birth, password, user_image_url)
            .await
    }

    /// Login by email and password.
    ///
    /// Unknown email is `Ok(None)`; a wrong password for a known email is
    /// `InvalidInput`, never "not found". The returned record includes the
    /// stored plaintext `password` field — preserved observed behavior of
    /// the system this replaces; do not build new callers on it.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<User>> {
        require(email, "email")?;
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };
        if user.password != password {
            return Err(ServiceError::InvalidInput("invalid password".to_string()));
        }
        Ok(Some(user))
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<User>> {
        require(user_id, "user id")?;
        let found = self.store.get(&RecordKey::user_profile(user_id)).await?;
        found
            .as_ref()
            .map(codec::decode_user)
            .transpose()
            .map_err(Into::into)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let records = self.store.query(&index::users_by_email(email)?).await?;
        records
            .first()
            .map(codec::decode_user)
            .transpose()
            .map_err(Into::into)
    }

    /// Resolve the user currently holding a live connection id. Offline
    /// users carry no `wssId` attribute and are invisible here.
    pub async fn get_by_connection_id(&self, connection_id: &str) -> Result<Option<User>> {
        let records = self
            .store
            .query(&index::users_by_connection_id(connection_id)?)
            .await?;
        records
            .first()
            .map(codec::decode_user)
            .transpose()
            .map_err(Into::into)
    }

    /// Administrative listing of all users.
    pub async fn list(&self) -> Result<Vec<User>> {
        let records = self.store.scan(&index::all_users()).await?;
        records
            .iter()
            .map(|r| codec::decode_user(r).map_err(Into::into))
            .collect()
    }

    /// Full-record overwrite.
    pub async fn update(&self, user: &User) -> Result<()> {
        require(&user.user_id, "user id")?;
        self.store.put(codec::encode_user(user)).await?;
        Ok(())
    }

    pub async fn delete(&self, user_id: &str) -> Result<()> {
        require(user_id, "user id")?;
        self.store.delete(&RecordKey::user_profile(user_id)).await?;
        Ok(())
    }
}
