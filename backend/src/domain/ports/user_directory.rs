//! Driving port for registering and looking up users.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, User, UserId, Username};

/// Request to register a new user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub username: String,
}

/// Driving port for the user directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Register a user under a fresh identifier.
    ///
    /// Invalid usernames yield `InvalidRequest`; taken ones yield `Conflict`.
    async fn register_user(&self, request: RegisterUserRequest) -> Result<User, Error>;

    /// Look a user up; unknown identifiers yield `NotFound`.
    async fn find_user(&self, user_id: UserId) -> Result<User, Error>;
}

/// Fixture directory that registers without storing and finds nobody.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserDirectory;

#[async_trait]
impl UserDirectory for FixtureUserDirectory {
    async fn register_user(&self, request: RegisterUserRequest) -> Result<User, Error> {
        let username = Username::new(request.username)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        Ok(User::new(UserId::random(), username))
    }

    async fn find_user(&self, user_id: UserId) -> Result<User, Error> {
        Err(Error::not_found(format!("user {user_id} not found")))
    }
}
