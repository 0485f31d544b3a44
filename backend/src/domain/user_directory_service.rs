//! User directory service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    RegisterUserRequest, UserDirectory, UserRepository, UserRepositoryError,
};
use crate::domain::{Error, User, UserId, Username};

/// Registers users and resolves identifiers to users.
#[derive(Clone)]
pub struct UserDirectoryService<U> {
    users: Arc<U>,
}

impl<U> UserDirectoryService<U> {
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }
}

fn map_user_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserRepositoryError::DuplicateUsername { username } => {
            Error::conflict(format!("username {username} is already taken"))
                .with_details(json!({ "field": "username" }))
        }
    }
}

#[async_trait]
impl<U> UserDirectory for UserDirectoryService<U>
where
    U: UserRepository,
{
    async fn register_user(&self, request: RegisterUserRequest) -> Result<User, Error> {
        let username = Username::new(request.username).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "username" }))
        })?;
        let user = User::new(UserId::random(), username);
        self.users.create(&user).await.map_err(map_user_error)?;
        info!(user = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    async fn find_user(&self, user_id: UserId) -> Result<User, Error> {
        self.users
            .find_by_id(&user_id)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found(format!("user {user_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockUserRepository;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn register_user_persists_validated_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_create()
            .times(1)
            .withf(|user| user.username.as_str() == "ada")
            .return_once(|_| Ok(()));

        let user = UserDirectoryService::new(Arc::new(repo))
            .register_user(RegisterUserRequest {
                username: "ada".to_owned(),
            })
            .await
            .expect("registered");

        assert_eq!(user.username.as_str(), "ada");
    }

    #[rstest]
    #[tokio::test]
    async fn register_user_maps_duplicate_to_conflict() {
        let mut repo = MockUserRepository::new();
        repo.expect_create()
            .return_once(|_| Err(UserRepositoryError::duplicate_username("ada")));

        let error = UserDirectoryService::new(Arc::new(repo))
            .register_user(RegisterUserRequest {
                username: "ada".to_owned(),
            })
            .await
            .expect_err("duplicate");

        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[case("")]
    #[case("two words")]
    #[tokio::test]
    async fn register_user_rejects_invalid_username(#[case] username: &str) {
        let mut repo = MockUserRepository::new();
        repo.expect_create().never();

        let error = UserDirectoryService::new(Arc::new(repo))
            .register_user(RegisterUserRequest {
                username: username.to_owned(),
            })
            .await
            .expect_err("invalid");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn find_user_reports_missing_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().return_once(|_| Ok(None));

        let error = UserDirectoryService::new(Arc::new(repo))
            .find_user(UserId::random())
            .await
            .expect_err("missing");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
