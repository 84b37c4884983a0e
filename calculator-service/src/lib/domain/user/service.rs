use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::AuthenticationResult;
use auth::Authenticator;
use auth::TokenClaims;
use chrono::Utc;

use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserSession;
use crate::domain::user::models::Username;
use crate::user::errors::UserError;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Domain service implementation for user operations.
///
/// Password hashing and verification run on the blocking thread pool.
pub struct UserService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> UserService<UR>
where
    UR: UserRepository,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `authenticator` - Password hashing and token issuing
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, UserError> {
        let authenticator = Arc::clone(&self.authenticator);
        run_blocking(move || authenticator.hash_password(&password))
            .await?
            .map_err(UserError::from)
    }

    async fn verify_and_issue(
        &self,
        user: &User,
        password: String,
    ) -> Result<UserSession, UserError> {
        let authenticator = Arc::clone(&self.authenticator);
        let stored_hash = user.password_hash.clone();
        let claims = TokenClaims::for_user(user.id.0, user.username.as_str());

        let result = run_blocking(move || {
            authenticator.authenticate(&password, &stored_hash, &claims)
        })
        .await?
        .map_err(|e| match e {
            AuthenticationError::InvalidCredentials => UserError::InvalidCredentials,
            AuthenticationError::PasswordError(err) => UserError::Password(err),
            AuthenticationError::TokenError(err) => UserError::Token(err),
        })?;

        Ok(session(user.clone(), result))
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, UserError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| UserError::Unknown(format!("Password task failed: {}", e)))
}

fn session(user: User, result: AuthenticationResult) -> UserSession {
    UserSession {
        user,
        access_token: result.access_token,
        expires_at: result.expires_at,
    }
}

#[async_trait]
impl<UR> UserServicePort for UserService<UR>
where
    UR: UserRepository,
{
    async fn register(&self, command: RegisterUserCommand) -> Result<UserSession, UserError> {
        let password_hash = self.hash_password(command.password.into_string()).await?;

        let user = self
            .repository
            .create(NewUser {
                username: command.username,
                email: command.email,
                password_hash,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        let result = self
            .authenticator
            .issue_token(&TokenClaims::for_user(user.id.0, user.username.as_str()))?;

        Ok(session(user, result))
    }

    async fn login(&self, command: LoginCommand) -> Result<UserSession, UserError> {
        let user = self
            .repository
            .find_by_username(&command.username)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        let session = self.verify_and_issue(&user, command.password).await;
        if let Err(UserError::InvalidCredentials) = &session {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        }
        session
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }

    async fn get_user_by_username(&self, username: &Username) -> Result<User, UserError> {
        self.repository
            .find_by_username(username)
            .await?
            .ok_or(UserError::NotFoundByUsername(username.to_string()))
    }

    async fn update_profile(
        &self,
        id: &UserId,
        command: UpdateProfileCommand,
    ) -> Result<User, UserError> {
        let mut user = self.get_user(id).await?;

        if let Some(new_username) = command.username {
            user.username = new_username;
        }

        if let Some(new_email) = command.email {
            user.email = new_email;
        }

        self.repository.update(user).await
    }

    async fn change_password(
        &self,
        id: &UserId,
        command: ChangePasswordCommand,
    ) -> Result<(), UserError> {
        let mut user = self.get_user(id).await?;

        let authenticator = Arc::clone(&self.authenticator);
        let stored_hash = user.password_hash.clone();
        let old_password = command.old_password;
        let matches = run_blocking(move || {
            authenticator.verify_password(&old_password, &stored_hash)
        })
        .await?;
        if !matches {
            return Err(UserError::InvalidCredentials);
        }

        user.password_hash = self
            .hash_password(command.new_password.into_string())
            .await?;
        self.repository.update(user).await?;

        tracing::info!(user_id = %id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use auth::PasswordHasher;
    use auth::SigningKey;
    use auth::TokenCodec;
    use mockall::mock;

    use super::*;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::Password;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: NewUser) -> Result<User, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
            async fn find_by_username(&self, username: &Username) -> Result<Option<User>, UserError>;
            async fn update(&self, user: User) -> Result<User, UserError>;
        }
    }

    fn authenticator() -> Arc<Authenticator> {
        let key = SigningKey::new("user_service_test_secret_32_bytes!").unwrap();
        Arc::new(Authenticator::new(
            TokenCodec::new(key),
            chrono::Duration::minutes(30),
        ))
    }

    fn stored_user(id: i64, username: &str, password: &str) -> User {
        User {
            id: UserId(id),
            username: Username::new(username.to_string()).unwrap(),
            email: EmailAddress::new(format!("{}@example.com", username)).unwrap(),
            password_hash: PasswordHasher::new().hash(password).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn persisted(user: NewUser, id: i64) -> User {
        User {
            id: UserId(id),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repository = MockTestUserRepository::new();

        repository
            .expect_create()
            .withf(|user| {
                user.username.as_str() == "testuser"
                    && user.email.as_str() == "test@example.com"
                    && user.password_hash.starts_with("$argon2")
            })
            .times(1)
            .returning(|user| Ok(persisted(user, 1)));

        let authenticator = authenticator();
        let service = UserService::new(Arc::new(repository), Arc::clone(&authenticator));

        let command = RegisterUserCommand::new(
            Username::new("testuser".to_string()).unwrap(),
            EmailAddress::new("test@example.com".to_string()).unwrap(),
            Password::new("password123".to_string()).unwrap(),
        );

        let session = service.register(command).await.expect("Registration failed");
        assert_eq!(session.user.id, UserId(1));
        assert!(PasswordHasher::new().verify("password123", &session.user.password_hash));

        let claims = authenticator
            .validate_token(session.access_token.as_str())
            .expect("Token validation failed");
        assert_eq!(claims.user_id, Some(1));
        assert_eq!(claims.sub, Some("testuser".to_string()));
    }

    #[tokio::test]
    async fn test_register_overlong_password() {
        let mut repository = MockTestUserRepository::new();
        repository.expect_create().times(0);

        let service = UserService::new(Arc::new(repository), authenticator());

        let command = RegisterUserCommand::new(
            Username::new("testuser".to_string()).unwrap(),
            EmailAddress::new("test@example.com".to_string()).unwrap(),
            Password::new("x".repeat(73)).unwrap(),
        );

        let result = service.register(command).await;
        assert!(matches!(
            result,
            Err(UserError::Password(auth::PasswordError::CredentialTooLong { .. }))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let mut repository = MockTestUserRepository::new();

        repository.expect_create().times(1).returning(|user| {
            Err(UserError::UsernameAlreadyExists(
                user.username.as_str().to_string(),
            ))
        });

        let service = UserService::new(Arc::new(repository), authenticator());

        let command = RegisterUserCommand::new(
            Username::new("testuser".to_string()).unwrap(),
            EmailAddress::new("test2@example.com".to_string()).unwrap(),
            Password::new("password456".to_string()).unwrap(),
        );

        let result = service.register(command).await;
        assert!(matches!(result, Err(UserError::UsernameAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut repository = MockTestUserRepository::new();
        let user = stored_user(7, "alice", "correct_password");

        repository
            .expect_find_by_username()
            .withf(|username| username.as_str() == "alice")
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = UserService::new(Arc::new(repository), authenticator());

        let session = service
            .login(LoginCommand {
                username: Username::new("alice".to_string()).unwrap(),
                password: "correct_password".to_string(),
            })
            .await
            .expect("Login failed");

        assert_eq!(session.user.id, UserId(7));
        assert!(!session.access_token.as_str().is_empty());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut repository = MockTestUserRepository::new();
        let user = stored_user(7, "alice", "correct_password");

        repository
            .expect_find_by_username()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = UserService::new(Arc::new(repository), authenticator());

        let result = service
            .login(LoginCommand {
                username: Username::new("alice".to_string()).unwrap(),
                password: "wrong_password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_username()
            .times(1)
            .returning(|_| Ok(None));

        let service = UserService::new(Arc::new(repository), authenticator());

        let result = service
            .login(LoginCommand {
                username: Username::new("nobody".to_string()).unwrap(),
                password: "whatever123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = UserService::new(Arc::new(repository), authenticator());

        let result = service.get_user(&UserId(99)).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_user_by_username_not_found() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_username()
            .times(1)
            .returning(|_| Ok(None));

        let service = UserService::new(Arc::new(repository), authenticator());

        let username = Username::new("nonexistent".to_string()).unwrap();
        let result = service.get_user_by_username(&username).await;
        assert!(matches!(result, Err(UserError::NotFoundByUsername(_))));
    }

    #[tokio::test]
    async fn test_update_profile_success() {
        let mut repository = MockTestUserRepository::new();
        let existing = stored_user(3, "olduser", "password123");

        repository
            .expect_find_by_id()
            .withf(|id| *id == UserId(3))
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));

        repository
            .expect_update()
            .withf(|user| {
                user.username.as_str() == "newuser" && user.email.as_str() == "olduser@example.com"
            })
            .times(1)
            .returning(|user| Ok(user));

        let service = UserService::new(Arc::new(repository), authenticator());

        let command = UpdateProfileCommand {
            username: Some(Username::new("newuser".to_string()).unwrap()),
            email: None,
        };

        let updated = service
            .update_profile(&UserId(3), command)
            .await
            .expect("Update failed");
        assert_eq!(updated.username.as_str(), "newuser");
    }

    #[tokio::test]
    async fn test_change_password_success() {
        let mut repository = MockTestUserRepository::new();
        let existing = stored_user(3, "alice", "old_password");

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));

        repository
            .expect_update()
            .withf(|user| PasswordHasher::new().verify("new_password", &user.password_hash))
            .times(1)
            .returning(|user| Ok(user));

        let service = UserService::new(Arc::new(repository), authenticator());

        let command = ChangePasswordCommand::new(
            "old_password".to_string(),
            Password::new("new_password".to_string()).unwrap(),
        )
        .unwrap();

        assert!(service.change_password(&UserId(3), command).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_wrong_old_password() {
        let mut repository = MockTestUserRepository::new();
        let existing = stored_user(3, "alice", "old_password");

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        repository.expect_update().times(0);

        let service = UserService::new(Arc::new(repository), authenticator());

        let command = ChangePasswordCommand::new(
            "not_the_old_password".to_string(),
            Password::new("new_password".to_string()).unwrap(),
        )
        .unwrap();

        let result = service.change_password(&UserId(3), command).await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }
}
