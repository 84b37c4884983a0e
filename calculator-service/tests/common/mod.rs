#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use auth::Authenticator;
use auth::SigningKey;
use auth::TokenCodec;
use calculator_service::calculation::errors::CalculationError;
use calculator_service::calculation::models::Calculation;
use calculator_service::calculation::models::CalculationId;
use calculator_service::calculation::models::NewCalculation;
use calculator_service::calculation::ports::CalculationRepository;
use calculator_service::domain::calculation::service::CalculationService;
use calculator_service::domain::user::service::UserService;
use calculator_service::inbound::http::router::create_router;
use calculator_service::user::errors::UserError;
use calculator_service::user::models::NewUser;
use calculator_service::user::models::User;
use calculator_service::user::models::UserId;
use calculator_service::user::models::Username;
use calculator_service::user::ports::UserRepository;
use chrono::Duration;
use serde_json::json;
use serde_json::Value;

pub const TEST_SECRET: &str = "test-secret-key-for-token-signing-at-least-32-bytes";

/// Test application that spawns a real server over in-memory storage
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub users: Arc<InMemoryUserRepository>,
    pub token_codec: TokenCodec,
}

/// Registered user as seen by a test
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub token: String,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let users = Arc::new(InMemoryUserRepository::default());
        let calculations = Arc::new(InMemoryCalculationRepository::default());

        let authenticator = Arc::new(Authenticator::new(
            TokenCodec::new(SigningKey::new(TEST_SECRET).unwrap()),
            Duration::minutes(30),
        ));

        let user_service = Arc::new(UserService::new(
            Arc::clone(&users),
            Arc::clone(&authenticator),
        ));
        let calculation_service = Arc::new(CalculationService::new(calculations));

        let router = create_router(user_service, calculation_service, authenticator);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::new(),
            users,
            token_codec: TokenCodec::new(SigningKey::new(TEST_SECRET).unwrap()),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make PUT request with Bearer token
    pub fn put_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .put(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Helper to make DELETE request with Bearer token
    pub fn delete_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .delete(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Register a user through the API and return its id and token
    pub async fn register(&self, username: &str) -> TestUser {
        let password = format!("{}_password", username);

        let response = self
            .post("/users/register")
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: Value = response.json().await.expect("Failed to parse response");

        TestUser {
            id: body["data"]["user"]["id"].as_i64().expect("Missing user id"),
            username: username.to_string(),
            password,
            token: body["data"]["access_token"]
                .as_str()
                .expect("Missing access token")
                .to_string(),
        }
    }
}

#[derive(Default)]
struct UserTable {
    last_id: i64,
    users: BTreeMap<i64, User>,
}

/// User storage double with the same uniqueness rules as the users table
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: Mutex<UserTable>,
    unavailable: AtomicBool,
}

impl InMemoryUserRepository {
    /// Make every subsequent call fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn remove(&self, id: i64) {
        self.table.lock().unwrap().users.remove(&id);
    }

    fn check_available(&self) -> Result<(), UserError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UserError::DatabaseError("connection refused".to_string()));
        }
        Ok(())
    }
}

fn check_unique(table: &UserTable, candidate: &User) -> Result<(), UserError> {
    for existing in table.users.values().filter(|u| u.id != candidate.id) {
        if existing.username == candidate.username {
            return Err(UserError::UsernameAlreadyExists(
                candidate.username.to_string(),
            ));
        }
        if existing.email == candidate.email {
            return Err(UserError::EmailAlreadyExists(
                candidate.email.as_str().to_string(),
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        self.check_available()?;
        let mut table = self.table.lock().unwrap();

        let user = User {
            id: UserId(table.last_id + 1),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
        };
        check_unique(&table, &user)?;

        table.last_id = user.id.0;
        table.users.insert(user.id.0, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        self.check_available()?;
        Ok(self.table.lock().unwrap().users.get(&id.0).cloned())
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, UserError> {
        self.check_available()?;
        Ok(self
            .table
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| &u.username == username)
            .cloned())
    }

    async fn update(&self, user: User) -> Result<User, UserError> {
        self.check_available()?;
        let mut table = self.table.lock().unwrap();

        if !table.users.contains_key(&user.id.0) {
            return Err(UserError::NotFound(user.id.to_string()));
        }
        check_unique(&table, &user)?;

        table.users.insert(user.id.0, user.clone());
        Ok(user)
    }
}

#[derive(Default)]
struct CalculationTable {
    last_id: i64,
    calculations: BTreeMap<i64, Calculation>,
}

#[derive(Default)]
pub struct InMemoryCalculationRepository {
    table: Mutex<CalculationTable>,
}

#[async_trait]
impl CalculationRepository for InMemoryCalculationRepository {
    async fn create(&self, calculation: NewCalculation) -> Result<Calculation, CalculationError> {
        let mut table = self.table.lock().unwrap();
        table.last_id += 1;

        let calculation = Calculation {
            id: CalculationId(table.last_id),
            user_id: calculation.user_id,
            a: calculation.a,
            b: calculation.b,
            operation: calculation.operation,
            result: calculation.result,
            created_at: calculation.created_at,
            updated_at: calculation.created_at,
        };
        table
            .calculations
            .insert(calculation.id.0, calculation.clone());
        Ok(calculation)
    }

    async fn find_for_owner(
        &self,
        owner: &UserId,
        id: &CalculationId,
    ) -> Result<Option<Calculation>, CalculationError> {
        Ok(self
            .table
            .lock()
            .unwrap()
            .calculations
            .get(&id.0)
            .filter(|c| c.user_id == *owner)
            .cloned())
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Calculation>, CalculationError> {
        Ok(self
            .table
            .lock()
            .unwrap()
            .calculations
            .values()
            .filter(|c| c.user_id == *owner)
            .cloned()
            .collect())
    }

    async fn update(&self, calculation: Calculation) -> Result<Calculation, CalculationError> {
        let mut table = self.table.lock().unwrap();
        match table.calculations.get_mut(&calculation.id.0) {
            Some(existing) if existing.user_id == calculation.user_id => {
                *existing = calculation.clone();
                Ok(calculation)
            }
            _ => Err(CalculationError::NotFound(calculation.id.0)),
        }
    }

    async fn delete_for_owner(
        &self,
        owner: &UserId,
        id: &CalculationId,
    ) -> Result<(), CalculationError> {
        let mut table = self.table.lock().unwrap();
        let owned = table
            .calculations
            .get(&id.0)
            .map_or(false, |c| c.user_id == *owner);
        if !owned {
            return Err(CalculationError::NotFound(id.0));
        }

        table.calculations.remove(&id.0);
        Ok(())
    }
}
