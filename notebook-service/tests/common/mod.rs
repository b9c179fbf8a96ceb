//! Test helpers for notebook-service integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use notebook_service::{
    build_router,
    config::{
        Environment, MongoConfig, NotebookConfig, OtpConfig, RateLimitConfig, RecaptchaConfig,
        SecurityConfig, SessionConfig, SmtpConfig,
    },
    services::{
        Identity, InMemoryOtpLimiter, MockBotVerifier, MockEmailService, MongoDb, MongoOtpStore,
        OtpService, SessionService,
    },
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_SESSION_SECRET: &str = "test-session-secret-0123456789abcdef";

pub fn test_mongodb_uri() -> String {
    std::env::var("TEST_MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017/?serverSelectionTimeoutMS=2000".to_string())
}

pub fn test_config(db_name: &str) -> NotebookConfig {
    NotebookConfig {
        common: service_core::config::Config { port: 0 },
        environment: Environment::Dev,
        service_name: "notebook-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: test_mongodb_uri(),
            database: db_name.to_string(),
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from: "noreply@localhost".to_string(),
        },
        session: SessionConfig {
            secret: TEST_SESSION_SECRET.to_string(),
            ttl_seconds: 600,
        },
        otp: OtpConfig {
            ttl_seconds: 300,
            min_resend_seconds: 60,
            daily_send_cap: 5,
        },
        recaptcha: RecaptchaConfig {
            secret: String::new(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            register_attempts: 100,
            register_window_seconds: 60,
            otp_send_attempts: 100,
            otp_send_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

/// Test application over a uniquely named database.
///
/// The Mongo client connects lazily, so tests that never touch a collection
/// run without a server; the `#[ignore]`d suites need one.
pub struct TestApp {
    pub state: AppState,
    pub email: Arc<MockEmailService>,
    pub otp_limiter: Arc<InMemoryOtpLimiter>,
    pub db_name: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(MockBotVerifier::passing()).await
    }

    pub async fn spawn_with(bot: MockBotVerifier) -> Self {
        dotenvy::dotenv().ok();
        let db_name = format!("test_notebook_{}", Uuid::new_v4().simple());
        let config = test_config(&db_name);

        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .expect("Failed to create MongoDB client");

        let email = Arc::new(MockEmailService::new());
        let bot_verifier = Arc::new(bot);
        let session = SessionService::new(&config.session.secret, config.session.ttl_seconds);

        let otp_limiter = Arc::new(InMemoryOtpLimiter::new(
            config.otp.min_resend_seconds,
            config.otp.daily_send_cap,
        ));
        let otp = Arc::new(OtpService::new(
            Arc::new(MongoOtpStore::new(db.clone())),
            email.clone(),
            bot_verifier.clone(),
            otp_limiter.clone(),
            config.otp.ttl_seconds,
        ));

        let state = AppState {
            config: config.clone(),
            db,
            email: email.clone(),
            bot_verifier,
            session,
            otp,
            login_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.login_attempts,
                config.rate_limit.login_window_seconds,
            ),
            register_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.register_attempts,
                config.rate_limit.register_window_seconds,
            ),
            otp_send_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.otp_send_attempts,
                config.rate_limit.otp_send_window_seconds,
            ),
            ip_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.global_ip_limit,
                config.rate_limit.global_ip_window_seconds,
            ),
        };

        TestApp {
            state,
            email,
            otp_limiter,
            db_name,
        }
    }

    pub async fn router(&self) -> Router {
        build_router(self.state.clone())
            .await
            .expect("Failed to build router")
    }

    /// A valid session token for an arbitrary identity.
    pub fn session_token(&self) -> String {
        let (token, _) = self
            .state
            .session
            .issue(&test_identity())
            .expect("Failed to issue session");
        token
    }

    /// A token whose expiry is already in the past, signed with the same
    /// secret the app validates against.
    pub fn expired_session_token(&self) -> String {
        let expired_issuer = SessionService::new(TEST_SESSION_SECRET, -10);
        let (token, _) = expired_issuer
            .issue(&test_identity())
            .expect("Failed to issue session");
        token
    }

    pub async fn teardown(&self) {
        let client = mongodb::Client::with_uri_str(test_mongodb_uri())
            .await
            .expect("Failed to connect for teardown");
        client
            .database(&self.db_name)
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}

pub fn test_identity() -> Identity {
    Identity {
        id: "user_test_1".to_string(),
        email: "tester@example.com".to_string(),
        username: "tester".to_string(),
        name: "Test User".to_string(),
    }
}

// ============================================================================
// Request helpers
// ============================================================================

pub async fn post_json(
    router: Router,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get_with_bearer(router: Router, uri: &str, token: &str) -> Response<Body> {
    router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get_plain(router: Router, uri: &str) -> Response<Body> {
    router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn request_json(
    router: Router,
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
