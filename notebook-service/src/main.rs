use notebook_service::{
    build_router,
    config::NotebookConfig,
    services::{
        EmailService, InMemoryOtpLimiter, MongoDb, MongoOtpStore, OtpService, RecaptchaVerifier,
        SessionService,
    },
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = NotebookConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting notebook service"
    );

    // Initialize database connection
    tracing::info!("Initializing database connection");
    let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database).await?;
    db.initialize_indexes().await?;
    db.seed_colors().await?;
    tracing::info!("Database initialized successfully");

    // Initialize email service
    let email = Arc::new(EmailService::new(&config.smtp).map_err(service_core::error::AppError::from)?);
    tracing::info!("Email service initialized");

    // Bot-score gate
    let bot_verifier = Arc::new(RecaptchaVerifier::new(config.recaptcha.secret.clone()));

    // Session issuance with a fixed lifetime
    let session = SessionService::new(&config.session.secret, config.session.ttl_seconds);
    tracing::info!(ttl_seconds = config.session.ttl_seconds, "Session service initialized");

    // One-time code lifecycle
    let otp_store = Arc::new(MongoOtpStore::new(db.clone()));
    let otp_limiter = Arc::new(InMemoryOtpLimiter::new(
        config.otp.min_resend_seconds,
        config.otp.daily_send_cap,
    ));
    let otp = Arc::new(OtpService::new(
        otp_store,
        email.clone(),
        bot_verifier.clone(),
        otp_limiter,
        config.otp.ttl_seconds,
    ));
    tracing::info!(ttl_seconds = config.otp.ttl_seconds, "OTP service initialized");

    // Endpoint-level IP rate limiters
    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let register_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.register_attempts,
        config.rate_limit.register_window_seconds,
    );
    let otp_send_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.otp_send_attempts,
        config.rate_limit.otp_send_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login, Register, OTP Send, and Global IP");

    let state = AppState {
        config: config.clone(),
        db,
        email,
        bot_verifier,
        session,
        otp,
        login_rate_limiter,
        register_rate_limiter,
        otp_send_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
