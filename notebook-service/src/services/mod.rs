//! Services layer for notebook-service.
//!
//! Business logic for code issuance/verification, sessions, persistence,
//! email delivery and the bot-score gate.

mod bot_score;
mod database;
mod email;
pub mod error;
mod otp;
mod otp_store;
mod rate_limit;
mod session;
pub mod watchdog;

pub use bot_score::{BotScore, BotScoreVerifier, MockBotVerifier, RecaptchaVerifier};
pub use database::MongoDb;
pub use email::{EmailProvider, EmailService, MockEmailService};
pub use error::ServiceError;
pub use otp::OtpService;
pub use otp_store::{InMemoryOtpStore, MongoOtpStore, OtpStore};
pub use rate_limit::{InMemoryOtpLimiter, OtpRateLimiter, RateDecision};
pub use session::{Identity, SessionClaims, SessionError, SessionService, SessionView};
pub use watchdog::{SessionWatchdog, WatchdogEvent, WatchdogHandle, WatchdogState};
