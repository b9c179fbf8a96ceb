//! One-time code lifecycle: issue, deliver, verify, invalidate.

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::models::OtpRecord;
use crate::services::{
    BotScoreVerifier, EmailProvider, OtpRateLimiter, OtpStore, RateDecision, ServiceError,
};

/// Scores below this are treated as automation.
const BOT_SCORE_THRESHOLD: f64 = 0.4;

pub struct OtpService {
    store: Arc<dyn OtpStore>,
    email: Arc<dyn EmailProvider>,
    bot_verifier: Arc<dyn BotScoreVerifier>,
    limiter: Arc<dyn OtpRateLimiter>,
    ttl_seconds: i64,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        email: Arc<dyn EmailProvider>,
        bot_verifier: Arc<dyn BotScoreVerifier>,
        limiter: Arc<dyn OtpRateLimiter>,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            store,
            email,
            bot_verifier,
            limiter,
            ttl_seconds,
        }
    }

    /// Issue a fresh code for `email` and deliver it out-of-band.
    ///
    /// The plaintext code never leaves this function except by email.
    #[tracing::instrument(skip(self, bot_score_token), fields(email = %email))]
    pub async fn issue(&self, email: &str, bot_score_token: &str) -> Result<(), ServiceError> {
        if email.trim().is_empty() || bot_score_token.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("Missing params".to_string()));
        }
        let email = email.trim().to_lowercase();
        let now = Utc::now();

        if let RateDecision::Refused { retry_after } = self.limiter.check(&email, now) {
            return Err(ServiceError::RateLimited {
                message: "Too many code requests. Please try again later.".to_string(),
                retry_after,
            });
        }

        let bot_score = self.bot_verifier.verify(bot_score_token).await?;
        if !bot_score.success || bot_score.score < BOT_SCORE_THRESHOLD {
            tracing::warn!(score = bot_score.score, "Bot-score gate rejected code request");
            return Err(ServiceError::BotCheckFailed);
        }

        let code = generate_code();
        let salt = generate_salt();
        let code_hash = hash_code(&code, &salt);
        let expires_at = now + Duration::seconds(self.ttl_seconds);

        // Garbage-collect records that already lapsed for this email
        self.store.delete_expired_for_email(&email, now).await?;

        let record = OtpRecord::new(email.clone(), code_hash, salt, expires_at);
        self.store.insert(&record).await?;

        self.email
            .send_otp_email(&email, &code, self.ttl_seconds)
            .await?;

        self.limiter.record_send(&email, now);

        tracing::info!(expires_in = self.ttl_seconds, "One-time code issued");
        Ok(())
    }

    /// Verify a candidate code and consume it on success.
    ///
    /// Returns the verified email identity. The most recently created record
    /// is authoritative; consumption is a conditional delete so a code can be
    /// redeemed at most once even under concurrent verification.
    #[tracing::instrument(skip(self, candidate), fields(email = %email))]
    pub async fn verify(&self, email: &str, candidate: &str) -> Result<String, ServiceError> {
        if email.trim().is_empty() || candidate.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("Missing params".to_string()));
        }
        let email = email.trim().to_lowercase();
        let now = Utc::now();

        let record = self
            .store
            .latest_for_email(&email)
            .await?
            .ok_or(ServiceError::OtpNotFound)?;

        if record.is_expired_at(now) {
            self.store.delete_all_for_email(&email).await?;
            return Err(ServiceError::OtpExpired);
        }

        let candidate_hash = hash_code(candidate.trim(), &record.salt);
        if !hashes_match(&candidate_hash, &record.code_hash) {
            // Mismatches leave the record in place; retries are bounded by expiry
            return Err(ServiceError::OtpMismatch);
        }

        // Single-use enforcement: only one concurrent verify can win this delete
        let consumed = self
            .store
            .consume(&record.id, &record.code_hash, now)
            .await?
            .ok_or(ServiceError::OtpNotFound)?;

        // Older records for the email are inert; purge them
        self.store.delete_all_for_email(&email).await?;

        tracing::info!("One-time code verified and consumed");
        Ok(consumed.email)
    }
}

/// Uniform random 6-digit code; the leading digit is never zero.
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(100_000..=999_999).to_string()
}

fn generate_salt() -> String {
    let salt: [u8; 16] = rand::thread_rng().gen();
    hex::encode(salt)
}

/// Salted one-way hash of a code for storage.
fn hash_code(code: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

fn hashes_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
