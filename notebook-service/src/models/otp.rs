//! One-time code records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored one-time code.
///
/// Only the salted hash of the code is persisted; the plaintext goes out by
/// email and is never stored or logged. Multiple records may exist for one
/// email across time; at verification the most recent `created_at` wins and
/// all records for the email are purged on consumption or detected expiry.
/// Records are never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub code_hash: String,
    /// Per-record random salt (hex) mixed into `code_hash`.
    pub salt: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn new(email: String, code_hash: String, salt: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            code_hash,
            salt,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Expiry is exclusive of the boundary instant: a record whose
    /// `expires_at` equals `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let record = OtpRecord::new(
            "user@example.com".to_string(),
            "hash".to_string(),
            "salt".to_string(),
            now,
        );

        assert!(record.is_expired_at(now));
        assert!(record.is_expired_at(now + Duration::seconds(1)));
        assert!(!record.is_expired_at(now - Duration::seconds(1)));
    }
}
