//! Storage seam for one-time code records.
//!
//! Consumption is a single conditional delete at the store layer: the record
//! is removed only if the id and hash still match and the record is unexpired,
//! so two concurrent verifications of the same code cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::doc,
    options::FindOneOptions,
};

use crate::models::OtpRecord;
use crate::services::{MongoDb, ServiceError};

#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn insert(&self, record: &OtpRecord) -> Result<(), ServiceError>;

    /// Most recently created record for the email, ties broken by recency.
    async fn latest_for_email(&self, email: &str) -> Result<Option<OtpRecord>, ServiceError>;

    async fn delete_all_for_email(&self, email: &str) -> Result<u64, ServiceError>;

    /// Purge records already expired at `now`.
    async fn delete_expired_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError>;

    /// Conditionally consume: delete and return the record identified by `id`
    /// only while its hash matches and it is unexpired at `now`.
    async fn consume(
        &self,
        id: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpRecord>, ServiceError>;
}

#[derive(Clone)]
pub struct MongoOtpStore {
    db: MongoDb,
}

impl MongoOtpStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OtpStore for MongoOtpStore {
    async fn insert(&self, record: &OtpRecord) -> Result<(), ServiceError> {
        self.db.otp_codes().insert_one(record, None).await?;
        Ok(())
    }

    async fn latest_for_email(&self, email: &str) -> Result<Option<OtpRecord>, ServiceError> {
        let options = FindOneOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let record = self
            .db
            .otp_codes()
            .find_one(doc! { "email": email }, options)
            .await?;
        Ok(record)
    }

    async fn delete_all_for_email(&self, email: &str) -> Result<u64, ServiceError> {
        let result = self
            .db
            .otp_codes()
            .delete_many(doc! { "email": email }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_expired_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let result = self
            .db
            .otp_codes()
            .delete_many(
                doc! {
                    "email": email,
                    "expires_at": { "$lte": mongodb::bson::DateTime::from_chrono(now) },
                },
                None,
            )
            .await?;
        Ok(result.deleted_count)
    }

    async fn consume(
        &self,
        id: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpRecord>, ServiceError> {
        let record = self
            .db
            .otp_codes()
            .find_one_and_delete(
                doc! {
                    "_id": id,
                    "code_hash": code_hash,
                    "expires_at": { "$gt": mongodb::bson::DateTime::from_chrono(now) },
                },
                None,
            )
            .await?;
        Ok(record)
    }
}

/// Process-local store with the same conditional-consume contract, used by
/// hermetic tests.
#[derive(Default)]
pub struct InMemoryOtpStore {
    records: std::sync::Mutex<Vec<OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn insert(&self, record: &OtpRecord) -> Result<(), ServiceError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn latest_for_email(&self, email: &str) -> Result<Option<OtpRecord>, ServiceError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.email == email)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn delete_all_for_email(&self, email: &str) -> Result<u64, ServiceError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.email != email);
        Ok((before - records.len()) as u64)
    }

    async fn delete_expired_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.email != email || r.expires_at > now);
        Ok((before - records.len()) as u64)
    }

    async fn consume(
        &self,
        id: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpRecord>, ServiceError> {
        let mut records = self.records.lock().unwrap();
        let position = records
            .iter()
            .position(|r| r.id == id && r.code_hash == code_hash && r.expires_at > now);
        Ok(position.map(|i| records.remove(i)))
    }
}
