use crate::models::{Color, Note, OtpRecord, User};
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for notebook-service");

        let users = self.users();

        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("username_unique".to_string())
                    .build(),
            )
            .build();
        users.create_index(username_index, None).await.map_err(|e| {
            tracing::error!("Failed to create username index on users collection: {}", e);
            AppError::from(e)
        })?;

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            )
            .build();
        users.create_index(email_index, None).await.map_err(|e| {
            tracing::error!("Failed to create email index on users collection: {}", e);
            AppError::from(e)
        })?;
        tracing::info!("Created unique indexes on users.(username, email)");

        // Verification fetches the newest record per email
        let otp_index = IndexModel::builder()
            .keys(doc! { "email": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("otp_email_recency".to_string())
                    .build(),
            )
            .build();
        self.otp_codes()
            .create_index(otp_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create index on otp_codes collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on otp_codes.(email, created_at)");

        let notes_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("notes_owner_recency".to_string())
                    .build(),
            )
            .build();
        self.notes()
            .create_index(notes_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create index on notes collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on notes.(owner_id, created_at)");

        Ok(())
    }

    /// Seed the color palette when the collection is empty.
    pub async fn seed_colors(&self) -> Result<(), AppError> {
        let colors = self.colors();
        let count = colors.count_documents(doc! {}, None).await?;
        if count == 0 {
            let palette = Color::default_palette();
            colors.insert_many(&palette, None).await?;
            tracing::info!(count = palette.len(), "Seeded default color palette");
        }
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn otp_codes(&self) -> Collection<OtpRecord> {
        self.db.collection("otp_codes")
    }

    pub fn notes(&self) -> Collection<Note> {
        self.db.collection("notes")
    }

    pub fn colors(&self) -> Collection<Color> {
        self.db.collection("colors")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
