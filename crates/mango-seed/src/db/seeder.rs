//! Database seeding: application user, collections, marker documents.

use mongodb::bson::{Document, doc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::{ObjectKind, SeedStore};
use crate::config::SeedConfig;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Cannot reach database: {0}")]
    Connection(String),
    #[error("Not authorized: {0}")]
    Authorization(String),
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: ObjectKind, name: String },
    #[error("Database error: {0}")]
    Database(#[source] mongodb::error::Error),
    #[error("Invalid seed configuration: {0}")]
    Config(String),
    #[error("Verification failed: {0}")]
    Verification(String),
}

/// The sentinel document inserted into every seeded collection.
pub fn marker_document() -> Document {
    doc! { "init": 1 }
}

/// Whether a create step did its work or found the object already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Created,
    Skipped,
}

/// What a seeding run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub database: String,
    pub user: String,
    pub user_outcome: StepOutcome,
    pub collections_created: Vec<String>,
    pub collections_skipped: Vec<String>,
    pub markers_inserted: usize,
}

/// Runs the bootstrap sequence against a [`SeedStore`].
pub struct Seeder<S> {
    store: S,
    config: SeedConfig,
}

impl<S: SeedStore> Seeder<S> {
    pub fn new(store: S, config: SeedConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Returns a reference to the store for advanced usage.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the user, then every collection, then one marker per collection.
    ///
    /// The first failing step aborts the run. Nothing already done is undone.
    pub async fn run(&self) -> Result<SeedReport, SeedError> {
        self.config.validate()?;
        self.store.ping().await?;
        info!("Seeding database {}...", self.store.database_name());

        let user_outcome = self.seed_user().await?;

        let mut collections_created = Vec::new();
        let mut collections_skipped = Vec::new();
        for name in &self.config.collections {
            match self.seed_collection(name).await? {
                StepOutcome::Created => collections_created.push(name.clone()),
                StepOutcome::Skipped => collections_skipped.push(name.clone()),
            }
        }

        let markers_inserted = self.seed_markers().await?;

        info!(
            "Seeded user {}, {} collections, {} markers",
            self.config.username,
            self.config.collections.len(),
            markers_inserted
        );

        Ok(SeedReport {
            database: self.store.database_name().to_string(),
            user: self.config.username.clone(),
            user_outcome,
            collections_created,
            collections_skipped,
            markers_inserted,
        })
    }

    async fn seed_user(&self) -> Result<StepOutcome, SeedError> {
        let credential = self.config.credential();
        info!(
            "Creating user {} with role {} on {}",
            credential.username, credential.role, credential.scope_database
        );
        let result = self.store.create_user(&credential).await;
        self.outcome(result)
    }

    async fn seed_collection(&self, name: &str) -> Result<StepOutcome, SeedError> {
        info!("Creating collection {name}");
        let result = self.store.create_collection(name).await;
        self.outcome(result)
    }

    async fn seed_markers(&self) -> Result<usize, SeedError> {
        let mut inserted = 0;
        for name in &self.config.collections {
            self.store.insert_document(name, marker_document()).await?;
            inserted += 1;
        }
        info!("Inserted {inserted} marker documents");
        Ok(inserted)
    }

    /// Turns `AlreadyExists` into a skip when the config allows it.
    fn outcome(&self, result: Result<(), SeedError>) -> Result<StepOutcome, SeedError> {
        match result {
            Ok(()) => Ok(StepOutcome::Created),
            Err(SeedError::AlreadyExists { kind, name }) if self.config.skip_existing => {
                warn!("{kind} {name} already exists, skipping");
                Ok(StepOutcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    /// Checks that the store holds what a successful run leaves behind.
    pub async fn verify(&self) -> Result<(), SeedError> {
        let expected = self.config.credential().grant();
        match self.store.user_roles(&self.config.username).await? {
            None => {
                return Err(SeedError::Verification(format!(
                    "user {} does not exist",
                    self.config.username
                )));
            }
            Some(roles) if roles != [expected.clone()] => {
                return Err(SeedError::Verification(format!(
                    "user {} has roles {roles:?}, expected only {expected:?}",
                    self.config.username
                )));
            }
            Some(_) => {}
        }

        let existing = self.store.collection_names().await?;
        for name in &self.config.collections {
            if !existing.contains(name) {
                return Err(SeedError::Verification(format!(
                    "collection {name} does not exist"
                )));
            }
            if self.store.count_matching(name, marker_document()).await? == 0 {
                return Err(SeedError::Verification(format!(
                    "collection {name} has no marker document"
                )));
            }
        }

        info!(
            "Verified user {} and {} collections",
            self.config.username,
            self.config.collections.len()
        );
        Ok(())
    }

    /// Drops the user and every configured collection.
    ///
    /// **WARNING**: This deletes the collections with all their documents.
    pub async fn teardown(&self) -> Result<(), SeedError> {
        info!("Dropping seeded objects from {}...", self.store.database_name());

        self.store.drop_user(&self.config.username).await?;
        for name in &self.config.collections {
            self.store.drop_collection(name).await?;
        }

        info!("Teardown complete");
        Ok(())
    }
}
