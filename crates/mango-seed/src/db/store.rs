use std::fmt;

use async_trait::async_trait;
use mongodb::bson::Document;

use super::SeedError;
use crate::config::{Credential, RoleGrant};

/// Kind of object a create step targets, used in `AlreadyExists` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    User,
    Collection,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::User => f.write_str("user"),
            ObjectKind::Collection => f.write_str("collection"),
        }
    }
}

/// Storage operations the seeder needs from the target database.
///
/// Create operations must fail with [`SeedError::AlreadyExists`] when the
/// object is already present; implementations never skip silently.
#[async_trait]
pub trait SeedStore: Send + Sync {
    /// Name of the database user and collections are created in.
    fn database_name(&self) -> &str;

    /// Checks that the store answers at all.
    async fn ping(&self) -> Result<(), SeedError>;

    async fn create_user(&self, credential: &Credential) -> Result<(), SeedError>;

    async fn create_collection(&self, name: &str) -> Result<(), SeedError>;

    async fn insert_document(&self, collection: &str, document: Document)
    -> Result<(), SeedError>;

    /// Role grants of `username`, or `None` when no such user exists.
    async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, SeedError>;

    async fn collection_names(&self) -> Result<Vec<String>, SeedError>;

    /// Number of documents in `collection` whose fields equal every field of `filter`.
    async fn count_matching(&self, collection: &str, filter: Document) -> Result<u64, SeedError>;

    /// Removes a user. Missing users are not an error.
    async fn drop_user(&self, username: &str) -> Result<(), SeedError>;

    /// Removes a collection. Missing collections are not an error.
    async fn drop_collection(&self, name: &str) -> Result<(), SeedError>;
}
