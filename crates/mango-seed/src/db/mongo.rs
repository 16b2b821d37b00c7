//! [`SeedStore`] backed by a MongoDB server.

use async_trait::async_trait;
use mongodb::{
    Client, Database,
    bson::{Document, doc, document::ValueAccessError},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::ClientOptions,
};
use tracing::debug;

use super::{ObjectKind, SeedError, SeedStore};
use crate::config::{ConnectionSettings, Credential, RoleGrant};

/// Server codes meaning "this already exists": DuplicateKey, NamespaceExists
/// and the `createUser` duplicate location code.
const ALREADY_EXISTS_CODES: [i32; 3] = [11000, 48, 51003];
/// Unauthorized, AuthenticationFailed.
const UNAUTHORIZED_CODES: [i32; 2] = [13, 18];
const USER_NOT_FOUND: i32 = 11;
const NAMESPACE_NOT_FOUND: i32 = 26;

#[derive(Debug, PartialEq, Eq)]
enum Failure {
    AlreadyExists,
    Unauthorized,
    Unreachable,
    InvalidArgument,
    Other,
}

fn server_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) => Some(cmd.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        _ => None,
    }
}

fn classify(err: &MongoError) -> Failure {
    if let Some(code) = server_code(err) {
        if ALREADY_EXISTS_CODES.contains(&code) {
            return Failure::AlreadyExists;
        }
        if UNAUTHORIZED_CODES.contains(&code) {
            return Failure::Unauthorized;
        }
        return Failure::Other;
    }

    match err.kind.as_ref() {
        ErrorKind::Authentication { .. } => Failure::Unauthorized,
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            Failure::Unreachable
        }
        ErrorKind::InvalidArgument { .. } => Failure::InvalidArgument,
        _ => Failure::Other,
    }
}

/// Maps a driver error onto the seeding error kinds. `target` names the
/// object a create step was creating, if any.
fn map_err(err: MongoError, target: Option<(ObjectKind, &str)>) -> SeedError {
    match (classify(&err), target) {
        (Failure::AlreadyExists, Some((kind, name))) => SeedError::AlreadyExists {
            kind,
            name: name.to_string(),
        },
        (Failure::Unauthorized, _) => SeedError::Authorization(err.to_string()),
        (Failure::Unreachable, _) => SeedError::Connection(err.to_string()),
        (Failure::InvalidArgument, _) => SeedError::Config(err.to_string()),
        _ => SeedError::Database(err),
    }
}

/// MongoDB-backed seed store.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Builds a client for `settings`. The driver connects lazily, so an
    /// unreachable server only shows up on the first command (see [`SeedStore::ping`]).
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, SeedError> {
        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .map_err(|e| map_err(e, None))?;
        options.app_name = Some("mango-seed".to_string());
        if let Some(timeout) = settings.server_selection_timeout {
            options.server_selection_timeout = Some(timeout);
        }

        let client = Client::with_options(options).map_err(|e| map_err(e, None))?;
        Ok(Self::from_database(client.database(&settings.database)))
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Returns the database handle for advanced usage.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn parse_roles(reply: &Document) -> Result<Option<Vec<RoleGrant>>, SeedError> {
    let malformed =
        |e: ValueAccessError| SeedError::Verification(format!("unexpected usersInfo reply: {e}"));

    let users = reply.get_array("users").map_err(malformed)?;
    let Some(user) = users.first().and_then(|u| u.as_document()) else {
        return Ok(None);
    };

    let roles = user
        .get_array("roles")
        .map_err(malformed)?
        .iter()
        .filter_map(|r| r.as_document())
        .map(|r| -> Result<RoleGrant, SeedError> {
            Ok(RoleGrant {
                role: r.get_str("role").map_err(malformed)?.to_string(),
                db: r.get_str("db").map_err(malformed)?.to_string(),
            })
        })
        .collect::<Result<Vec<_>, SeedError>>()?;

    Ok(Some(roles))
}

#[async_trait]
impl SeedStore for MongoStore {
    fn database_name(&self) -> &str {
        self.db.name()
    }

    async fn ping(&self) -> Result<(), SeedError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| map_err(e, None))?;
        Ok(())
    }

    async fn create_user(&self, credential: &Credential) -> Result<(), SeedError> {
        self.db
            .run_command(doc! {
                "createUser": credential.username.as_str(),
                "pwd": credential.password.as_str(),
                "roles": [
                    { "role": credential.role.as_str(), "db": credential.scope_database.as_str() }
                ],
            })
            .await
            .map_err(|e| map_err(e, Some((ObjectKind::User, credential.username.as_str()))))?;
        Ok(())
    }

    async fn create_collection(&self, name: &str) -> Result<(), SeedError> {
        self.db
            .create_collection(name)
            .await
            .map_err(|e| map_err(e, Some((ObjectKind::Collection, name))))
    }

    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<(), SeedError> {
        let result = self
            .db
            .collection::<Document>(collection)
            .insert_one(document)
            .await
            .map_err(|e| map_err(e, None))?;
        debug!(collection, id = %result.inserted_id, "Inserted document");
        Ok(())
    }

    async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, SeedError> {
        let reply = self
            .db
            .run_command(doc! { "usersInfo": username })
            .await
            .map_err(|e| map_err(e, None))?;
        parse_roles(&reply)
    }

    async fn collection_names(&self) -> Result<Vec<String>, SeedError> {
        self.db
            .list_collection_names()
            .await
            .map_err(|e| map_err(e, None))
    }

    async fn count_matching(&self, collection: &str, filter: Document) -> Result<u64, SeedError> {
        self.db
            .collection::<Document>(collection)
            .count_documents(filter)
            .await
            .map_err(|e| map_err(e, None))
    }

    async fn drop_user(&self, username: &str) -> Result<(), SeedError> {
        match self.db.run_command(doc! { "dropUser": username }).await {
            Ok(_) => Ok(()),
            Err(e) if server_code(&e) == Some(USER_NOT_FOUND) => Ok(()),
            Err(e) => Err(map_err(e, None)),
        }
    }

    async fn drop_collection(&self, name: &str) -> Result<(), SeedError> {
        match self.db.collection::<Document>(name).drop().await {
            Ok(()) => Ok(()),
            Err(e) if server_code(&e) == Some(NAMESPACE_NOT_FOUND) => Ok(()),
            Err(e) => Err(map_err(e, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{config::SeedConfig, db::Seeder};

    #[test]
    fn test_parse_roles_single_grant() {
        let reply = doc! {
            "users": [
                {
                    "user": "userme",
                    "db": "mangorest",
                    "roles": [ { "role": "readWrite", "db": "mangorest" } ],
                }
            ],
            "ok": 1.0,
        };

        let roles = parse_roles(&reply).unwrap().unwrap();
        assert_eq!(
            roles,
            vec![RoleGrant {
                role: "readWrite".to_string(),
                db: "mangorest".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_roles_missing_user() {
        let reply = doc! { "users": [], "ok": 1.0 };
        assert_eq!(parse_roles(&reply).unwrap(), None);
    }

    #[test]
    fn test_parse_roles_malformed_reply() {
        let reply = doc! { "ok": 1.0 };
        assert!(matches!(
            parse_roles(&reply),
            Err(SeedError::Verification(_))
        ));
    }

    #[tokio::test]
    async fn test_unparseable_uri_is_config_error() {
        let settings = ConnectionSettings::new("not-a-mongodb-uri", "mangorest");
        let result = MongoStore::connect(&settings).await;
        assert!(matches!(result, Err(SeedError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Nothing listens on port 1.
        let settings = ConnectionSettings {
            server_selection_timeout: Some(Duration::from_millis(200)),
            ..ConnectionSettings::new("mongodb://127.0.0.1:1/?directConnection=true", "mangorest")
        };
        let store = MongoStore::connect(&settings).await.unwrap();

        assert!(matches!(store.ping().await, Err(SeedError::Connection(_))));

        let result = Seeder::new(store, SeedConfig::default()).run().await;
        assert!(matches!(result, Err(SeedError::Connection(_))));
    }
}
