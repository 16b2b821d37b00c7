//! In-process [`SeedStore`] used for dry runs and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, oid::ObjectId};

use super::{ObjectKind, SeedError, SeedStore};
use crate::config::{Credential, RoleGrant};

/// A mutation applied to a [`MemoryStore`], in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateUser(String),
    CreateCollection(String),
    Insert(String),
    DropUser(String),
    DropCollection(String),
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<String, Vec<RoleGrant>>,
    collections: BTreeMap<String, Vec<Document>>,
    journal: Vec<Operation>,
}

/// Store that keeps users and collections in memory with the same duplicate
/// semantics as a MongoDB server.
#[derive(Debug)]
pub struct MemoryStore {
    database: String,
    state: Mutex<State>,
    reachable: bool,
    writable: bool,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            state: Mutex::new(State::default()),
            reachable: true,
            writable: true,
        }
    }

    /// A store whose every operation fails with [`SeedError::Connection`].
    pub fn unreachable(database: impl Into<String>) -> Self {
        Self {
            reachable: false,
            ..Self::new(database)
        }
    }

    /// A store that answers but refuses every mutation with [`SeedError::Authorization`].
    pub fn read_only(database: impl Into<String>) -> Self {
        Self {
            writable: false,
            ..Self::new(database)
        }
    }

    /// Mutations applied so far, oldest first.
    pub fn journal(&self) -> Vec<Operation> {
        self.lock().journal.clone()
    }

    /// Documents currently stored in `collection`.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_reachable(&self) -> Result<(), SeedError> {
        if self.reachable {
            Ok(())
        } else {
            Err(SeedError::Connection(format!(
                "in-memory store for {} is offline",
                self.database
            )))
        }
    }

    fn check_writable(&self, action: &str) -> Result<(), SeedError> {
        self.check_reachable()?;
        if self.writable {
            Ok(())
        } else {
            Err(SeedError::Authorization(format!(
                "not authorized on {} to {action}",
                self.database
            )))
        }
    }
}

/// Field-wise equality on the keys of `filter`, mirroring a plain equality query.
fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key).is_some_and(|v| bson_eq(v, expected)))
}

/// Numeric values compare by value across int32/int64/double, as the server does.
fn bson_eq(a: &Bson, b: &Bson) -> bool {
    fn as_f64(value: &Bson) -> Option<f64> {
        match value {
            Bson::Int32(v) => Some(f64::from(*v)),
            Bson::Int64(v) => Some(*v as f64),
            Bson::Double(v) => Some(*v),
            _ => None,
        }
    }

    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

#[async_trait]
impl SeedStore for MemoryStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn ping(&self) -> Result<(), SeedError> {
        self.check_reachable()
    }

    async fn create_user(&self, credential: &Credential) -> Result<(), SeedError> {
        self.check_writable("createUser")?;
        let mut state = self.lock();
        if state.users.contains_key(&credential.username) {
            return Err(SeedError::AlreadyExists {
                kind: ObjectKind::User,
                name: credential.username.clone(),
            });
        }
        state
            .users
            .insert(credential.username.clone(), vec![credential.grant()]);
        state
            .journal
            .push(Operation::CreateUser(credential.username.clone()));
        Ok(())
    }

    async fn create_collection(&self, name: &str) -> Result<(), SeedError> {
        self.check_writable("create")?;
        let mut state = self.lock();
        if state.collections.contains_key(name) {
            return Err(SeedError::AlreadyExists {
                kind: ObjectKind::Collection,
                name: name.to_string(),
            });
        }
        state.collections.insert(name.to_string(), Vec::new());
        state
            .journal
            .push(Operation::CreateCollection(name.to_string()));
        Ok(())
    }

    async fn insert_document(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<(), SeedError> {
        self.check_writable("insert")?;
        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }
        let mut state = self.lock();
        // Inserting into a missing collection creates it implicitly.
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        state.journal.push(Operation::Insert(collection.to_string()));
        Ok(())
    }

    async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, SeedError> {
        self.check_reachable()?;
        Ok(self.lock().users.get(username).cloned())
    }

    async fn collection_names(&self) -> Result<Vec<String>, SeedError> {
        self.check_reachable()?;
        Ok(self.lock().collections.keys().cloned().collect())
    }

    async fn count_matching(&self, collection: &str, filter: Document) -> Result<u64, SeedError> {
        self.check_reachable()?;
        let state = self.lock();
        let count = state
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches_filter(d, &filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn drop_user(&self, username: &str) -> Result<(), SeedError> {
        self.check_writable("dropUser")?;
        let mut state = self.lock();
        if state.users.remove(username).is_some() {
            state.journal.push(Operation::DropUser(username.to_string()));
        }
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), SeedError> {
        self.check_writable("drop")?;
        let mut state = self.lock();
        if state.collections.remove(name).is_some() {
            state
                .journal
                .push(Operation::DropCollection(name.to_string()));
        }
        Ok(())
    }
}
