use futures::TryStreamExt;
use mongodb::{
    Client, Collection, IndexModel,
    bson::{Bson, Document, doc, oid::ObjectId},
    options::IndexOptions,
};

use crate::documents::ListQuery;
use crate::errors::AppError;
use crate::models::MangoUser;

/// Collection holding MangoREST accounts.
pub const USER_COLLECTION: &str = "mangorest_users";

#[derive(Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    pub fn new(db: mongodb::Database) -> Self {
        Self { db }
    }

    /// Builds a client for `uri` and selects `database`. Fails fast when the
    /// server does not answer a ping.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;
        Ok(Self::new(db))
    }

    pub fn name(&self) -> &str {
        self.db.name()
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    fn users(&self) -> Collection<MangoUser> {
        self.db.collection(USER_COLLECTION)
    }

    pub async fn find_documents(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<Vec<Document>, AppError> {
        let documents = self.collection(collection);
        let mut find = documents.find(query.filter.clone());
        if let Some(projection) = &query.projection {
            find = find.projection(projection.clone());
        }
        if let Some(sort) = &query.sort {
            find = find.sort(sort.clone());
        }
        if let Some(limit) = query.limit {
            find = find.limit(limit);
        }
        if let Some(skip) = query.skip {
            find = find.skip(skip);
        }

        let found: Vec<Document> = find.await?.try_collect().await?;
        Ok(found)
    }

    pub async fn find_document(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, AppError> {
        let document = self.collection(collection).find_one(filter).await?;
        Ok(document)
    }

    pub async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<Bson, AppError> {
        let result = self.collection(collection).insert_one(document).await?;
        Ok(result.inserted_id)
    }

    /// Inserts a batch and returns the new ids in input order.
    pub async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<Bson>, AppError> {
        let result = self.collection(collection).insert_many(documents).await?;
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    /// Applies `update` to the matching document. Returns false when nothing matched.
    pub async fn update_document(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<bool, AppError> {
        let previous = self
            .collection(collection)
            .find_one_and_update(filter, update)
            .await?;
        Ok(previous.is_some())
    }

    /// Deletes the matching document. Returns false when nothing matched.
    pub async fn delete_document(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<bool, AppError> {
        let deleted = self
            .collection(collection)
            .find_one_and_delete(filter)
            .await?;
        Ok(deleted.is_some())
    }

    /// Creates the unique index on `mangorest_users.username`.
    pub async fn ensure_user_index(&self) -> Result<(), AppError> {
        let index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users().create_index(index).await?;
        Ok(())
    }

    pub async fn insert_user(&self, user: &MangoUser) -> Result<ObjectId, AppError> {
        let result = self.users().insert_one(user).await.map_err(|e| {
            match AppError::from(e) {
                AppError::DuplicateKey(_) => AppError::UserExists(user.username.clone()),
                other => other,
            }
        })?;
        result
            .inserted_id
            .as_object_id()
            .ok_or(AppError::Internal)
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<MangoUser>, AppError> {
        let user = self.users().find_one(doc! { "username": username }).await?;
        Ok(user)
    }
}
