use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::ResourceMap,
    database::Database,
    documents::{self, ListQuery, NewDocuments},
    errors::AppError,
};

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

pub async fn get_collection(
    Extension(db): Extension<Database>,
    Extension(resources): Extension<Arc<ResourceMap>>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, AppError> {
    let collection = resources.collection(&resource)?;
    let query = ListQuery::from_params(params)?;

    let found = db.find_documents(collection, &query).await?;
    debug!(collection, count = found.len(), "Fetched documents");

    Ok(Json(found.into_iter().map(documents::to_json).collect()))
}

pub async fn create_document(
    Extension(db): Extension<Database>,
    Extension(resources): Extension<Arc<ResourceMap>>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let collection = resources.collection(&resource)?;

    let created = match NewDocuments::from_json(body)? {
        NewDocuments::One(document) => {
            let id = db.insert_document(collection, document).await?;
            documents::id_to_json(id)
        }
        NewDocuments::Many(batch) => {
            let ids = db.insert_documents(collection, batch).await?;
            Value::Array(ids.into_iter().map(documents::id_to_json).collect())
        }
    };

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_document(
    Extension(db): Extension<Database>,
    Extension(resources): Extension<Arc<ResourceMap>>,
    Path((resource, oid)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let collection = resources.collection(&resource)?;
    let filter = documents::id_filter(&oid)?;

    let document = db
        .find_document(collection, filter)
        .await?
        .ok_or(AppError::DocumentNotFound(oid))?;

    Ok(Json(documents::to_json(document)))
}

pub async fn update_document(
    Extension(db): Extension<Database>,
    Extension(resources): Extension<Arc<ResourceMap>>,
    Path((resource, oid)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<StatusCode, AppError> {
    let collection = resources.collection(&resource)?;
    let filter = documents::id_filter(&oid)?;
    let update = documents::update_from_json(body)?;

    if !db.update_document(collection, filter, update).await? {
        return Err(AppError::DocumentNotFound(oid));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_document(
    Extension(db): Extension<Database>,
    Extension(resources): Extension<Arc<ResourceMap>>,
    Path((resource, oid)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let collection = resources.collection(&resource)?;
    let filter = documents::id_filter(&oid)?;

    if !db.delete_document(collection, filter).await? {
        return Err(AppError::DocumentNotFound(oid));
    }

    Ok(StatusCode::NO_CONTENT)
}
