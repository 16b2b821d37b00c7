//! Translation between REST payloads and MongoDB documents.
//!
//! Documents leave the service as relaxed extended JSON, so an `_id` renders as
//! `{"$oid": "..."}`. Incoming bodies are parsed as extended JSON as well.

use std::collections::HashMap;

use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use serde_json::{Map, Value};

use crate::errors::AppError;

pub fn parse_object_id(oid: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(oid).map_err(|_| AppError::InvalidId(oid.to_string()))
}

pub fn id_filter(oid: &str) -> Result<Document, AppError> {
    Ok(doc! { "_id": parse_object_id(oid)? })
}

pub fn to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}

pub fn id_to_json(id: Bson) -> Value {
    id.into_relaxed_extjson()
}

fn object_to_document(object: Map<String, Value>) -> Result<Document, AppError> {
    Document::try_from(object).map_err(|e| AppError::InvalidInput(e.to_string()))
}

/// Body of a create request: one document or a batch.
#[derive(Debug, PartialEq)]
pub enum NewDocuments {
    One(Document),
    Many(Vec<Document>),
}

impl NewDocuments {
    pub fn from_json(body: Value) -> Result<Self, AppError> {
        match body {
            Value::Object(object) => Ok(Self::One(object_to_document(object)?)),
            Value::Array(items) if items.is_empty() => Err(AppError::InvalidInput(
                "Expected at least one document".to_string(),
            )),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(object) => object_to_document(object),
                    _ => Err(AppError::InvalidInput(
                        "Array items must be JSON objects".to_string(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Many),
            _ => Err(AppError::InvalidInput(
                "Expected a JSON object or an array of objects".to_string(),
            )),
        }
    }
}

/// Fields to `$set` on an existing document.
pub fn update_from_json(body: Value) -> Result<Document, AppError> {
    let Value::Object(object) = body else {
        return Err(AppError::InvalidInput("Expected a JSON object".to_string()));
    };
    if object.is_empty() {
        return Err(AppError::InvalidInput("Nothing to update".to_string()));
    }
    if object.contains_key("_id") {
        return Err(AppError::InvalidInput("_id cannot be modified".to_string()));
    }
    if let Some(key) = object.keys().find(|k| k.starts_with('$')) {
        return Err(AppError::InvalidInput(format!("Invalid field name: {key}")));
    }

    Ok(doc! { "$set": object_to_document(object)? })
}

/// A collection listing: equality filter plus paging and ordering.
#[derive(Debug, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

impl ListQuery {
    /// Builds a listing from query parameters.
    ///
    /// `limit`, `skip`, `sort` (`field` or `-field`) and `fields` (comma list)
    /// are reserved. `limit` must be positive since the server reads 0 as
    /// unlimited. Any other parameter is an equality filter whose value is
    /// read as JSON when it parses (`90`, `true`) and as a string otherwise.
    pub fn from_params(params: HashMap<String, String>) -> Result<Self, AppError> {
        let mut query = ListQuery::default();

        for (key, raw) in params {
            match key.as_str() {
                "limit" => {
                    let limit: i64 = raw
                        .parse()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| AppError::InvalidInput(format!("Invalid limit: {raw}")))?;
                    query.limit = Some(limit);
                }
                "skip" => {
                    let skip = raw
                        .parse()
                        .map_err(|_| AppError::InvalidInput(format!("Invalid skip: {raw}")))?;
                    query.skip = Some(skip);
                }
                "sort" => query.sort = Some(sort_spec(&raw)?),
                "fields" => query.projection = Some(projection_spec(&raw)?),
                _ if key.starts_with('$') => {
                    return Err(AppError::InvalidInput(format!("Invalid filter field: {key}")));
                }
                _ => {
                    let value = serde_json::from_str::<Value>(&raw)
                        .ok()
                        .and_then(|v| Bson::try_from(v).ok())
                        .unwrap_or(Bson::String(raw));
                    query.filter.insert(key, value);
                }
            }
        }

        Ok(query)
    }
}

fn sort_spec(raw: &str) -> Result<Document, AppError> {
    let mut sort = Document::new();
    for field in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let (name, direction) = match field.strip_prefix('-') {
            Some(name) => (name, -1),
            None => (field, 1),
        };
        if name.is_empty() {
            return Err(AppError::InvalidInput(format!("Invalid sort: {raw}")));
        }
        sort.insert(name, direction);
    }
    if sort.is_empty() {
        return Err(AppError::InvalidInput(format!("Invalid sort: {raw}")));
    }
    Ok(sort)
}

fn projection_spec(raw: &str) -> Result<Document, AppError> {
    let projection: Document = raw
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| (f.to_string(), Bson::Int32(1)))
        .collect();
    if projection.is_empty() {
        return Err(AppError::InvalidInput(format!("Invalid fields: {raw}")));
    }
    Ok(projection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_object_id() {
        let oid = ObjectId::new();
        assert_eq!(parse_object_id(&oid.to_hex()).unwrap(), oid);
        assert!(matches!(
            parse_object_id("not-an-id"),
            Err(AppError::InvalidId(id)) if id == "not-an-id"
        ));
    }

    #[test]
    fn test_to_json_renders_oid() {
        let oid = ObjectId::new();
        let value = to_json(doc! { "_id": oid, "name": "RD-180", "thrust_to_weight_ratio": 90 });
        assert_eq!(
            value,
            json!({
                "_id": { "$oid": oid.to_hex() },
                "name": "RD-180",
                "thrust_to_weight_ratio": 90,
            })
        );
    }

    #[test]
    fn test_new_documents_single_and_batch() {
        let one = NewDocuments::from_json(json!({ "name": "RD-180" })).unwrap();
        assert_eq!(one, NewDocuments::One(doc! { "name": "RD-180" }));

        let many =
            NewDocuments::from_json(json!([{ "name": "RD-360" }, { "name": "RD-270" }])).unwrap();
        assert_eq!(
            many,
            NewDocuments::Many(vec![doc! { "name": "RD-360" }, doc! { "name": "RD-270" }])
        );
    }

    #[test]
    fn test_new_documents_rejects_other_shapes() {
        for body in [json!("text"), json!(42), json!([]), json!([{ "a": 1 }, 2])] {
            assert!(matches!(
                NewDocuments::from_json(body),
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_extended_json_input() {
        let oid = ObjectId::new();
        let parsed = NewDocuments::from_json(json!({ "ref": { "$oid": oid.to_hex() } })).unwrap();
        assert_eq!(parsed, NewDocuments::One(doc! { "ref": oid }));
    }

    #[test]
    fn test_update_wraps_in_set() {
        let update = update_from_json(json!({
            "manufacturer": "Energomasher Inc.",
            "thrust_to_weight_ratio": 150,
        }))
        .unwrap();
        assert_eq!(
            to_json(update),
            json!({ "$set": { "manufacturer": "Energomasher Inc.", "thrust_to_weight_ratio": 150 } })
        );
    }

    #[test]
    fn test_update_rejects_id_and_operators() {
        assert!(update_from_json(json!({ "_id": "x" })).is_err());
        assert!(update_from_json(json!({ "$inc": { "a": 1 } })).is_err());
        assert!(update_from_json(json!({})).is_err());
        assert!(update_from_json(json!([1])).is_err());
    }

    #[test]
    fn test_list_query_from_params() {
        let query = ListQuery::from_params(params(&[
            ("limit", "1"),
            ("skip", "0"),
            ("sort", "-thrust_to_weight_ratio,name"),
            ("fields", "name,country"),
            ("country", "USSR"),
            ("thrust_to_weight_ratio", "90"),
        ]))
        .unwrap();

        assert_eq!(query.limit, Some(1));
        assert_eq!(query.skip, Some(0));
        assert_eq!(
            query.sort,
            Some(doc! { "thrust_to_weight_ratio": -1, "name": 1 })
        );
        assert_eq!(query.projection, Some(doc! { "name": 1, "country": 1 }));
        assert_eq!(query.filter.get_str("country").unwrap(), "USSR");
        assert!(matches!(
            query.filter.get("thrust_to_weight_ratio"),
            Some(Bson::Int32(90) | Bson::Int64(90))
        ));
    }

    #[test]
    fn test_list_query_empty_params() {
        assert_eq!(
            ListQuery::from_params(HashMap::new()).unwrap(),
            ListQuery::default()
        );
    }

    #[test]
    fn test_list_query_rejects_bad_values() {
        assert!(ListQuery::from_params(params(&[("limit", "-1")])).is_err());
        assert!(matches!(
            ListQuery::from_params(params(&[("limit", "0")])),
            Err(AppError::InvalidInput(msg)) if msg.contains("limit")
        ));
        assert!(ListQuery::from_params(params(&[("skip", "x")])).is_err());
        assert!(ListQuery::from_params(params(&[("sort", "-")])).is_err());
        assert!(ListQuery::from_params(params(&[("$where", "1")])).is_err());
    }
}
