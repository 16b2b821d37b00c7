//! Service configuration read from the environment.

use std::collections::HashMap;

use thiserror::Error;

use crate::errors::AppError;

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid resource mapping {0:?}: expected resource:collection")]
    InvalidMapping(String),
    #[error("resource {0} is mapped twice")]
    DuplicateResource(String),
    #[error("invalid PORT {0:?}")]
    InvalidPort(String),
}

/// Which collections are exposed, and under which resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMap {
    resources: HashMap<String, String>,
}

impl ResourceMap {
    /// Parses comma-separated `resource:collection` pairs. A bare name exposes
    /// the collection of the same name.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut resources = HashMap::new();

        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (resource, collection) = match item.split_once(':') {
                None => (item, item),
                Some((resource, collection)) => (resource.trim(), collection.trim()),
            };
            if resource.is_empty() || collection.is_empty() || collection.contains(':') {
                return Err(ConfigError::InvalidMapping(item.to_string()));
            }
            if resources
                .insert(resource.to_string(), collection.to_string())
                .is_some()
            {
                return Err(ConfigError::DuplicateResource(resource.to_string()));
            }
        }

        Ok(Self { resources })
    }

    /// Collection behind `resource`, if it is exposed.
    pub fn collection(&self, resource: &str) -> Result<&str, AppError> {
        self.resources
            .get(resource)
            .map(String::as_str)
            .ok_or_else(|| AppError::CollectionNotFound(resource.to_string()))
    }

    /// Distinct collections behind all resources.
    pub fn collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.values().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub database: String,
    pub resources: ResourceMap,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds settings from any variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mongodb_uri = var("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?;
        let database = var("DB_SCHEMA").ok_or(ConfigError::Missing("DB_SCHEMA"))?;
        let resources = ResourceMap::parse(&var("COLLECTION").unwrap_or_default())?;
        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            mongodb_uri,
            database,
            resources,
            port,
        })
    }
}
