//! Configuration types for database seeding.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::SeedError;

/// Role granted to the application user unless configured otherwise.
pub const DEFAULT_ROLE: &str = "readWrite";

/// Database user to create, with its single role grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
    /// Name of the role granted to the user.
    pub role: String,
    /// Database the role grant is restricted to.
    pub scope_database: String,
}

/// A single `{role, db}` grant as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl Credential {
    /// The one grant this credential is created with.
    pub fn grant(&self) -> RoleGrant {
        RoleGrant {
            role: self.role.clone(),
            db: self.scope_database.clone(),
        }
    }
}

/// Configuration for a seeding run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub username: String,
    pub password: String,
    pub role: String,
    pub scope_database: String,

    /// Collections to create and seed, in order.
    pub collections: Vec<String>,

    /// Treat an already existing user or collection as done instead of failing.
    pub skip_existing: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            username: "userme".to_string(),
            password: "passme".to_string(),
            role: DEFAULT_ROLE.to_string(),
            scope_database: "mangorest".to_string(),
            collections: vec!["rocket_engines".to_string(), "launch_vehicles".to_string()],
            skip_existing: false,
        }
    }
}

impl SeedConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SeedError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| SeedError::Config(format!("invalid seed config {}: {e}", path.display())))
    }

    pub fn credential(&self) -> Credential {
        Credential {
            username: self.username.clone(),
            password: self.password.clone(),
            role: self.role.clone(),
            scope_database: self.scope_database.clone(),
        }
    }

    /// Rejects configurations the store would only fail on halfway through a run.
    pub fn validate(&self) -> Result<(), SeedError> {
        for (field, value) in [
            ("username", &self.username),
            ("password", &self.password),
            ("role", &self.role),
            ("scope_database", &self.scope_database),
        ] {
            if value.trim().is_empty() {
                return Err(SeedError::Config(format!("{field} must not be empty")));
            }
        }

        let mut seen = HashSet::new();
        for name in &self.collections {
            if name.trim().is_empty() {
                return Err(SeedError::Config(
                    "collection names must not be empty".to_string(),
                ));
            }
            if name.contains('$') || name.starts_with("system.") {
                return Err(SeedError::Config(format!(
                    "invalid collection name: {name}"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(SeedError::Config(format!(
                    "collection listed twice: {name}"
                )));
            }
        }

        Ok(())
    }
}

/// Where the seeder connects to.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub uri: String,
    /// Database the user and collections are created in.
    pub database: String,
    pub server_selection_timeout: Option<std::time::Duration>,
}

impl ConnectionSettings {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            server_selection_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_bootstrap_scenario() {
        let config = SeedConfig::default();
        assert_eq!(config.username, "userme");
        assert_eq!(config.password, "passme");
        assert_eq!(config.role, "readWrite");
        assert_eq!(config.scope_database, "mangorest");
        assert_eq!(config.collections, vec!["rocket_engines", "launch_vehicles"]);
        assert!(!config.skip_existing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SeedConfig =
            serde_json::from_str(r#"{"username": "admin", "collections": ["a"]}"#).unwrap();
        assert_eq!(config.username, "admin");
        assert_eq!(config.role, "readWrite");
        assert_eq!(config.collections, vec!["a"]);
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let config = SeedConfig {
            password: " ".to_string(),
            ..SeedConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SeedError::Config(msg) if msg.contains("password")));
    }

    #[test]
    fn test_validate_rejects_duplicate_collections() {
        let config = SeedConfig {
            collections: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            ..SeedConfig::default()
        };
        assert!(matches!(config.validate(), Err(SeedError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_reserved_names() {
        let config = SeedConfig {
            collections: vec!["system.users".to_string()],
            ..SeedConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_collections_is_valid() {
        let config = SeedConfig {
            collections: Vec::new(),
            ..SeedConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credential_grant() {
        let grant = SeedConfig::default().credential().grant();
        assert_eq!(
            grant,
            RoleGrant {
                role: "readWrite".to_string(),
                db: "mangorest".to_string()
            }
        );
    }
}
