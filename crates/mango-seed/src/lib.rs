//! Database bootstrap for MangoREST.
//!
//! This crate creates the application user with its role grant, creates the
//! collections MangoREST exposes, and drops an `{"init": 1}` marker document
//! into each of them.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use mango_seed::prelude::*;
//!
//! let settings = ConnectionSettings::new("mongodb://localhost:27017", "mangorest");
//! let store = MongoStore::connect(&settings).await?;
//!
//! let report = Seeder::new(store, SeedConfig::default()).run().await?;
//! ```

pub mod config;
pub mod db;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{ConnectionSettings, Credential, RoleGrant, SeedConfig};
    pub use crate::db::{
        MemoryStore, MongoStore, SeedError, SeedReport, SeedStore, Seeder, StepOutcome,
        marker_document,
    };
}
