//! Database integration for seeding.
//!
//! The [`Seeder`] runs the bootstrap sequence against any [`SeedStore`]:
//! [`MongoStore`] for a live server, [`MemoryStore`] for dry runs and tests.

mod memory;
mod mongo;
mod seeder;
mod store;

pub use memory::{MemoryStore, Operation};
pub use mongo::MongoStore;
pub use seeder::{SeedError, SeedReport, Seeder, StepOutcome, marker_document};
pub use store::{ObjectKind, SeedStore};
