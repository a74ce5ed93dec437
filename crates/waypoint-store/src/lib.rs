//! `waypoint-store` — typed CRUD over every domain entity,
//! exposed as the [`Store`] trait so the orchestration crates depend on an
//! interface, not a concrete database. [`sqlite::SqliteStore`] is the one
//! reference implementation shipped.

pub mod error;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;
pub use traits::Store;
