//! `waypoint-core` — shared types, configuration, error taxonomy and the
//! cross-cutting contracts (model adapter, transport, analytics) that every
//! other crate in this workspace depends on without depending on each other.

pub mod analytics;
pub mod config;
pub mod error;
pub mod model;
pub mod taxonomy;
pub mod time;
pub mod transport;
pub mod types;

pub use config::WaypointConfig;
pub use error::{CoreError, Result};
pub use taxonomy::ErrorTaxonomy;
