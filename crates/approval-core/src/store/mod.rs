//! Persistence layer
//!
//! All workflow mutations go through functions that take a plain
//! `&mut SqliteConnection`, so they compose inside whatever transaction the
//! engine opened. The engine never selects a physical database; the
//! [`ContextProvider`] collaborator hands it the pool for each request.

pub mod config_store;
pub mod context;
pub mod numbering;
pub mod workflow_store;

pub use config_store::SqlFilter;
pub use context::{run_migrations, ContextProvider, StaticContext};
pub use numbering::{CounterReferenceGenerator, ReferenceGenerator};
