//! Asset Approval Core Library
//!
//! Business logic for the approval workflow engine: configuration,
//! persistence, and the state machine gating asset operations behind
//! job-role approval chains.

pub mod config;
pub mod error;
pub mod store;
pub mod workflow;

// Re-export main types for easy access
pub use config::ServiceConfig;
pub use error::{ApprovalError, Result};

pub use store::{
    run_migrations, ContextProvider, CounterReferenceGenerator, ReferenceGenerator, SqlFilter,
    StaticContext,
};

pub use workflow::{ApprovalEngine, InstantiateRequest};
