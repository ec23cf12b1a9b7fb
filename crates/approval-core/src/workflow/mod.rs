//! The approval workflow engine

pub mod audit;
pub mod bypass;
pub mod engine;
pub mod instantiate;
pub mod process;
pub mod roles;
pub mod sequence;

pub use engine::ApprovalEngine;
pub use instantiate::InstantiateRequest;
