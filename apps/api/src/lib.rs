//! Block height resolution and publish gating for report templates.
//!
//! The `layout` module is the pure core. `routes`, `state`, `config` and `errors`
//! wrap it in a small axum service for the editor preview and the publish workflow.

pub mod config;
pub mod errors;
pub mod layout;
pub mod routes;
pub mod state;
