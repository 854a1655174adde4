//! Static checks of application modules.
//!
//! Backend sources are read, never executed: classes, bases, imports and
//! metadata constants come from [`python`], and [`loader`] resolves them to
//! qualified names. The frontend is checked against its `desc.json` manifest
//! and install scripts against the lifecycle script names.
pub mod files;
pub mod loader;
pub mod manifest;
pub mod metadata;
pub mod orchestrator;
pub mod python;
pub mod report;
pub mod roles;

pub use orchestrator::{check_backend, check_frontend, check_scripts};
pub use report::{BackendReport, CheckSummary, Findings, FrontendReport, ScriptsReport};
