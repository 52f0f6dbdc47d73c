//! Sports Catalog Reconciler
//!
//! Consolidates countries, leagues, seasons, teams and matches from several
//! inconsistent providers into one canonical catalog with stable internal
//! identifiers.
//!
//! ## Architecture
//!
//! - **reconcile**: identity resolution (names, suffixes, nicknames, leagues,
//!   seasons) and the generic field-level merge
//! - **xref**: provider id -> internal id cross-reference table
//! - **store**: storage collaborator trait and the JSON-snapshot store
//! - **provider**: provider-fetch collaborator, dump reader, rate limiting
//! - **import**: dependency-ordered import runs producing a [`report::RunReport`]

pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod metrics;
pub mod provider;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod store;
pub mod tables;
pub mod types;
pub mod xref;

pub use error::ReconcileError;
