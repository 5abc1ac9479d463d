//! # Store
//!
//! Loads a data model and its rows into PostgreSQL, MySQL or SQLite via
//! `sqlx`, and reads rows back for verification.

pub mod apply;
pub mod dialect;
pub mod sql;

pub use apply::{apply, get_all_rows, ApplySummary, AppliedTable, StoreConnection};
pub use dialect::Dialect;
