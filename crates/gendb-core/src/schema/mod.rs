//! # Data Model
//!
//! Tables, columns and foreign keys as the data model generator describes
//! them, plus the structural checks run before ordering or synthesis.

pub mod types;

pub use types::{Column, DataType, ForeignKeyRef, Schema, Table};
