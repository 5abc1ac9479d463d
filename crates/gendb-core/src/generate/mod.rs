//! # Row Synthesis
//!
//! Fills every table of a schema with rows, referenced tables first, so
//! that each foreign key value exists in the table it points at.
//!
//! - [`engine`] drives the per-table worklist and merges columns into rows.
//! - [`foreign_key`] hands out referenced values with a bounded fan-out.
//! - [`providers`] fills ids, flags, timestamps, amounts and UUIDs locally.
//! - [`offline`] is a `fake`-backed stand-in for the LLM value generator.

pub mod engine;
pub mod foreign_key;
pub mod offline;
pub mod providers;
pub mod value;

pub use engine::{SynthesisOptions, SynthesisOutput, Synthesizer};
pub use offline::FakeValueGenerator;
pub use value::{Row, RowsByTable, Value};
