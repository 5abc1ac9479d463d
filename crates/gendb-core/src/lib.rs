pub mod config;
pub mod dataset;
pub mod error;
pub mod generate;
pub mod graph;
pub mod llm;
pub mod schema;
pub mod store;

// Re-export key types for convenience
pub use error::{GenDbError, Result};
pub use generate::{RowsByTable, SynthesisOptions, SynthesisOutput, Synthesizer};
pub use schema::types::{Column, DataType, Schema, Table};
