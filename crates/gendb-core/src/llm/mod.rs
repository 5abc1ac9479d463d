//! # Value Generation
//!
//! The synthesizer asks a [`ValueGenerator`] for plausible values of free-text
//! columns. [`client::LlmProvider`] answers with a language model;
//! [`crate::generate::offline::FakeValueGenerator`] answers locally.

pub mod client;
pub mod company;
pub mod parse;
pub mod prompt;

use std::future::Future;

use crate::error::Result;
use crate::schema::types::DataType;

/// A request for `count` values of one column.
#[derive(Debug, Clone)]
pub struct ValueRequest {
    /// Who is asking: the company the database belongs to.
    pub system_context: String,
    /// What to generate, in plain language.
    pub instruction: String,
    pub table: String,
    pub column: String,
    pub data_type: DataType,
    pub count: usize,
    /// Values must be distinct (primary key columns).
    pub unique: bool,
    /// JSON schema the answer must follow (`{"values": [string]}`).
    pub response_schema: serde_json::Value,
}

/// Values returned by one generator call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedValues {
    pub values: Vec<String>,
    /// Usage units reported for the call (LLM tokens; zero when free).
    pub usage: u64,
}

/// Capability that produces column values.
///
/// Implementations may return more or fewer values than requested and in
/// any order. The caller batches, tops up and truncates.
pub trait ValueGenerator: Send + Sync {
    fn generate_values(
        &self,
        request: &ValueRequest,
    ) -> impl Future<Output = Result<GeneratedValues>> + Send;
}
