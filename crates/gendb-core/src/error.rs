//! # Error Types
//!
//! Defines `GenDbError`, the unified error enum for every failure mode in the
//! gendb pipeline. Synthesis errors carry the table and column they were
//! raised for so a bad data model can be fixed without re-running anything.

use thiserror::Error;

/// All errors that can occur in gendb operations.
#[derive(Error, Debug)]
pub enum GenDbError {
    #[error("Circular foreign key dependency between tables: {tables}\n  The data model must be acyclic; remove one of the foreign keys in the cycle.")]
    Cycle { tables: String },

    #[error("Foreign key {table}.{column} references {referenced_table}.{referenced_column}, but {referenced_table} has no such column")]
    MissingReferencedColumn {
        table: String,
        column: String,
        referenced_table: String,
        referenced_column: String,
    },

    #[error("Not enough values in {referenced_table} to fill {table}.{column}: needed {required}, only {available} available\n  {table}.{column} is a primary key (or {referenced_table} is empty), so values cannot be reused")]
    InsufficientForeignKeyValues {
        table: String,
        column: String,
        referenced_table: String,
        required: usize,
        available: usize,
    },

    #[error("No table can be populated next; every remaining table references an unpopulated table: {remaining}")]
    NoPopulatableTable { remaining: String },

    #[error("Missing value for row {row_index}, column {table}.{column}")]
    MissingValue {
        table: String,
        column: String,
        row_index: usize,
    },

    #[error("Table '{table}' is declared more than once")]
    DuplicateTable { table: String },

    #[error("Foreign key {table}.{column} references unknown table '{referenced_table}'")]
    UnknownReferencedTable {
        table: String,
        column: String,
        referenced_table: String,
    },

    #[error("Rows for table '{table}' were already generated")]
    TableAlreadyPopulated { table: String },

    #[error("Value generator returned no values for {table}.{column}")]
    EmptyGeneration { table: String, column: String },

    #[error("Failed to generate {required} unique values for primary key {table}.{column}: stuck at {generated} after {attempts} attempts without a new value")]
    UniqueExhausted {
        table: String,
        column: String,
        required: usize,
        generated: usize,
        attempts: usize,
    },

    #[error("LLM API error: {message}")]
    Llm { message: String },

    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unsupported database scheme '{scheme}'. Supported: postgres://, mysql://, sqlite:")]
    UnsupportedDatabase { scheme: String },

    #[error("No database URL provided. gendb looks for a connection in this order:\n  1. --db flag\n  2. DATABASE_URL environment variable\n  3. .env file with DATABASE_URL\n  4. gendb.toml [database] section\n\nExample: gendb apply gendb.json --db postgres://localhost/fakeco")]
    NoDatabaseUrl,

    #[error("Statement failed on table {table}: {source}\n  SQL: {statement}")]
    Store {
        table: String,
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Dataset file error: {message}")]
    Dataset { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{message}: {source}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GenDbError>;
