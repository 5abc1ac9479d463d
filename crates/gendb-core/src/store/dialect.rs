use chrono::{DateTime, NaiveDateTime};

use crate::error::{GenDbError, Result};
use crate::generate::value::Value;
use crate::schema::types::DataType;

/// SQL dialect of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Pick the dialect from a connection URL's scheme.
    pub fn from_url(db_url: &str) -> Result<Self> {
        let scheme = db_url.split(':').next().unwrap_or_default().to_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(GenDbError::UnsupportedDatabase { scheme }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "PostgreSQL",
            Dialect::MySql => "MySQL",
            Dialect::Sqlite => "SQLite",
        }
    }

    /// Column type for a declared data type. `is_key` marks primary and
    /// foreign key columns, which MySQL cannot index as `TEXT`.
    pub fn column_type(&self, data_type: DataType, is_key: bool) -> &'static str {
        match (self, data_type) {
            (Dialect::Postgres, DataType::Uuid) => "UUID",
            (Dialect::Postgres, DataType::Text) => "TEXT",
            (Dialect::Postgres, DataType::Integer) => "INTEGER",
            (Dialect::Postgres, DataType::Float) => "DOUBLE PRECISION",
            (Dialect::Postgres, DataType::Date) => "TIMESTAMP",
            (Dialect::Postgres, DataType::Boolean) => "BOOLEAN",

            (Dialect::MySql, DataType::Uuid) => "CHAR(36)",
            (Dialect::MySql, DataType::Text) if is_key => "VARCHAR(255)",
            (Dialect::MySql, DataType::Text) => "TEXT",
            (Dialect::MySql, DataType::Integer) => "INT",
            (Dialect::MySql, DataType::Float) => "DOUBLE",
            (Dialect::MySql, DataType::Date) => "DATETIME(3)",
            (Dialect::MySql, DataType::Boolean) => "BOOLEAN",

            (Dialect::Sqlite, DataType::Uuid) => "TEXT",
            (Dialect::Sqlite, DataType::Text) => "TEXT",
            (Dialect::Sqlite, DataType::Integer) => "INTEGER",
            (Dialect::Sqlite, DataType::Float) => "REAL",
            (Dialect::Sqlite, DataType::Date) => "TEXT",
            (Dialect::Sqlite, DataType::Boolean) => "INTEGER",
        }
    }

    /// Target type when reading every column back as text.
    pub fn text_cast_type(&self) -> &'static str {
        match self {
            Dialect::MySql => "CHAR",
            _ => "TEXT",
        }
    }

    /// Quote a SQL identifier.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
            _ => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Render a value as a literal for a column of `data_type`.
    ///
    /// Values read back from a dataset file are plain text, so the literal
    /// is chosen from the column's declared type. Text that does not parse
    /// as that type is passed through quoted and left for the database to
    /// accept or reject.
    pub fn literal(&self, data_type: DataType, value: &Value) -> String {
        let raw = value.to_wire_string();
        match data_type {
            DataType::Integer => match raw.trim().parse::<i64>() {
                Ok(i) => i.to_string(),
                Err(_) => self.string_literal(&raw),
            },
            DataType::Float => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => raw.trim().to_string(),
                _ => self.string_literal(&raw),
            },
            DataType::Boolean => match parse_bool(&raw) {
                Some(b) => self.bool_literal(b),
                None => self.string_literal(&raw),
            },
            DataType::Date => match parse_timestamp(&raw) {
                Some(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
                None => self.string_literal(&raw),
            },
            DataType::Uuid | DataType::Text => self.string_literal(&raw),
        }
    }

    fn bool_literal(&self, b: bool) -> String {
        match (self, b) {
            (Dialect::Postgres, true) => "TRUE".to_string(),
            (Dialect::Postgres, false) => "FALSE".to_string(),
            (_, true) => "1".to_string(),
            (_, false) => "0".to_string(),
        }
    }

    fn string_literal(&self, s: &str) -> String {
        let escaped = s.replace('\'', "''");
        match self {
            // MySQL treats backslash as an escape character inside literals.
            Dialect::MySql => format!("'{}'", escaped.replace('\\', "\\\\")),
            _ => format!("'{}'", escaped),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// RFC 3339 instants (the wire format) plus plain `YYYY-MM-DD HH:MM:SS`.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok()
}
