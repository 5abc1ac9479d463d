use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::generate::value::Value;
use crate::schema::types::{Column, DataType};

/// Chance that a timestamp lands in the last two weeks rather than the last year.
const RECENT_DATE_PROBABILITY: f64 = 0.5;
const RECENT_DAYS: i64 = 14;
const YEAR_DAYS: i64 = 365;
const FLOAT_MAX: f64 = 100.0;

/// Whether a column is filled locally instead of by the value generator.
pub fn is_local(column: &Column) -> bool {
    column.is_auto_incrementing
        || matches!(
            column.data_type,
            DataType::Boolean | DataType::Date | DataType::Float | DataType::Uuid
        )
}

/// Generate `count` values for a locally filled column.
///
/// Returns `None` for columns that need the value generator.
pub fn generate_column(
    column: &Column,
    count: usize,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Option<Vec<Value>> {
    if !is_local(column) {
        return None;
    }
    if column.is_auto_incrementing {
        return Some((1..=count as i64).map(Value::Integer).collect());
    }

    let values = match column.data_type {
        DataType::Boolean => (0..count).map(|_| Value::Boolean(rng.random_bool(0.5))).collect(),
        DataType::Date => (0..count).map(|_| recent_timestamp(rng, now)).collect(),
        DataType::Float => (0..count).map(|_| amount(rng)).collect(),
        DataType::Uuid => (0..count).map(|_| random_uuid(rng)).collect(),
        DataType::Text | DataType::Integer => return None,
    };
    Some(values)
}

/// A whole number of days before `now`: half within the last two weeks,
/// half within the last year.
pub fn recent_timestamp(rng: &mut impl Rng, now: DateTime<Utc>) -> Value {
    let days = if rng.random_bool(RECENT_DATE_PROBABILITY) {
        rng.random_range(0..RECENT_DAYS)
    } else {
        rng.random_range(0..YEAR_DAYS)
    };
    Value::Timestamp(now - Duration::days(days))
}

/// Uniform in [0, 100), rounded to cents.
pub fn amount(rng: &mut impl Rng) -> Value {
    let raw: f64 = rng.random_range(0.0..FLOAT_MAX);
    let rounded = (raw * 100.0).floor() / 100.0;
    Value::Float(rounded)
}

/// A v4 UUID drawn from `rng`, so a seeded run yields the same ids.
pub fn random_uuid(rng: &mut impl Rng) -> Value {
    Value::Uuid(uuid::Builder::from_random_bytes(rng.random()).into_uuid())
}
