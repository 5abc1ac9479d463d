//! # Foreign Key Value Pool
//!
//! Hands out referenced values to a child table's FK column. The pool holds
//! every value of the referenced column repeated `k` times and shuffled, so
//! each referenced row is used about `k` times before any is reused. Once
//! the pool runs dry, ordinary FK columns reuse a random value already drawn;
//! primary key FK columns cannot repeat and fail instead.
//!
//! A primary key pool holds each distinct referenced value once. The table
//! still needs one row per referenced row, so a referenced column with
//! repeated values fails up front.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{GenDbError, Result};
use crate::generate::value::{Row, Value};
use crate::schema::types::{Column, Table};

pub struct ReferencePool {
    table: String,
    column: String,
    referenced_table: String,
    is_primary_key: bool,
    remaining: Vec<Value>,
    used: Vec<Value>,
}

impl ReferencePool {
    /// Build the pool for `column` of `table` from the already generated rows
    /// of the table it references.
    ///
    /// The referenced column is matched ignoring case. A referenced table
    /// without rows yields no pool at all.
    pub fn build(
        table: &Table,
        column: &Column,
        referenced: &Table,
        referenced_rows: &[Row],
        rows_per_referenced_value: usize,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        let Some(fk) = &column.foreign_key else {
            return Err(GenDbError::MissingReferencedColumn {
                table: table.name.clone(),
                column: column.name.clone(),
                referenced_table: referenced.name.clone(),
                referenced_column: String::new(),
            });
        };

        let Some(target) = referenced.column_ignore_case(&fk.referenced_column) else {
            return Err(GenDbError::MissingReferencedColumn {
                table: table.name.clone(),
                column: column.name.clone(),
                referenced_table: referenced.name.clone(),
                referenced_column: fk.referenced_column.clone(),
            });
        };

        if referenced_rows.is_empty() {
            return Err(GenDbError::InsufficientForeignKeyValues {
                table: table.name.clone(),
                column: column.name.clone(),
                referenced_table: referenced.name.clone(),
                required: 1,
                available: 0,
            });
        }

        let copies = if column.is_primary_key {
            1
        } else {
            rows_per_referenced_value
        };

        let mut remaining = Vec::with_capacity(referenced_rows.len() * copies);
        let mut seen = HashSet::new();
        for (row_index, row) in referenced_rows.iter().enumerate() {
            let Some(value) = row.get(&target.name) else {
                return Err(GenDbError::MissingValue {
                    table: referenced.name.clone(),
                    column: target.name.clone(),
                    row_index,
                });
            };
            if column.is_primary_key && !seen.insert(value.to_wire_string()) {
                continue;
            }
            for _ in 0..copies {
                remaining.push(value.clone());
            }
        }

        if column.is_primary_key && remaining.len() < referenced_rows.len() {
            return Err(GenDbError::InsufficientForeignKeyValues {
                table: table.name.clone(),
                column: column.name.clone(),
                referenced_table: referenced.name.clone(),
                required: referenced_rows.len(),
                available: remaining.len(),
            });
        }
        remaining.shuffle(rng);

        Ok(Self {
            table: table.name.clone(),
            column: column.name.clone(),
            referenced_table: referenced.name.clone(),
            is_primary_key: column.is_primary_key,
            used: Vec::with_capacity(remaining.len()),
            remaining,
        })
    }

    /// Values not yet drawn.
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Draw the next value.
    ///
    /// `required` is the number of rows the table will have and only feeds
    /// the error raised when a primary key pool is exhausted.
    pub fn draw(&mut self, required: usize, rng: &mut impl Rng) -> Result<Value> {
        if let Some(value) = self.remaining.pop() {
            self.used.push(value.clone());
            return Ok(value);
        }

        if self.is_primary_key || self.used.is_empty() {
            return Err(GenDbError::InsufficientForeignKeyValues {
                table: self.table.clone(),
                column: self.column.clone(),
                referenced_table: self.referenced_table.clone(),
                required,
                available: self.used.len(),
            });
        }

        let value = self.used[rng.random_range(0..self.used.len())].clone();
        Ok(value)
    }
}

/// Draw one value per row from every pool.
///
/// The table gets as many rows as the largest pool holds, so every
/// referenced value is used at least once. Returns the values column by
/// column, in pool order.
pub fn allocate(pools: &mut [ReferencePool], rng: &mut impl Rng) -> Result<Vec<Vec<Value>>> {
    let row_count = pools.iter().map(|p| p.len()).max().unwrap_or(0);
    let mut columns: Vec<Vec<Value>> = pools
        .iter()
        .map(|_| Vec::with_capacity(row_count))
        .collect();

    for _ in 0..row_count {
        for (pool, values) in pools.iter_mut().zip(columns.iter_mut()) {
            values.push(pool.draw(row_count, rng)?);
        }
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::DataType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn users() -> Table {
        Table::new("users").with_column(Column::new("UserID", DataType::Integer).primary_key())
    }

    fn user_rows(n: i64) -> Vec<Row> {
        (1..=n)
            .map(|i| {
                let mut row = Row::new();
                row.insert("UserID".to_string(), Value::Integer(i));
                row
            })
            .collect()
    }

    fn orders() -> Table {
        Table::new("orders")
            .with_column(Column::new("id", DataType::Uuid).primary_key())
            .with_column(Column::new("userId", DataType::Integer).references("users", "userid"))
    }

    #[test]
    fn test_each_value_used_k_times() {
        let mut rng = StdRng::seed_from_u64(7);
        let table = orders();
        let mut pools = vec![ReferencePool::build(
            &table,
            &table.columns[1],
            &users(),
            &user_rows(5),
            2,
            &mut rng,
        )
        .unwrap()];

        let columns = allocate(&mut pools, &mut rng).unwrap();
        assert_eq!(columns[0].len(), 10);

        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in &columns[0] {
            *counts.entry(value.to_wire_string()).or_default() += 1;
        }
        assert_eq!(counts.len(), 5);
        assert!(counts.values().all(|&c| c == 2));
    }

    #[test]
    fn test_shorter_pool_reuses_drawn_values() {
        let mut rng = StdRng::seed_from_u64(11);
        let products = Table::new("products")
            .with_column(Column::new("sku", DataType::Integer).primary_key());
        let product_rows: Vec<Row> = (1..=2)
            .map(|i| {
                let mut row = Row::new();
                row.insert("sku".to_string(), Value::Integer(100 + i));
                row
            })
            .collect();
        let table = orders().with_column(
            Column::new("productSku", DataType::Integer).references("products", "sku"),
        );

        let mut pools = vec![
            ReferencePool::build(&table, &table.columns[1], &users(), &user_rows(4), 2, &mut rng)
                .unwrap(),
            ReferencePool::build(&table, &table.columns[2], &products, &product_rows, 1, &mut rng)
                .unwrap(),
        ];

        let columns = allocate(&mut pools, &mut rng).unwrap();
        assert_eq!(columns[0].len(), 8);
        assert_eq!(columns[1].len(), 8);
        for value in &columns[1] {
            assert!(matches!(value, Value::Integer(101) | Value::Integer(102)));
        }
    }

    #[test]
    fn test_primary_key_pool_cannot_reuse() {
        let mut rng = StdRng::seed_from_u64(3);
        let profiles = Table::new("profiles")
            .with_column(
                Column::new("UserID", DataType::Integer)
                    .primary_key()
                    .references("users", "UserID"),
            )
            .with_column(Column::new("tagId", DataType::Integer).references("users", "UserID"));

        let mut pools = vec![
            ReferencePool::build(&profiles, &profiles.columns[0], &users(), &user_rows(3), 2, &mut rng)
                .unwrap(),
            ReferencePool::build(&profiles, &profiles.columns[1], &users(), &user_rows(3), 2, &mut rng)
                .unwrap(),
        ];

        let err = allocate(&mut pools, &mut rng).unwrap_err();
        match err {
            GenDbError::InsufficientForeignKeyValues {
                column,
                required,
                available,
                ..
            } => {
                assert_eq!(column, "UserID");
                assert_eq!(required, 6);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_primary_key_pool_needs_distinct_values() {
        let mut rng = StdRng::seed_from_u64(1);
        let flags = Table::new("flags")
            .with_column(Column::new("id", DataType::Uuid).primary_key())
            .with_column(Column::new("active", DataType::Boolean));
        let flag_rows: Vec<Row> = [true, false, true, false, true]
            .into_iter()
            .map(|active| {
                let mut row = Row::new();
                row.insert("active".to_string(), Value::Boolean(active));
                row
            })
            .collect();
        let states = Table::new("states").with_column(
            Column::new("active", DataType::Boolean)
                .primary_key()
                .references("flags", "active"),
        );

        let result =
            ReferencePool::build(&states, &states.columns[0], &flags, &flag_rows, 2, &mut rng);
        match result {
            Err(GenDbError::InsufficientForeignKeyValues {
                table,
                column,
                required,
                available,
                ..
            }) => {
                assert_eq!(table, "states");
                assert_eq!(column, "active");
                assert_eq!(required, 5);
                assert_eq!(available, 2);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("pool built from repeated values"),
        }

        // The same repeats are fine for an ordinary foreign key.
        let events = Table::new("events")
            .with_column(Column::new("flagActive", DataType::Boolean).references("flags", "active"));
        let pool =
            ReferencePool::build(&events, &events.columns[0], &flags, &flag_rows, 2, &mut rng)
                .unwrap();
        assert_eq!(pool.len(), 10);
    }

    #[test]
    fn test_missing_referenced_column() {
        let mut rng = StdRng::seed_from_u64(1);
        let table = Table::new("orders")
            .with_column(Column::new("userId", DataType::Integer).references("users", "uuid"));

        let result = ReferencePool::build(
            &table,
            &table.columns[0],
            &users(),
            &user_rows(2),
            2,
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(GenDbError::MissingReferencedColumn { ref referenced_column, .. }) if referenced_column == "uuid"
        ));
    }

    #[test]
    fn test_empty_referenced_table() {
        let mut rng = StdRng::seed_from_u64(1);
        let table = orders();
        let result = ReferencePool::build(&table, &table.columns[1], &users(), &[], 2, &mut rng);
        assert!(matches!(
            result,
            Err(GenDbError::InsufficientForeignKeyValues { available: 0, .. })
        ));
    }
}
