//! SQL rendering for the store: `CREATE TABLE` with inline keys, batched
//! multi-row `INSERT`s, and the text-cast `SELECT` used to read rows back.

use crate::error::Result;
use crate::generate::value::{Row, RowsByTable};
use crate::graph::creation_order_for;
use crate::schema::types::{Column, DataType, Schema, Table};
use crate::store::dialect::Dialect;

/// Rows per multi-row INSERT statement.
pub const INSERT_BATCH_SIZE: usize = 100;

/// Everything executed for one table, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStatements {
    pub table: String,
    pub rows: usize,
    pub statements: Vec<String>,
}

/// Render the statements for every table in creation order.
///
/// The schema is validated and ordered first, so a bad model fails before
/// any SQL reaches the database.
pub fn plan_statements(
    tables: &[Table],
    rows_by_table: &RowsByTable,
    dialect: Dialect,
) -> Result<Vec<TableStatements>> {
    let schema = Schema::new(tables.to_vec());
    schema.validate()?;
    let order = creation_order_for(&schema.tables)?;

    let mut plan = Vec::with_capacity(order.tables.len());
    for name in &order.tables {
        let Some(table) = schema.table(name) else {
            continue;
        };
        let rows = rows_by_table.get(name).unwrap_or(&[]);

        let mut statements = vec![create_table_sql(&schema, table, dialect)];
        statements.extend(insert_sql(&schema, table, rows, dialect));

        plan.push(TableStatements {
            table: table.name.clone(),
            rows: rows.len(),
            statements,
        });
    }
    Ok(plan)
}

/// The type a column is stored as.
///
/// A foreign key column holds copies of the referenced column's values, so
/// it takes that column's type when the reference resolves.
pub fn effective_type(schema: &Schema, column: &Column) -> DataType {
    referenced_column(schema, column)
        .map(|target| target.data_type)
        .unwrap_or(column.data_type)
}

fn referenced_column<'a>(schema: &'a Schema, column: &Column) -> Option<&'a Column> {
    let fk = column.foreign_key.as_ref()?;
    schema
        .table(&fk.referenced_table)?
        .column_ignore_case(&fk.referenced_column)
}

fn is_referenced(schema: &Schema, table: &Table, column: &Column) -> bool {
    schema.tables.iter().any(|other| {
        other.foreign_key_columns().any(|c| {
            c.foreign_key.as_ref().is_some_and(|fk| {
                fk.referenced_table == table.name
                    && fk.referenced_column.eq_ignore_ascii_case(&column.name)
            })
        })
    })
}

/// `CREATE TABLE` with one line per column. A single primary key column is
/// declared inline; several become a table-level `PRIMARY KEY (...)`.
pub fn create_table_sql(schema: &Schema, table: &Table, dialect: Dialect) -> String {
    let primary_keys: Vec<&Column> = table.columns.iter().filter(|c| c.is_primary_key).collect();
    let inline_primary_key = primary_keys.len() == 1;

    let mut definitions = Vec::with_capacity(table.columns.len() + 1);
    for column in &table.columns {
        let is_key = column.is_primary_key
            || column.foreign_key.is_some()
            || is_referenced(schema, table, column);
        let sql_type = dialect.column_type(effective_type(schema, column), is_key);

        let mut definition = format!("{} {}", dialect.quote_identifier(&column.name), sql_type);
        if column.is_primary_key && inline_primary_key {
            definition.push_str(" PRIMARY KEY");
        }
        if let Some(fk) = &column.foreign_key {
            let target = referenced_column(schema, column)
                .map(|c| c.name.as_str())
                .unwrap_or(&fk.referenced_column);
            definition.push_str(&format!(
                " REFERENCES {} ({})",
                dialect.quote_identifier(&fk.referenced_table),
                dialect.quote_identifier(target)
            ));
        }
        definitions.push(definition);
    }

    if primary_keys.len() > 1 {
        let names: Vec<String> = primary_keys
            .iter()
            .map(|c| dialect.quote_identifier(&c.name))
            .collect();
        definitions.push(format!("PRIMARY KEY ({})", names.join(", ")));
    }

    format!(
        "CREATE TABLE {} ({})",
        dialect.quote_identifier(&table.name),
        definitions.join(", ")
    )
}

/// Multi-row INSERTs of at most [`INSERT_BATCH_SIZE`] rows. A cell missing
/// from a row is written as `NULL`.
pub fn insert_sql(schema: &Schema, table: &Table, rows: &[Row], dialect: Dialect) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }

    let quoted_table = dialect.quote_identifier(&table.name);
    let col_list = table
        .columns
        .iter()
        .map(|c| dialect.quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let types: Vec<DataType> = table
        .columns
        .iter()
        .map(|c| effective_type(schema, c))
        .collect();

    rows.chunks(INSERT_BATCH_SIZE)
        .map(|chunk| {
            let mut sql = format!("INSERT INTO {} ({}) VALUES ", quoted_table, col_list);
            for (i, row) in chunk.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push('(');
                for (j, (column, data_type)) in table.columns.iter().zip(&types).enumerate() {
                    if j > 0 {
                        sql.push_str(", ");
                    }
                    let literal = row
                        .get(&column.name)
                        .map(|v| dialect.literal(*data_type, v))
                        .unwrap_or_else(|| "NULL".to_string());
                    sql.push_str(&literal);
                }
                sql.push(')');
            }
            sql
        })
        .collect()
}

/// `SELECT` every column cast to text, aliased to its own name.
pub fn select_all_sql(table: &Table, dialect: Dialect) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| {
            let quoted = dialect.quote_identifier(&c.name);
            format!("CAST({} AS {}) AS {}", quoted, dialect.text_cast_type(), quoted)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {}", columns, dialect.quote_identifier(&table.name))
}

/// Shorten a statement for error messages.
pub fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.len() <= max_len {
        return sql.to_string();
    }
    let mut end = max_len;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}
