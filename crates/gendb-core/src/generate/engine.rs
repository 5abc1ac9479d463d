use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::error::{GenDbError, Result};
use crate::generate::foreign_key::{allocate, ReferencePool};
use crate::generate::providers;
use crate::generate::value::{Row, RowsByTable, Value};
use crate::graph::{creation_order, SchemaGraph};
use crate::llm::{prompt, ValueGenerator};
use crate::schema::types::{DataType, Schema, Table};

/// Consecutive generator calls without a new distinct value before a
/// primary key column gives up.
const MAX_STALLED_ATTEMPTS: usize = 10;

/// Knobs for one synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    /// Rows generated for a table without foreign keys.
    pub rows_per_base_table: usize,
    /// How many times each referenced value is used by a non-key FK column.
    pub rows_per_referenced_value: usize,
    /// Largest number of values asked of the generator in one call.
    pub max_batch_size: usize,
    /// Seed for shuffles and locally generated values. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Anchor for generated timestamps. `None` uses the current time.
    pub now: Option<DateTime<Utc>>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            rows_per_base_table: 5,
            rows_per_referenced_value: 2,
            max_batch_size: 30,
            seed: None,
            now: None,
        }
    }
}

impl SynthesisOptions {
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("rows_per_base_table", self.rows_per_base_table),
            ("rows_per_referenced_value", self.rows_per_referenced_value),
            ("max_batch_size", self.max_batch_size),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(GenDbError::Config {
                    message: format!("{} must be at least 1", name),
                });
            }
        }
        Ok(())
    }
}

/// Rows for every table plus the usage reported by the value generator.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOutput {
    pub rows_by_table: RowsByTable,
    pub usage: u64,
}

/// Populates a schema table by table, parents before children.
pub struct Synthesizer<'a, G: ValueGenerator> {
    generator: &'a G,
    options: SynthesisOptions,
}

impl<'a, G: ValueGenerator> Synthesizer<'a, G> {
    pub fn new(generator: &'a G, options: SynthesisOptions) -> Self {
        Self { generator, options }
    }

    /// Generate rows for every table of `schema`.
    ///
    /// The schema is validated and checked for cycles before anything is
    /// generated. Tables are then taken from a ready set (every referenced
    /// table already populated), lowest schema position first. The first
    /// error aborts the run; nothing partial is returned.
    pub async fn synthesize(
        &self,
        schema: &Schema,
        business_summary: &str,
        log: Option<&(dyn Fn(&str) + Send + Sync)>,
    ) -> Result<SynthesisOutput> {
        self.options.validate()?;
        schema.validate()?;
        creation_order(&SchemaGraph::build(&schema.tables))?;

        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let now = self.options.now.unwrap_or_else(Utc::now);

        let mut pending: Vec<usize> = Vec::with_capacity(schema.table_count());
        let mut dependants: HashMap<&str, Vec<usize>> = HashMap::new();
        for (position, table) in schema.tables.iter().enumerate() {
            let referenced = table.referenced_tables();
            pending.push(referenced.len());
            for parent in referenced {
                dependants.entry(parent).or_default().push(position);
            }
        }
        let mut ready: BTreeSet<usize> = pending
            .iter()
            .enumerate()
            .filter(|(_, &count)| count == 0)
            .map(|(position, _)| position)
            .collect();

        let mut output = SynthesisOutput::default();

        while let Some(position) = ready.pop_first() {
            let table = &schema.tables[position];
            let (rows, usage) = self
                .populate_table(schema, table, &output.rows_by_table, business_summary, &mut rng, now)
                .await?;
            let row_count = rows.len();
            output.usage += usage;
            output.rows_by_table.insert(&table.name, rows)?;

            info!(table = %table.name, rows = row_count, "generated rows");
            if let Some(log) = log {
                log(&format!("Generated {} rows for table {}", row_count, table.name));
            }

            for &child in dependants.get(table.name.as_str()).into_iter().flatten() {
                pending[child] -= 1;
                if pending[child] == 0 {
                    ready.insert(child);
                }
            }
        }

        if output.rows_by_table.len() < schema.table_count() {
            let remaining: Vec<&str> = schema
                .tables
                .iter()
                .filter(|t| !output.rows_by_table.contains(&t.name))
                .map(|t| t.name.as_str())
                .collect();
            return Err(GenDbError::NoPopulatableTable {
                remaining: remaining.join(", "),
            });
        }

        Ok(output)
    }

    async fn populate_table(
        &self,
        schema: &Schema,
        table: &Table,
        populated: &RowsByTable,
        business_summary: &str,
        rng: &mut StdRng,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Row>, u64)> {
        let mut columns: Vec<Option<Vec<Value>>> = vec![None; table.columns.len()];

        // Foreign keys decide the row count.
        let mut fk_positions = Vec::new();
        let mut pools = Vec::new();
        for (index, column) in table.columns.iter().enumerate() {
            let Some(fk) = &column.foreign_key else {
                continue;
            };
            let referenced =
                schema
                    .table(&fk.referenced_table)
                    .ok_or_else(|| GenDbError::UnknownReferencedTable {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        referenced_table: fk.referenced_table.clone(),
                    })?;
            let referenced_rows = populated.get(&referenced.name).unwrap_or(&[]);
            pools.push(ReferencePool::build(
                table,
                column,
                referenced,
                referenced_rows,
                self.options.rows_per_referenced_value,
                rng,
            )?);
            fk_positions.push(index);
        }

        let row_count = if pools.is_empty() {
            self.options.rows_per_base_table
        } else {
            let drawn = allocate(&mut pools, rng)?;
            let count = drawn.first().map(Vec::len).unwrap_or(0);
            for (index, values) in fk_positions.into_iter().zip(drawn) {
                columns[index] = Some(values);
            }
            count
        };

        let mut generator_columns = Vec::new();
        for (index, column) in table.columns.iter().enumerate() {
            if columns[index].is_some() {
                continue;
            }
            match providers::generate_column(column, row_count, rng, now) {
                Some(values) => columns[index] = Some(values),
                None => generator_columns.push(index),
            }
        }

        let requests = generator_columns
            .iter()
            .map(|&index| self.generate_column_values(business_summary, table, index, row_count));
        let generated = try_join_all(requests).await?;

        let mut usage = 0;
        for (index, (values, column_usage)) in generator_columns.into_iter().zip(generated) {
            columns[index] = Some(values);
            usage += column_usage;
        }

        let rows = merge_columns(table, columns, row_count)?;
        Ok((rows, usage))
    }

    /// Ask the generator for exactly `count` values of one column.
    ///
    /// Requests at most `max_batch_size` values per call and keeps calling
    /// until enough values arrived; surplus values are dropped. Blank values
    /// count as missing, and an answer with nothing else halves the request
    /// size. Primary key columns keep only distinct values.
    async fn generate_column_values(
        &self,
        business_summary: &str,
        table: &Table,
        column_index: usize,
        count: usize,
    ) -> Result<(Vec<Value>, u64)> {
        let column = &table.columns[column_index];
        let unique = column.is_primary_key;

        let mut values: Vec<String> = Vec::with_capacity(count);
        let mut seen: HashSet<String> = HashSet::new();
        let mut usage = 0;
        let mut batch_limit = self.options.max_batch_size;
        let mut stalled = 0;

        while values.len() < count {
            let requested = (count - values.len()).min(batch_limit);
            let request = prompt::value_request(business_summary, table, column_index, requested);
            let response = self.generator.generate_values(&request).await?;
            usage += response.usage;

            let received = response.values.len();
            let answered: Vec<String> = response
                .values
                .into_iter()
                .filter(|value| !value.trim().is_empty())
                .collect();
            debug!(
                table = %table.name,
                column = %column.name,
                requested,
                received,
                blank = received - answered.len(),
                "value batch"
            );

            if answered.is_empty() {
                if requested == 1 {
                    return Err(GenDbError::EmptyGeneration {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
                batch_limit = (requested / 2).max(1);
                continue;
            }

            let before = values.len();
            if unique {
                let mut dropped = 0;
                for value in answered {
                    if seen.insert(value.clone()) {
                        values.push(value);
                    } else {
                        dropped += 1;
                    }
                }
                if dropped > 0 {
                    warn!(
                        table = %table.name,
                        column = %column.name,
                        dropped,
                        "discarded duplicate primary key values"
                    );
                }
            } else {
                values.extend(answered);
            }

            if values.len() == before {
                stalled += 1;
                if stalled >= MAX_STALLED_ATTEMPTS {
                    return Err(GenDbError::UniqueExhausted {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        required: count,
                        generated: values.len(),
                        attempts: stalled,
                    });
                }
            } else {
                stalled = 0;
            }
        }

        values.truncate(count);
        let values = values
            .into_iter()
            .map(|raw| typed_value(column.data_type, raw))
            .collect();
        Ok((values, usage))
    }
}

/// Integers come back from the generator as text; keep them numeric when
/// they parse.
fn typed_value(data_type: DataType, raw: String) -> Value {
    match data_type {
        DataType::Integer => match raw.trim().parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(raw),
        },
        _ => Value::Text(raw),
    }
}

/// Zip per-column value lists into rows in column order. A blank text cell
/// counts as missing.
fn merge_columns(
    table: &Table,
    columns: Vec<Option<Vec<Value>>>,
    row_count: usize,
) -> Result<Vec<Row>> {
    let mut iters: Vec<Option<std::vec::IntoIter<Value>>> = columns
        .into_iter()
        .map(|values| values.map(Vec::into_iter))
        .collect();

    let mut rows = Vec::with_capacity(row_count);
    for row_index in 0..row_count {
        let mut row = Row::with_capacity(table.columns.len());
        for (column, iter) in table.columns.iter().zip(iters.iter_mut()) {
            let value = iter
                .as_mut()
                .and_then(Iterator::next)
                .filter(|value| !matches!(value, Value::Text(text) if text.trim().is_empty()))
                .ok_or_else(|| GenDbError::MissingValue {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    row_index,
                })?;
            row.insert(column.name.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GeneratedValues, ValueRequest};
    use crate::schema::types::Column;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers with a fixed script of value counts, then echoes requests.
    struct CountingGenerator {
        calls: AtomicUsize,
        script: Mutex<Vec<usize>>,
        requested: Mutex<Vec<usize>>,
        repeat_value: bool,
        blank_after: Option<usize>,
    }

    impl CountingGenerator {
        fn new(script: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script),
                requested: Mutex::new(Vec::new()),
                repeat_value: false,
                blank_after: None,
            }
        }

        /// Every answer has only its first `filled` values non-blank.
        fn blank_after(filled: usize) -> Self {
            Self {
                blank_after: Some(filled),
                ..Self::new(Vec::new())
            }
        }

        fn repeating() -> Self {
            Self {
                repeat_value: true,
                ..Self::new(Vec::new())
            }
        }
    }

    impl ValueGenerator for CountingGenerator {
        async fn generate_values(&self, request: &ValueRequest) -> Result<GeneratedValues> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(request.count);
            let n = {
                let mut script = self.script.lock().unwrap();
                if script.is_empty() {
                    request.count
                } else {
                    script.remove(0)
                }
            };
            let values = (0..n)
                .map(|i| {
                    if self.blank_after.is_some_and(|filled| i >= filled) {
                        "  ".to_string()
                    } else if self.repeat_value {
                        "same".to_string()
                    } else {
                        format!("{}-{}-{}", request.column, call, i)
                    }
                })
                .collect();
            Ok(GeneratedValues { values, usage: 7 })
        }
    }

    fn options() -> SynthesisOptions {
        SynthesisOptions {
            seed: Some(42),
            ..SynthesisOptions::default()
        }
    }

    fn named(name: &str) -> Table {
        Table::new(name)
            .with_column(Column::new("id", DataType::Integer).primary_key().auto_increment())
            .with_column(Column::new("name", DataType::Text))
    }

    #[tokio::test]
    async fn test_base_table_gets_default_row_count() {
        let generator = CountingGenerator::new(Vec::new());
        let schema = Schema::new(vec![named("users")]);
        let out = Synthesizer::new(&generator, options())
            .synthesize(&schema, "A shop.", None)
            .await
            .unwrap();

        let rows = out.rows_by_table.get("users").unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4]["id"], Value::Integer(5));
        assert_eq!(out.usage, 7);
    }

    #[tokio::test]
    async fn test_batches_are_capped_and_truncated() {
        let generator = CountingGenerator::new(vec![4, 4, 4]);
        let schema = Schema::new(vec![named("users")]);
        let opts = SynthesisOptions {
            rows_per_base_table: 10,
            max_batch_size: 4,
            ..options()
        };
        let out = Synthesizer::new(&generator, opts)
            .synthesize(&schema, "A shop.", None)
            .await
            .unwrap();

        assert_eq!(out.rows_by_table.get("users").unwrap().len(), 10);
        assert_eq!(*generator.requested.lock().unwrap(), vec![4, 4, 2]);
        assert_eq!(out.usage, 21);
    }

    #[tokio::test]
    async fn test_empty_answer_halves_request() {
        let generator = CountingGenerator::new(vec![0, 3, 0, 0]);
        let schema = Schema::new(vec![named("users")]);
        let opts = SynthesisOptions {
            rows_per_base_table: 8,
            max_batch_size: 8,
            ..options()
        };
        let result = Synthesizer::new(&generator, opts)
            .synthesize(&schema, "A shop.", None)
            .await;

        // 8 empty, 4 gives three, 4 empty, 2 empty, then single values.
        assert!(result.is_ok());
        assert_eq!(generator.requested.lock().unwrap()[..4], [8, 4, 4, 2]);
    }

    #[tokio::test]
    async fn test_empty_answer_for_single_value_fails() {
        let generator = CountingGenerator::new(vec![0]);
        let schema = Schema::new(vec![named("users")]);
        let opts = SynthesisOptions {
            rows_per_base_table: 1,
            ..options()
        };
        let err = Synthesizer::new(&generator, opts)
            .synthesize(&schema, "A shop.", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenDbError::EmptyGeneration { ref column, .. } if column == "name"));
    }

    #[tokio::test]
    async fn test_blank_values_are_asked_for_again() {
        let generator = CountingGenerator::blank_after(2);
        let schema = Schema::new(vec![named("users")]);
        let out = Synthesizer::new(&generator, options())
            .synthesize(&schema, "A shop.", None)
            .await
            .unwrap();

        let rows = out.rows_by_table.get("users").unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows
            .iter()
            .all(|row| !row["name"].to_wire_string().trim().is_empty()));
        assert_eq!(*generator.requested.lock().unwrap(), vec![5, 3, 1]);
    }

    #[tokio::test]
    async fn test_only_blank_values_fail() {
        let generator = CountingGenerator::blank_after(0);
        let schema = Schema::new(vec![named("users")]);
        let opts = SynthesisOptions {
            rows_per_base_table: 2,
            ..options()
        };
        let err = Synthesizer::new(&generator, opts)
            .synthesize(&schema, "A shop.", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenDbError::EmptyGeneration { ref column, .. } if column == "name"));
        assert_eq!(*generator.requested.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_blank_cell_is_missing() {
        let table = named("users");
        let columns = vec![
            Some(vec![Value::Integer(1)]),
            Some(vec![Value::Text(" ".to_string())]),
        ];
        let err = merge_columns(&table, columns, 1).unwrap_err();
        assert!(matches!(
            err,
            GenDbError::MissingValue { ref column, row_index: 0, .. } if column == "name"
        ));
    }

    #[tokio::test]
    async fn test_primary_key_generator_column_gives_up() {
        let generator = CountingGenerator::repeating();
        let schema = Schema::new(vec![Table::new("codes")
            .with_column(Column::new("code", DataType::Text).primary_key())]);
        let err = Synthesizer::new(&generator, options())
            .synthesize(&schema, "A shop.", None)
            .await
            .unwrap_err();

        match err {
            GenDbError::UniqueExhausted {
                required,
                generated,
                attempts,
                ..
            } => {
                assert_eq!(required, 5);
                assert_eq!(generated, 1);
                assert_eq!(attempts, MAX_STALLED_ATTEMPTS);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1 + MAX_STALLED_ATTEMPTS);
    }

    #[test]
    fn test_generated_integers_stay_numeric() {
        assert_eq!(typed_value(DataType::Integer, " 12".to_string()), Value::Integer(12));
        assert_eq!(
            typed_value(DataType::Integer, "twelve".to_string()),
            Value::Text("twelve".to_string())
        );
    }

    #[tokio::test]
    async fn test_zero_options_rejected() {
        let generator = CountingGenerator::new(Vec::new());
        let opts = SynthesisOptions {
            max_batch_size: 0,
            ..options()
        };
        let err = Synthesizer::new(&generator, opts)
            .synthesize(&Schema::default(), "A shop.", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenDbError::Config { .. }));
    }

    #[tokio::test]
    async fn test_log_lines_follow_population_order() {
        let generator = CountingGenerator::new(Vec::new());
        let orders = named("orders")
            .with_column(Column::new("user_id", DataType::Integer).references("users", "ID"));
        let schema = Schema::new(vec![orders, named("users")]);

        let lines = Mutex::new(Vec::new());
        let log = |line: &str| lines.lock().unwrap().push(line.to_string());
        let out = Synthesizer::new(&generator, options())
            .synthesize(&schema, "A shop.", Some(&log))
            .await
            .unwrap();

        assert_eq!(
            *lines.lock().unwrap(),
            vec![
                "Generated 5 rows for table users".to_string(),
                "Generated 10 rows for table orders".to_string(),
            ]
        );
        let order_ids: Vec<&Value> = out.rows_by_table.get("orders").unwrap().iter().map(|r| &r["id"]).collect();
        assert_eq!(order_ids.first(), Some(&&Value::Integer(1)));
        assert_eq!(order_ids.last(), Some(&&Value::Integer(10)));
    }
}
