use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use gendb_core::error::Result;
use gendb_core::llm::{GeneratedValues, ValueGenerator, ValueRequest};
use gendb_core::schema::types::*;

/// `Users(UserID PK)` and `Orders(OrderID PK, UserID FK -> Users.UserID)`.
pub fn users_orders_schema() -> Schema {
    Schema::new(vec![
        Table::new("Users")
            .with_column(Column::new("UserID", DataType::Uuid).primary_key())
            .with_column(Column::new("Email", DataType::Text)),
        Table::new("Orders")
            .with_column(Column::new("OrderID", DataType::Uuid).primary_key())
            .with_column(Column::new("UserID", DataType::Uuid).references("Users", "UserID"))
            .with_column(Column::new("PlacedAt", DataType::Date))
            .with_column(Column::new("Total", DataType::Float)),
    ])
}

/// A marketplace with three levels of references, a table whose primary key
/// is a foreign key, mixed-case reference names and every data type.
///
/// Tables are declared children first so ordering has work to do.
pub fn marketplace_schema() -> Schema {
    Schema::new(vec![
        Table::new("order_items")
            .with_column(Column::new("id", DataType::Integer).primary_key().auto_increment())
            .with_column(Column::new("order_id", DataType::Uuid).references("orders", "id"))
            .with_column(Column::new("product_id", DataType::Integer).references("products", "ProductId"))
            .with_column(Column::new("quantity", DataType::Integer)),
        Table::new("orders")
            .with_column(Column::new("id", DataType::Uuid).primary_key())
            .with_column(Column::new("customer_id", DataType::Uuid).references("customers", "ID"))
            .with_column(Column::new("placed_at", DataType::Date))
            .with_column(Column::new("is_gift", DataType::Boolean)),
        Table::new("customer_profiles")
            .with_column(
                Column::new("customer_id", DataType::Uuid)
                    .primary_key()
                    .references("customers", "id"),
            )
            .with_column(Column::new("bio", DataType::Text)),
        Table::new("products")
            .with_column(Column::new("productId", DataType::Integer).primary_key().auto_increment())
            .with_column(Column::new("vendor_id", DataType::Uuid).references("vendors", "id"))
            .with_column(Column::new("name", DataType::Text))
            .with_column(Column::new("price", DataType::Float)),
        Table::new("customers")
            .with_column(Column::new("id", DataType::Uuid).primary_key())
            .with_column(Column::new("email", DataType::Text))
            .with_column(Column::new("signed_up_at", DataType::Date)),
        Table::new("vendors")
            .with_column(Column::new("id", DataType::Uuid).primary_key())
            .with_column(Column::new("name", DataType::Text)),
    ])
}

/// `A.b_id -> B` and `B.a_id -> A`.
pub fn cyclic_schema() -> Schema {
    Schema::new(vec![
        Table::new("A")
            .with_column(Column::new("id", DataType::Uuid).primary_key())
            .with_column(Column::new("b_id", DataType::Uuid).references("B", "id")),
        Table::new("B")
            .with_column(Column::new("id", DataType::Uuid).primary_key())
            .with_column(Column::new("a_id", DataType::Uuid).references("A", "id")),
    ])
}

/// A value generator with predictable output for tests and benches.
///
/// Values look like `Table.Column-7`, numbered per column, so they are
/// always distinct. Integer columns get plain numbers.
pub struct ScriptedGenerator {
    usage_per_call: u64,
    max_values_per_call: Option<usize>,
    empty_columns: HashSet<String>,
    calls: AtomicUsize,
    total_usage: AtomicU64,
    counters: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<(String, String, usize)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            usage_per_call: 0,
            max_values_per_call: None,
            empty_columns: HashSet::new(),
            calls: AtomicUsize::new(0),
            total_usage: AtomicU64::new(0),
            counters: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Report `usage` units for every call.
    pub fn with_usage(mut self, usage: u64) -> Self {
        self.usage_per_call = usage;
        self
    }

    /// Never return more than `max` values per call.
    pub fn with_short_answers(mut self, max: usize) -> Self {
        self.max_values_per_call = Some(max);
        self
    }

    /// Answer requests for `column` (any table) with no values.
    pub fn with_empty_column(mut self, column: &str) -> Self {
        self.empty_columns.insert(column.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn total_usage(&self) -> u64 {
        self.total_usage.load(Ordering::SeqCst)
    }

    /// `(table, column, count)` of every request so far.
    pub fn requests(&self) -> Vec<(String, String, usize)> {
        self.requests.lock().unwrap().clone()
    }

    fn answer(&self, request: &ValueRequest) -> GeneratedValues {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.total_usage.fetch_add(self.usage_per_call, Ordering::SeqCst);
        self.requests.lock().unwrap().push((
            request.table.clone(),
            request.column.clone(),
            request.count,
        ));

        if self.empty_columns.contains(&request.column) {
            return GeneratedValues {
                values: Vec::new(),
                usage: self.usage_per_call,
            };
        }

        let count = match self.max_values_per_call {
            Some(max) => request.count.min(max),
            None => request.count,
        };
        let key = format!("{}.{}", request.table, request.column);
        let mut counters = self.counters.lock().unwrap();
        let next = counters.entry(key.clone()).or_insert(0);

        let values = (0..count)
            .map(|_| {
                *next += 1;
                match request.data_type {
                    DataType::Integer => next.to_string(),
                    _ => format!("{}-{}", key, next),
                }
            })
            .collect();

        GeneratedValues {
            values,
            usage: self.usage_per_call,
        }
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueGenerator for ScriptedGenerator {
    async fn generate_values(&self, request: &ValueRequest) -> Result<GeneratedValues> {
        Ok(self.answer(request))
    }
}
