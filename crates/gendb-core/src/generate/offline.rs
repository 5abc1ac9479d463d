//! # Offline Value Generator
//!
//! A [`ValueGenerator`] that needs no network: column names are matched
//! against a small rule table and the `fake` crate fills in the values.
//! Used for tests, CI and `gendb synthesize --offline`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex, PoisonError};

use fake::faker::address::en::*;
use fake::faker::company::en::*;
use fake::faker::internet::en::*;
use fake::faker::lorem::en::*;
use fake::faker::name::en::*;
use fake::faker::phone_number::en::*;
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

use crate::error::Result;
use crate::llm::{GeneratedValues, ValueGenerator, ValueRequest};
use crate::schema::types::DataType;

/// What kind of text a column holds, guessed from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FakeKind {
    Email,
    FirstName,
    LastName,
    Username,
    Company,
    PersonName,
    ProductName,
    Phone,
    Street,
    City,
    State,
    Country,
    PostalCode,
    Url,
    Status,
    Title,
    Description,
    Code,
    Words,
}

/// Rules are tried in order; the first matching pattern wins.
const RULES: &[(&str, FakeKind)] = &[
    (r"e_?mail", FakeKind::Email),
    (r"first_?name|given_?name", FakeKind::FirstName),
    (r"last_?name|surname|family_?name", FakeKind::LastName),
    (r"user_?name|login|handle", FakeKind::Username),
    (r"company|business|vendor|supplier|brand|manufacturer", FakeKind::Company),
    (r"product|item|sku_?name", FakeKind::ProductName),
    (r"phone|mobile|fax", FakeKind::Phone),
    (r"street|address", FakeKind::Street),
    (r"city|town", FakeKind::City),
    (r"state|province|region", FakeKind::State),
    (r"country|nation", FakeKind::Country),
    (r"zip|postal|postcode", FakeKind::PostalCode),
    (r"url|website|link|homepage", FakeKind::Url),
    (r"status", FakeKind::Status),
    (r"title|subject|headline", FakeKind::Title),
    (r"desc|comment|note|review|bio|summary|message|content|text", FakeKind::Description),
    (r"code|sku|reference|ref$|number$", FakeKind::Code),
    (r"name", FakeKind::PersonName),
];

static COMPILED_RULES: LazyLock<Vec<(Regex, FakeKind)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|(pattern, kind)| (Regex::new(pattern).expect("static regex"), *kind))
        .collect()
});

const STATUSES: &[&str] = &["active", "pending", "inactive", "completed", "cancelled"];

fn classify(table: &str, column: &str) -> FakeKind {
    let column = column.to_lowercase();
    // A bare "name" column means different things in different tables.
    if column == "name" {
        let table = table.to_lowercase();
        return COMPILED_RULES
            .iter()
            .find(|(pattern, kind)| *kind != FakeKind::PersonName && pattern.is_match(&table))
            .map(|(_, kind)| *kind)
            .filter(|kind| matches!(kind, FakeKind::Company | FakeKind::ProductName))
            .unwrap_or(FakeKind::PersonName);
    }
    COMPILED_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&column))
        .map(|(_, kind)| *kind)
        .unwrap_or(FakeKind::Words)
}

fn fake_text(kind: FakeKind, rng: &mut StdRng) -> String {
    match kind {
        FakeKind::Email => SafeEmail().fake_with_rng(rng),
        FakeKind::FirstName => FirstName().fake_with_rng(rng),
        FakeKind::LastName => LastName().fake_with_rng(rng),
        FakeKind::Username => Username().fake_with_rng(rng),
        FakeKind::Company => CompanyName().fake_with_rng(rng),
        FakeKind::PersonName => Name().fake_with_rng(rng),
        FakeKind::ProductName => {
            let words: Vec<String> = Words(1..3).fake_with_rng(rng);
            let noun: String = Buzzword().fake_with_rng(rng);
            capitalize(&format!("{} {}", words.join(" "), noun))
        }
        FakeKind::Phone => PhoneNumber().fake_with_rng(rng),
        FakeKind::Street => {
            let number = rng.random_range(1..2000);
            let street: String = StreetName().fake_with_rng(rng);
            format!("{} {}", number, street)
        }
        FakeKind::City => CityName().fake_with_rng(rng),
        FakeKind::State => StateName().fake_with_rng(rng),
        FakeKind::Country => CountryName().fake_with_rng(rng),
        FakeKind::PostalCode => ZipCode().fake_with_rng(rng),
        FakeKind::Url => {
            let word: String = Word().fake_with_rng(rng);
            let suffix: String = DomainSuffix().fake_with_rng(rng);
            format!("https://www.{}.{}", word, suffix)
        }
        FakeKind::Status => STATUSES[rng.random_range(0..STATUSES.len())].to_string(),
        FakeKind::Title => {
            let words: Vec<String> = Words(3..7).fake_with_rng(rng);
            capitalize(&words.join(" "))
        }
        FakeKind::Description => Sentence(5..12).fake_with_rng(rng),
        FakeKind::Code => {
            let letters: String = (0..3)
                .map(|_| char::from(b'A' + rng.random_range(0..26u8)))
                .collect();
            format!("{}-{:04}", letters, rng.random_range(0..10_000))
        }
        FakeKind::Words => {
            let words: Vec<String> = Words(1..4).fake_with_rng(rng);
            words.join(" ")
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().to_string() + chars.as_str(),
    }
}

/// Local stand-in for the LLM.
///
/// Reports zero usage. Requests for unique values get a running sequence
/// number mixed in so primary keys never collide.
pub struct FakeValueGenerator {
    rng: Mutex<StdRng>,
    sequence: AtomicU64,
}

impl FakeValueGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
            sequence: AtomicU64::new(0),
        }
    }

    fn generate(&self, request: &ValueRequest) -> GeneratedValues {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let kind = classify(&request.table, &request.column);

        let values = (0..request.count)
            .map(|_| {
                let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
                match (request.data_type, request.unique) {
                    (DataType::Integer, true) => sequence.to_string(),
                    (DataType::Integer, false) => rng.random_range(1..1000).to_string(),
                    (_, true) => format!("{}-{}", fake_text(kind, &mut rng), sequence),
                    (_, false) => fake_text(kind, &mut rng),
                }
            })
            .collect();

        GeneratedValues { values, usage: 0 }
    }
}

impl Default for FakeValueGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ValueGenerator for FakeValueGenerator {
    fn generate_values(
        &self,
        request: &ValueRequest,
    ) -> impl Future<Output = Result<GeneratedValues>> + Send {
        std::future::ready(Ok(self.generate(request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt;
    use crate::schema::types::{Column, Table};
    use std::collections::HashSet;

    #[test]
    fn test_classify_by_column_name() {
        assert_eq!(classify("users", "EmailAddress"), FakeKind::Email);
        assert_eq!(classify("users", "first_name"), FakeKind::FirstName);
        assert_eq!(classify("users", "name"), FakeKind::PersonName);
        assert_eq!(classify("products", "name"), FakeKind::ProductName);
        assert_eq!(classify("suppliers", "Name"), FakeKind::Company);
        assert_eq!(classify("orders", "status"), FakeKind::Status);
        assert_eq!(classify("orders", "promo_code"), FakeKind::Code);
        assert_eq!(classify("orders", "zzz"), FakeKind::Words);
    }

    #[tokio::test]
    async fn test_returns_requested_count() {
        let generator = FakeValueGenerator::new(Some(1));
        let table = Table::new("customers").with_column(Column::new("email", DataType::Text));
        let request = prompt::value_request("A shop.", &table, 0, 25);

        let out = generator.generate_values(&request).await.unwrap();
        assert_eq!(out.values.len(), 25);
        assert_eq!(out.usage, 0);
        assert!(out.values.iter().all(|v| v.contains('@')));
    }

    #[tokio::test]
    async fn test_unique_requests_never_repeat() {
        let generator = FakeValueGenerator::new(Some(2));
        let table = Table::new("coupons")
            .with_column(Column::new("status", DataType::Text).primary_key())
            .with_column(Column::new("number", DataType::Integer).primary_key());

        for index in 0..2 {
            let request = prompt::value_request("A shop.", &table, index, 200);
            let out = generator.generate_values(&request).await.unwrap();
            let distinct: HashSet<&String> = out.values.iter().collect();
            assert_eq!(distinct.len(), 200);
        }
    }

    #[tokio::test]
    async fn test_seeded_generators_agree() {
        let table = Table::new("cities").with_column(Column::new("city", DataType::Text));
        let request = prompt::value_request("A shop.", &table, 0, 10);

        let a = FakeValueGenerator::new(Some(9)).generate_values(&request).await.unwrap();
        let b = FakeValueGenerator::new(Some(9)).generate_values(&request).await.unwrap();
        assert_eq!(a, b);
    }
}
