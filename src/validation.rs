use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Brand, Category, ProductDraft},
};

pub const NAME_MAX_CHARS: usize = 50;
pub const MIN_CATEGORIES: usize = 1;
pub const MAX_CATEGORIES: usize = 5;
pub const EXPIRATION_MIN_DAYS: i64 = 30;
pub const FEATURED_RATING: f64 = 8.0;

pub const BRAND_INVALID: &str = "brand_id is invalid";
pub const CATEGORY_COUNT: &str = "A product must have from 1 to 5 categories";
pub const NAME_TOO_LONG: &str = "Field cannot be longer than 50 characters.";
pub const EXPIRES_TOO_SOON: &str = "must expire not less than 30 days since now.";
pub const REQUIRED: &str = "This field is required.";
pub const INVALID_STRING: &str = "Not a valid string value.";
pub const INVALID_FLOAT: &str = "Not a valid float value.";
pub const INVALID_INTEGER: &str = "Not a valid integer value.";
pub const INVALID_BOOLEAN: &str = "Not a valid boolean value.";
pub const INVALID_DATETIME: &str = "Not a valid datetime value.";

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

type FieldResult<T> = Result<T, &'static str>;

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    fn record<T>(&mut self, field: &str, result: FieldResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

pub trait ReferenceLookup {
    fn find_brand(&self, id: i32) -> impl Future<Output = AppResult<Option<Brand>>> + Send;

    /// Returns the categories that exist among `ids`; unknown ids are skipped.
    fn find_categories(&self, ids: &[i32])
    -> impl Future<Output = AppResult<Vec<Category>>> + Send;
}

/// Applies every passing field of `input` to `target` and returns the failures.
/// `Err` means a lookup failed, not that the input is invalid.
pub async fn validate_product<L>(
    lookup: &L,
    mut input: Map<String, Value>,
    target: &mut ProductDraft,
    mode: Mode,
    now: DateTime<Utc>,
) -> AppResult<FieldErrors>
where
    L: ReferenceLookup + Sync,
{
    let mut errors = FieldErrors::default();

    // Create requires a resolvable brand; edit ignores a bad one.
    let brand = match input.remove("brand_id").as_ref().and_then(coerce_id) {
        Some(id) => lookup.find_brand(id).await?,
        None => None,
    };
    if brand.is_none() && mode == Mode::Create {
        errors.add("brand_id", BRAND_INVALID);
    }

    let category_ids = input
        .remove("categories")
        .map(|value| coerce_ids(&value))
        .unwrap_or_default();
    let categories = if category_ids.is_empty() {
        Vec::new()
    } else {
        lookup.find_categories(&category_ids).await?
    };
    let prospective: BTreeSet<i32> = target
        .categories
        .iter()
        .chain(categories.iter())
        .map(|c| c.id)
        .collect();
    if !(MIN_CATEGORIES..=MAX_CATEGORIES).contains(&prospective.len()) {
        errors.add("categories", CATEGORY_COUNT);
    }

    // null means "leave unchanged"
    input.retain(|_, value| !value.is_null());

    apply_fields(&input, target, mode, now, &mut errors);

    if let Some(brand) = brand {
        target.brand_id = Some(brand.id);
    }

    for category in categories {
        if !target.categories.iter().any(|c| c.id == category.id) {
            target.categories.push(category);
        }
    }

    if target.rating.is_some_and(|rating| rating > FEATURED_RATING) {
        target.featured = true;
    }

    Ok(errors)
}

fn apply_fields(
    input: &Map<String, Value>,
    target: &mut ProductDraft,
    mode: Mode,
    now: DateTime<Utc>,
    errors: &mut FieldErrors,
) {
    match input.get("name") {
        Some(value) => {
            if let Some(name) = errors.record("name", parse_name(value)) {
                target.name = name;
            }
        }
        None if mode == Mode::Create => errors.add("name", REQUIRED),
        None => {}
    }

    if let Some(value) = input.get("rating") {
        if let Some(rating) = errors.record("rating", parse_float(value)) {
            target.rating = Some(rating);
        }
    }

    if let Some(value) = input.get("receipt_date") {
        if let Some(date) = errors.record("receipt_date", parse_datetime(value)) {
            target.receipt_date = Some(date);
        }
    }

    if let Some(value) = input.get("expiration_date") {
        let checked = parse_datetime(value).and_then(|date| check_expiration(date, now));
        if let Some(date) = errors.record("expiration_date", checked) {
            target.expiration_date = Some(date);
        }
    }

    if let Some(value) = input.get("featured") {
        if let Some(featured) = errors.record("featured", parse_bool(value)) {
            target.featured = featured;
        }
    }

    match input.get("items_in_stock") {
        Some(value) => {
            if let Some(stock) = errors.record("items_in_stock", parse_int(value)) {
                target.items_in_stock = Some(stock);
            }
        }
        None if mode == Mode::Create => errors.add("items_in_stock", REQUIRED),
        None => {}
    }
}

fn parse_name(value: &Value) -> FieldResult<String> {
    let name = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return Err(INVALID_STRING),
    };
    if name.trim().is_empty() {
        return Err(REQUIRED);
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(NAME_TOO_LONG);
    }
    Ok(name)
}

fn parse_float(value: &Value) -> FieldResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).ok_or(INVALID_FLOAT)
}

fn parse_int(value: &Value) -> FieldResult<i32> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| i32::try_from(n).ok())
        .ok_or(INVALID_INTEGER)
}

fn parse_bool(value: &Value) -> FieldResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(INVALID_BOOLEAN),
        },
        _ => Err(INVALID_BOOLEAN),
    }
}

fn parse_datetime(value: &Value) -> FieldResult<DateTime<Utc>> {
    let Value::String(raw) = value else {
        return Err(INVALID_DATETIME);
    };
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(naive) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(INVALID_DATETIME)
}

fn check_expiration(date: DateTime<Utc>, now: DateTime<Utc>) -> FieldResult<DateTime<Utc>> {
    if date < now + Duration::days(EXPIRATION_MIN_DAYS) {
        return Err(EXPIRES_TOO_SOON);
    }
    Ok(date)
}

fn coerce_id(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|id| i32::try_from(id).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_ids(value: &Value) -> Vec<i32> {
    match value {
        Value::Array(items) => items.iter().filter_map(coerce_id).collect(),
        other => coerce_id(other).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    struct InMemoryCatalog {
        brands: HashMap<i32, Brand>,
        categories: HashMap<i32, Category>,
    }

    impl InMemoryCatalog {
        fn new() -> Self {
            let brands = [(1, "Apple", "US"), (2, "Milka", "DE")]
                .into_iter()
                .map(|(id, name, cc)| {
                    (
                        id,
                        Brand {
                            id,
                            name: name.into(),
                            country_code: cc.into(),
                        },
                    )
                })
                .collect();
            let categories = (1..=7)
                .map(|id| {
                    (
                        id,
                        Category {
                            id,
                            name: format!("Category {id}"),
                        },
                    )
                })
                .collect();
            Self { brands, categories }
        }
    }

    impl ReferenceLookup for InMemoryCatalog {
        async fn find_brand(&self, id: i32) -> AppResult<Option<Brand>> {
            Ok(self.brands.get(&id).cloned())
        }

        async fn find_categories(&self, ids: &[i32]) -> AppResult<Vec<Category>> {
            let mut ids = ids.to_vec();
            ids.sort_unstable();
            ids.dedup();
            Ok(ids
                .iter()
                .filter_map(|id| self.categories.get(id).cloned())
                .collect())
        }
    }

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn existing() -> ProductDraft {
        ProductDraft {
            id: Some(2),
            name: "Chocolate".into(),
            rating: Some(7.0),
            featured: false,
            items_in_stock: Some(0),
            brand_id: Some(2),
            categories: vec![Category {
                id: 2,
                name: "Category 2".into(),
            }],
            ..Default::default()
        }
    }

    async fn run(input: Value, target: &mut ProductDraft, mode: Mode) -> FieldErrors {
        validate_product(&InMemoryCatalog::new(), object(input), target, mode, now())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn valid_create_populates_draft_and_derives_featured() {
        let mut draft = ProductDraft::default();
        let errors = run(
            json!({
                "brand_id": 1,
                "categories": [1],
                "expiration_date": null,
                "featured": false,
                "items_in_stock": 10,
                "name": "oPhone",
                "rating": 10.0,
                "receipt_date": null
            }),
            &mut draft,
            Mode::Create,
        )
        .await;

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(draft.name, "oPhone");
        assert_eq!(draft.brand_id, Some(1));
        assert_eq!(draft.category_ids(), vec![1]);
        assert_eq!(draft.items_in_stock, Some(10));
        assert!(draft.featured, "rating above 8 forces featured");
    }

    #[tokio::test]
    async fn create_without_brand_is_rejected_and_unassigned() {
        let mut draft = ProductDraft::default();
        let errors = run(
            json!({"categories": [1], "name": "oPhone", "items_in_stock": 1}),
            &mut draft,
            Mode::Create,
        )
        .await;

        assert_eq!(errors.get("brand_id").unwrap(), [BRAND_INVALID]);
        assert_eq!(draft.brand_id, None);
    }

    #[tokio::test]
    async fn create_with_unknown_brand_is_rejected() {
        let mut draft = ProductDraft::default();
        let errors = run(
            json!({"brand_id": 99, "categories": [1], "name": "x", "items_in_stock": 1}),
            &mut draft,
            Mode::Create,
        )
        .await;

        assert_eq!(errors.get("brand_id").unwrap(), [BRAND_INVALID]);
        assert_eq!(draft.brand_id, None);
    }

    #[tokio::test]
    async fn edit_ignores_missing_or_unknown_brand() {
        let mut draft = existing();
        let errors = run(json!({"brand_id": 99}), &mut draft, Mode::Edit).await;
        assert!(errors.is_empty());
        assert_eq!(draft.brand_id, Some(2));

        let errors = run(json!({"brand_id": "1"}), &mut draft, Mode::Edit).await;
        assert!(errors.is_empty());
        assert_eq!(draft.brand_id, Some(1));
    }

    #[tokio::test]
    async fn category_count_must_stay_between_one_and_five() {
        let mut draft = ProductDraft::default();
        let errors = run(
            json!({"brand_id": 1, "categories": [], "name": "x", "items_in_stock": 1}),
            &mut draft,
            Mode::Create,
        )
        .await;
        assert_eq!(errors.get("categories").unwrap(), [CATEGORY_COUNT]);

        let mut draft = existing();
        let errors = run(json!({"categories": [1, 3, 4, 5, 6]}), &mut draft, Mode::Edit).await;
        assert_eq!(errors.get("categories").unwrap(), [CATEGORY_COUNT]);
    }

    #[tokio::test]
    async fn categories_union_with_existing_and_deduplicate() {
        let mut draft = existing();
        let errors = run(json!({"categories": [2, 2, 3, 42]}), &mut draft, Mode::Edit).await;

        assert!(errors.is_empty());
        assert_eq!(draft.category_ids(), vec![2, 3]);
    }

    #[tokio::test]
    async fn categories_are_never_removed() {
        let mut draft = existing();
        let errors = run(json!({"categories": []}), &mut draft, Mode::Edit).await;

        assert!(errors.is_empty());
        assert_eq!(draft.category_ids(), vec![2]);
    }

    #[tokio::test]
    async fn unknown_category_ids_alone_do_not_satisfy_the_minimum() {
        let mut draft = ProductDraft::default();
        let errors = run(
            json!({"brand_id": 1, "categories": [42, "nope"], "name": "x", "items_in_stock": 1}),
            &mut draft,
            Mode::Create,
        )
        .await;

        assert_eq!(errors.get("categories").unwrap(), [CATEGORY_COUNT]);
        assert!(draft.categories.is_empty());
    }

    #[tokio::test]
    async fn long_name_reports_exact_message() {
        let mut draft = ProductDraft::default();
        let errors = run(
            json!({"brand_id": 1, "categories": [1], "name": "o".repeat(60), "items_in_stock": 1}),
            &mut draft,
            Mode::Create,
        )
        .await;

        assert_eq!(errors.get("name").unwrap(), [NAME_TOO_LONG]);
        assert_eq!(draft.name, "");
    }

    #[tokio::test]
    async fn name_length_counts_characters_not_bytes() {
        let mut draft = existing();
        let errors = run(json!({"name": "ё".repeat(50)}), &mut draft, Mode::Edit).await;
        assert!(errors.is_empty());
        assert_eq!(draft.name.chars().count(), 50);
    }

    #[tokio::test]
    async fn expiration_date_must_be_thirty_days_out() {
        let mut draft = existing();
        let errors = run(
            json!({"expiration_date": "2024-06-01 12:00:00"}),
            &mut draft,
            Mode::Edit,
        )
        .await;
        assert_eq!(errors.get("expiration_date").unwrap(), [EXPIRES_TOO_SOON]);
        assert_eq!(draft.expiration_date, None);

        let errors = run(
            json!({"expiration_date": "2024-07-01T12:00:00Z"}),
            &mut draft,
            Mode::Edit,
        )
        .await;
        assert!(errors.is_empty(), "exactly thirty days is allowed");
        assert_eq!(draft.expiration_date, Some(now() + Duration::days(30)));
    }

    #[tokio::test]
    async fn null_fields_leave_target_unchanged() {
        let mut draft = existing();
        draft.expiration_date = Some(now() + Duration::days(60));
        let before = draft.clone();

        let errors = run(
            json!({"expiration_date": null, "name": null, "rating": null, "items_in_stock": null}),
            &mut draft,
            Mode::Edit,
        )
        .await;

        assert!(errors.is_empty());
        assert_eq!(draft, before);
    }

    #[tokio::test]
    async fn passing_fields_apply_even_when_siblings_fail() {
        let mut draft = existing();
        let errors = run(
            json!({"name": "Dark chocolate", "rating": "great", "items_in_stock": 5}),
            &mut draft,
            Mode::Edit,
        )
        .await;

        assert_eq!(errors.get("rating").unwrap(), [INVALID_FLOAT]);
        assert_eq!(draft.name, "Dark chocolate");
        assert_eq!(draft.items_in_stock, Some(5));
        assert_eq!(draft.rating, Some(7.0));
    }

    #[tokio::test]
    async fn rating_above_eight_overrides_explicit_featured() {
        let mut draft = existing();
        let errors = run(json!({"rating": 11.0, "featured": false}), &mut draft, Mode::Edit).await;
        assert!(errors.is_empty());
        assert_eq!(draft.rating, Some(11.0));
        assert!(draft.featured);
    }

    #[tokio::test]
    async fn rating_of_exactly_eight_leaves_featured_unchanged() {
        let mut draft = existing();
        let errors = run(json!({"rating": 8.0}), &mut draft, Mode::Edit).await;
        assert!(errors.is_empty());
        assert_eq!(draft.rating, Some(8.0));
        assert!(!draft.featured);
    }

    #[tokio::test]
    async fn featured_is_not_cleared_when_rating_drops() {
        let mut draft = existing();
        draft.featured = true;
        let errors = run(json!({"rating": 3}), &mut draft, Mode::Edit).await;
        assert!(errors.is_empty());
        assert!(draft.featured);
    }

    #[tokio::test]
    async fn create_requires_name_and_stock() {
        let mut draft = ProductDraft::default();
        let errors = run(json!({"brand_id": 1, "categories": [1]}), &mut draft, Mode::Create).await;

        assert_eq!(errors.get("name").unwrap(), [REQUIRED]);
        assert_eq!(errors.get("items_in_stock").unwrap(), [REQUIRED]);
        assert_eq!(errors.fields().collect::<Vec<_>>(), ["items_in_stock", "name"]);
    }

    #[tokio::test]
    async fn wrong_types_become_field_errors() {
        let mut draft = existing();
        let errors = run(
            json!({
                "name": ["a"],
                "items_in_stock": 1.5,
                "featured": "maybe",
                "receipt_date": "yesterday"
            }),
            &mut draft,
            Mode::Edit,
        )
        .await;

        assert_eq!(errors.get("name").unwrap(), [INVALID_STRING]);
        assert_eq!(errors.get("items_in_stock").unwrap(), [INVALID_INTEGER]);
        assert_eq!(errors.get("featured").unwrap(), [INVALID_BOOLEAN]);
        assert_eq!(errors.get("receipt_date").unwrap(), [INVALID_DATETIME]);
        assert_eq!(draft, existing());
    }

    #[tokio::test]
    async fn brand_and_categories_apply_despite_field_failures() {
        let mut draft = ProductDraft::default();
        let errors = run(
            json!({"brand_id": 1, "categories": [1, 3], "name": "o".repeat(51), "items_in_stock": 1}),
            &mut draft,
            Mode::Create,
        )
        .await;

        assert!(errors.get("name").is_some());
        assert_eq!(draft.brand_id, Some(1));
        assert_eq!(draft.category_ids(), vec![1, 3]);
    }

    #[test]
    fn datetime_formats() {
        let expected: DateTime<Utc> = "2030-01-02T03:04:05Z".parse().unwrap();
        for raw in [
            "2030-01-02T03:04:05Z",
            "2030-01-02T05:04:05+02:00",
            "2030-01-02 03:04:05",
            "2030-01-02T03:04:05",
            "2030-01-02 03:04:05.000",
        ] {
            assert_eq!(parse_datetime(&json!(raw)), Ok(expected), "{raw}");
        }
        assert_eq!(
            parse_datetime(&json!("2030-01-02")),
            Ok("2030-01-02T00:00:00Z".parse().unwrap())
        );
        assert_eq!(parse_datetime(&json!(20300102)), Err(INVALID_DATETIME));
    }

    #[test]
    fn id_coercion() {
        assert_eq!(coerce_ids(&json!([1, "2", null, "x", 3.5])), vec![1, 2]);
        assert_eq!(coerce_ids(&json!(4)), vec![4]);
        assert_eq!(coerce_ids(&json!({"id": 1})), Vec::<i32>::new());
    }
}
