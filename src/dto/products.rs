use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::Product, validation::FieldErrors};

/// Documented shape of a product write. Handlers read the body as a raw
/// JSON object so malformed values surface as field errors.
#[derive(Debug, ToSchema)]
pub struct ProductInput {
    /// Required on create; ignored on edit when it does not exist.
    pub brand_id: Option<i32>,
    /// Category ids added to the product; existing ones are kept.
    pub categories: Option<Vec<i32>>,
    #[schema(max_length = 50)]
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub receipt_date: Option<DateTime<Utc>>,
    /// Must be at least 30 days in the future.
    pub expiration_date: Option<DateTime<Utc>>,
    pub featured: Option<bool>,
    pub items_in_stock: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductList {
    pub results: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationErrors {
    pub errors: FieldErrors,
}
