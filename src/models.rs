use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{brands, categories};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Brand {
    pub id: i32,
    pub name: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub rating: Option<f64>,
    pub receipt_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub featured: bool,
    pub items_in_stock: Option<i32>,
    pub brand: Option<Brand>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub id: Option<i32>,
    pub name: String,
    pub rating: Option<f64>,
    pub receipt_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub featured: bool,
    pub items_in_stock: Option<i32>,
    pub brand_id: Option<i32>,
    pub categories: Vec<Category>,
}

impl ProductDraft {
    pub fn category_ids(&self) -> Vec<i32> {
        self.categories.iter().map(|c| c.id).collect()
    }
}

impl From<brands::Model> for Brand {
    fn from(model: brands::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            country_code: model.country_code,
        }
    }
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}
