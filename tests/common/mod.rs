#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use product_catalog_api::{
    entity::{
        Brands, Categories, Products, ProductsCategories,
        brands::ActiveModel as BrandActive,
        categories::ActiveModel as CategoryActive,
        products::ActiveModel as ProductActive,
        products_categories::ActiveModel as ProductCategoryActive,
    },
    routes::create_app,
    state::AppState,
};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    Schema, Set,
};
use sea_orm::ActiveValue::NotSet;
use serde_json::Value;
use tower::ServiceExt;

/// In-memory SQLite store with the catalog schema created from the entities.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection: every pooled connection would otherwise get its own empty database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;

    create_schema(&orm).await?;
    Ok(AppState { orm })
}

async fn create_schema(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let backend = orm.get_database_backend();
    let schema = Schema::new(backend);
    orm.execute(backend.build(&schema.create_table_from_entity(Brands)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(Categories)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(Products)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(ProductsCategories)))
        .await?;
    Ok(())
}

/// Brands Apple (1) and Milka (2), categories "Mobile phones" (1) and "Food" (2),
/// products iPhone (1) and Chocolate (2), each linked to the matching category.
pub async fn create_fixture_data(state: &AppState) -> anyhow::Result<()> {
    for (name, country_code) in [("Apple", "US"), ("Milka", "DE")] {
        BrandActive {
            id: NotSet,
            name: Set(name.into()),
            country_code: Set(country_code.into()),
        }
        .insert(&state.orm)
        .await?;
    }

    for name in ["Mobile phones", "Food"] {
        CategoryActive {
            id: NotSet,
            name: Set(name.into()),
        }
        .insert(&state.orm)
        .await?;
    }

    let products = [
        ("iPhone", 10.0, true, 10, None, 1),
        (
            "Chocolate",
            7.0,
            false,
            0,
            Some(Utc::now() + Duration::days(10)),
            2,
        ),
    ];
    for (name, rating, featured, stock, receipt_date, related_id) in products {
        let product = ProductActive {
            id: NotSet,
            name: Set(name.into()),
            rating: Set(Some(rating)),
            receipt_date: Set(receipt_date.map(|d| d.fixed_offset())),
            expiration_date: Set(None),
            featured: Set(featured),
            items_in_stock: Set(Some(stock)),
            brand_id: Set(Some(related_id)),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&state.orm)
        .await?;

        ProductCategoryActive {
            product_id: Set(product.id),
            category_id: Set(related_id),
        }
        .insert(&state.orm)
        .await?;
    }

    Ok(())
}

pub fn app(state: &AppState) -> Router {
    create_app(state.clone())
}

/// Sends one request through the router and returns the status and decoded JSON body
/// (`Value::Null` when the body is empty).
pub async fn send(
    state: &AppState,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> anyhow::Result<(StatusCode, Value)> {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json)?)
        }
        None => Body::empty(),
    };

    let response = app(state).oneshot(request.body(body)?).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

pub async fn product_count(state: &AppState) -> anyhow::Result<u64> {
    use sea_orm::PaginatorTrait;
    Ok(Products::find().count(&state.orm).await?)
}
