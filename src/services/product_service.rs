use chrono::Utc;
use sea_orm::TransactionTrait;
use serde_json::{Map, Value};

use crate::{
    dto::products::ProductList,
    error::{AppError, AppResult},
    models::{Product, ProductDraft},
    repository,
    routes::params::ProductQuery,
    state::AppState,
    validation::{Mode, validate_product},
};

pub async fn list_products(state: &AppState, query: ProductQuery) -> AppResult<ProductList> {
    let results = repository::list_products(&state.orm, &query).await?;
    Ok(ProductList { results })
}

pub async fn get_product(state: &AppState, id: i32) -> AppResult<Product> {
    repository::find_product(&state.orm, id)
        .await?
        .ok_or(AppError::NotFound)
}

#[tracing::instrument(skip(state, input))]
pub async fn create_product(state: &AppState, input: Map<String, Value>) -> AppResult<Product> {
    let txn = state.orm.begin().await?;

    let mut draft = ProductDraft::default();
    let errors = validate_product(&txn, input, &mut draft, Mode::Create, Utc::now()).await?;
    if !errors.is_empty() {
        let fields: Vec<&str> = errors.fields().collect();
        tracing::debug!(?fields, "product rejected");
        return Err(AppError::Validation(errors));
    }

    let id = repository::insert_product(&txn, &draft).await?;
    let product = repository::find_product(&txn, id)
        .await?
        .ok_or(AppError::NotFound)?;
    txn.commit().await?;

    tracing::info!(product_id = id, "product created");
    Ok(product)
}

#[tracing::instrument(skip(state, input))]
pub async fn update_product(
    state: &AppState,
    id: i32,
    input: Map<String, Value>,
) -> AppResult<Product> {
    let txn = state.orm.begin().await?;

    let mut draft = repository::find_draft(&txn, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let errors = validate_product(&txn, input, &mut draft, Mode::Edit, Utc::now()).await?;
    if !errors.is_empty() {
        let fields: Vec<&str> = errors.fields().collect();
        tracing::debug!(?fields, "product update rejected");
        return Err(AppError::Validation(errors));
    }

    repository::update_product(&txn, id, &draft).await?;
    let product = repository::find_product(&txn, id)
        .await?
        .ok_or(AppError::NotFound)?;
    txn.commit().await?;

    tracing::info!(product_id = id, "product updated");
    Ok(product)
}

/// Deleting an id that does not exist is not an error.
#[tracing::instrument(skip(state))]
pub async fn delete_product(state: &AppState, id: i32) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    let removed = repository::delete_product(&txn, id).await?;
    txn.commit().await?;

    if removed == 0 {
        tracing::debug!(product_id = id, "delete of missing product ignored");
    } else {
        tracing::info!(product_id = id, "product deleted");
    }
    Ok(())
}
