use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Map, Value};

use crate::{
    dto::products::{ProductInput, ProductList, ValidationErrors},
    error::{AppError, AppResult},
    models::Product,
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product)
                .put(update_product)
                .patch(update_product)
                .delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/products",
    params(
        ("q" = Option<String>, Query, description = "Name contains"),
        ("brand_id" = Option<i32>, Query, description = "Only products of this brand"),
        ("category_id" = Option<i32>, Query, description = "Only products in this category"),
        ("featured" = Option<bool>, Query, description = "Filter by featured flag"),
        ("sort_by" = Option<String>, Query, description = "Sort by: id, name, rating, created_at"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc"),
    ),
    responses(
        (status = 200, description = "List products", body = ProductList)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ProductList>> {
    let list = product_service::list_products(&state, query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = Product),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id).ok_or(AppError::NotFound)?;
    let product = product_service::get_product(&state, id).await?;
    Ok(Json(product))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Create product", body = Product),
        (status = 400, description = "Invalid fields", body = ValidationErrors),
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Product>)> {
    let input = input_object(&body)?;
    let product = product_service::create_product(&state, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Updated product", body = Product),
        (status = 400, description = "Invalid fields", body = ValidationErrors),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id).ok_or(AppError::NotFound)?;
    let input = input_object(&body)?;
    let product = product_service::update_product(&state, id, input).await?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Deleted product, or it did not exist")
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    match parse_id(&id) {
        Some(id) => product_service::delete_product(&state, id).await?,
        None => tracing::debug!(%id, "delete of unparseable product id ignored"),
    }
    Ok(StatusCode::NO_CONTENT)
}

// Ids outside i32 cannot name a stored product.
fn parse_id(raw: &str) -> Option<i32> {
    raw.parse().ok()
}

// An empty or null body is an empty map.
fn input_object(body: &[u8]) -> AppResult<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(AppError::BadRequest(
            "request body must be a JSON object".into(),
        )),
        Err(err) => Err(AppError::BadRequest(format!("invalid JSON: {err}"))),
    }
}
