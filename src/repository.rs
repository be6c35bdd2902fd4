use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::{
    entity::{
        Brands, Categories, Products, ProductsCategories,
        brands::Column as BrandCol,
        categories::Column as CategoryCol,
        products::{ActiveModel as ProductActive, Column as ProdCol, Model as ProductModel},
        products_categories::{
            ActiveModel as ProductCategoryActive, Column as JoinCol, Model as ProductCategoryModel,
        },
    },
    error::{AppError, AppResult},
    models::{Brand, Category, Product, ProductDraft},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    validation::ReferenceLookup,
};

pub async fn find_product<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<Option<Product>> {
    let Some(model) = Products::find_by_id(id).one(conn).await? else {
        return Ok(None);
    };
    Ok(with_relations(conn, vec![model]).await?.pop())
}

pub async fn find_draft<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<Option<ProductDraft>> {
    let Some(model) = Products::find_by_id(id).one(conn).await? else {
        return Ok(None);
    };
    let categories = model
        .find_related(Categories)
        .order_by_asc(CategoryCol::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    Ok(Some(ProductDraft {
        id: Some(model.id),
        name: model.name,
        rating: model.rating,
        receipt_date: model.receipt_date.map(|d| d.with_timezone(&Utc)),
        expiration_date: model.expiration_date.map(|d| d.with_timezone(&Utc)),
        featured: model.featured,
        items_in_stock: model.items_in_stock,
        brand_id: model.brand_id,
        categories,
    }))
}

pub async fn list_products<C: ConnectionTrait>(
    conn: &C,
    query: &ProductQuery,
) -> AppResult<Vec<Product>> {
    let mut finder = Products::find();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        finder = finder.filter(Expr::expr(Func::lower(Expr::col(ProdCol::Name))).like(pattern));
    }
    if let Some(brand_id) = query.brand_id {
        finder = finder.filter(ProdCol::BrandId.eq(brand_id));
    }
    if let Some(featured) = query.featured {
        finder = finder.filter(ProdCol::Featured.eq(featured));
    }
    if let Some(category_id) = query.category_id {
        let in_category = Query::select()
            .column(JoinCol::ProductId)
            .from(ProductsCategories)
            .and_where(JoinCol::CategoryId.eq(category_id))
            .to_owned();
        finder = finder.filter(ProdCol::Id.in_subquery(in_category));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::Id);
    let sort_col = match sort_by {
        ProductSortBy::Id => ProdCol::Id,
        ProductSortBy::Name => ProdCol::Name,
        ProductSortBy::Rating => ProdCol::Rating,
        ProductSortBy::CreatedAt => ProdCol::CreatedAt,
    };
    finder = match query.sort_order.unwrap_or(SortOrder::Asc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    if sort_by != ProductSortBy::Id {
        finder = finder.order_by_asc(ProdCol::Id);
    }

    let models = finder.all(conn).await?;
    with_relations(conn, models).await
}

pub async fn insert_product<C: ConnectionTrait>(conn: &C, draft: &ProductDraft) -> AppResult<i32> {
    let active = ProductActive {
        id: NotSet,
        name: Set(draft.name.clone()),
        rating: Set(draft.rating),
        receipt_date: Set(draft.receipt_date.map(|d| d.fixed_offset())),
        expiration_date: Set(draft.expiration_date.map(|d| d.fixed_offset())),
        featured: Set(draft.featured),
        items_in_stock: Set(draft.items_in_stock),
        brand_id: Set(draft.brand_id),
        created_at: Set(Utc::now().fixed_offset()),
    };
    let product = active.insert(conn).await?;

    link_categories(conn, product.id, &draft.category_ids()).await?;
    Ok(product.id)
}

pub async fn update_product<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    draft: &ProductDraft,
) -> AppResult<()> {
    let existing = Products::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ProductActive = existing.into();
    active.name = Set(draft.name.clone());
    active.rating = Set(draft.rating);
    active.receipt_date = Set(draft.receipt_date.map(|d| d.fixed_offset()));
    active.expiration_date = Set(draft.expiration_date.map(|d| d.fixed_offset()));
    active.featured = Set(draft.featured);
    active.items_in_stock = Set(draft.items_in_stock);
    active.brand_id = Set(draft.brand_id);
    active.update(conn).await?;

    link_categories(conn, id, &draft.category_ids()).await
}

// Returns the number of products removed.
pub async fn delete_product<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<u64> {
    ProductsCategories::delete_many()
        .filter(JoinCol::ProductId.eq(id))
        .exec(conn)
        .await?;
    let result = Products::delete_by_id(id).exec(conn).await?;
    Ok(result.rows_affected)
}

pub async fn find_brand<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<Option<Brand>> {
    Ok(Brands::find_by_id(id).one(conn).await?.map(Brand::from))
}

pub async fn find_categories<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> AppResult<Vec<Category>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let categories = Categories::find()
        .filter(CategoryCol::Id.is_in(ids.iter().copied()))
        .order_by_asc(CategoryCol::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    Ok(categories)
}

// Categories are only ever added: insert the links that are not stored yet.
async fn link_categories<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    category_ids: &[i32],
) -> AppResult<()> {
    let stored: HashSet<i32> = ProductsCategories::find()
        .filter(JoinCol::ProductId.eq(product_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|link| link.category_id)
        .collect();

    let missing: Vec<ProductCategoryActive> = category_ids
        .iter()
        .filter(|id| !stored.contains(*id))
        .map(|&category_id| ProductCategoryActive {
            product_id: Set(product_id),
            category_id: Set(category_id),
        })
        .collect();

    if !missing.is_empty() {
        ProductsCategories::insert_many(missing)
            .exec_without_returning(conn)
            .await?;
    }
    Ok(())
}

// Batch-loads brands and categories for a page of products, keeping input order.
async fn with_relations<C: ConnectionTrait>(
    conn: &C,
    models: Vec<ProductModel>,
) -> AppResult<Vec<Product>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let product_ids: Vec<i32> = models.iter().map(|m| m.id).collect();

    let links: Vec<ProductCategoryModel> = ProductsCategories::find()
        .filter(JoinCol::ProductId.is_in(product_ids))
        .order_by_asc(JoinCol::CategoryId)
        .all(conn)
        .await?;
    let category_ids: Vec<i32> = links.iter().map(|l| l.category_id).collect();
    let categories: HashMap<i32, Category> = find_categories(conn, &dedup(category_ids))
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let mut categories_by_product: HashMap<i32, Vec<Category>> = HashMap::new();
    for link in &links {
        if let Some(category) = categories.get(&link.category_id) {
            categories_by_product
                .entry(link.product_id)
                .or_default()
                .push(category.clone());
        }
    }

    let brand_ids = dedup(models.iter().filter_map(|m| m.brand_id).collect());
    let brands: HashMap<i32, Brand> = if brand_ids.is_empty() {
        HashMap::new()
    } else {
        Brands::find()
            .filter(BrandCol::Id.is_in(brand_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|b| (b.id, Brand::from(b)))
            .collect()
    };

    Ok(models
        .into_iter()
        .map(|model| {
            let brand = model.brand_id.and_then(|id| brands.get(&id).cloned());
            let categories = categories_by_product.remove(&model.id).unwrap_or_default();
            product_from_entity(model, brand, categories)
        })
        .collect())
}

fn dedup(mut ids: Vec<i32>) -> Vec<i32> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn product_from_entity(
    model: ProductModel,
    brand: Option<Brand>,
    categories: Vec<Category>,
) -> Product {
    Product {
        id: model.id,
        name: model.name,
        rating: model.rating,
        receipt_date: model.receipt_date.map(|d| d.with_timezone(&Utc)),
        expiration_date: model.expiration_date.map(|d| d.with_timezone(&Utc)),
        featured: model.featured,
        items_in_stock: model.items_in_stock,
        brand,
        categories,
    }
}

impl ReferenceLookup for DatabaseTransaction {
    async fn find_brand(&self, id: i32) -> AppResult<Option<Brand>> {
        find_brand(self, id).await
    }

    async fn find_categories(&self, ids: &[i32]) -> AppResult<Vec<Category>> {
        find_categories(self, ids).await
    }
}
