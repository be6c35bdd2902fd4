use chrono::{Duration, Utc};
use product_catalog_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Brands, Categories, Products,
        brands::{self, ActiveModel as BrandActive},
        categories::{self, ActiveModel as CategoryActive},
        products,
    },
    models::{Category, ProductDraft},
    repository,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm, &config.migrations_dir).await?;

    let apple = ensure_brand(&orm, "Apple", "US").await?;
    let milka = ensure_brand(&orm, "Milka", "DE").await?;
    let phones = ensure_category(&orm, "Mobile phones").await?;
    let food = ensure_category(&orm, "Food").await?;

    seed_products(&orm, &[(apple, phones.clone()), (milka, food.clone())]).await?;

    println!("Seed completed. Brands: {apple}, {milka}. Categories: {}, {}", phones.id, food.id);
    Ok(())
}

async fn ensure_brand(orm: &DatabaseConnection, name: &str, country_code: &str) -> anyhow::Result<i32> {
    if let Some(existing) = Brands::find()
        .filter(brands::Column::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let brand = BrandActive {
        id: NotSet,
        name: Set(name.to_string()),
        country_code: Set(country_code.to_string()),
    }
    .insert(orm)
    .await?;

    println!("Ensured brand {name} ({country_code})");
    Ok(brand.id)
}

async fn ensure_category(orm: &DatabaseConnection, name: &str) -> anyhow::Result<Category> {
    if let Some(existing) = Categories::find()
        .filter(categories::Column::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.into());
    }

    let category = CategoryActive {
        id: NotSet,
        name: Set(name.to_string()),
    }
    .insert(orm)
    .await?;

    println!("Ensured category {name}");
    Ok(category.into())
}

async fn seed_products(orm: &DatabaseConnection, refs: &[(i32, Category)]) -> anyhow::Result<()> {
    let products = [
        ("iPhone", Some(10.0), true, 10, None),
        ("Chocolate", Some(7.0), false, 0, Some(Utc::now() + Duration::days(10))),
    ];

    let txn = orm.begin().await?;
    for ((name, rating, featured, stock, receipt_date), (brand_id, category)) in
        products.into_iter().zip(refs)
    {
        let exists = Products::find()
            .filter(products::Column::Name.eq(name))
            .one(&txn)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let draft = ProductDraft {
            name: name.to_string(),
            rating,
            receipt_date,
            featured,
            items_in_stock: Some(stock),
            brand_id: Some(*brand_id),
            categories: vec![category.clone()],
            ..Default::default()
        };
        repository::insert_product(&txn, &draft).await?;
    }
    txn.commit().await?;

    println!("Seeded products");
    Ok(())
}
