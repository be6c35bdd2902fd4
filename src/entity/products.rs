use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub rating: Option<f64>,
    pub receipt_date: Option<DateTimeWithTimeZone>,
    pub expiration_date: Option<DateTimeWithTimeZone>,
    pub featured: bool,
    pub items_in_stock: Option<i32>,
    pub brand_id: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::brands::Entity",
        from = "Column::BrandId",
        to = "super::brands::Column::Id"
    )]
    Brands,
    #[sea_orm(has_many = "super::products_categories::Entity")]
    ProductsCategories,
}

impl Related<super::brands::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Brands.def()
    }
}

// Many-to-many through the `products_categories` join table.
impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        super::products_categories::Relation::Categories.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::products_categories::Relation::Products.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
