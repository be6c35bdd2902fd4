use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::products_categories::Entity")]
    ProductsCategories,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        super::products_categories::Relation::Products.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::products_categories::Relation::Categories.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
