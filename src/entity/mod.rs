pub mod brands;
pub mod categories;
pub mod products;
pub mod products_categories;

pub use brands::Entity as Brands;
pub use categories::Entity as Categories;
pub use products::Entity as Products;
pub use products_categories::Entity as ProductsCategories;
