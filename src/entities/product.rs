use super::movement::StockLocation;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Product entity with one stock counter per location
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Three letters followed by two digits, stored upper-cased
    #[sea_orm(unique)]
    pub code: String,

    pub name: String,
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub supplier: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub cost_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub sale_price: Decimal,

    /// Units on the shop floor (estoque_loja)
    pub shop_quantity: i32,
    /// Units in the warehouse (estoque_armazem)
    pub warehouse_quantity: i32,
    pub min_quantity: i32,

    pub shelf_id: Option<Uuid>,
    pub barcode: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn quantity_at(&self, location: StockLocation) -> i32 {
        match location {
            StockLocation::Shop => self.shop_quantity,
            StockLocation::Warehouse => self.warehouse_quantity,
        }
    }

    pub fn total_quantity(&self) -> i64 {
        i64::from(self.shop_quantity) + i64::from(self.warehouse_quantity)
    }

    /// Low stock means strictly fewer units than the configured minimum.
    pub fn is_low_stock(&self) -> bool {
        self.total_quantity() < i64::from(self.min_quantity)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::shelf::Entity",
        from = "Column::ShelfId",
        to = "super::shelf::Column::Id",
        on_delete = "Restrict"
    )]
    Shelf,
    #[sea_orm(has_many = "super::movement::Entity")]
    Movements,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::shelf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shelf.def()
    }
}

impl Related<super::movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(shop: i32, warehouse: i32, min: i32) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            code: "ARZ01".into(),
            name: "Arroz 5kg".into(),
            category_id: None,
            brand: None,
            supplier: None,
            cost_price: dec!(18.00),
            sale_price: dec!(24.50),
            shop_quantity: shop,
            warehouse_quantity: warehouse,
            min_quantity: min,
            shelf_id: None,
            barcode: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn low_stock_boundary_is_strict() {
        assert!(product(2, 2, 5).is_low_stock());
        assert!(!product(2, 3, 5).is_low_stock());
        assert!(!product(0, 0, 0).is_low_stock());
    }

    #[test]
    fn quantity_at_reads_the_matching_counter() {
        let p = product(7, 11, 0);
        assert_eq!(p.quantity_at(StockLocation::Shop), 7);
        assert_eq!(p.quantity_at(StockLocation::Warehouse), 11);
        assert_eq!(p.total_quantity(), 18);
    }

    #[test]
    fn total_quantity_does_not_overflow_i32() {
        let p = product(i32::MAX, i32::MAX, 0);
        assert_eq!(p.total_quantity(), 2 * i64::from(i32::MAX));
    }
}
