use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MovementType {
    #[sea_orm(string_value = "entry")]
    Entry,
    #[sea_orm(string_value = "exit")]
    Exit,
}

/// Physical stock location
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StockLocation {
    #[sea_orm(string_value = "shop")]
    Shop,
    #[sea_orm(string_value = "warehouse")]
    Warehouse,
}

impl StockLocation {
    /// The opposite location, i.e. the destination of a transfer.
    pub fn other(self) -> Self {
        match self {
            StockLocation::Shop => StockLocation::Warehouse,
            StockLocation::Warehouse => StockLocation::Shop,
        }
    }
}

/// Stock movement (movimentação). Prices are snapshots taken when the
/// movement was recorded.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "movements")]
#[schema(as = Movement)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub employee_id: Uuid,
    pub movement_type: MovementType,
    pub location: StockLocation,
    pub quantity: i32,
    pub reason: Option<String>,
    pub notes: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_cost: Decimal,
    /// Shared by the exit/entry pair written by a transfer
    pub transfer_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl Model {
    /// A sale is an exit that is not half of a transfer.
    pub fn is_sale(&self) -> bool {
        self.movement_type == MovementType::Exit && self.transfer_id.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn other_location_flips() {
        assert_eq!(StockLocation::Shop.other(), StockLocation::Warehouse);
        assert_eq!(StockLocation::Warehouse.other(), StockLocation::Shop);
    }

    #[test]
    fn enums_parse_from_lowercase_names() {
        assert_eq!(MovementType::from_str("exit").unwrap(), MovementType::Exit);
        assert_eq!(
            StockLocation::from_str("warehouse").unwrap(),
            StockLocation::Warehouse
        );
        assert!(StockLocation::from_str("garage").is_err());
        assert_eq!(StockLocation::Shop.to_string(), "shop");
    }
}
