use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Access level of an employee
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
pub enum EmployeeRole {
    #[sea_orm(string_value = "supervisor")]
    Supervisor,
    #[sea_orm(string_value = "staff")]
    Staff,
}

impl EmployeeRole {
    pub fn is_supervisor(self) -> bool {
        matches!(self, EmployeeRole::Supervisor)
    }
}

/// Employee (funcionário); the phone number is the login identifier
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Digits only, see `validation::normalize_phone`
    #[sea_orm(unique)]
    pub phone: String,
    pub password_hash: String,
    pub role: EmployeeRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
    #[sea_orm(has_many = "super::movement::Entity")]
    Movements,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
