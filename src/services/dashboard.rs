use crate::{
    db::DbPool,
    entities::{
        movement::{self, Entity as Movement},
        product::{self, Entity as Product},
        shelf::{self, Entity as Shelf},
    },
    errors::ServiceError,
};
use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

const RECENT_MOVEMENTS: u64 = 10;

/// Product count and low-stock count for one shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShelfSummary {
    pub shelf_id: Uuid,
    pub number: String,
    pub description: Option<String>,
    pub total_products: u64,
    pub low_stock_products: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub active_products: u64,
    pub low_stock_products: u64,
    pub shop_units: i64,
    pub warehouse_units: i64,
    pub movements_today: u64,
    pub shelves: Vec<ShelfSummary>,
    pub recent_movements: Vec<movement::Model>,
}

/// Groups active products by shelf. Shelves with no products still appear.
pub fn summarize_shelves(shelves: &[shelf::Model], products: &[product::Model]) -> Vec<ShelfSummary> {
    let mut by_shelf: BTreeMap<Uuid, (u64, u64)> = BTreeMap::new();
    for product in products.iter().filter(|p| p.active) {
        if let Some(shelf_id) = product.shelf_id {
            let entry = by_shelf.entry(shelf_id).or_default();
            entry.0 += 1;
            if product.is_low_stock() {
                entry.1 += 1;
            }
        }
    }

    let mut summaries: Vec<ShelfSummary> = shelves
        .iter()
        .map(|s| {
            let (total, low) = by_shelf.get(&s.id).copied().unwrap_or_default();
            ShelfSummary {
                shelf_id: s.id,
                number: s.number.clone(),
                description: s.description.clone(),
                total_products: total,
                low_stock_products: low,
            }
        })
        .collect();
    summaries.sort_by(|a, b| a.number.cmp(&b.number));
    summaries
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db_pool;

        let products = Product::find()
            .filter(product::Column::Active.eq(true))
            .all(db)
            .await?;
        let shelves = Shelf::find()
            .filter(shelf::Column::Active.eq(true))
            .all(db)
            .await?;

        let today: DateTime<Utc> = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let movements_today = Movement::find()
            .filter(movement::Column::OccurredAt.gte(today))
            .count(db)
            .await?;
        let recent_movements = Movement::find()
            .order_by_desc(movement::Column::OccurredAt)
            .limit(RECENT_MOVEMENTS)
            .all(db)
            .await?;

        Ok(DashboardSummary {
            active_products: products.len() as u64,
            low_stock_products: products.iter().filter(|p| p.is_low_stock()).count() as u64,
            shop_units: products.iter().map(|p| i64::from(p.shop_quantity)).sum(),
            warehouse_units: products.iter().map(|p| i64::from(p.warehouse_quantity)).sum(),
            movements_today,
            shelves: summarize_shelves(&shelves, &products),
            recent_movements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn shelf(number: &str) -> shelf::Model {
        let now = Utc::now();
        shelf::Model {
            id: Uuid::new_v4(),
            number: number.into(),
            description: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(shelf_id: Option<Uuid>, total: i32, min: i32, active: bool) -> product::Model {
        let now = Utc::now();
        product::Model {
            id: Uuid::new_v4(),
            code: "CAF01".into(),
            name: "Café 500g".into(),
            category_id: None,
            brand: None,
            supplier: None,
            cost_price: dec!(10.00),
            sale_price: dec!(15.00),
            shop_quantity: total,
            warehouse_quantity: 0,
            min_quantity: min,
            shelf_id,
            barcode: None,
            active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn shelves_count_their_active_and_low_products() {
        let b = shelf("B-02");
        let a = shelf("A-01");
        let products = vec![
            product(Some(a.id), 10, 5, true),
            product(Some(a.id), 1, 5, true),
            product(Some(a.id), 0, 5, false),
            product(None, 0, 5, true),
        ];

        let summaries = summarize_shelves(&[b.clone(), a.clone()], &products);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].number, "A-01");
        assert_eq!(summaries[0].total_products, 2);
        assert_eq!(summaries[0].low_stock_products, 1);
        assert_eq!(summaries[1].shelf_id, b.id);
        assert_eq!(summaries[1].total_products, 0);
    }
}
