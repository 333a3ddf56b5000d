use crate::{
    db::DbPool,
    entities::{
        employee::{self, Entity as Employee},
        movement::{self, Entity as Movement},
        product::{self, Entity as Product},
        MovementType, StockLocation,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// One sale: an exit movement that is not half of a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalesLine {
    pub movement_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub location: StockLocation,
    pub employee_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub unit_cost: Decimal,
    pub line_cost: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalesSummary {
    pub line_count: usize,
    pub units_sold: i64,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub gross_profit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalesReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub summary: SalesSummary,
    pub lines: Vec<SalesLine>,
}

/// Raw material for a report line.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub movement: movement::Model,
    pub product: Option<product::Model>,
    pub employee_name: Option<String>,
}

impl SalesReport {
    /// Keeps the sales inside `[start, end]` (both ends inclusive), oldest
    /// first, and totals them from the prices captured on each movement.
    pub fn build<I>(start: DateTime<Utc>, end: DateTime<Utc>, records: I, generated_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = SaleRecord>,
    {
        let mut lines: Vec<SalesLine> = records
            .into_iter()
            .filter(|r| r.movement.is_sale())
            .filter(|r| r.movement.occurred_at >= start && r.movement.occurred_at <= end)
            .map(|r| {
                let m = r.movement;
                let quantity = Decimal::from(m.quantity);
                let (code, name) = r
                    .product
                    .map(|p| (p.code, p.name))
                    .unwrap_or_else(|| (String::new(), String::new()));
                SalesLine {
                    movement_id: m.id,
                    occurred_at: m.occurred_at,
                    product_id: m.product_id,
                    product_code: code,
                    product_name: name,
                    location: m.location,
                    employee_name: r.employee_name,
                    quantity: m.quantity,
                    unit_price: m.unit_price,
                    line_total: quantity * m.unit_price,
                    unit_cost: m.unit_cost,
                    line_cost: quantity * m.unit_cost,
                }
            })
            .collect();
        lines.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.movement_id.cmp(&b.movement_id))
        });

        let mut summary = SalesSummary {
            line_count: lines.len(),
            ..Default::default()
        };
        for line in &lines {
            summary.units_sold += i64::from(line.quantity);
            summary.total_revenue += line.line_total;
            summary.total_cost += line.line_cost;
        }
        summary.gross_profit = summary.total_revenue - summary.total_cost;

        Self {
            start,
            end,
            generated_at,
            summary,
            lines,
        }
    }
}

/// Report period. Either RFC 3339 instants (`start`/`end`) or calendar days
/// (`start_date`/`end_date`, expanded to the first and last instant of the
/// day in UTC). Instants win when both forms are given.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

impl ReportQuery {
    pub fn period(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
        let start = self
            .start
            .or_else(|| self.start_date.map(|d| d.and_time(NaiveTime::MIN).and_utc()))
            .ok_or_else(|| ServiceError::ValidationError("start is required".to_string()))?;
        let end = self
            .end
            .or_else(|| self.end_date.map(|d| d.and_time(end_of_day()).and_utc()))
            .ok_or_else(|| ServiceError::ValidationError("end is required".to_string()))?;

        if start > end {
            return Err(ServiceError::ValidationError(
                "start must not be after end".to_string(),
            ));
        }
        Ok((start, end))
    }
}

#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn sales_report(
        &self,
        requested_by: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SalesReport, ServiceError> {
        if start > end {
            return Err(ServiceError::ValidationError(
                "start must not be after end".to_string(),
            ));
        }
        let db = &*self.db_pool;

        let rows = Movement::find()
            .filter(movement::Column::MovementType.eq(MovementType::Exit))
            .filter(movement::Column::TransferId.is_null())
            .filter(movement::Column::OccurredAt.gte(start))
            .filter(movement::Column::OccurredAt.lte(end))
            .order_by_asc(movement::Column::OccurredAt)
            .find_also_related(Product)
            .all(db)
            .await?;

        let employee_ids: HashSet<Uuid> = rows.iter().map(|(m, _)| m.employee_id).collect();
        let names: HashMap<Uuid, String> = if employee_ids.is_empty() {
            HashMap::new()
        } else {
            Employee::find()
                .filter(employee::Column::Id.is_in(employee_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|e| (e.id, e.name))
                .collect()
        };

        let records = rows.into_iter().map(|(movement, product)| SaleRecord {
            employee_name: names.get(&movement.employee_id).cloned(),
            movement,
            product,
        });
        let report = SalesReport::build(start, end, records, Utc::now());

        self.event_sender.send_or_log(Event::SalesReportGenerated {
            requested_by,
            start,
            end,
            lines: report.lines.len(),
        });
        info!(
            lines = report.summary.line_count,
            revenue = %report.summary.total_revenue,
            "sales report generated"
        );
        Ok(report)
    }
}
