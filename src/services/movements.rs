//! Stock movements: plain entries and exits and location-to-location transfers.
//!
//! Every workflow runs in a single database transaction: the movement rows
//! and the product counters are written together or not at all. Exits never
//! drive a counter below zero; the units that could not be taken are
//! reported back as `shortfall`.

use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        employee::Entity as Employee,
        movement::{self, Entity as Movement},
        product::{self, Entity as Product},
        MovementType, StockLocation,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    services::{lock_for_update, PageRequest},
    validation::{clean_optional, sanitize_uuid},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Reason recorded on transfer movements when the caller gives none.
pub const DEFAULT_TRANSFER_REASON: &str = "Transferência entre locais";

/// New counter after an entry, `None` on overflow.
pub fn apply_entry(current: i32, quantity: i32) -> Option<i32> {
    current.checked_add(quantity)
}

/// New counter after an exit, clamped at zero, and the units that were missing.
pub fn apply_exit(current: i32, quantity: i32) -> (i32, i32) {
    let available = current.max(0);
    if quantity <= available {
        (available - quantity, 0)
    } else {
        (0, quantity - available)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    pub source_after: i32,
    pub destination_after: i32,
    pub shortfall: i32,
}

/// Counters after moving `quantity` units from `source` to `destination`.
/// The destination is credited with the full quantity even when the source
/// runs short.
pub fn plan_transfer(source: i32, destination: i32, quantity: i32) -> Option<TransferPlan> {
    let (source_after, shortfall) = apply_exit(source, quantity);
    let destination_after = apply_entry(destination, quantity)?;
    Some(TransferPlan {
        source_after,
        destination_after,
        shortfall,
    })
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordMovementRequest {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub location: StockLocation,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    pub product_id: Uuid,
    /// Source location; the destination is always the other one
    pub from: StockLocation,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementOutcome {
    pub movement: movement::Model,
    pub product: product::Model,
    pub shortfall: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferOutcome {
    pub transfer_id: Uuid,
    pub exit: movement::Model,
    pub entry: movement::Model,
    pub product: product::Model,
    pub shortfall: i32,
}

/// Movement with the names a detail screen shows next to it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementDetail {
    pub movement: movement::Model,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub employee_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    /// Raw value from the query string; anything not shaped like a v4 UUID is ignored
    pub product_id: Option<String>,
    pub movement_type: Option<MovementType>,
    pub location: Option<StockLocation>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl MovementFilter {
    fn product_uuid(&self) -> Option<Uuid> {
        self.product_id
            .as_deref()
            .and_then(sanitize_uuid)
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

#[allow(clippy::too_many_arguments)]
fn movement_row(
    product: &product::Model,
    employee_id: Uuid,
    movement_type: MovementType,
    location: StockLocation,
    quantity: i32,
    reason: Option<String>,
    notes: Option<String>,
    transfer_id: Option<Uuid>,
    occurred_at: DateTime<Utc>,
) -> movement::ActiveModel {
    movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        employee_id: Set(employee_id),
        movement_type: Set(movement_type),
        location: Set(location),
        quantity: Set(quantity),
        reason: Set(reason),
        notes: Set(notes),
        unit_price: Set(product.sale_price),
        unit_cost: Set(product.cost_price),
        transfer_id: Set(transfer_id),
        occurred_at: Set(occurred_at),
    }
}

fn with_counter(
    product: product::Model,
    location: StockLocation,
    value: i32,
    now: DateTime<Utc>,
) -> product::ActiveModel {
    let mut model: product::ActiveModel = product.into();
    match location {
        StockLocation::Shop => model.shop_quantity = Set(value),
        StockLocation::Warehouse => model.warehouse_quantity = Set(value),
    }
    model.updated_at = Set(now);
    model
}

async fn load_active_product(
    txn: &DatabaseTransaction,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    let product = lock_for_update(Product::find_by_id(product_id), txn)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("product", product_id))?;

    if !product.active {
        return Err(ServiceError::InvalidOperation(format!(
            "product {} is inactive",
            product.code
        )));
    }
    Ok(product)
}

#[derive(Clone)]
pub struct MovementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MovementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a plain entry or exit for the acting employee.
    #[instrument(skip(self, actor, request), fields(employee_id = %actor.employee_id, product_id = %request.product_id))]
    pub async fn record(
        &self,
        actor: &AuthUser,
        request: RecordMovementRequest,
    ) -> Result<MovementOutcome, ServiceError> {
        request.validate()?;
        let workflow = request.movement_type.to_string();

        match self.record_in_transaction(actor.employee_id, request).await {
            Ok((outcome, was_low)) => {
                let movement = &outcome.movement;
                metrics::record_movement(movement.movement_type, movement.location);
                metrics::record_shortfall(outcome.shortfall);

                if outcome.shortfall > 0 {
                    warn!(
                        movement_id = %movement.id,
                        shortfall = outcome.shortfall,
                        "exit exceeded available stock; counter clamped at zero"
                    );
                }

                let event = match movement.movement_type {
                    MovementType::Entry => Event::StockEntryRecorded {
                        movement_id: movement.id,
                        product_id: movement.product_id,
                        location: movement.location,
                        quantity: movement.quantity,
                    },
                    MovementType::Exit => Event::StockExitRecorded {
                        movement_id: movement.id,
                        product_id: movement.product_id,
                        location: movement.location,
                        quantity: movement.quantity,
                        shortfall: outcome.shortfall,
                    },
                };
                self.event_sender.send_or_log(event);
                self.notify_low_stock(&outcome.product, was_low);

                info!(movement_id = %movement.id, "movement recorded");
                Ok(outcome)
            }
            Err(e) => {
                metrics::record_workflow_failure(&workflow);
                error!(error = %e, workflow = %workflow, "movement rolled back");
                Err(e)
            }
        }
    }

    async fn record_in_transaction(
        &self,
        employee_id: Uuid,
        request: RecordMovementRequest,
    ) -> Result<(MovementOutcome, bool), ServiceError> {
        let txn = self.db_pool.begin().await?;

        let product = load_active_product(&txn, request.product_id).await?;
        let was_low = product.is_low_stock();
        let current = product.quantity_at(request.location);

        let (new_value, shortfall) = match request.movement_type {
            MovementType::Entry => {
                let value = apply_entry(current, request.quantity).ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "entry of {} units would overflow the {} counter",
                        request.quantity, request.location
                    ))
                })?;
                (value, 0)
            }
            MovementType::Exit => apply_exit(current, request.quantity),
        };

        let now = Utc::now();
        let movement = movement_row(
            &product,
            employee_id,
            request.movement_type,
            request.location,
            request.quantity,
            clean_optional(request.reason),
            clean_optional(request.notes),
            None,
            now,
        )
        .insert(&txn)
        .await?;

        let product = with_counter(product, request.location, new_value, now)
            .update(&txn)
            .await?;

        txn.commit().await?;

        Ok((
            MovementOutcome {
                movement,
                product,
                shortfall,
            },
            was_low,
        ))
    }

    /// Moves stock from one location to the other as an exit/entry pair
    /// sharing a `transfer_id`.
    #[instrument(skip(self, actor, request), fields(employee_id = %actor.employee_id, product_id = %request.product_id))]
    pub async fn transfer(
        &self,
        actor: &AuthUser,
        request: TransferRequest,
    ) -> Result<TransferOutcome, ServiceError> {
        request.validate()?;

        match self.transfer_in_transaction(actor.employee_id, request).await {
            Ok((outcome, was_low)) => {
                metrics::record_transfer();
                metrics::record_movement(outcome.exit.movement_type, outcome.exit.location);
                metrics::record_movement(outcome.entry.movement_type, outcome.entry.location);
                metrics::record_shortfall(outcome.shortfall);

                if outcome.shortfall > 0 {
                    warn!(
                        transfer_id = %outcome.transfer_id,
                        shortfall = outcome.shortfall,
                        from = %outcome.exit.location,
                        "transfer exceeded available stock at source; counter clamped at zero"
                    );
                }

                self.event_sender.send_or_log(Event::StockTransferred {
                    transfer_id: outcome.transfer_id,
                    product_id: outcome.product.id,
                    from: outcome.exit.location,
                    to: outcome.entry.location,
                    quantity: outcome.exit.quantity,
                    shortfall: outcome.shortfall,
                });
                self.notify_low_stock(&outcome.product, was_low);

                info!(transfer_id = %outcome.transfer_id, "transfer completed");
                Ok(outcome)
            }
            Err(e) => {
                metrics::record_workflow_failure("transfer");
                error!(error = %e, "transfer rolled back");
                Err(e)
            }
        }
    }

    async fn transfer_in_transaction(
        &self,
        employee_id: Uuid,
        request: TransferRequest,
    ) -> Result<(TransferOutcome, bool), ServiceError> {
        let from = request.from;
        let to = from.other();

        let txn = self.db_pool.begin().await?;

        let product = load_active_product(&txn, request.product_id).await?;
        let was_low = product.is_low_stock();

        let plan = plan_transfer(
            product.quantity_at(from),
            product.quantity_at(to),
            request.quantity,
        )
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "transfer of {} units would overflow the {} counter",
                request.quantity, to
            ))
        })?;

        let transfer_id = Uuid::new_v4();
        let reason = clean_optional(request.reason)
            .or_else(|| Some(DEFAULT_TRANSFER_REASON.to_string()));
        let notes = clean_optional(request.notes);
        let now = Utc::now();

        let exit = movement_row(
            &product,
            employee_id,
            MovementType::Exit,
            from,
            request.quantity,
            reason.clone(),
            notes.clone(),
            Some(transfer_id),
            now,
        )
        .insert(&txn)
        .await?;

        let entry = movement_row(
            &product,
            employee_id,
            MovementType::Entry,
            to,
            request.quantity,
            reason,
            notes,
            Some(transfer_id),
            now,
        )
        .insert(&txn)
        .await?;

        let mut model = with_counter(product, from, plan.source_after, now);
        match to {
            StockLocation::Shop => model.shop_quantity = Set(plan.destination_after),
            StockLocation::Warehouse => model.warehouse_quantity = Set(plan.destination_after),
        }
        let product = model.update(&txn).await?;

        txn.commit().await?;

        Ok((
            TransferOutcome {
                transfer_id,
                exit,
                entry,
                product,
                shortfall: plan.shortfall,
            },
            was_low,
        ))
    }

    fn notify_low_stock(&self, product: &product::Model, was_low: bool) {
        if product.is_low_stock() && !was_low {
            self.event_sender.send_or_log(Event::LowStockReached {
                product_id: product.id,
                code: product.code.clone(),
                total_quantity: product.total_quantity(),
                min_quantity: product.min_quantity,
            });
        }
    }

    /// Newest first. Both ends of the time range are inclusive.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &MovementFilter,
        page: PageRequest,
    ) -> Result<(Vec<movement::Model>, u64), ServiceError> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            if start > end {
                return Err(ServiceError::ValidationError(
                    "start must not be after end".to_string(),
                ));
            }
        }

        let mut query = Movement::find();
        if let Some(product_id) = filter.product_uuid() {
            query = query.filter(movement::Column::ProductId.eq(product_id));
        }
        if let Some(movement_type) = filter.movement_type {
            query = query.filter(movement::Column::MovementType.eq(movement_type));
        }
        if let Some(location) = filter.location {
            query = query.filter(movement::Column::Location.eq(location));
        }
        if let Some(start) = filter.start {
            query = query.filter(movement::Column::OccurredAt.gte(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(movement::Column::OccurredAt.lte(end));
        }

        let paginator = query
            .order_by_desc(movement::Column::OccurredAt)
            .order_by_asc(movement::Column::Id)
            .paginate(&*self.db_pool, page.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<MovementDetail, ServiceError> {
        let db = &*self.db_pool;
        let (movement, product) = Movement::find_by_id(id)
            .find_also_related(Product)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("movement", id))?;
        let employee = Employee::find_by_id(movement.employee_id).one(db).await?;

        Ok(MovementDetail {
            product_code: product.as_ref().map(|p| p.code.clone()),
            product_name: product.map(|p| p.name),
            employee_name: employee.map(|e| e.name),
            movement,
        })
    }

    /// Both halves of a transfer, exit first.
    #[instrument(skip(self))]
    pub async fn transfer_pair(&self, transfer_id: Uuid) -> Result<Vec<movement::Model>, ServiceError> {
        let rows = Movement::find()
            .filter(movement::Column::TransferId.eq(transfer_id))
            .order_by_desc(movement::Column::MovementType)
            .all(&*self.db_pool)
            .await?;
        if rows.is_empty() {
            return Err(ServiceError::not_found("transfer", transfer_id));
        }
        Ok(rows)
    }
}
