use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        category::Entity as Category,
        product::{self, Entity as Product},
        shelf::Entity as Shelf,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{ensure_may_set_active, search_term, PageRequest},
    validation::{
        clean_optional, normalize_product_code, validate_non_negative_price, validate_not_blank,
        validate_product_code,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(custom = "validate_product_code")]
    pub code: String,
    #[validate(length(max = 200), custom = "validate_not_blank")]
    pub name: String,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    #[validate(custom = "validate_non_negative_price")]
    pub cost_price: Decimal,
    #[validate(custom = "validate_non_negative_price")]
    pub sale_price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub shop_quantity: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub warehouse_quantity: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub min_quantity: i32,
    pub shelf_id: Option<Uuid>,
    #[validate(length(max = 64))]
    pub barcode: Option<String>,
}

/// Partial update. Absent fields are left alone; `category_id` and
/// `shelf_id` can only be re-pointed, not cleared, through this payload.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(custom = "validate_product_code")]
    pub code: Option<String>,
    #[validate(length(max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    #[validate(custom = "validate_non_negative_price")]
    pub cost_price: Option<Decimal>,
    #[validate(custom = "validate_non_negative_price")]
    pub sale_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub shop_quantity: Option<i32>,
    #[validate(range(min = 0))]
    pub warehouse_quantity: Option<i32>,
    #[validate(range(min = 0))]
    pub min_quantity: Option<i32>,
    pub shelf_id: Option<Uuid>,
    #[validate(length(max = 64))]
    pub barcode: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub shelf_id: Option<Uuid>,
    pub include_inactive: bool,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Searches by name, code or barcode, ordered by name.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = Product::find();

        if !filter.include_inactive {
            query = query.filter(product::Column::Active.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(shelf_id) = filter.shelf_id {
            query = query.filter(product::Column::ShelfId.eq(shelf_id));
        }
        if let Some(term) = search_term(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(&term))
                    .add(product::Column::Code.contains(term.to_ascii_uppercase()))
                    .add(product::Column::Barcode.contains(&term)),
            );
        }

        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db_pool, page.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))
    }

    /// Active products whose combined stock is below their minimum.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = Product::find()
            .filter(product::Column::Active.eq(true))
            .filter(product::Column::MinQuantity.gt(0))
            .order_by_asc(product::Column::Name)
            .all(&*self.db_pool)
            .await?;

        Ok(products.into_iter().filter(|p| p.is_low_stock()).collect())
    }

    async fn ensure_references(
        &self,
        category_id: Option<Uuid>,
        shelf_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if let Some(id) = category_id {
            if Category::find_by_id(id).one(&*self.db_pool).await?.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "category {} does not exist",
                    id
                )));
            }
        }
        if let Some(id) = shelf_id {
            if Shelf::find_by_id(id).one(&*self.db_pool).await?.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "shelf {} does not exist",
                    id
                )));
            }
        }
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = Product::find().filter(product::Column::Code.eq(code));
        if let Some(id) = except {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.count(&*self.db_pool).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "product code '{}' already exists",
                code
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let code = normalize_product_code(&request.code);
        self.ensure_code_free(&code, None).await?;
        self.ensure_references(request.category_id, request.shelf_id)
            .await?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.clone()),
            name: Set(request.name.trim().to_string()),
            category_id: Set(request.category_id),
            brand: Set(clean_optional(request.brand)),
            supplier: Set(clean_optional(request.supplier)),
            cost_price: Set(request.cost_price),
            sale_price: Set(request.sale_price),
            shop_quantity: Set(request.shop_quantity),
            warehouse_quantity: Set(request.warehouse_quantity),
            min_quantity: Set(request.min_quantity),
            shelf_id: Set(request.shelf_id),
            barcode: Set(clean_optional(request.barcode)),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| ServiceError::from_constraint(e, &format!("product code '{}'", code)))?;

        self.event_sender.send_or_log(Event::ProductCreated(model.id));
        info!(product_id = %model.id, code = %model.code, "product created");
        Ok(model)
    }

    #[instrument(skip(self, actor, request), fields(actor_id = %actor.employee_id))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let existing = self.get(id).await?;
        ensure_may_set_active(actor, existing.active, request.active)?;
        let code = request.code.as_deref().map(normalize_product_code);
        if let Some(code) = code.as_deref() {
            if code != existing.code {
                self.ensure_code_free(code, Some(id)).await?;
            }
        }
        self.ensure_references(request.category_id, request.shelf_id)
            .await?;

        let subject = format!(
            "product code '{}'",
            code.as_deref().unwrap_or(&existing.code)
        );
        let mut model: product::ActiveModel = existing.into();
        if let Some(code) = code {
            model.code = Set(code);
        }
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if request.category_id.is_some() {
            model.category_id = Set(request.category_id);
        }
        if request.brand.is_some() {
            model.brand = Set(clean_optional(request.brand));
        }
        if request.supplier.is_some() {
            model.supplier = Set(clean_optional(request.supplier));
        }
        if let Some(price) = request.cost_price {
            model.cost_price = Set(price);
        }
        if let Some(price) = request.sale_price {
            model.sale_price = Set(price);
        }
        if let Some(quantity) = request.shop_quantity {
            model.shop_quantity = Set(quantity);
        }
        if let Some(quantity) = request.warehouse_quantity {
            model.warehouse_quantity = Set(quantity);
        }
        if let Some(quantity) = request.min_quantity {
            model.min_quantity = Set(quantity);
        }
        if request.shelf_id.is_some() {
            model.shelf_id = Set(request.shelf_id);
        }
        if request.barcode.is_some() {
            model.barcode = Set(clean_optional(request.barcode));
        }
        if let Some(active) = request.active {
            model.active = Set(active);
        }
        model.updated_at = Set(Utc::now());

        let updated = model
            .update(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_constraint(e, &subject))?;

        self.event_sender.send_or_log(Event::ProductUpdated(id));
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let existing = self.get(id).await?;
        if !existing.active {
            return Ok(existing);
        }

        let mut model: product::ActiveModel = existing.into();
        model.active = Set(false);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::ProductDeactivated(id));
        info!(product_id = %id, "product deactivated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> CreateProductRequest {
        CreateProductRequest {
            code: "arz01".into(),
            name: "Arroz 5kg".into(),
            category_id: None,
            brand: Some("Tio João".into()),
            supplier: None,
            cost_price: dec!(18.00),
            sale_price: dec!(24.50),
            shop_quantity: 10,
            warehouse_quantity: 40,
            min_quantity: 5,
            shelf_id: None,
            barcode: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn malformed_code_is_rejected() {
        let mut req = request();
        req.code = "AB123".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn negative_values_are_rejected() {
        let mut req = request();
        req.sale_price = dec!(-1);
        assert!(req.validate().is_err());

        let mut req = request();
        req.warehouse_quantity = -3;
        assert!(req.validate().is_err());

        let update = UpdateProductRequest {
            min_quantity: Some(-1),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn counters_default_to_zero() {
        let req: CreateProductRequest = serde_json::from_value(serde_json::json!({
            "code": "FEJ02",
            "name": "Feijão 1kg",
            "cost_price": "5.00",
            "sale_price": "7.50"
        }))
        .unwrap();
        assert_eq!(req.shop_quantity, 0);
        assert_eq!(req.warehouse_quantity, 0);
        assert_eq!(req.min_quantity, 0);
    }
}
