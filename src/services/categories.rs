use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::category::{self, Entity as Category},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{ensure_may_set_active, ListFilter, PageRequest},
    validation::{clean_optional, validate_not_blank},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(max = 100), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ListFilter,
        page: PageRequest,
    ) -> Result<(Vec<category::Model>, u64), ServiceError> {
        let mut query = Category::find();
        if !filter.include_inactive {
            query = query.filter(category::Column::Active.eq(true));
        }
        if let Some(term) = filter.term() {
            query = query.filter(category::Column::Name.contains(&term));
        }

        let paginator = query
            .order_by_asc(category::Column::Name)
            .paginate(&*self.db_pool, page.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            description: Set(clean_optional(request.description)),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated(model.id));
        info!(category_id = %model.id, "category created");
        Ok(model)
    }

    #[instrument(skip(self, actor, request), fields(actor_id = %actor.employee_id))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;

        let existing = self.get(id).await?;
        ensure_may_set_active(actor, existing.active, request.active)?;

        let mut model: category::ActiveModel = existing.into();
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if request.description.is_some() {
            model.description = Set(clean_optional(request.description));
        }
        if let Some(active) = request.active {
            model.active = Set(active);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        self.event_sender.send_or_log(Event::CategoryUpdated(id));
        Ok(updated)
    }

    /// Soft delete. Products keep their reference to the category.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        let existing = self.get(id).await?;
        if !existing.active {
            return Ok(existing);
        }

        let mut model: category::ActiveModel = existing.into();
        model.active = Set(false);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::CategoryDeactivated(id));
        info!(category_id = %id, "category deactivated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_name_must_not_be_blank() {
        let ok = CreateCategoryRequest {
            name: "Mercearia".into(),
            description: None,
        };
        assert!(ok.validate().is_ok());

        let blank = CreateCategoryRequest {
            name: "  ".into(),
            description: Some("Grãos e cereais".into()),
        };
        assert!(blank.validate().is_err());
    }
}
