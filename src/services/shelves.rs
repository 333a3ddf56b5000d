use crate::{
    db::DbPool,
    entities::{
        product::{self, Entity as Product},
        shelf::{self, Entity as Shelf},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{ListFilter, PageRequest},
    validation::{clean_optional, validate_not_blank},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateShelfRequest {
    #[validate(length(min = 2, max = 20), custom = "validate_not_blank")]
    pub number: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateShelfRequest {
    #[validate(length(min = 2, max = 20), custom = "validate_not_blank")]
    pub number: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub active: Option<bool>,
}

fn duplicate_number(number: &str) -> ServiceError {
    ServiceError::Conflict(format!("shelf number '{}' already exists", number))
}

#[derive(Clone)]
pub struct ShelfService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ShelfService {
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
    ) -> Result<(Vec<shelf::Model>, u64), ServiceError> {
        let mut query = Shelf::find();
        if !filter.include_inactive {
            query = query.filter(shelf::Column::Active.eq(true));
        }
        if let Some(term) = filter.term() {
            query = query.filter(
                Condition::any()
                    .add(shelf::Column::Number.contains(&term))
                    .add(shelf::Column::Description.contains(&term)),
            );
        }

        let paginator = query
            .order_by_asc(shelf::Column::Number)
            .paginate(&*self.db_pool, page.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<shelf::Model, ServiceError> {
        Shelf::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("shelf", id))
    }

    /// Early duplicate check. The partial unique index has the final say
    /// when two requests race past this query.
    async fn ensure_number_free(&self, number: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = Shelf::find()
            .filter(shelf::Column::Number.eq(number))
            .filter(shelf::Column::Active.eq(true));
        if let Some(id) = except {
            query = query.filter(shelf::Column::Id.ne(id));
        }
        if query.count(&*self.db_pool).await? > 0 {
            return Err(duplicate_number(number));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(number = %request.number))]
    pub async fn create(&self, request: CreateShelfRequest) -> Result<shelf::Model, ServiceError> {
        request.validate()?;

        let number = request.number.trim().to_string();
        self.ensure_number_free(&number, None).await?;

        let now = Utc::now();
        let model = shelf::ActiveModel {
            id: Set(Uuid::new_v4()),
            number: Set(number.clone()),
            description: Set(clean_optional(request.description)),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| match ServiceError::from_constraint(e, "shelf") {
            ServiceError::Conflict(_) => duplicate_number(&number),
            other => other,
        })?;

        self.event_sender.send_or_log(Event::ShelfCreated(model.id));
        info!(shelf_id = %model.id, "shelf created");
        Ok(model)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateShelfRequest,
    ) -> Result<shelf::Model, ServiceError> {
        request.validate()?;

        let existing = self.get(id).await?;
        let number = request
            .number
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.number)
            .to_string();
        let will_be_active = request.active.unwrap_or(existing.active);
        if will_be_active && (number != existing.number || !existing.active) {
            self.ensure_number_free(&number, Some(id)).await?;
        }

        let mut model: shelf::ActiveModel = existing.into();
        model.number = Set(number.clone());
        if request.description.is_some() {
            model.description = Set(clean_optional(request.description));
        }
        model.active = Set(will_be_active);
        model.updated_at = Set(Utc::now());

        let updated = model
            .update(&*self.db_pool)
            .await
            .map_err(|e| match ServiceError::from_constraint(e, "shelf") {
                ServiceError::Conflict(_) => duplicate_number(&number),
                other => other,
            })?;

        self.event_sender.send_or_log(Event::ShelfUpdated(id));
        Ok(updated)
    }

    /// Hard delete, refused while any product still points at the shelf.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;

        let referencing = Product::find()
            .filter(product::Column::ShelfId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if referencing > 0 {
            warn!(shelf_id = %id, referencing, "refusing to delete shelf in use");
            return Err(ServiceError::Conflict(format!(
                "shelf '{}' still holds {} product(s)",
                existing.number, referencing
            )));
        }

        let subject = format!("shelf '{}'", existing.number);
        existing
            .delete(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_constraint(e, &subject))?;

        self.event_sender.send_or_log(Event::ShelfDeleted(id));
        info!(shelf_id = %id, "shelf deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_names_the_number() {
        let err = duplicate_number("A-01");
        assert_eq!(err.to_string(), "Conflict: shelf number 'A-01' already exists");
    }

    #[test]
    fn shelf_number_is_required_and_short() {
        let blank = CreateShelfRequest {
            number: " ".into(),
            description: None,
        };
        assert!(blank.validate().is_err());

        let long = CreateShelfRequest {
            number: "X".repeat(21),
            description: None,
        };
        assert!(long.validate().is_err());

        let single = CreateShelfRequest {
            number: "A".into(),
            description: None,
        };
        assert!(single.validate().is_err());

        let shortest = CreateShelfRequest {
            number: "A1".into(),
            description: None,
        };
        assert!(shortest.validate().is_ok());
    }

    #[test]
    fn renamed_shelf_number_follows_the_same_rules() {
        let rename = UpdateShelfRequest {
            number: Some("B".into()),
            ..Default::default()
        };
        assert!(rename.validate().is_err());
        assert!(UpdateShelfRequest::default().validate().is_ok());
    }
}
