use crate::{
    auth::{password, AuthService},
    db::DbPool,
    entities::{
        employee::{self, Entity as Employee},
        EmployeeRole,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{ListFilter, PageRequest},
    validation::{normalize_phone, validate_not_blank, validate_phone},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Employee record as exposed over the API; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeView {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: EmployeeRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<employee::Model> for EmployeeView {
    fn from(model: employee::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone: model.phone,
            role: model.role,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < password::MIN_PASSWORD_LENGTH {
        let mut err = ValidationError::new("password_length");
        err.message = Some(
            format!(
                "Password must have at least {} characters",
                password::MIN_PASSWORD_LENGTH
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEmployeeRequest {
    #[validate(length(max = 120), custom = "validate_not_blank")]
    pub name: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(custom = "validate_password")]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: EmployeeRole,
}

fn default_role() -> EmployeeRole {
    EmployeeRole::Staff
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployeeRequest {
    #[validate(length(max = 120), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[validate(custom = "validate_password")]
    pub password: Option<String>,
    pub role: Option<EmployeeRole>,
    pub active: Option<bool>,
}

/// Employee management; every operation here is supervisor-only at the router.
#[derive(Clone)]
pub struct EmployeeService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl EmployeeService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Lists employees by name, ordered alphabetically. The search term
    /// matches the name or the phone digits.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ListFilter,
        page: PageRequest,
    ) -> Result<(Vec<EmployeeView>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = Employee::find();

        if !filter.include_inactive {
            query = query.filter(employee::Column::Active.eq(true));
        }
        if let Some(term) = filter.term() {
            let mut condition = Condition::any().add(employee::Column::Name.contains(&term));
            let digits = normalize_phone(&term);
            if !digits.is_empty() {
                condition = condition.add(employee::Column::Phone.contains(&digits));
            }
            query = query.filter(condition);
        }

        let paginator = query
            .order_by_asc(employee::Column::Name)
            .paginate(db, page.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        Ok((items.into_iter().map(EmployeeView::from).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<EmployeeView, ServiceError> {
        self.find_model(id).await.map(EmployeeView::from)
    }

    async fn find_model(&self, id: Uuid) -> Result<employee::Model, ServiceError> {
        Employee::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("employee", id))
    }

    async fn ensure_phone_free(&self, phone: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = Employee::find().filter(employee::Column::Phone.eq(phone));
        if let Some(id) = except {
            query = query.filter(employee::Column::Id.ne(id));
        }
        if query.count(&*self.db_pool).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "phone '{}' already exists",
                phone
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(role = %request.role))]
    pub async fn create(&self, request: CreateEmployeeRequest) -> Result<EmployeeView, ServiceError> {
        request.validate()?;

        let phone = normalize_phone(&request.phone);
        self.ensure_phone_free(&phone, None).await?;

        let hash = password::hash_password_blocking(request.password)
            .await
            .map_err(ServiceError::HashError)?;

        let now = Utc::now();
        let model = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            phone: Set(phone.clone()),
            password_hash: Set(hash),
            role: Set(request.role),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| ServiceError::from_constraint(e, &format!("phone '{}'", phone)))?;

        self.event_sender
            .send_or_log(Event::EmployeeCreated(model.id));
        info!(employee_id = %model.id, "employee created");
        Ok(EmployeeView::from(model))
    }

    /// Applies a partial update. Setting `active` to false revokes the
    /// employee's sessions in the same transaction.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        actor_id: Uuid,
        id: Uuid,
        request: UpdateEmployeeRequest,
    ) -> Result<EmployeeView, ServiceError> {
        request.validate()?;

        if actor_id == id {
            if request.active == Some(false) {
                return Err(ServiceError::InvalidOperation(
                    "supervisors cannot deactivate themselves".to_string(),
                ));
            }
            if matches!(request.role, Some(role) if !role.is_supervisor()) {
                return Err(ServiceError::InvalidOperation(
                    "supervisors cannot remove their own supervisor role".to_string(),
                ));
            }
        }

        let existing = self.find_model(id).await?;
        let phone = request.phone.as_deref().map(normalize_phone);
        if let Some(phone) = phone.as_deref() {
            if phone != existing.phone {
                self.ensure_phone_free(phone, Some(id)).await?;
            }
        }

        let hash = match request.password {
            Some(password) => Some(
                password::hash_password_blocking(password)
                    .await
                    .map_err(ServiceError::HashError)?,
            ),
            None => None,
        };

        let deactivating = existing.active && request.active == Some(false);
        let subject = format!("phone '{}'", phone.as_deref().unwrap_or(&existing.phone));

        let mut model: employee::ActiveModel = existing.into();
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(phone) = phone {
            model.phone = Set(phone);
        }
        if let Some(hash) = hash {
            model.password_hash = Set(hash);
        }
        if let Some(role) = request.role {
            model.role = Set(role);
        }
        if let Some(active) = request.active {
            model.active = Set(active);
        }
        model.updated_at = Set(Utc::now());

        let txn = self.db_pool.begin().await?;
        let updated = model
            .update(&txn)
            .await
            .map_err(|e| ServiceError::from_constraint(e, &subject))?;
        if deactivating {
            let revoked = AuthService::revoke_employee_sessions(&txn, id).await?;
            info!(employee_id = %id, revoked, "sessions revoked on deactivation");
        }
        txn.commit().await?;

        let event = if deactivating {
            Event::EmployeeDeactivated(id)
        } else {
            Event::EmployeeUpdated(id)
        };
        self.event_sender.send_or_log(event);
        Ok(EmployeeView::from(updated))
    }

    /// Soft-deletes an employee and revokes every open session they hold.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, actor_id: Uuid, id: Uuid) -> Result<EmployeeView, ServiceError> {
        if actor_id == id {
            return Err(ServiceError::InvalidOperation(
                "supervisors cannot deactivate themselves".to_string(),
            ));
        }

        let existing = self.find_model(id).await?;
        if !existing.active {
            return Ok(EmployeeView::from(existing));
        }

        let txn = self.db_pool.begin().await?;
        let mut model: employee::ActiveModel = existing.into();
        model.active = Set(false);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&txn).await?;
        let revoked = AuthService::revoke_employee_sessions(&txn, id).await?;
        txn.commit().await?;

        if revoked > 0 {
            warn!(employee_id = %id, revoked, "open sessions revoked");
        }
        self.event_sender
            .send_or_log(Event::EmployeeDeactivated(id));
        Ok(EmployeeView::from(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(phone: &str, password: &str) -> CreateEmployeeRequest {
        CreateEmployeeRequest {
            name: "Maria Souza".into(),
            phone: phone.into(),
            password: password.into(),
            role: EmployeeRole::Staff,
        }
    }

    #[test]
    fn create_request_rules() {
        assert!(create_request("(11) 98888-7777", "segredo1").validate().is_ok());
        assert!(create_request("123", "segredo1").validate().is_err());
        assert!(create_request("11988887777", "abc").validate().is_err());

        let mut blank = create_request("11988887777", "segredo1");
        blank.name = "   ".into();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn update_request_validates_only_present_fields() {
        assert!(UpdateEmployeeRequest::default().validate().is_ok());

        let bad_phone = UpdateEmployeeRequest {
            phone: Some("12".into()),
            ..Default::default()
        };
        assert!(bad_phone.validate().is_err());
    }

    #[test]
    fn role_defaults_to_staff() {
        let req: CreateEmployeeRequest = serde_json::from_value(serde_json::json!({
            "name": "João",
            "phone": "11977776666",
            "password": "segredo1"
        }))
        .unwrap();
        assert_eq!(req.role, EmployeeRole::Staff);
    }

    #[test]
    fn view_drops_password_hash() {
        let now = Utc::now();
        let view = EmployeeView::from(employee::Model {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            phone: "11900001111".into(),
            password_hash: "$argon2id$secret".into(),
            role: EmployeeRole::Supervisor,
            active: true,
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"supervisor\""));
    }
}
