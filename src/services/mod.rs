// Catalogue services
pub mod categories;
pub mod employees;
pub mod products;
pub mod shelves;

// Stock workflows
pub mod movements;

// Analytics and Reporting
pub mod dashboard;
pub mod reports;

use crate::{auth::AuthUser, errors::ServiceError};
use sea_orm::{DatabaseTransaction, DbBackend, EntityTrait, QuerySelect, Select};

/// Longest search term passed to a LIKE filter.
pub const MAX_SEARCH_CHARS: usize = 100;

/// Highest page a listing will seek to. Keeps `page * per_page` well inside
/// the range the paginators turn into an SQL offset.
pub const MAX_PAGE: u64 = 1_000_000;

/// One page of a listing, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            per_page: per_page.max(1),
        }
    }

    /// Zero-based page index for sea-orm paginators
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// Free-text search plus the soft-delete switch shared by the catalogue listings.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl ListFilter {
    pub fn term(&self) -> Option<String> {
        search_term(self.search.as_deref())
    }
}

/// Adds `FOR UPDATE` where the backend supports it. SQLite serialises
/// writers on its own and rejects the clause.
pub(crate) fn lock_for_update<E: EntityTrait>(
    select: Select<E>,
    txn: &DatabaseTransaction,
) -> Select<E> {
    use sea_orm::ConnectionTrait;
    if txn.get_database_backend() == DbBackend::Postgres {
        select.lock_exclusive()
    } else {
        select
    }
}

/// Escapes LIKE wildcards in user-supplied search terms and caps their length.
pub(crate) fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.chars()
                .take(MAX_SEARCH_CHARS)
                .collect::<String>()
                .replace('%', "")
                .replace('_', " ")
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Switching a record's `active` flag is reserved to supervisors, like the
/// DELETE routes. Sending the current value back is allowed.
pub(crate) fn ensure_may_set_active(
    actor: &AuthUser,
    current: bool,
    requested: Option<bool>,
) -> Result<(), ServiceError> {
    match requested {
        Some(active) if active != current && !actor.is_supervisor() => {
            Err(ServiceError::Forbidden("access denied".to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EmployeeRole;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    #[test]
    fn page_request_clamps_to_first_page() {
        let req = PageRequest::new(0, 0);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 1);
        assert_eq!(req.index(), 0);
        assert_eq!(PageRequest::new(3, 20).index(), 2);
    }

    #[test]
    fn page_request_caps_the_page_number() {
        let req = PageRequest::new(u64::MAX, 100);
        assert_eq!(req.page, MAX_PAGE);
        assert!(req.index().checked_mul(req.per_page).is_some());
    }

    #[test]
    fn search_terms_are_trimmed_and_stripped() {
        assert_eq!(search_term(None), None);
        assert_eq!(search_term(Some("   ")), None);
        assert_eq!(search_term(Some("%")), None);
        assert_eq!(search_term(Some(" arroz ")), Some("arroz".to_string()));
    }

    #[test]
    fn search_terms_are_capped() {
        let long = "a".repeat(250);
        assert_eq!(
            search_term(Some(&long)).map(|s| s.chars().count()),
            Some(MAX_SEARCH_CHARS)
        );
    }

    fn actor(role: EmployeeRole) -> AuthUser {
        AuthUser {
            employee_id: Uuid::new_v4(),
            name: "Teste".into(),
            role,
            session_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn only_supervisors_flip_the_active_flag() {
        let staff = actor(EmployeeRole::Staff);
        assert_matches!(
            ensure_may_set_active(&staff, true, Some(false)),
            Err(ServiceError::Forbidden(_))
        );
        assert_matches!(
            ensure_may_set_active(&staff, false, Some(true)),
            Err(ServiceError::Forbidden(_))
        );
        assert!(ensure_may_set_active(&staff, true, Some(true)).is_ok());
        assert!(ensure_may_set_active(&staff, true, None).is_ok());

        let supervisor = actor(EmployeeRole::Supervisor);
        assert!(ensure_may_set_active(&supervisor, true, Some(false)).is_ok());
    }
}
