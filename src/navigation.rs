//! Page-name allow-list and id sanitising for the front end's router.
//!
//! The client asks the service where a link should land. Unknown page names
//! fall back to the dashboard and any id that is not shaped like a v4 UUID is
//! dropped before it can reach a query.

use crate::entities::EmployeeRole;
use crate::validation::sanitize_uuid;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Page {
    Dashboard,
    Products,
    ProductDetail,
    ProductForm,
    Shelves,
    ShelfForm,
    Categories,
    CategoryForm,
    Employees,
    EmployeeForm,
    Movements,
    MovementDetail,
    MovementForm,
    StockTransfer,
    FinancialReport,
}

impl Page {
    pub fn requires_supervisor(self) -> bool {
        matches!(
            self,
            Page::ShelfForm | Page::Employees | Page::EmployeeForm | Page::FinancialReport
        )
    }
}

/// Maps a requested page name onto the allow-list. Matching is exact.
pub fn resolve_page(name: &str) -> Page {
    Page::from_str(name).unwrap_or(Page::Dashboard)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NavigationQuery {
    pub page: Option<String>,
    pub id: Option<String>,
    pub product_id: Option<String>,
    pub shelf_id: Option<String>,
    pub category_id: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NavigationTarget {
    pub page: Page,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shelf_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    /// Set when the page is supervisor-only and the caller is not a supervisor.
    /// The data endpoints enforce the same rule independently.
    pub access_denied: bool,
}

fn keep_uuid(value: Option<&String>) -> Option<String> {
    value.and_then(|v| sanitize_uuid(v)).map(str::to_string)
}

pub fn resolve(query: &NavigationQuery, role: EmployeeRole) -> NavigationTarget {
    let page = query
        .page
        .as_deref()
        .map(resolve_page)
        .unwrap_or(Page::Dashboard);

    NavigationTarget {
        page,
        id: keep_uuid(query.id.as_ref()),
        product_id: keep_uuid(query.product_id.as_ref()),
        shelf_id: keep_uuid(query.shelf_id.as_ref()),
        category_id: keep_uuid(query.category_id.as_ref()),
        employee_id: keep_uuid(query.employee_id.as_ref()),
        access_denied: page.requires_supervisor() && !role.is_supervisor(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::VariantNames;

    #[test]
    fn every_allow_listed_name_maps_to_itself() {
        for name in Page::VARIANTS {
            assert_eq!(resolve_page(name).as_ref(), *name);
        }
        assert_eq!(Page::VARIANTS.len(), 15);
    }

    #[test]
    fn movement_detail_keeps_its_id() {
        let query = NavigationQuery {
            page: Some("movement-detail".into()),
            id: Some("9b2f7c1e-3d4a-4e5b-8c6d-7e8f9a0b1c2d".into()),
            ..Default::default()
        };
        let target = resolve(&query, EmployeeRole::Staff);
        assert_eq!(target.page, Page::MovementDetail);
        assert_eq!(target.id.as_deref(), Some("9b2f7c1e-3d4a-4e5b-8c6d-7e8f9a0b1c2d"));
        assert!(!target.access_denied);
    }

    #[test]
    fn shelf_form_is_for_supervisors() {
        assert!(Page::ShelfForm.requires_supervisor());
        assert!(!Page::Shelves.requires_supervisor());
    }

    #[rstest]
    #[case("admin-console")]
    #[case("")]
    #[case("Products")]
    #[case("products ")]
    #[case("../employees")]
    fn anything_else_resolves_to_dashboard(#[case] name: &str) {
        assert_eq!(resolve_page(name), Page::Dashboard);
    }

    #[test]
    fn stock_transfer_uses_kebab_case() {
        assert_eq!(resolve_page("stock-transfer"), Page::StockTransfer);
        assert_eq!(Page::FinancialReport.to_string(), "financial-report");
    }

    #[test]
    fn resolve_drops_malformed_ids_and_flags_restricted_pages() {
        let query = NavigationQuery {
            page: Some("financial-report".into()),
            id: Some("null".into()),
            product_id: Some("3f2504e0-4f89-41d3-9a0c-0305e82c3301".into()),
            ..Default::default()
        };

        let staff = resolve(&query, EmployeeRole::Staff);
        assert_eq!(staff.page, Page::FinancialReport);
        assert!(staff.access_denied);
        assert_eq!(staff.id, None);
        assert_eq!(
            staff.product_id.as_deref(),
            Some("3f2504e0-4f89-41d3-9a0c-0305e82c3301")
        );

        let supervisor = resolve(&query, EmployeeRole::Supervisor);
        assert!(!supervisor.access_denied);
    }

    #[test]
    fn missing_page_defaults_to_dashboard() {
        let target = resolve(&NavigationQuery::default(), EmployeeRole::Staff);
        assert_eq!(target.page, Page::Dashboard);
        assert!(!target.access_denied);
    }
}
