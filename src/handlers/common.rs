use crate::{config::AppConfig, services::PageRequest, ApiResponse, PaginatedResponse};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// 201 with the standard envelope
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped by `api_max_page_size`
    pub per_page: Option<u64>,
}

impl PaginationParams {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self { page, per_page }
    }

    /// Applies the configured default and caps. Pages past
    /// [`crate::services::MAX_PAGE`] are clamped to it and come back empty.
    pub fn resolve(&self, config: &AppConfig) -> PageRequest {
        let max = config.api_max_page_size.max(1);
        let per_page = self
            .per_page
            .unwrap_or(config.api_default_page_size)
            .clamp(1, max);
        PageRequest::new(self.page.unwrap_or(1), per_page)
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: PageRequest) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(page.per_page)
        };
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
            total_pages,
        }
    }
}
