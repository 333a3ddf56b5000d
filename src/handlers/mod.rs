pub mod categories;
pub mod common;
pub mod dashboard;
pub mod employees;
pub mod movements;
pub mod navigation;
pub mod products;
pub mod reports;
pub mod shelves;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    categories::CategoryService, dashboard::DashboardService, employees::EmployeeService,
    movements::MovementService, products::ProductService, reports::ReportService,
    shelves::ShelfService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub employees: Arc<EmployeeService>,
    pub categories: Arc<CategoryService>,
    pub shelves: Arc<ShelfService>,
    pub products: Arc<ProductService>,
    pub movements: Arc<MovementService>,
    pub reports: Arc<ReportService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            employees: Arc::new(EmployeeService::new(db_pool.clone(), event_sender.clone())),
            categories: Arc::new(CategoryService::new(db_pool.clone(), event_sender.clone())),
            shelves: Arc::new(ShelfService::new(db_pool.clone(), event_sender.clone())),
            products: Arc::new(ProductService::new(db_pool.clone(), event_sender.clone())),
            movements: Arc::new(MovementService::new(db_pool.clone(), event_sender.clone())),
            reports: Arc::new(ReportService::new(db_pool.clone(), event_sender)),
            dashboard: Arc::new(DashboardService::new(db_pool)),
        }
    }
}
