//! sea-orm entities for the stock schema created by `crate::migrator`.

pub mod category;
pub mod employee;
pub mod movement;
pub mod product;
pub mod session;
pub mod shelf;

pub use employee::EmployeeRole;
pub use movement::{MovementType, StockLocation};
