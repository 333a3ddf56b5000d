//! Prometheus counters for the stock workflows, exposed as text at `/metrics`.

use crate::entities::{MovementType, StockLocation};
use crate::errors::ServiceError;
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    static ref MOVEMENTS_RECORDED: IntCounterVec = IntCounterVec::new(
        Opts::new("movements_recorded_total", "Stock movements written"),
        &["movement_type", "location"]
    )
    .expect("metric can be created");
    static ref TRANSFERS: IntCounter =
        IntCounter::new("transfers_total", "Completed stock transfers")
            .expect("metric can be created");
    static ref WORKFLOW_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "workflow_failures_total",
            "Stock workflows rolled back before commit"
        ),
        &["workflow"]
    )
    .expect("metric can be created");
    static ref SHORTFALL_UNITS: IntCounter = IntCounter::new(
        "stock_shortfall_units_total",
        "Units requested beyond the available counter and clamped at zero"
    )
    .expect("metric can be created");
    static ref LOGINS: IntCounterVec = IntCounterVec::new(
        Opts::new("logins_total", "Login attempts by outcome"),
        &["outcome"]
    )
    .expect("metric can be created");
    static ref REGISTRY: Registry = {
        let registry = Registry::new_custom(Some("estoque".to_string()), None)
            .expect("registry can be created");
        registry
            .register(Box::new(MOVEMENTS_RECORDED.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(TRANSFERS.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(WORKFLOW_FAILURES.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(SHORTFALL_UNITS.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(LOGINS.clone()))
            .expect("metric can be registered");
        registry
    };
}

pub fn record_movement(movement_type: MovementType, location: StockLocation) {
    MOVEMENTS_RECORDED
        .with_label_values(&[&movement_type.to_string(), &location.to_string()])
        .inc();
}

pub fn record_transfer() {
    TRANSFERS.inc();
}

pub fn record_workflow_failure(workflow: &str) {
    WORKFLOW_FAILURES.with_label_values(&[workflow]).inc();
}

pub fn record_shortfall(units: i32) {
    if units > 0 {
        SHORTFALL_UNITS.inc_by(units as u64);
    }
}

pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    LOGINS.with_label_values(&[outcome]).inc();
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> Result<String, ServiceError> {
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics are not utf-8: {}", e)))
}
