use crate::entities::StockLocation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes an event; a closed or full channel is logged and ignored.
    pub fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Domain events published after a write commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockEntryRecorded {
        movement_id: Uuid,
        product_id: Uuid,
        location: StockLocation,
        quantity: i32,
    },
    StockExitRecorded {
        movement_id: Uuid,
        product_id: Uuid,
        location: StockLocation,
        quantity: i32,
        shortfall: i32,
    },
    StockTransferred {
        transfer_id: Uuid,
        product_id: Uuid,
        from: StockLocation,
        to: StockLocation,
        quantity: i32,
        shortfall: i32,
    },
    LowStockReached {
        product_id: Uuid,
        code: String,
        total_quantity: i64,
        min_quantity: i32,
    },

    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeactivated(Uuid),
    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeactivated(Uuid),
    ShelfCreated(Uuid),
    ShelfUpdated(Uuid),
    ShelfDeleted(Uuid),
    EmployeeCreated(Uuid),
    EmployeeUpdated(Uuid),
    EmployeeDeactivated(Uuid),

    SessionStarted {
        session_id: Uuid,
        employee_id: Uuid,
    },
    SessionRevoked {
        session_id: Uuid,
        employee_id: Uuid,
    },

    SalesReportGenerated {
        requested_by: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        lines: usize,
    },
}

/// Drains the channel and writes each event to the log.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockExitRecorded { shortfall, .. } | Event::StockTransferred { shortfall, .. }
                if *shortfall > 0 =>
            {
                warn!(?event, "stock movement clamped at zero");
            }
            Event::LowStockReached {
                product_id,
                code,
                total_quantity,
                min_quantity,
            } => {
                warn!(
                    %product_id,
                    code = %code,
                    total_quantity,
                    min_quantity,
                    "product is below its minimum stock"
                );
            }
            _ => info!(?event, "domain event"),
        }
    }

    info!("Event channel closed; event processing loop finished");
}
