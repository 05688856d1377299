pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Bill, BillStatus, BillSummary, Payment, PaymentMode, PaymentReceipt};
pub use router::billing_routes;
pub use services::{BillingService, TotalChange, MAX_WRITE_ATTEMPTS};
