pub mod billing;

pub use billing::{BillingService, TotalChange, MAX_WRITE_ATTEMPTS};
