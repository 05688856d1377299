pub mod handlers;
pub mod models;
pub mod report;
pub mod router;
pub mod services;

pub use models::{Patient, Sex};
pub use router::patient_routes;
