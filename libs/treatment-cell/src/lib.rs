pub mod catalog;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::Treatment;
pub use router::treatment_routes;
pub use services::TreatmentService;
