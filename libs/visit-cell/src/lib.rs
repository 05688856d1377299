pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Visit, VisitAttachment, VisitStatus, VisitTreatment};
pub use router::visit_routes;
pub use services::{AttachmentService, VisitService};
