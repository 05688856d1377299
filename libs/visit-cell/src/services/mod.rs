pub mod attachment;
pub mod visit;

pub use attachment::AttachmentService;
pub use visit::VisitService;
