pub mod access;
pub mod auth;
pub mod error;

pub use access::{can, Action, Role};
pub use error::AppError;
