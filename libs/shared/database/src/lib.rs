pub mod error;
pub mod sequence;
pub mod supabase;

pub use error::DbError;
pub use sequence::{format_code, SequenceGenerator};
pub use supabase::SupabaseClient;
