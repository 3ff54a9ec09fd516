pub mod api_router;
pub mod core;
#[cfg(feature = "llm")]
pub mod llm;
pub mod seo;
pub mod tickets;

pub use crate::core::config::AppConfig;
pub use crate::core::shared::state::AppState;
