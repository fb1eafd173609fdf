pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{create_admin_settings_router, create_settings_router};
pub use services::settings::SettingsService;
