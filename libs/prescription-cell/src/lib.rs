pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{create_admin_prescription_router, create_prescription_router};
pub use services::prescription::PrescriptionService;
