pub mod admin;
pub mod error_code;
pub mod health;
mod helpers;
pub mod types;
pub mod user;
pub mod webhook;

pub use error_code::ErrorCode;
pub use health::{AppStartTime, HealthService, health_routes};
pub use helpers::{
    api_result, created_response, error_from_studio, error_response, json_response,
    success_response,
};
pub use types::*;
pub use webhook::webhook_routes;
