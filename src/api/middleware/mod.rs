pub mod auth;

pub use auth::{AdminAuth, AuthUser, UserAuth};
