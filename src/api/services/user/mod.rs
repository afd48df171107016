//! User API 服务模块
//!
//! 面向移动端的 `/api/v1` 端点。除积分包和课表外均需要用户 JWT。

mod account;
mod bookings;
mod catalog;
mod checkout;
pub mod routes;

pub use routes::user_v1_routes;
