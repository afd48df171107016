//! Admin API 服务模块
//!
//! 供场馆工作人员使用：
//! - 课表 CSV 上传与导入记录
//! - 积分包维护
//! - 人工积分调整

mod credits;
mod passes;
pub mod routes;
mod schedule;

pub use routes::admin_v1_routes;
