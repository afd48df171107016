//! Admin API 路由配置

use actix_web::web;

use super::credits::{get_balance, grant_credits};
use super::passes::upsert_pass;
use super::schedule::{get_upload, list_uploads, upload_schedule};

/// 课表路由 `/schedule`
pub fn schedule_routes() -> actix_web::Scope {
    web::scope("/schedule").route("/upload", web::post().to(upload_schedule))
}

/// 导入记录路由 `/uploads`
pub fn uploads_routes() -> actix_web::Scope {
    web::scope("/uploads")
        .route("", web::get().to(list_uploads))
        .route("/{id}", web::get().to(get_upload))
}

/// 积分路由 `/credits`
pub fn credits_routes() -> actix_web::Scope {
    web::scope("/credits")
        .route("/grant", web::post().to(grant_credits))
        .route("/{user_id}", web::get().to(get_balance))
}

/// `/admin/v1` 下全部路由（鉴权由外层 AdminAuth 负责）
pub fn admin_v1_routes() -> actix_web::Scope {
    web::scope("/v1")
        .service(schedule_routes())
        .service(uploads_routes())
        .service(credits_routes())
        .route("/passes", web::post().to(upsert_pass))
}
