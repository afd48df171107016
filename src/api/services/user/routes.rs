//! User API 路由配置

use actix_web::dev::HttpServiceFactory;
use actix_web::web;

use crate::api::middleware::UserAuth;

use super::account::{
    get_credits, get_goals, get_ledger, get_profile, get_stats, update_goals, update_profile,
};
use super::bookings::{book_class, booking_history, cancel_booking, upcoming_bookings};
use super::catalog::{get_schedule, list_passes};
use super::checkout::create_checkout;

/// 当前用户路由 `/me`
pub fn me_routes() -> impl HttpServiceFactory {
    web::scope("/me")
        .wrap(UserAuth)
        .route("/profile", web::get().to(get_profile))
        .route("/profile", web::put().to(update_profile))
        .route("/goals", web::get().to(get_goals))
        .route("/goals", web::put().to(update_goals))
        .route("/credits", web::get().to(get_credits))
        .route("/ledger", web::get().to(get_ledger))
        .route("/stats", web::get().to(get_stats))
}

/// 预约路由 `/bookings`
pub fn bookings_routes() -> impl HttpServiceFactory {
    web::scope("/bookings")
        .wrap(UserAuth)
        .route("", web::post().to(book_class))
        .route("/upcoming", web::get().to(upcoming_bookings))
        .route("/history", web::get().to(booking_history))
        .route("/{id}/cancel", web::post().to(cancel_booking))
}

/// 结账路由 `/checkout`
pub fn checkout_routes() -> impl HttpServiceFactory {
    web::scope("/checkout")
        .wrap(UserAuth)
        .route("", web::post().to(create_checkout))
}

/// `/api/v1` 下全部路由
pub fn user_v1_routes() -> actix_web::Scope {
    web::scope("/v1")
        .route("/passes", web::get().to(list_passes))
        .route("/schedule", web::get().to(get_schedule))
        .service(me_routes())
        .service(bookings_routes())
        .service(checkout_routes())
}
