//! 当前用户：资料、目标、积分、流水、统计

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::info;

use crate::api::middleware::AuthUser;
use crate::services::{BookingService, ProfileService, StatsService};
use crate::storage::{Goals, ProfileUpdate};

use super::super::helpers::api_result;

pub async fn get_profile(
    user: AuthUser,
    profiles: web::Data<Arc<ProfileService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(profiles.get_profile(&user.user_id).await))
}

pub async fn update_profile(
    user: AuthUser,
    body: web::Json<ProfileUpdate>,
    profiles: web::Data<Arc<ProfileService>>,
) -> ActixResult<impl Responder> {
    let result = profiles
        .update_profile(&user.user_id, body.into_inner())
        .await;
    if result.is_ok() {
        info!("User API: profile updated for {}", user.user_id);
    }
    Ok(api_result(result))
}

pub async fn get_goals(
    user: AuthUser,
    profiles: web::Data<Arc<ProfileService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(profiles.get_goals(&user.user_id).await))
}

pub async fn update_goals(
    user: AuthUser,
    body: web::Json<Goals>,
    profiles: web::Data<Arc<ProfileService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        profiles.update_goals(&user.user_id, body.into_inner()).await,
    ))
}

/// GET /me/credits
pub async fn get_credits(
    user: AuthUser,
    bookings: web::Data<Arc<BookingService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(bookings.credit_summary(&user.user_id).await))
}

/// GET /me/ledger
pub async fn get_ledger(
    user: AuthUser,
    bookings: web::Data<Arc<BookingService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(bookings.ledger(&user.user_id).await))
}

/// GET /me/stats
pub async fn get_stats(
    user: AuthUser,
    stats: web::Data<Arc<StatsService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(stats.user_stats(&user.user_id).await))
}
