//! 预约与取消

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::info;

use crate::api::middleware::AuthUser;
use crate::services::{BookClassRequest, BookingService};

use super::super::helpers::{api_result, created_response, error_from_studio};

/// POST /bookings
pub async fn book_class(
    user: AuthUser,
    body: web::Json<BookClassRequest>,
    bookings: web::Data<Arc<BookingService>>,
) -> ActixResult<impl Responder> {
    let req = body.into_inner();
    match bookings.book_class(&user.user_id, req).await {
        Ok(outcome) => {
            info!(
                "User API: {} booked session {} on {} (balance {})",
                user.user_id, req.session_id, req.date, outcome.balance_after
            );
            Ok(created_response(outcome))
        }
        Err(e) => Ok(error_from_studio(&e)),
    }
}

/// POST /bookings/{id}/cancel
pub async fn cancel_booking(
    user: AuthUser,
    path: web::Path<i32>,
    bookings: web::Data<Arc<BookingService>>,
) -> ActixResult<impl Responder> {
    let booking_id = path.into_inner();
    Ok(api_result(
        bookings.cancel_booking(&user.user_id, booking_id).await,
    ))
}

/// GET /bookings/upcoming
pub async fn upcoming_bookings(
    user: AuthUser,
    bookings: web::Data<Arc<BookingService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(bookings.upcoming_bookings(&user.user_id).await))
}

/// GET /bookings/history
pub async fn booking_history(
    user: AuthUser,
    bookings: web::Data<Arc<BookingService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(bookings.booking_history(&user.user_id).await))
}
