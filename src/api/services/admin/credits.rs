//! 人工积分调整

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;

use crate::services::BookingService;

use super::super::helpers::{api_result, error_from_studio, success_response};
use super::super::types::{BalanceResponse, GrantCreditsRequest};

/// POST /credits/grant
pub async fn grant_credits(
    body: web::Json<GrantCreditsRequest>,
    bookings: web::Data<Arc<BookingService>>,
) -> ActixResult<impl Responder> {
    let req = body.into_inner();
    Ok(api_result(
        bookings
            .grant_credits(&req.user_id, req.delta, req.note.as_deref())
            .await,
    ))
}

/// GET /credits/{user_id}
pub async fn get_balance(
    path: web::Path<String>,
    bookings: web::Data<Arc<BookingService>>,
) -> ActixResult<impl Responder> {
    let user_id = path.into_inner();
    match bookings.balance(&user_id).await {
        Ok(balance) => Ok(success_response(BalanceResponse { user_id, balance })),
        Err(e) => Ok(error_from_studio(&e)),
    }
}
