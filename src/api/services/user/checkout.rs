use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;

use crate::api::middleware::AuthUser;
use crate::services::{CheckoutRequest, CheckoutService};

use super::super::helpers::api_result;

/// POST /checkout
pub async fn create_checkout(
    user: AuthUser,
    body: web::Json<CheckoutRequest>,
    checkout: web::Data<Arc<CheckoutService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        checkout
            .create_checkout(&user.user_id, body.into_inner())
            .await,
    ))
}
