use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;

use crate::services::CatalogService;
use crate::storage::PassDraft;

use super::super::helpers::api_result;

/// POST /passes（id 为空时新建）
pub async fn upsert_pass(
    body: web::Json<PassDraft>,
    catalog: web::Data<Arc<CatalogService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(catalog.upsert_pass(body.into_inner()).await))
}
