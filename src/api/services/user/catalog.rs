//! 公开目录：积分包与课表

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::trace;

use crate::errors::StudioError;
use crate::services::CatalogService;
use crate::utils::time::parse_date;

use super::super::helpers::{api_result, error_from_studio};
use super::super::types::ScheduleQuery;

/// GET /passes
pub async fn list_passes(catalog: web::Data<Arc<CatalogService>>) -> ActixResult<impl Responder> {
    trace!("User API: list passes");
    let result = catalog.list_passes().await.map(|passes| (*passes).clone());
    Ok(api_result::<_, StudioError>(result))
}

/// GET /schedule?from=YYYY-MM-DD&days=N
pub async fn get_schedule(
    query: web::Query<ScheduleQuery>,
    catalog: web::Data<Arc<CatalogService>>,
) -> ActixResult<impl Responder> {
    let from = match query.from.as_deref().map(parse_date).transpose() {
        Ok(from) => from,
        Err(e) => return Ok(error_from_studio(&e)),
    };
    trace!("User API: schedule from {:?} for {:?} days", from, query.days);
    Ok(api_result(catalog.weekly_schedule(from, query.days).await))
}
