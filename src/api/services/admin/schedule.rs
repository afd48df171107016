//! 课表 CSV 上传与导入记录

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{Responder, Result as ActixResult, web};
use futures_util::stream::StreamExt;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::constants::RECENT_UPLOADS_LIMIT;
use crate::errors::StudioError;
use crate::services::ScheduleImporter;
use crate::storage::SeaOrmStorage;

use super::super::error_code::ErrorCode;
use super::super::helpers::{api_result, error_from_studio, error_response, success_response};

const DEFAULT_UPLOADER: &str = "admin";

/// POST /schedule/upload（multipart: file, userId）
pub async fn upload_schedule(
    mut payload: Multipart,
    importer: web::Data<Arc<ScheduleImporter>>,
) -> ActixResult<impl Responder> {
    let max_size = importer.max_file_size();
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut uploaded_by: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to parse multipart field: {}", e);
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::InvalidMultipartData,
                    &format!("Invalid multipart data: {}", e),
                ));
            }
        };

        let field_name = field.name().unwrap_or("").to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(String::from);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(bytes) => {
                    if data.len() + bytes.len() > max_size {
                        return Ok(error_response(
                            StatusCode::PAYLOAD_TOO_LARGE,
                            ErrorCode::FileTooLarge,
                            &format!("File exceeds the maximum size of {} bytes", max_size),
                        ));
                    }
                    data.extend_from_slice(&bytes);
                }
                Err(e) => {
                    error!("Failed to read multipart chunk: {}", e);
                    return Ok(error_response(
                        StatusCode::BAD_REQUEST,
                        ErrorCode::InvalidMultipartData,
                        &format!("Failed to read upload: {}", e),
                    ));
                }
            }
        }

        match field_name.as_str() {
            "file" => {
                file = Some((filename.unwrap_or_else(|| "schedule.csv".to_string()), data));
            }
            "userId" => {
                let value = String::from_utf8_lossy(&data).trim().to_string();
                if !value.is_empty() {
                    uploaded_by = Some(value);
                }
            }
            _ => {}
        }
    }

    let Some((filename, data)) = file else {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::CsvFileMissing,
            "No file provided",
        ));
    };

    let uploaded_by = uploaded_by.unwrap_or_else(|| DEFAULT_UPLOADER.to_string());
    info!(
        "Admin API: schedule upload '{}' ({} bytes) by {}",
        filename,
        data.len(),
        uploaded_by
    );

    match importer.import(&filename, &uploaded_by, &data).await {
        Ok(report) => Ok(success_response(report)),
        Err(e) => Ok(error_from_studio(&e)),
    }
}

/// GET /uploads
pub async fn list_uploads(storage: web::Data<Arc<SeaOrmStorage>>) -> ActixResult<impl Responder> {
    Ok(api_result(storage.recent_uploads(RECENT_UPLOADS_LIMIT).await))
}

/// GET /uploads/{id}
pub async fn get_upload(
    path: web::Path<i32>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> ActixResult<impl Responder> {
    let result = storage
        .get_upload(path.into_inner())
        .await
        .and_then(|u| u.ok_or_else(|| StudioError::not_found("Upload not found")));
    Ok(api_result(result))
}
