//! API 帮助函数

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;

use crate::errors::StudioError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建 201 响应
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 StudioError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
///
/// 数据库与文件错误不向客户端暴露内部细节。
pub fn error_from_studio(err: &StudioError) -> HttpResponse {
    let status = err.http_status();
    let error_code = ErrorCode::from(err);
    let internal = matches!(
        err,
        StudioError::DatabaseConfig(_)
            | StudioError::DatabaseConnection(_)
            | StudioError::DatabaseOperation(_)
            | StudioError::FileOperation(_)
    );
    if internal {
        tracing::error!("Request failed: {}", err);
        return error_response(status, error_code, "Internal server error");
    }
    error_response(status, error_code, err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<StudioError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_studio(&e.into()),
    }
}
