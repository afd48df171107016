//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::StudioError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 预约与积分错误
/// - 4000-4099: 导入错误
/// - 5000-5099: 支付错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    FileTooLarge = 1011,
    InvalidDateFormat = 1012,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    TokenInvalid = 2002,

    // 预约与积分错误 3000-3099
    InsufficientCredits = 3000,
    AlreadyBooked = 3001,
    ClassFull = 3002,
    CancellationWindow = 3003,
    AlreadyCancelled = 3004,

    // 导入错误 4000-4099
    InvalidMultipartData = 4002,
    CsvFileMissing = 4004,
    CsvParseError = 4005,

    // 支付错误 5000-5099
    PaymentProviderError = 5000,
    WebhookSignatureInvalid = 5001,
}

impl From<&StudioError> for ErrorCode {
    fn from(err: &StudioError) -> Self {
        match err {
            StudioError::Validation(_) | StudioError::Serialization(_) => ErrorCode::BadRequest,
            StudioError::DateParse(_) => ErrorCode::InvalidDateFormat,
            StudioError::NotFound(_) => ErrorCode::NotFound,
            StudioError::Unauthorized(_) => ErrorCode::TokenInvalid,
            StudioError::InsufficientCredits(_) => ErrorCode::InsufficientCredits,
            StudioError::AlreadyBooked(_) => ErrorCode::AlreadyBooked,
            StudioError::ClassFull(_) => ErrorCode::ClassFull,
            StudioError::CancellationWindow(_) => ErrorCode::CancellationWindow,
            StudioError::AlreadyCancelled(_) => ErrorCode::AlreadyCancelled,
            StudioError::CsvParse(_) => ErrorCode::CsvParseError,
            StudioError::PaymentProvider(_) => ErrorCode::PaymentProviderError,
            StudioError::WebhookSignature(_) => ErrorCode::WebhookSignatureInvalid,
            StudioError::DatabaseConfig(_)
            | StudioError::DatabaseConnection(_)
            | StudioError::DatabaseOperation(_)
            | StudioError::FileOperation(_)
            | StudioError::Configuration(_) => ErrorCode::InternalServerError,
        }
    }
}
