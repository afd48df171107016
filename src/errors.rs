use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum StudioError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    DateParse(String),
    Unauthorized(String),
    InsufficientCredits(String),
    AlreadyBooked(String),
    ClassFull(String),
    CancellationWindow(String),
    AlreadyCancelled(String),
    PaymentProvider(String),
    WebhookSignature(String),
    CsvParse(String),
    Configuration(String),
}

impl StudioError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            StudioError::DatabaseConfig(_) => "E001",
            StudioError::DatabaseConnection(_) => "E002",
            StudioError::DatabaseOperation(_) => "E003",
            StudioError::FileOperation(_) => "E004",
            StudioError::Validation(_) => "E005",
            StudioError::NotFound(_) => "E006",
            StudioError::Serialization(_) => "E007",
            StudioError::DateParse(_) => "E008",
            StudioError::Unauthorized(_) => "E009",
            StudioError::InsufficientCredits(_) => "E010",
            StudioError::AlreadyBooked(_) => "E011",
            StudioError::ClassFull(_) => "E012",
            StudioError::CancellationWindow(_) => "E013",
            StudioError::AlreadyCancelled(_) => "E014",
            StudioError::PaymentProvider(_) => "E015",
            StudioError::WebhookSignature(_) => "E016",
            StudioError::CsvParse(_) => "E017",
            StudioError::Configuration(_) => "E018",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            StudioError::DatabaseConfig(_) => "Database Configuration Error",
            StudioError::DatabaseConnection(_) => "Database Connection Error",
            StudioError::DatabaseOperation(_) => "Database Operation Error",
            StudioError::FileOperation(_) => "File Operation Error",
            StudioError::Validation(_) => "Validation Error",
            StudioError::NotFound(_) => "Resource Not Found",
            StudioError::Serialization(_) => "Serialization Error",
            StudioError::DateParse(_) => "Date Parse Error",
            StudioError::Unauthorized(_) => "Unauthorized",
            StudioError::InsufficientCredits(_) => "Insufficient Credits",
            StudioError::AlreadyBooked(_) => "Already Booked",
            StudioError::ClassFull(_) => "Class Full",
            StudioError::CancellationWindow(_) => "Cancellation Window Closed",
            StudioError::AlreadyCancelled(_) => "Already Cancelled",
            StudioError::PaymentProvider(_) => "Payment Provider Error",
            StudioError::WebhookSignature(_) => "Webhook Signature Error",
            StudioError::CsvParse(_) => "CSV Parse Error",
            StudioError::Configuration(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            StudioError::DatabaseConfig(msg)
            | StudioError::DatabaseConnection(msg)
            | StudioError::DatabaseOperation(msg)
            | StudioError::FileOperation(msg)
            | StudioError::Validation(msg)
            | StudioError::NotFound(msg)
            | StudioError::Serialization(msg)
            | StudioError::DateParse(msg)
            | StudioError::Unauthorized(msg)
            | StudioError::InsufficientCredits(msg)
            | StudioError::AlreadyBooked(msg)
            | StudioError::ClassFull(msg)
            | StudioError::CancellationWindow(msg)
            | StudioError::AlreadyCancelled(msg)
            | StudioError::PaymentProvider(msg)
            | StudioError::WebhookSignature(msg)
            | StudioError::CsvParse(msg)
            | StudioError::Configuration(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            StudioError::Validation(_)
            | StudioError::DateParse(_)
            | StudioError::CsvParse(_)
            | StudioError::WebhookSignature(_)
            | StudioError::Serialization(_) => StatusCode::BAD_REQUEST,
            StudioError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StudioError::InsufficientCredits(_) => StatusCode::PAYMENT_REQUIRED,
            StudioError::NotFound(_) => StatusCode::NOT_FOUND,
            StudioError::AlreadyBooked(_)
            | StudioError::ClassFull(_)
            | StudioError::CancellationWindow(_)
            | StudioError::AlreadyCancelled(_) => StatusCode::CONFLICT,
            StudioError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            StudioError::DatabaseConfig(_)
            | StudioError::DatabaseConnection(_)
            | StudioError::DatabaseOperation(_)
            | StudioError::FileOperation(_)
            | StudioError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于启动失败）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for StudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for StudioError {}

// 便捷的构造函数
impl StudioError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        StudioError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        StudioError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        StudioError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        StudioError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        StudioError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        StudioError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        StudioError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        StudioError::DateParse(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        StudioError::Unauthorized(msg.into())
    }

    pub fn insufficient_credits<T: Into<String>>(msg: T) -> Self {
        StudioError::InsufficientCredits(msg.into())
    }

    pub fn already_booked<T: Into<String>>(msg: T) -> Self {
        StudioError::AlreadyBooked(msg.into())
    }

    pub fn class_full<T: Into<String>>(msg: T) -> Self {
        StudioError::ClassFull(msg.into())
    }

    pub fn cancellation_window<T: Into<String>>(msg: T) -> Self {
        StudioError::CancellationWindow(msg.into())
    }

    pub fn already_cancelled<T: Into<String>>(msg: T) -> Self {
        StudioError::AlreadyCancelled(msg.into())
    }

    pub fn payment_provider<T: Into<String>>(msg: T) -> Self {
        StudioError::PaymentProvider(msg.into())
    }

    pub fn webhook_signature<T: Into<String>>(msg: T) -> Self {
        StudioError::WebhookSignature(msg.into())
    }

    pub fn csv_parse<T: Into<String>>(msg: T) -> Self {
        StudioError::CsvParse(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        StudioError::Configuration(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for StudioError {
    fn from(err: sea_orm::DbErr) -> Self {
        StudioError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for StudioError {
    fn from(err: std::io::Error) -> Self {
        StudioError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(err: serde_json::Error) -> Self {
        StudioError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for StudioError {
    fn from(err: chrono::ParseError) -> Self {
        StudioError::DateParse(err.to_string())
    }
}

impl From<csv::Error> for StudioError {
    fn from(err: csv::Error) -> Self {
        StudioError::CsvParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            StudioError::database_config("x"),
            StudioError::database_connection("x"),
            StudioError::database_operation("x"),
            StudioError::file_operation("x"),
            StudioError::validation("x"),
            StudioError::not_found("x"),
            StudioError::serialization("x"),
            StudioError::date_parse("x"),
            StudioError::unauthorized("x"),
            StudioError::insufficient_credits("x"),
            StudioError::already_booked("x"),
            StudioError::class_full("x"),
            StudioError::cancellation_window("x"),
            StudioError::already_cancelled("x"),
            StudioError::payment_provider("x"),
            StudioError::webhook_signature("x"),
            StudioError::csv_parse("x"),
            StudioError::configuration("x"),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_booking_errors_map_to_conflict() {
        assert_eq!(
            StudioError::already_booked("dup").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StudioError::cancellation_window("late").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StudioError::insufficient_credits("none").http_status(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn test_format_simple() {
        let err = StudioError::not_found("Booking not found");
        assert_eq!(err.format_simple(), "Resource Not Found: Booking not found");
        assert_eq!(err.to_string(), err.format_simple());
    }

    #[test]
    fn test_from_db_err() {
        let err: StudioError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, StudioError::DatabaseOperation(_)));
        assert!(err.message().contains("boom"));
    }
}
