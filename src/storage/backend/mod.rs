//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod bookings;
mod catalog;
mod connection;
mod converters;
mod ledger;
mod profiles;
pub mod retry;
mod uploads;

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::{Result, StudioError};
use crate::storage::models::{Pass, StorageConfig};

pub use bookings::{CancelDecision, NewBooking, cancellation_decision};
pub use profiles::{DEFAULT_MONTHLY_GOAL, DEFAULT_WEEKLY_GOAL};
pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use ledger::NewPurchase;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(StudioError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 规范化 backend 名称
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        other => other.to_string(),
    }
}

/// 唯一约束冲突（并发预约、重复退款、webhook 重放都依赖它）
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

const PASS_CACHE_KEY: &str = "active_passes";

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// 上架积分包列表缓存（TTL 60秒）
    pass_cache: Cache<&'static str, Arc<Vec<Pass>>>,
    /// 重试配置
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(StudioError::database_config(
                "DATABASE_URL 未设置".to_string(),
            ));
        }

        let db_config = crate::config::try_get_config()
            .map(|c| c.database.clone())
            .unwrap_or_default();
        Self::with_config(database_url, backend_name, &db_config).await
    }

    pub async fn with_config(
        database_url: &str,
        backend_name: &str,
        db_config: &DatabaseConfig,
    ) -> Result<Self> {
        let retry_config = retry::RetryConfig::from(db_config);

        let backend_name = normalize_backend_name(backend_name);

        // 根据不同数据库类型配置连接选项
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, &backend_name, db_config.pool_size).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name,
            pass_cache: Cache::builder()
                .time_to_live(Duration::from_secs(60))
                .max_capacity(4)
                .build(),
            retry_config,
        };

        // 运行迁移
        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn get_backend_config(&self) -> StorageConfig {
        StorageConfig {
            storage_type: self.backend_name.clone(),
        }
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 连通性检查（readiness 探针使用）
    pub async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| StudioError::database_connection(format!("数据库不可用: {}", e)))
    }

    /// 清除积分包缓存（积分包变更时调用）
    pub fn invalidate_pass_cache(&self) {
        self.pass_cache.invalidate_all();
    }
}
