use std::sync::Arc;

use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::SeaOrmStorage;
pub use models::{
    Booking, BookingDetail, BookingRules, ClassDraft, ClassInfo, ClassLevel, ClassSession,
    CreditSummary, CsvUpload, Goals, LedgerEntry, LedgerReason, Pass, PassDraft, Profile,
    ProfileUpdate, Purchase, PurchaseRecord, SessionDraft, UploadStatus,
};

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        let database_url = &config.database.database_url;

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;

        let storage =
            backend::SeaOrmStorage::with_config(database_url, &backend_type, &config.database)
                .await?;
        Ok(Arc::new(storage))
    }
}
