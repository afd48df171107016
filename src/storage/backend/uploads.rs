use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel, QueryOrder, QuerySelect,
};

use super::SeaOrmStorage;
use super::converters::model_to_upload;
use crate::errors::{Result, StudioError};
use crate::storage::models::{CsvUpload, UploadStatus};

use migration::entities::csv_upload;

impl SeaOrmStorage {
    /// 新建导入记录（状态 processing）
    pub async fn create_upload(
        &self,
        filename: &str,
        uploaded_by: &str,
        now: DateTime<Utc>,
    ) -> Result<CsvUpload> {
        let model = csv_upload::ActiveModel {
            filename: Set(filename.to_string()),
            uploaded_by: Set(uploaded_by.to_string()),
            status: Set(UploadStatus::Processing.as_ref().to_string()),
            total_classes: Set(0),
            processed_classes: Set(0),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let inserted = model.insert(&self.db).await?;
        Ok(model_to_upload(inserted))
    }

    pub async fn finish_upload(
        &self,
        upload_id: i32,
        status: UploadStatus,
        total_classes: i32,
        processed_classes: i32,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CsvUpload> {
        let existing = csv_upload::Entity::find_by_id(upload_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StudioError::not_found("Upload not found"))?;

        let mut model = existing.into_active_model();
        model.status = Set(status.as_ref().to_string());
        model.total_classes = Set(total_classes);
        model.processed_classes = Set(processed_classes);
        model.error_message = Set(error_message);
        model.updated_at = Set(now);

        let updated = model.update(&self.db).await?;
        Ok(model_to_upload(updated))
    }

    pub async fn get_upload(&self, upload_id: i32) -> Result<Option<CsvUpload>> {
        Ok(csv_upload::Entity::find_by_id(upload_id)
            .one(&self.db)
            .await?
            .map(model_to_upload))
    }

    /// 最近的导入记录
    pub async fn recent_uploads(&self, limit: u64) -> Result<Vec<CsvUpload>> {
        let rows = csv_upload::Entity::find()
            .order_by_desc(csv_upload::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(model_to_upload).collect())
    }
}
