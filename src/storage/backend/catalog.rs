//! 积分包、课程与时段

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TryIntoModel,
};
use tracing::{debug, info};

use super::converters::{model_to_class, model_to_pass, model_to_session};
use super::{PASS_CACHE_KEY, SeaOrmStorage, retry};
use crate::errors::{Result, StudioError};
use crate::storage::models::{ClassDraft, ClassInfo, ClassSession, Pass, PassDraft, SessionDraft};

use migration::entities::{booking, class, class_session, pass};

impl SeaOrmStorage {
    /// 上架中的积分包，按价格、id 排序
    pub async fn list_active_passes(&self) -> Result<Arc<Vec<Pass>>> {
        if let Some(cached) = self.pass_cache.get(PASS_CACHE_KEY) {
            debug!("Pass list served from cache");
            return Ok(cached);
        }

        let db = &self.db;
        let models = retry::with_retry("list_active_passes", self.retry_config, || async {
            pass::Entity::find()
                .filter(pass::Column::IsActive.eq(true))
                .all(db)
                .await
        })
        .await?;

        let mut passes: Vec<Pass> = models.into_iter().map(model_to_pass).collect();
        // 未定价的排在最后
        passes.sort_by_key(|p| (p.price_cents.unwrap_or(i32::MAX), p.id));

        let passes = Arc::new(passes);
        self.pass_cache.insert(PASS_CACHE_KEY, passes.clone());
        Ok(passes)
    }

    pub async fn get_pass(&self, pass_id: i32) -> Result<Option<Pass>> {
        let db = &self.db;
        let model = retry::with_retry("get_pass", self.retry_config, || async {
            pass::Entity::find_by_id(pass_id).one(db).await
        })
        .await?;
        Ok(model.map(model_to_pass))
    }

    pub async fn upsert_pass(&self, draft: &PassDraft) -> Result<Pass> {
        let existing = match draft.id {
            Some(id) => Some(
                pass::Entity::find_by_id(id)
                    .one(&self.db)
                    .await?
                    .ok_or_else(|| StudioError::not_found("Pass not found"))?,
            ),
            None => None,
        };

        let mut model = match existing {
            Some(m) => m.into_active_model(),
            None => <pass::ActiveModel as Default>::default(),
        };
        model.name = Set(draft.name.trim().to_string());
        model.description = Set(draft.description.clone());
        model.credits = Set(draft.credits);
        model.unlimited = Set(draft.unlimited);
        model.validity_days = Set(draft.validity_days);
        model.stripe_price_id = Set(draft.stripe_price_id.trim().to_string());
        model.is_active = Set(draft.is_active);
        model.price_cents = Set(draft.price_cents);
        model.currency = Set(draft.currency.clone());

        let saved = model.save(&self.db).await?;
        let saved = saved
            .try_into_model()
            .map_err(|e| StudioError::database_operation(format!("保存积分包失败: {}", e)))?;

        self.invalidate_pass_cache();
        info!("Pass upserted: {} ({})", saved.name, saved.id);
        Ok(model_to_pass(saved))
    }

    /// 按 class_name 新建或更新课程
    pub async fn upsert_class<C: ConnectionTrait>(
        conn: &C,
        draft: &ClassDraft,
        now: DateTime<Utc>,
    ) -> Result<class::Model> {
        let existing = class::Entity::find()
            .filter(class::Column::ClassName.eq(draft.class_name.as_str()))
            .one(conn)
            .await?;

        let mut model = match existing {
            Some(m) => m.into_active_model(),
            None => class::ActiveModel {
                class_name: Set(draft.class_name.clone()),
                created_at: Set(now),
                ..Default::default()
            },
        };
        model.description = Set(draft.description.clone());
        model.instructor = Set(draft.instructor.clone());
        model.level = Set(draft.level.as_ref().to_string());
        model.temperature_cel = Set(draft.temperature_cel);
        model.duration_minute = Set(draft.duration_minute);
        model.max_capacity = Set(draft.max_capacity);
        model.is_active = Set(true);
        model.updated_at = Set(now);

        let saved = model.save(conn).await?;
        saved
            .try_into_model()
            .map_err(|e| StudioError::database_operation(format!("保存课程失败: {}", e)))
    }

    /// 按 (class_id, day_of_week, start_time) 新建或更新时段
    pub async fn upsert_session<C: ConnectionTrait>(
        conn: &C,
        class_id: i32,
        draft: &SessionDraft,
        now: DateTime<Utc>,
    ) -> Result<class_session::Model> {
        let existing = class_session::Entity::find()
            .filter(class_session::Column::ClassId.eq(class_id))
            .filter(class_session::Column::DayOfWeek.eq(draft.day_of_week))
            .filter(class_session::Column::StartTime.eq(draft.start_time))
            .one(conn)
            .await?;

        let mut model = match existing {
            Some(m) => m.into_active_model(),
            None => class_session::ActiveModel {
                class_id: Set(class_id),
                day_of_week: Set(draft.day_of_week),
                start_time: Set(draft.start_time),
                created_at: Set(now),
                ..Default::default()
            },
        };
        model.end_time = Set(draft.end_time);
        model.is_active = Set(true);
        model.updated_at = Set(now);

        let saved = model.save(conn).await?;
        saved
            .try_into_model()
            .map_err(|e| StudioError::database_operation(format!("保存时段失败: {}", e)))
    }

    pub async fn get_session_with_class(
        &self,
        session_id: i32,
    ) -> Result<Option<(ClassSession, ClassInfo)>> {
        let row = class_session::Entity::find_by_id(session_id)
            .find_also_related(class::Entity)
            .one(&self.db)
            .await?;

        Ok(match row {
            Some((session, Some(class))) => {
                Some((model_to_session(session), model_to_class(class)))
            }
            _ => None,
        })
    }

    /// 所有上架课程的上架时段
    pub async fn active_schedule_templates(&self) -> Result<Vec<(ClassSession, ClassInfo)>> {
        let db = &self.db;
        let rows = retry::with_retry("active_schedule_templates", self.retry_config, || async {
            class_session::Entity::find()
                .filter(class_session::Column::IsActive.eq(true))
                .find_also_related(class::Entity)
                .order_by_asc(class_session::Column::StartTime)
                .all(db)
                .await
        })
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(session, class)| match class {
                Some(class) if class.is_active => {
                    Some((model_to_session(session), model_to_class(class)))
                }
                _ => None,
            })
            .collect())
    }

    /// 日期区间内每个 (时段, 日期) 的有效预约数
    pub async fn active_booking_counts(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashMap<(i32, NaiveDate), i64>> {
        let rows = booking::Entity::find()
            .filter(booking::Column::BookingDate.gte(from))
            .filter(booking::Column::BookingDate.lte(to))
            .filter(booking::Column::CancelledAt.is_null())
            .all(&self.db)
            .await?;

        let mut counts = HashMap::new();
        for row in rows {
            *counts.entry((row.session_id, row.booking_date)).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
