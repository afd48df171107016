//! 用户档案读写

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::model_to_profile;
use super::{is_unique_violation, retry};
use crate::errors::{Result, StudioError};
use crate::storage::models::{Goals, Profile, ProfileUpdate};

use migration::entities::profile;

/// 新档案的默认目标
pub const DEFAULT_WEEKLY_GOAL: i32 = 5;
pub const DEFAULT_MONTHLY_GOAL: i32 = 20;

impl SeaOrmStorage {
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let db = &self.db;
        let id = user_id.to_string();
        let model = retry::with_retry("get_profile", self.retry_config, || async {
            profile::Entity::find_by_id(id.clone()).one(db).await
        })
        .await?;
        Ok(model.map(model_to_profile))
    }

    /// 首次访问时创建档案，已存在则原样返回
    pub async fn ensure_profile(
        &self,
        user_id: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Profile> {
        if let Some(existing) = self.get_profile(user_id).await? {
            return Ok(existing);
        }

        let model = profile::ActiveModel {
            id: Set(user_id.to_string()),
            email: Set(email.to_string()),
            first_name: Set(None),
            last_name: Set(None),
            phone_number: Set(None),
            waiver_accepted: Set(false),
            waiver_accepted_at: Set(None),
            stripe_customer_id: Set(None),
            weekly_goal: Set(DEFAULT_WEEKLY_GOAL),
            monthly_goal: Set(DEFAULT_MONTHLY_GOAL),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match profile::Entity::insert(model).exec(&self.db).await {
            Ok(_) => info!("Profile created for user {}", user_id),
            // 并发的首次请求已经建好了
            Err(e) if is_unique_violation(&e) => {}
            Err(e) => {
                return Err(StudioError::database_operation(format!(
                    "创建档案失败: {}",
                    e
                )));
            }
        }

        self.get_profile(user_id)
            .await?
            .ok_or_else(|| StudioError::not_found("Profile not found"))
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Profile> {
        let existing = profile::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| StudioError::not_found("Profile not found"))?;

        let already_accepted = existing.waiver_accepted_at.is_some();
        let mut model = existing.into_active_model();
        if let Some(first_name) = &update.first_name {
            model.first_name = Set(Some(first_name.trim().to_string()));
        }
        if let Some(last_name) = &update.last_name {
            model.last_name = Set(Some(last_name.trim().to_string()));
        }
        if let Some(phone) = &update.phone_number {
            model.phone_number = Set(Some(phone.trim().to_string()));
        }
        if let Some(accepted) = update.waiver_accepted {
            model.waiver_accepted = Set(accepted);
            // 只记录第一次签署时间
            if accepted && !already_accepted {
                model.waiver_accepted_at = Set(Some(now));
            }
        }
        model.updated_at = Set(now);

        let updated = model.update(&self.db).await?;
        Ok(model_to_profile(updated))
    }

    pub async fn update_goals(
        &self,
        user_id: &str,
        goals: Goals,
        now: DateTime<Utc>,
    ) -> Result<Profile> {
        let existing = profile::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| StudioError::not_found("Profile not found"))?;

        let mut model = existing.into_active_model();
        model.weekly_goal = Set(goals.weekly_goal);
        model.monthly_goal = Set(goals.monthly_goal);
        model.updated_at = Set(now);

        let updated = model.update(&self.db).await?;
        Ok(model_to_profile(updated))
    }

    pub async fn set_stripe_customer_id(&self, user_id: &str, customer_id: &str) -> Result<()> {
        let existing = profile::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| StudioError::not_found("Profile not found"))?;

        let mut model = existing.into_active_model();
        model.stripe_customer_id = Set(Some(customer_id.to_string()));
        model.updated_at = Set(Utc::now());
        model.update(&self.db).await?;
        Ok(())
    }
}
