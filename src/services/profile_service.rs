use std::sync::Arc;

use chrono::Utc;

use crate::errors::{Result, StudioError};
use crate::storage::{Goals, Profile, ProfileUpdate, SeaOrmStorage};

const MAX_NAME_LEN: usize = 100;
const MAX_PHONE_LEN: usize = 32;

pub const WEEKLY_GOAL_RANGE: std::ops::RangeInclusive<i32> = 1..=50;
pub const MONTHLY_GOAL_RANGE: std::ops::RangeInclusive<i32> = 1..=200;

pub struct ProfileService {
    storage: Arc<SeaOrmStorage>,
}

impl ProfileService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 首次认证请求时建档
    pub async fn ensure_profile(&self, user_id: &str, email: Option<&str>) -> Result<Profile> {
        self.storage
            .ensure_profile(user_id, email.unwrap_or_default(), Utc::now())
            .await
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.storage
            .get_profile(user_id)
            .await?
            .ok_or_else(|| StudioError::not_found("Profile not found"))
    }

    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<Profile> {
        check_len("first_name", update.first_name.as_deref(), MAX_NAME_LEN)?;
        check_len("last_name", update.last_name.as_deref(), MAX_NAME_LEN)?;
        check_len("phone_number", update.phone_number.as_deref(), MAX_PHONE_LEN)?;
        if let Some(phone) = update.phone_number.as_deref()
            && !phone
                .chars()
                .all(|c| c.is_ascii_digit() || " +-()".contains(c))
        {
            return Err(StudioError::validation("phone_number contains invalid characters"));
        }

        self.storage
            .update_profile(user_id, &update, Utc::now())
            .await
    }

    pub async fn get_goals(&self, user_id: &str) -> Result<Goals> {
        let profile = self.get_profile(user_id).await?;
        Ok(Goals {
            weekly_goal: profile.weekly_goal,
            monthly_goal: profile.monthly_goal,
        })
    }

    pub async fn update_goals(&self, user_id: &str, goals: Goals) -> Result<Goals> {
        validate_goals(goals)?;
        let profile = self.storage.update_goals(user_id, goals, Utc::now()).await?;
        Ok(Goals {
            weekly_goal: profile.weekly_goal,
            monthly_goal: profile.monthly_goal,
        })
    }
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) if v.trim().chars().count() > max => Err(StudioError::validation(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

pub fn validate_goals(goals: Goals) -> Result<()> {
    if !WEEKLY_GOAL_RANGE.contains(&goals.weekly_goal) {
        return Err(StudioError::validation(format!(
            "weekly_goal must be between {} and {}",
            WEEKLY_GOAL_RANGE.start(),
            WEEKLY_GOAL_RANGE.end()
        )));
    }
    if !MONTHLY_GOAL_RANGE.contains(&goals.monthly_goal) {
        return Err(StudioError::validation(format!(
            "monthly_goal must be between {} and {}",
            MONTHLY_GOAL_RANGE.start(),
            MONTHLY_GOAL_RANGE.end()
        )));
    }
    Ok(())
}
