//! Passes and the dated weekly schedule

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::BookingConfig;
use crate::errors::{Result, StudioError};
use crate::storage::{BookingRules, ClassInfo, ClassSession, Pass, PassDraft, SeaOrmStorage};
use crate::utils::time::{class_start_utc, studio_today, weekday_index};

/// 课表中某一天的一节课
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleOccurrence {
    pub session_id: i32,
    pub class_id: i32,
    pub class_name: String,
    pub description: Option<String>,
    pub instructor: String,
    pub level: String,
    pub temperature_cel: Option<i32>,
    pub duration_minute: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub starts_at: DateTime<Utc>,
    pub max_capacity: i32,
    pub booked: i64,
    pub spots_left: i64,
}

/// 把时段模板展开成具体日期
pub fn expand_schedule(
    templates: &[(ClassSession, ClassInfo)],
    from: NaiveDate,
    days: u32,
    rules: BookingRules,
    booked: impl Fn(i32, NaiveDate) -> i64,
) -> Vec<ScheduleOccurrence> {
    let mut out = Vec::new();
    for offset in 0..days {
        let date = from + Duration::days(i64::from(offset));
        let weekday = weekday_index(date);
        for (session, class) in templates.iter().filter(|(s, _)| s.day_of_week == weekday) {
            let taken = booked(session.id, date);
            out.push(ScheduleOccurrence {
                session_id: session.id,
                class_id: class.id,
                class_name: class.class_name.clone(),
                description: class.description.clone(),
                instructor: class.instructor.clone(),
                level: class.level.clone(),
                temperature_cel: class.temperature_cel,
                duration_minute: class.duration_minute,
                date,
                start_time: session.start_time,
                end_time: session.end_time,
                starts_at: class_start_utc(date, session.start_time, rules.offset),
                max_capacity: class.max_capacity,
                booked: taken,
                spots_left: (i64::from(class.max_capacity) - taken).max(0),
            });
        }
    }
    out.sort_by(|a, b| {
        (a.date, a.start_time, &a.class_name).cmp(&(b.date, b.start_time, &b.class_name))
    });
    out
}

pub struct CatalogService {
    storage: Arc<SeaOrmStorage>,
    rules: BookingRules,
    default_days: u32,
    max_days: u32,
}

impl CatalogService {
    pub fn new(storage: Arc<SeaOrmStorage>, rules: BookingRules, config: &BookingConfig) -> Self {
        Self {
            storage,
            rules,
            default_days: config.default_schedule_days.max(1),
            max_days: config.max_schedule_days.max(1),
        }
    }

    pub async fn list_passes(&self) -> Result<Arc<Vec<Pass>>> {
        self.storage.list_active_passes().await
    }

    pub async fn upsert_pass(&self, draft: PassDraft) -> Result<Pass> {
        if draft.name.trim().is_empty() {
            return Err(StudioError::validation("name is required"));
        }
        if draft.stripe_price_id.trim().is_empty() {
            return Err(StudioError::validation("stripe_price_id is required"));
        }
        if draft.credits < 0 {
            return Err(StudioError::validation("credits must not be negative"));
        }
        if !draft.unlimited && draft.credits == 0 {
            return Err(StudioError::validation(
                "credits must be positive for a credit pass",
            ));
        }
        if draft.validity_days.is_some_and(|d| d <= 0) {
            return Err(StudioError::validation("validity_days must be positive"));
        }
        if draft.price_cents.is_some_and(|p| p < 0) {
            return Err(StudioError::validation("price_cents must not be negative"));
        }

        let pass = self.storage.upsert_pass(&draft).await?;
        info!("CatalogService: pass '{}' saved", pass.name);
        Ok(pass)
    }

    pub async fn weekly_schedule(
        &self,
        from: Option<NaiveDate>,
        days: Option<u32>,
    ) -> Result<Vec<ScheduleOccurrence>> {
        let days = days.unwrap_or(self.default_days);
        if days == 0 || days > self.max_days {
            return Err(StudioError::validation(format!(
                "days must be between 1 and {}",
                self.max_days
            )));
        }
        let from = from.unwrap_or_else(|| studio_today(Utc::now(), self.rules.offset));
        let to = from + Duration::days(i64::from(days) - 1);

        let templates = self.storage.active_schedule_templates().await?;
        let counts = self.storage.active_booking_counts(from, to).await?;

        Ok(expand_schedule(&templates, from, days, self.rules, |session, date| {
            counts.get(&(session, date)).copied().unwrap_or(0)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: i32, day: i32, hour: u32, name: &str) -> (ClassSession, ClassInfo) {
        (
            ClassSession {
                id,
                class_id: id * 10,
                day_of_week: day,
                start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
                is_active: true,
            },
            ClassInfo {
                id: id * 10,
                class_name: name.to_string(),
                description: None,
                instructor: "Ana".to_string(),
                level: "All Levels".to_string(),
                temperature_cel: None,
                duration_minute: 60,
                max_capacity: 2,
                is_active: true,
            },
        )
    }

    #[test]
    fn test_expand_schedule_by_weekday() {
        // 2025-06-02 是周一
        let from = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let templates = vec![
            template(1, 1, 18, "Evening Flow"),
            template(2, 1, 7, "Sunrise"),
            template(3, 3, 9, "Yin"),
        ];
        let schedule = expand_schedule(&templates, from, 7, BookingRules::default(), |s, _| {
            if s == 1 { 2 } else { 0 }
        });

        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].class_name, "Sunrise");
        assert_eq!(schedule[1].class_name, "Evening Flow");
        assert_eq!(schedule[1].spots_left, 0);
        assert_eq!(schedule[2].date, NaiveDate::from_ymd_opt(2025, 6, 4).unwrap());
    }

    #[test]
    fn test_expand_schedule_two_weeks() {
        let from = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let templates = vec![template(1, 1, 18, "Evening Flow")];
        let schedule = expand_schedule(&templates, from, 14, BookingRules::default(), |_, _| 0);
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[1].date, NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
        assert_eq!(schedule[1].spots_left, 2);
    }
}
