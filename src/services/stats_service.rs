//! Practice statistics
//!
//! All numbers are derived from attended bookings (active, dated today or earlier).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::errors::Result;
use crate::storage::{BookingDetail, BookingRules, Goals, SeaOrmStorage};
use crate::utils::time::{month_start, studio_today, week_start, weekday_index, weekday_name};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserStats {
    pub lifetime_classes: u32,
    pub this_week_classes: u32,
    pub this_month_classes: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub average_classes_per_week: f64,
    pub total_hours: f64,
    pub favorite_class: Option<String>,
    pub most_active_day: Option<String>,
    pub weekly_goal: i32,
    pub monthly_goal: i32,
    pub weekly_progress: u32,
    pub monthly_progress: u32,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn progress(done: u32, goal: i32) -> u32 {
    if goal <= 0 {
        return 0;
    }
    let pct = (f64::from(done) * 100.0 / f64::from(goal)).round() as u32;
    pct.min(100)
}

/// 出现次数最多的键，次数相同取字典序最小
fn most_common<'a>(items: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    // BTreeMap 按字典序遍历，严格大于才替换
    let mut best: Option<(&str, u32)> = None;
    for (name, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// (当前连续天数, 最长连续天数)
fn streaks(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> (u32, u32) {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for &day in days {
        run = match prev {
            Some(p) if day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    let current = match prev {
        Some(last) if last == today || last == today - Duration::days(1) => run,
        _ => 0,
    };
    (current, longest)
}

pub fn compute_stats(bookings: &[BookingDetail], goals: Goals, today: NaiveDate) -> UserStats {
    let attended: Vec<&BookingDetail> = bookings
        .iter()
        .filter(|b| b.booking.is_active() && b.booking.booking_date <= today)
        .collect();

    let lifetime = attended.len() as u32;
    let week_from = week_start(today);
    let month_from = month_start(today);
    let this_week = attended
        .iter()
        .filter(|b| b.booking.booking_date >= week_from)
        .count() as u32;
    let this_month = attended
        .iter()
        .filter(|b| b.booking.booking_date >= month_from)
        .count() as u32;

    let days: BTreeSet<NaiveDate> = attended.iter().map(|b| b.booking.booking_date).collect();
    let (current_streak, longest_streak) = streaks(&days, today);

    let average = match days.first() {
        Some(first) => {
            let elapsed = (today - *first).num_days().max(0);
            let weeks = ((elapsed + 6) / 7).max(1);
            round1(f64::from(lifetime) / weeks as f64)
        }
        None => 0.0,
    };

    let minutes: i64 = attended
        .iter()
        .map(|b| i64::from(b.duration_minute.max(0)))
        .sum();

    let favorite_class = most_common(attended.iter().map(|b| b.class_name.as_str()));
    let most_active_day = most_common(
        attended
            .iter()
            .map(|b| weekday_name(weekday_index(b.booking.booking_date))),
    );

    UserStats {
        lifetime_classes: lifetime,
        this_week_classes: this_week,
        this_month_classes: this_month,
        current_streak,
        longest_streak,
        average_classes_per_week: average,
        total_hours: round1(minutes as f64 / 60.0),
        favorite_class,
        most_active_day,
        weekly_goal: goals.weekly_goal,
        monthly_goal: goals.monthly_goal,
        weekly_progress: progress(this_week, goals.weekly_goal),
        monthly_progress: progress(this_month, goals.monthly_goal),
    }
}

pub struct StatsService {
    storage: Arc<SeaOrmStorage>,
    rules: BookingRules,
}

impl StatsService {
    pub fn new(storage: Arc<SeaOrmStorage>, rules: BookingRules) -> Self {
        Self { storage, rules }
    }

    pub async fn user_stats(&self, user_id: &str) -> Result<UserStats> {
        self.user_stats_on(user_id, studio_today(Utc::now(), self.rules.offset))
            .await
    }

    pub async fn user_stats_on(&self, user_id: &str, today: NaiveDate) -> Result<UserStats> {
        let profile = self.storage.get_profile(user_id).await?;
        let goals = profile
            .map(|p| Goals {
                weekly_goal: p.weekly_goal,
                monthly_goal: p.monthly_goal,
            })
            .unwrap_or(Goals {
                weekly_goal: crate::storage::backend::DEFAULT_WEEKLY_GOAL,
                monthly_goal: crate::storage::backend::DEFAULT_MONTHLY_GOAL,
            });

        let bookings = self.storage.attended_bookings(user_id, today).await?;
        Ok(compute_stats(&bookings, goals, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Booking;
    use chrono::NaiveTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn attended(id: i32, date: &str, class: &str, minutes: i32) -> BookingDetail {
        BookingDetail {
            booking: Booking {
                id,
                user_id: "u".to_string(),
                class_id: 1,
                session_id: 1,
                booking_date: d(date),
                booked_at: Utc::now(),
                credits_charged: 1,
                cancelled_at: None,
                cancelled_by_user: None,
                credit_refunded: false,
            },
            class_name: class.to_string(),
            instructor: "Ana".to_string(),
            level: "All Levels".to_string(),
            temperature_cel: None,
            duration_minute: minutes,
            start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        }
    }

    fn goals() -> Goals {
        Goals {
            weekly_goal: 5,
            monthly_goal: 20,
        }
    }

    #[test]
    fn test_empty_history() {
        let stats = compute_stats(&[], goals(), d("2025-06-11"));
        assert_eq!(stats.lifetime_classes, 0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.average_classes_per_week, 0.0);
        assert_eq!(stats.favorite_class, None);
        assert_eq!(stats.weekly_progress, 0);
    }

    #[test]
    fn test_streaks_and_counts() {
        // 2025-06-11 是周三
        let bookings = vec![
            attended(1, "2025-05-20", "Yin", 60),
            attended(2, "2025-06-01", "Vinyasa", 60),
            attended(3, "2025-06-02", "Vinyasa", 75),
            attended(4, "2025-06-03", "Yin", 60),
            attended(5, "2025-06-09", "Hot", 90),
            attended(6, "2025-06-10", "Vinyasa", 60),
        ];
        let stats = compute_stats(&bookings, goals(), d("2025-06-11"));

        assert_eq!(stats.lifetime_classes, 6);
        assert_eq!(stats.this_week_classes, 2);
        assert_eq!(stats.this_month_classes, 5);
        assert_eq!(stats.longest_streak, 3);
        // 最后一节在昨天
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.favorite_class.as_deref(), Some("Vinyasa"));
        assert_eq!(stats.total_hours, 6.8);
        // 22 天 -> 4 周
        assert_eq!(stats.average_classes_per_week, 1.5);
        assert_eq!(stats.weekly_progress, 40);
        assert_eq!(stats.monthly_progress, 25);
    }

    #[test]
    fn test_current_streak_resets_after_gap() {
        let bookings = vec![
            attended(1, "2025-06-01", "Yin", 60),
            attended(2, "2025-06-02", "Yin", 60),
        ];
        let stats = compute_stats(&bookings, goals(), d("2025-06-05"));
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 2);
    }

    #[test]
    fn test_same_day_counts_once_for_streak() {
        let bookings = vec![
            attended(1, "2025-06-05", "Yin", 60),
            attended(2, "2025-06-05", "Hot", 60),
        ];
        let stats = compute_stats(&bookings, goals(), d("2025-06-05"));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.lifetime_classes, 2);
        // 平局按字母序
        assert_eq!(stats.favorite_class.as_deref(), Some("Hot"));
    }

    #[test]
    fn test_ignores_cancelled_and_future() {
        let mut cancelled = attended(1, "2025-06-04", "Yin", 60);
        cancelled.booking.cancelled_at = Some(Utc::now());
        let future = attended(2, "2025-06-20", "Yin", 60);
        let stats = compute_stats(&[cancelled, future], goals(), d("2025-06-05"));
        assert_eq!(stats.lifetime_classes, 0);
    }

    #[test]
    fn test_progress_capped() {
        let bookings: Vec<_> = (0..7)
            .map(|i| attended(i, "2025-06-10", "Yin", 60))
            .collect();
        let stats = compute_stats(&bookings, goals(), d("2025-06-10"));
        assert_eq!(stats.weekly_progress, 100);
        assert_eq!(stats.most_active_day.as_deref(), Some("Tuesday"));
    }

    #[test]
    fn test_most_active_day_tie_is_alphabetical() {
        let bookings = vec![
            attended(1, "2025-06-09", "Yin", 60), // Monday
            attended(2, "2025-06-06", "Yin", 60), // Friday
        ];
        let stats = compute_stats(&bookings, goals(), d("2025-06-10"));
        assert_eq!(stats.most_active_day.as_deref(), Some("Friday"));
    }
}
