//! 场馆时间换算
//!
//! 课表中的日期和时间都是场馆本地时间，通过固定 UTC 偏移换算成绝对时间。
//! `day_of_week` 采用 0 = 周日 ... 6 = 周六。

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc,
};

use crate::errors::{Result, StudioError};

/// 场馆时区
pub fn studio_offset(utc_offset_minutes: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
        StudioError::validation(format!("Invalid UTC offset: {} minutes", utc_offset_minutes))
    })
}

/// 解析 `HH:MM` 或 `HH:MM:SS`
pub fn parse_clock_time(input: &str) -> Result<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .map_err(|_| StudioError::date_parse(format!("Invalid time '{}', expected HH:MM", input)))
}

/// 解析 `YYYY-MM-DD`
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        StudioError::date_parse(format!("Invalid date '{}', expected YYYY-MM-DD", input))
    })
}

pub fn weekday_index(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

pub fn weekday_name(index: i32) -> &'static str {
    match index {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        _ => "Saturday",
    }
}

/// 课程开始的绝对时间
pub fn class_start_utc(date: NaiveDate, start: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(start);
    match offset.from_local_datetime(&local).single() {
        Some(dt) => dt.with_timezone(&Utc),
        // 固定偏移不会出现歧义，保底按 UTC 解释
        None => Utc.from_utc_datetime(&local),
    }
}

/// 场馆本地的“今天”
pub fn studio_today(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// 本周一（周一为一周开始）
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(
            parse_clock_time("06:30").unwrap(),
            NaiveTime::from_hms_opt(6, 30, 0).unwrap()
        );
        assert_eq!(
            parse_clock_time(" 18:05:09 ").unwrap(),
            NaiveTime::from_hms_opt(18, 5, 9).unwrap()
        );
        assert!(parse_clock_time("25:00").is_err());
        assert!(parse_clock_time("noon").is_err());
    }

    #[test]
    fn test_weekday_index_sunday_is_zero() {
        // 2025-06-01 是周日
        assert_eq!(weekday_index(d("2025-06-01")), 0);
        assert_eq!(weekday_index(d("2025-06-02")), 1);
        assert_eq!(weekday_index(d("2025-06-07")), 6);
        assert_eq!(weekday_name(3), "Wednesday");
    }

    #[test]
    fn test_class_start_with_offset() {
        let offset = studio_offset(-300).unwrap();
        let start = class_start_utc(
            d("2025-06-02"),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            offset,
        );
        assert_eq!(start.to_rfc3339(), "2025-06-02T12:00:00+00:00");
    }

    #[test]
    fn test_studio_today_crosses_midnight() {
        let offset = studio_offset(600).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap();
        assert_eq!(studio_today(now, offset), d("2025-06-02"));
    }

    #[test]
    fn test_week_and_month_start() {
        assert_eq!(week_start(d("2025-06-01")), d("2025-05-26"));
        assert_eq!(week_start(d("2025-06-02")), d("2025-06-02"));
        assert_eq!(week_start(d("2025-06-05")).weekday(), Weekday::Mon);
        assert_eq!(month_start(d("2025-06-17")), d("2025-06-01"));
    }

    #[test]
    fn test_invalid_offset() {
        assert!(studio_offset(24 * 60).is_err());
    }
}
