//! 课表 CSV 导入
//!
//! 每行数据对应一门课程和一个每周时段：课程按 class_name 合并，
//! 时段按 (class_id, day_of_week, start_time) 合并。单行失败不影响其他行，
//! 错误汇总后写入导入记录。

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use csv::{ReaderBuilder, StringRecord, Trim};
use sea_orm::TransactionTrait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::errors::{Result, StudioError};
use crate::storage::{ClassDraft, ClassLevel, SeaOrmStorage, SessionDraft, UploadStatus};
use crate::utils::time::parse_clock_time;

const DEFAULT_DURATION_MINUTE: i32 = 60;
const DEFAULT_MAX_CAPACITY: i32 = 24;

/// 必需的列
const REQUIRED_COLUMNS: [&str; 5] = [
    "class_name",
    "instructor",
    "day_of_week",
    "start_time",
    "end_time",
];

/// 一行解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRow {
    pub class: ClassDraft,
    pub session: SessionDraft,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub success: bool,
    pub upload_id: i32,
    pub processed_classes: i32,
    pub total_classes: i32,
    pub errors: Vec<String>,
}

/// 解析后的 CSV：行号（header 为第 1 行）+ 行解析结果
pub type ParsedRows = Vec<(usize, std::result::Result<ScheduleRow, String>)>;

struct RowView<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl RowView<'_> {
    fn get(&self, column: &str) -> &str {
        self.columns
            .get(column)
            .and_then(|&idx| self.record.get(idx))
            .unwrap_or("")
    }

    fn optional_int(&self, column: &str) -> std::result::Result<Option<i32>, String> {
        let raw = self.get(column);
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<i32>()
            .map(Some)
            .map_err(|_| format!("Invalid {} '{}'", column, raw))
    }

    fn positive_int(&self, column: &str, default: i32) -> std::result::Result<i32, String> {
        match self.optional_int(column)? {
            None => Ok(default),
            Some(v) if v > 0 => Ok(v),
            Some(v) => Err(format!("{} must be positive, got {}", column, v)),
        }
    }
}

fn parse_row(view: &RowView<'_>) -> std::result::Result<ScheduleRow, String> {
    let class_name = view.get("class_name");
    if class_name.is_empty() {
        return Err("class_name is required".to_string());
    }
    let instructor = view.get("instructor");
    if instructor.is_empty() {
        return Err("instructor is required".to_string());
    }

    let level = match view.get("level") {
        "" => ClassLevel::default(),
        raw => ClassLevel::from_str(raw).map_err(|_| format!("Invalid level '{}'", raw))?,
    };

    let day_of_week = view
        .optional_int("day_of_week")?
        .ok_or_else(|| "day_of_week is required".to_string())?;
    if !(0..=6).contains(&day_of_week) {
        return Err(format!("day_of_week must be 0-6, got {}", day_of_week));
    }

    let start_time = parse_clock_time(view.get("start_time"))
        .map_err(|_| format!("Invalid start_time '{}'", view.get("start_time")))?;
    let end_time = parse_clock_time(view.get("end_time"))
        .map_err(|_| format!("Invalid end_time '{}'", view.get("end_time")))?;
    if end_time <= start_time {
        return Err("end_time must be after start_time".to_string());
    }

    let description = Some(view.get("description"))
        .filter(|d| !d.is_empty())
        .map(String::from);

    Ok(ScheduleRow {
        class: ClassDraft {
            class_name: class_name.to_string(),
            description,
            instructor: instructor.to_string(),
            level,
            temperature_cel: view.optional_int("temperature_cel")?,
            duration_minute: view.positive_int("duration_minute", DEFAULT_DURATION_MINUTE)?,
            max_capacity: view.positive_int("max_capacity", DEFAULT_MAX_CAPACITY)?,
        },
        session: SessionDraft {
            day_of_week,
            start_time,
            end_time,
        },
    })
}

/// 解析 CSV 内容（header 去空白并转小写，空行忽略）
pub fn parse_schedule_csv(data: &[u8]) -> Result<ParsedRows> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.trim().to_lowercase(), idx))
        .filter(|(h, _)| !h.is_empty())
        .collect();

    if columns.is_empty() {
        return Err(StudioError::csv_parse("CSV file is empty"));
    }
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(StudioError::csv_parse(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row_num = idx + 2;
        let parsed = match result {
            Ok(record) => {
                if record.iter().all(|field| field.is_empty()) {
                    continue;
                }
                parse_row(&RowView {
                    columns: &columns,
                    record: &record,
                })
            }
            Err(e) => Err(format!("CSV parse error: {}", e)),
        };
        rows.push((row_num, parsed));
    }
    Ok(rows)
}

pub struct ScheduleImporter {
    storage: Arc<SeaOrmStorage>,
    max_file_size: usize,
}

impl ScheduleImporter {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &ImportConfig) -> Self {
        Self {
            storage,
            max_file_size: config.max_file_size,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// 从本地文件导入（CLI 使用）
    pub async fn import_file(&self, path: &std::path::Path, uploaded_by: &str) -> Result<ImportReport> {
        let meta = tokio::fs::metadata(path).await?;
        if meta.len() as usize > self.max_file_size {
            return Err(self.too_large());
        }
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "schedule.csv".to_string());
        self.import(&filename, uploaded_by, &data).await
    }

    fn too_large(&self) -> StudioError {
        StudioError::validation(format!(
            "File exceeds the maximum size of {} bytes",
            self.max_file_size
        ))
    }

    pub async fn import(&self, filename: &str, uploaded_by: &str, data: &[u8]) -> Result<ImportReport> {
        if data.len() > self.max_file_size {
            return Err(self.too_large());
        }
        let rows = parse_schedule_csv(data)?;
        let upload = self
            .storage
            .create_upload(filename, uploaded_by, Utc::now())
            .await?;

        let total = rows.len() as i32;
        let mut processed = 0;
        let mut errors = Vec::new();

        for (row_num, parsed) in rows {
            let result = match parsed {
                Ok(row) => self.apply_row(&row).await.map_err(|e| e.message().to_string()),
                Err(msg) => Err(msg),
            };
            match result {
                Ok(()) => processed += 1,
                Err(msg) => errors.push(format!("Row {}: {}", row_num, msg)),
            }
        }

        let (status, error_message) = if errors.is_empty() {
            (UploadStatus::Completed, None)
        } else {
            (UploadStatus::Failed, Some(errors.join("; ")))
        };
        self.storage
            .finish_upload(upload.id, status, total, processed, error_message, Utc::now())
            .await?;

        if errors.is_empty() {
            info!(
                "Schedule import {} ({}): {} rows imported",
                upload.id, filename, processed
            );
        } else {
            warn!(
                "Schedule import {} ({}): {}/{} rows imported, {} errors",
                upload.id,
                filename,
                processed,
                total,
                errors.len()
            );
        }

        Ok(ImportReport {
            success: true,
            upload_id: upload.id,
            processed_classes: processed,
            total_classes: total,
            errors,
        })
    }

    /// 单行在一个事务中写入课程与时段
    async fn apply_row(&self, row: &ScheduleRow) -> Result<()> {
        let now = Utc::now();
        let txn = self.storage.get_db().begin().await?;
        let class = SeaOrmStorage::upsert_class(&txn, &row.class, now).await?;
        SeaOrmStorage::upsert_session(&txn, class.id, &row.session, now).await?;
        txn.commit().await?;
        Ok(())
    }
}
