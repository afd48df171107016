//! CSV 课表导入记录表

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CsvUploads::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CsvUploads::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CsvUploads::Filename).string().not_null())
                    .col(ColumnDef::new(CsvUploads::UploadedBy).string().not_null())
                    .col(
                        ColumnDef::new(CsvUploads::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(CsvUploads::TotalClasses)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CsvUploads::ProcessedClasses)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CsvUploads::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(CsvUploads::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CsvUploads::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CsvUploads::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CsvUploads {
    Table,
    Id,
    Filename,
    UploadedBy,
    Status,
    TotalClasses,
    ProcessedClasses,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}
