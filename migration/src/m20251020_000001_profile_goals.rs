//! 为 profiles 添加每周/每月目标列
//!
//! SQLite 的 ALTER TABLE 每次只能加一列，所以拆成两条语句。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if !manager.has_column("profiles", "weekly_goal").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(Profiles::Table)
                        .add_column(
                            ColumnDef::new(Profiles::WeeklyGoal)
                                .integer()
                                .not_null()
                                .default(5),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_column("profiles", "monthly_goal").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(Profiles::Table)
                        .add_column(
                            ColumnDef::new(Profiles::MonthlyGoal)
                                .integer()
                                .not_null()
                                .default(20),
                        )
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Profiles::Table)
                    .drop_column(Profiles::MonthlyGoal)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Profiles::Table)
                    .drop_column(Profiles::WeeklyGoal)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    WeeklyGoal,
    MonthlyGoal,
}
