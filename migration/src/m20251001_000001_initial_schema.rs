//! 初始表结构
//!
//! 创建档案、通行证、支付、积分流水、课程、时段和预约表。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // profiles
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Profiles::Email).string().not_null())
                    .col(ColumnDef::new(Profiles::FirstName).string().null())
                    .col(ColumnDef::new(Profiles::LastName).string().null())
                    .col(ColumnDef::new(Profiles::PhoneNumber).string_len(32).null())
                    .col(
                        ColumnDef::new(Profiles::WaiverAccepted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Profiles::WaiverAcceptedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Profiles::StripeCustomerId).string().null())
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // passes
        manager
            .create_table(
                Table::create()
                    .table(Passes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Passes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Passes::Name).string().not_null())
                    .col(ColumnDef::new(Passes::Description).text().null())
                    .col(ColumnDef::new(Passes::Credits).integer().not_null())
                    .col(
                        ColumnDef::new(Passes::Unlimited)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Passes::ValidityDays).integer().null())
                    .col(ColumnDef::new(Passes::StripePriceId).string().not_null())
                    .col(
                        ColumnDef::new(Passes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Passes::PriceCents).integer().null())
                    .col(ColumnDef::new(Passes::Currency).string_len(3).null())
                    .to_owned(),
            )
            .await?;

        // purchases
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Purchases::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(Purchases::PassId).integer().not_null())
                    .col(
                        ColumnDef::new(Purchases::PaymentReference)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Purchases::PurchasedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_purchases_user_id")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .to_owned(),
            )
            .await?;

        // credit_ledger
        manager
            .create_table(
                Table::create()
                    .table(CreditLedger::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditLedger::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CreditLedger::UserId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditLedger::PassId).integer().null())
                    .col(ColumnDef::new(CreditLedger::Delta).integer().not_null())
                    .col(
                        ColumnDef::new(CreditLedger::Reason)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditLedger::RefId).integer().null())
                    .col(
                        ColumnDef::new(CreditLedger::IdempotencyKey)
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(CreditLedger::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_credit_ledger_user_id")
                    .table(CreditLedger::Table)
                    .col(CreditLedger::UserId)
                    .to_owned(),
            )
            .await?;

        // classes
        manager
            .create_table(
                Table::create()
                    .table(Classes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Classes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Classes::ClassName)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Classes::Description).text().null())
                    .col(ColumnDef::new(Classes::Instructor).string().not_null())
                    .col(
                        ColumnDef::new(Classes::Level)
                            .string_len(32)
                            .not_null()
                            .default("All Levels"),
                    )
                    .col(ColumnDef::new(Classes::TemperatureCel).integer().null())
                    .col(
                        ColumnDef::new(Classes::DurationMinute)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(
                        ColumnDef::new(Classes::MaxCapacity)
                            .integer()
                            .not_null()
                            .default(24),
                    )
                    .col(
                        ColumnDef::new(Classes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Classes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Classes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // class_sessions
        manager
            .create_table(
                Table::create()
                    .table(ClassSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClassSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClassSessions::ClassId).integer().not_null())
                    .col(
                        ColumnDef::new(ClassSessions::DayOfWeek)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClassSessions::StartTime).time().not_null())
                    .col(ColumnDef::new(ClassSessions::EndTime).time().not_null())
                    .col(
                        ColumnDef::new(ClassSessions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ClassSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassSessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_class_sessions_class_id")
                            .from(ClassSessions::Table, ClassSessions::ClassId)
                            .to(Classes::Table, Classes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 时段 upsert 的冲突目标
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_class_sessions_slot")
                    .table(ClassSessions::Table)
                    .col(ClassSessions::ClassId)
                    .col(ClassSessions::DayOfWeek)
                    .col(ClassSessions::StartTime)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // bookings
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(Bookings::ClassId).integer().not_null())
                    .col(ColumnDef::new(Bookings::SessionId).integer().not_null())
                    .col(ColumnDef::new(Bookings::BookingDate).date().not_null())
                    .col(
                        ColumnDef::new(Bookings::BookedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreditsCharged)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Bookings::CancelledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Bookings::CancelledByUser).boolean().null())
                    .col(
                        ColumnDef::new(Bookings::CreditRefunded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Bookings::ActiveSlot)
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        // 容量统计按 (session_id, booking_date) 查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bookings_session_date")
                    .table(Bookings::Table)
                    .col(Bookings::SessionId)
                    .col(Bookings::BookingDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bookings_user_id")
                    .table(Bookings::Table)
                    .col(Bookings::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Classes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CreditLedger::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Passes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Email,
    FirstName,
    LastName,
    PhoneNumber,
    WaiverAccepted,
    WaiverAcceptedAt,
    StripeCustomerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Passes {
    Table,
    Id,
    Name,
    Description,
    Credits,
    Unlimited,
    ValidityDays,
    StripePriceId,
    IsActive,
    PriceCents,
    Currency,
}

#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    UserId,
    PassId,
    PaymentReference,
    PurchasedAt,
}

#[derive(DeriveIden)]
enum CreditLedger {
    #[sea_orm(iden = "credit_ledger")]
    Table,
    Id,
    UserId,
    PassId,
    Delta,
    Reason,
    RefId,
    IdempotencyKey,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Classes {
    Table,
    Id,
    ClassName,
    Description,
    Instructor,
    Level,
    TemperatureCel,
    DurationMinute,
    MaxCapacity,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ClassSessions {
    Table,
    Id,
    ClassId,
    DayOfWeek,
    StartTime,
    EndTime,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    UserId,
    ClassId,
    SessionId,
    BookingDate,
    BookedAt,
    CreditsCharged,
    CancelledAt,
    CancelledByUser,
    CreditRefunded,
    ActiveSlot,
}
