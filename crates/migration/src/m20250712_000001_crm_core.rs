use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    Name,
    Industry,
    Website,
    Address,
    EmployeeCount,
    Memo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Contacts {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Position,
    CompanyId,
    Memo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Deals {
    Table,
    Id,
    Title,
    Amount,
    Stage,
    ExpectedCloseDate,
    ContactId,
    CompanyId,
    Memo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Activities {
    Table,
    Id,
    Type,
    Title,
    Description,
    ScheduledAt,
    CompletedAt,
    ContactId,
    CompanyId,
    DealId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    Title,
    Description,
    DueDate,
    Priority,
    IsCompleted,
    ContactId,
    CompanyId,
    DealId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DealStageEnum {
    #[sea_orm(iden = "deal_stage")]
    Table,
}

#[derive(DeriveIden)]
enum ActivityTypeEnum {
    #[sea_orm(iden = "activity_type")]
    Table,
}

#[derive(DeriveIden)]
enum PriorityEnum {
    #[sea_orm(iden = "priority")]
    Table,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

const DEAL_STAGE_VALUES: &[&str] = &[
    "lead",
    "qualified",
    "proposal",
    "negotiation",
    "closed_won",
    "closed_lost",
];
const ACTIVITY_TYPE_VALUES: &[&str] = &["call", "email", "meeting", "note"];
const PRIORITY_VALUES: &[&str] = &["low", "medium", "high"];

fn create_enum_sql(name: &str, values: &[&str]) -> String {
    format!(
        "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = '{}') THEN CREATE TYPE {} AS ENUM ({}); END IF; END $$;",
        name,
        name,
        values
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        conn.execute_unprepared(&create_enum_sql("deal_stage", DEAL_STAGE_VALUES))
            .await?;
        conn.execute_unprepared(&create_enum_sql("activity_type", ACTIVITY_TYPE_VALUES))
            .await?;
        conn.execute_unprepared(&create_enum_sql("priority", PRIORITY_VALUES))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Companies::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Companies::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Companies::Industry).string_len(100))
                    .col(ColumnDef::new(Companies::Website).string_len(255))
                    .col(ColumnDef::new(Companies::Address).text())
                    .col(ColumnDef::new(Companies::EmployeeCount).integer())
                    .col(ColumnDef::new(Companies::Memo).text())
                    .col(
                        ColumnDef::new(Companies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Companies::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_companies_name")
                    .table(Companies::Table)
                    .col(Companies::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contacts::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Contacts::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Contacts::Email).string_len(255))
                    .col(ColumnDef::new(Contacts::Phone).string_len(50))
                    .col(ColumnDef::new(Contacts::Position).string_len(100))
                    .col(ColumnDef::new(Contacts::CompanyId).uuid())
                    .col(ColumnDef::new(Contacts::Memo).text())
                    .col(
                        ColumnDef::new(Contacts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Contacts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_company")
                            .from(Contacts::Table, Contacts::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_contacts_name", Contacts::Name),
            ("idx_contacts_email", Contacts::Email),
            ("idx_contacts_company_id", Contacts::CompanyId),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Contacts::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Deals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Deals::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Deals::Title).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Deals::Amount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Deals::Stage)
                            .custom(DealStageEnum::Table)
                            .not_null()
                            .default(Expr::cust("'lead'::deal_stage")),
                    )
                    .col(ColumnDef::new(Deals::ExpectedCloseDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Deals::ContactId).uuid())
                    .col(ColumnDef::new(Deals::CompanyId).uuid())
                    .col(ColumnDef::new(Deals::Memo).text())
                    .col(
                        ColumnDef::new(Deals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Deals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_contact")
                            .from(Deals::Table, Deals::ContactId)
                            .to(Contacts::Table, Contacts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_company")
                            .from(Deals::Table, Deals::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_deals_title", Deals::Title),
            ("idx_deals_stage", Deals::Stage),
            ("idx_deals_contact_id", Deals::ContactId),
            ("idx_deals_company_id", Deals::CompanyId),
            ("idx_deals_expected_close_date", Deals::ExpectedCloseDate),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Deals::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Activities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Activities::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(Activities::Type)
                            .custom(ActivityTypeEnum::Table)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Activities::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Activities::Description).text())
                    .col(ColumnDef::new(Activities::ScheduledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Activities::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Activities::ContactId).uuid())
                    .col(ColumnDef::new(Activities::CompanyId).uuid())
                    .col(ColumnDef::new(Activities::DealId).uuid())
                    .col(
                        ColumnDef::new(Activities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Activities::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_contact")
                            .from(Activities::Table, Activities::ContactId)
                            .to(Contacts::Table, Contacts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_company")
                            .from(Activities::Table, Activities::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_deal")
                            .from(Activities::Table, Activities::DealId)
                            .to(Deals::Table, Deals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Every activity must hang off at least one parent record.
        conn.execute_unprepared(
            "ALTER TABLE activities ADD CONSTRAINT chk_activity_has_parent \
             CHECK (contact_id IS NOT NULL OR company_id IS NOT NULL OR deal_id IS NOT NULL);",
        )
        .await?;

        for (name, col) in [
            ("idx_activities_type", Activities::Type),
            ("idx_activities_scheduled_at", Activities::ScheduledAt),
            ("idx_activities_contact_id", Activities::ContactId),
            ("idx_activities_company_id", Activities::CompanyId),
            ("idx_activities_deal_id", Activities::DealId),
            ("idx_activities_created_at", Activities::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Activities::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tasks::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Tasks::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(ColumnDef::new(Tasks::DueDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .custom(PriorityEnum::Table)
                            .not_null()
                            .default(Expr::cust("'medium'::priority")),
                    )
                    .col(
                        ColumnDef::new(Tasks::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Tasks::ContactId).uuid())
                    .col(ColumnDef::new(Tasks::CompanyId).uuid())
                    .col(ColumnDef::new(Tasks::DealId).uuid())
                    .col(
                        ColumnDef::new(Tasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Tasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_contact")
                            .from(Tasks::Table, Tasks::ContactId)
                            .to(Contacts::Table, Contacts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_company")
                            .from(Tasks::Table, Tasks::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_deal")
                            .from(Tasks::Table, Tasks::DealId)
                            .to(Deals::Table, Deals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_tasks_priority", Tasks::Priority),
            ("idx_tasks_due_date", Tasks::DueDate),
            ("idx_tasks_is_completed", Tasks::IsCompleted),
            ("idx_tasks_contact_id", Tasks::ContactId),
            ("idx_tasks_company_id", Tasks::CompanyId),
            ("idx_tasks_deal_id", Tasks::DealId),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Tasks::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contacts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;
        let conn = manager.get_connection();
        conn.execute_unprepared("DROP TYPE IF EXISTS priority;").await?;
        conn.execute_unprepared("DROP TYPE IF EXISTS activity_type;")
            .await?;
        conn.execute_unprepared("DROP TYPE IF EXISTS deal_stage;").await?;
        Ok(())
    }
}
