use axum::{extract::State, Json};
use entity::{activity, company, contact, deal, task};
use sea_orm::{
    ColumnTrait, DatabaseBackend, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    Statement,
};
use serde::Serialize;
use serde_json::json;

use crate::deals::DealStage;
use crate::error::ApiResult;
use crate::stage::stage_str;
use crate::Db;

#[derive(Debug, FromQueryResult)]
struct StageTotalsRow {
    stage: String,
    count: i64,
    total_amount: i64,
}

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    count: i64,
    total_amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DealTotals {
    count: i64,
    total_amount: i64,
}

impl From<TotalsRow> for DealTotals {
    fn from(row: TotalsRow) -> Self {
        Self {
            count: row.count,
            total_amount: row.total_amount,
        }
    }
}

fn totals_stmt(sql: &str) -> Statement {
    Statement::from_string(DatabaseBackend::Postgres, sql.to_string())
}

/// Dashboard aggregates: entity counts, per-stage deal totals, open pipeline
/// value, and pending work counts.
pub async fn handler(State(db): State<Db>) -> ApiResult<Json<serde_json::Value>> {
    let contacts = contact::Entity::find().count(db.as_ref()).await?;
    let companies = company::Entity::find().count(db.as_ref()).await?;

    let by_stage_rows = StageTotalsRow::find_by_statement(totals_stmt(
        "SELECT stage::text AS stage, COUNT(*)::bigint AS count, \
         COALESCE(SUM(amount), 0)::bigint AS total_amount FROM deals GROUP BY stage",
    ))
    .all(db.as_ref())
    .await?;

    let total = TotalsRow::find_by_statement(totals_stmt(
        "SELECT COUNT(*)::bigint AS count, COALESCE(SUM(amount), 0)::bigint AS total_amount \
         FROM deals",
    ))
    .one(db.as_ref())
    .await?
    .unwrap_or(TotalsRow {
        count: 0,
        total_amount: 0,
    });

    let active = TotalsRow::find_by_statement(totals_stmt(
        "SELECT COUNT(*)::bigint AS count, COALESCE(SUM(amount), 0)::bigint AS total_amount \
         FROM deals WHERE stage IN ('lead', 'qualified', 'proposal', 'negotiation')",
    ))
    .one(db.as_ref())
    .await?
    .unwrap_or(TotalsRow {
        count: 0,
        total_amount: 0,
    });

    let won_this_month = TotalsRow::find_by_statement(totals_stmt(
        "SELECT COUNT(*)::bigint AS count, COALESCE(SUM(amount), 0)::bigint AS total_amount \
         FROM deals WHERE stage = 'closed_won' AND updated_at >= date_trunc('month', now())",
    ))
    .one(db.as_ref())
    .await?
    .unwrap_or(TotalsRow {
        count: 0,
        total_amount: 0,
    });

    let pending_activities = activity::Entity::find()
        .filter(activity::Column::CompletedAt.is_null())
        .count(db.as_ref())
        .await?;

    #[derive(Debug, FromQueryResult)]
    struct CountRow {
        count: i64,
    }
    let today_activities = CountRow::find_by_statement(totals_stmt(
        "SELECT COUNT(*)::bigint AS count FROM activities \
         WHERE scheduled_at >= date_trunc('day', now()) \
         AND scheduled_at < date_trunc('day', now()) + interval '1 day'",
    ))
    .one(db.as_ref())
    .await?
    .map(|row| row.count)
    .unwrap_or(0);

    let pending_tasks = task::Entity::find()
        .filter(task::Column::IsCompleted.eq(false))
        .count(db.as_ref())
        .await?;

    let mut by_stage = serde_json::Map::new();
    for stage in [
        DealStage::Lead,
        DealStage::Qualified,
        DealStage::Proposal,
        DealStage::Negotiation,
        DealStage::ClosedWon,
        DealStage::ClosedLost,
    ] {
        by_stage.insert(
            stage_str(stage.into()).to_string(),
            json!({ "count": 0, "totalAmount": 0 }),
        );
    }
    for row in by_stage_rows {
        by_stage.insert(
            row.stage,
            json!({ "count": row.count, "totalAmount": row.total_amount }),
        );
    }

    Ok(Json(json!({
        "contacts": contacts,
        "companies": companies,
        "deals": {
            "total": DealTotals::from(total),
            "active": DealTotals::from(active),
            "wonThisMonth": DealTotals::from(won_this_month),
            "byStage": by_stage,
        },
        "pendingActivities": pending_activities,
        "todayActivities": today_activities,
        "pendingTasks": pending_tasks,
    })))
}
