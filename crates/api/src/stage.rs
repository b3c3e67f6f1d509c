//! Deal-stage transitions with optimistic concurrency control.
//!
//! A stage move is the one mutation in the system that two users routinely
//! race on (drag-and-drop from separate pipeline boards), so it is guarded by
//! the deal's `updated_at` acting as a version token: the client sends back
//! the timestamp it last read, and the move is rejected with a conflict when
//! the stored row has advanced past it. The stage update and its audit
//! activity commit as a single transaction.

use chrono::{DateTime, Utc};
use entity::{activity, deal};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    TransactionTrait,
};
use uuid::Uuid;

/// Maximum clock discrepancy still treated as "same version". Absorbs the
/// sub-second precision loss of timestamps round-tripped through JSON.
pub const VERSION_TOLERANCE_MS: i64 = 1_000;

pub const DEAL_MODIFIED_MESSAGE: &str =
    "Deal has been modified by another user. Please refresh and try again.";

/// Whether a client-held version token still matches the stored one.
pub fn versions_match(client: DateTime<Utc>, stored: DateTime<Utc>) -> bool {
    (client - stored).num_milliseconds().abs() <= VERSION_TOLERANCE_MS
}

/// Wire identifier of a stage, as stored in the database and shown in audit
/// titles.
pub fn stage_str(stage: deal::Stage) -> &'static str {
    match stage {
        deal::Stage::Lead => "lead",
        deal::Stage::Qualified => "qualified",
        deal::Stage::Proposal => "proposal",
        deal::Stage::Negotiation => "negotiation",
        deal::Stage::ClosedWon => "closed_won",
        deal::Stage::ClosedLost => "closed_lost",
    }
}

#[derive(Debug)]
pub enum StageMoveError {
    NotFound,
    Conflict,
    Db(DbErr),
}

impl From<DbErr> for StageMoveError {
    fn from(value: DbErr) -> Self {
        StageMoveError::Db(value)
    }
}

/// Move `deal_id` to `stage`, guarded by the `updated_at` the client last
/// read.
///
/// The read, the version check, and both writes run inside one transaction.
/// The UPDATE additionally carries an `updated_at = <value just read>`
/// predicate, so a writer that slips in between our read and our write is
/// caught by `rows_affected == 0` and reported as a conflict rather than
/// silently overwritten. Every failure path leaves the deal untouched; the
/// transaction rolls back on drop.
pub async fn transition_stage(
    db: &DatabaseConnection,
    deal_id: Uuid,
    stage: deal::Stage,
    client_updated_at: DateTime<Utc>,
) -> Result<deal::Model, StageMoveError> {
    let txn = db.begin().await?;
    let existing = deal::Entity::find_by_id(deal_id)
        .one(&txn)
        .await?
        .ok_or(StageMoveError::NotFound)?;

    let stored = existing.updated_at;
    if !versions_match(client_updated_at, stored.with_timezone(&Utc)) {
        return Err(StageMoveError::Conflict);
    }

    let from_stage = existing.stage;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = deal::Entity::update_many()
        .set(deal::ActiveModel {
            stage: Set(stage),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(deal::Column::Id.eq(deal_id))
        .filter(deal::Column::UpdatedAt.eq(stored))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(StageMoveError::Conflict);
    }

    let audit = stage_change_activity(deal_id, from_stage, stage, now);
    activity::Entity::insert(audit)
        .exec_without_returning(&txn)
        .await?;

    txn.commit().await?;

    let updated = deal::Entity::find_by_id(deal_id)
        .one(db)
        .await?
        .ok_or(StageMoveError::NotFound)?;
    Ok(updated)
}

/// The single audit row recorded for a stage change. Only ever inserted
/// inside the caller's open transaction.
pub fn stage_change_activity(
    deal_id: Uuid,
    from: deal::Stage,
    to: deal::Stage,
    timestamp: DateTimeWithTimeZone,
) -> activity::ActiveModel {
    let title = format!("단계 변경: {} → {}", stage_str(from), stage_str(to));
    activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        kind: Set(activity::Kind::Note),
        title: Set(title),
        description: Set(None),
        scheduled_at: Set(None),
        completed_at: Set(None),
        contact_id: Set(None),
        company_id: Set(None),
        deal_id: Set(Some(deal_id)),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sea_orm::{ActiveValue, DatabaseBackend, MockDatabase, MockExecResult};

    fn sample_deal(stage: deal::Stage, updated_at: DateTime<Utc>) -> deal::Model {
        deal::Model {
            id: Uuid::new_v4(),
            title: "ACME renewal".into(),
            amount: 120_000,
            stage,
            expected_close_date: None,
            contact_id: None,
            company_id: None,
            memo: None,
            created_at: updated_at.into(),
            updated_at: updated_at.into(),
        }
    }

    #[test]
    fn versions_match_within_tolerance() {
        let base = Utc::now();
        assert!(versions_match(base, base));
        assert!(versions_match(base + Duration::milliseconds(500), base));
        assert!(versions_match(base - Duration::milliseconds(1_000), base));
        assert!(versions_match(base + Duration::milliseconds(1_000), base));
    }

    #[test]
    fn versions_diverge_outside_tolerance() {
        let base = Utc::now();
        assert!(!versions_match(base + Duration::milliseconds(1_001), base));
        assert!(!versions_match(base - Duration::seconds(5), base));
    }

    #[test]
    fn audit_title_names_both_stages() {
        let audit = stage_change_activity(
            Uuid::new_v4(),
            deal::Stage::Lead,
            deal::Stage::Qualified,
            Utc::now().into(),
        );
        let ActiveValue::Set(title) = audit.title else {
            panic!("title not set");
        };
        assert!(title.contains("lead"));
        assert!(title.contains("qualified"));
        let ActiveValue::Set(kind) = audit.kind else {
            panic!("kind not set");
        };
        assert_eq!(kind, activity::Kind::Note);
    }

    #[tokio::test]
    async fn missing_deal_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<deal::Model>::new()])
            .into_connection();
        let err = transition_stage(&db, Uuid::new_v4(), deal::Stage::Qualified, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StageMoveError::NotFound));
    }

    #[tokio::test]
    async fn stale_token_conflicts_without_writing() {
        let stored_at = Utc::now();
        let existing = sample_deal(deal::Stage::Proposal, stored_at);
        // No exec results queued: any attempted write would fail the mock,
        // surfacing as a Db error instead of the expected Conflict.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .into_connection();
        let stale = stored_at - Duration::seconds(30);
        let err = transition_stage(&db, Uuid::new_v4(), deal::Stage::Qualified, stale)
            .await
            .unwrap_err();
        assert!(matches!(err, StageMoveError::Conflict));
    }

    #[tokio::test]
    async fn raced_update_is_reported_as_conflict() {
        let stored_at = Utc::now();
        let existing = sample_deal(deal::Stage::Lead, stored_at);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let err = transition_stage(&db, Uuid::new_v4(), deal::Stage::Qualified, stored_at)
            .await
            .unwrap_err();
        assert!(matches!(err, StageMoveError::Conflict));
    }

    #[tokio::test]
    async fn matching_token_moves_stage_and_returns_fresh_row() {
        let stored_at = Utc::now();
        let existing = sample_deal(deal::Stage::Lead, stored_at);
        let deal_id = existing.id;
        let mut moved = existing.clone();
        moved.stage = deal::Stage::Qualified;
        moved.updated_at = (stored_at + Duration::seconds(2)).into();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing], vec![moved]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        // Client token 400ms off the stored value: inside the tolerance.
        let client = stored_at + Duration::milliseconds(400);
        let updated = transition_stage(&db, deal_id, deal::Stage::Qualified, client)
            .await
            .unwrap();
        assert_eq!(updated.stage, deal::Stage::Qualified);
        assert!(updated.updated_at.with_timezone(&Utc) > stored_at);
    }
}
