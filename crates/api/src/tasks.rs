use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use entity::task;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::pagination::{self, Page, Pagination};
use crate::validate;
use crate::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl From<task::Priority> for TaskPriority {
    fn from(value: task::Priority) -> Self {
        match value {
            task::Priority::Low => TaskPriority::Low,
            task::Priority::Medium => TaskPriority::Medium,
            task::Priority::High => TaskPriority::High,
        }
    }
}

impl From<TaskPriority> for task::Priority {
    fn from(value: TaskPriority) -> Self {
        match value {
            TaskPriority::Low => task::Priority::Low,
            TaskPriority::Medium => task::Priority::Medium,
            TaskPriority::High => task::Priority::High,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNode {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub is_completed: bool,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<task::Model> for TaskNode {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            due_date: model.due_date.map(Into::into),
            priority: model.priority.into(),
            is_completed: model.is_completed,
            contact_id: model.contact_id,
            company_id: model.company_id,
            deal_id: model.deal_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    pub is_completed: Option<bool>,
    pub priority: Option<TaskPriority>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn list(
    State(db): State<Db>,
    Query(params): Query<TaskListParams>,
) -> ApiResult<Json<Page<TaskNode>>> {
    let (page, limit) = pagination::resolve(params.page, params.limit);
    let mut query = task::Entity::find().order_by_desc(task::Column::CreatedAt);
    if let Some(is_completed) = params.is_completed {
        query = query.filter(task::Column::IsCompleted.eq(is_completed));
    }
    if let Some(priority) = params.priority {
        query = query.filter(task::Column::Priority.eq(task::Priority::from(priority)));
    }
    if let Some(contact_id) = params.contact_id {
        query = query.filter(task::Column::ContactId.eq(contact_id));
    }
    if let Some(company_id) = params.company_id {
        query = query.filter(task::Column::CompanyId.eq(company_id));
    }
    if let Some(deal_id) = params.deal_id {
        query = query.filter(task::Column::DealId.eq(deal_id));
    }
    let total = query.clone().count(db.as_ref()).await?;
    let rows = query
        .limit(limit)
        .offset((page - 1) * limit)
        .all(db.as_ref())
        .await?;
    Ok(Json(Page {
        data: rows.into_iter().map(TaskNode::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn create(
    State(db): State<Db>,
    ValidJson(input): ValidJson<TaskInput>,
) -> ApiResult<impl IntoResponse> {
    let title = validate::required_text("title", &input.title)?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(validate::optional_text(input.description)),
        due_date: Set(input.due_date.map(Into::into)),
        priority: Set(input.priority.unwrap_or(TaskPriority::Medium).into()),
        is_completed: Set(false),
        contact_id: Set(input.contact_id),
        company_id: Set(input.company_id),
        deal_id: Set(input.deal_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(TaskNode::from(model))))
}

pub async fn get_one(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<Json<TaskNode>> {
    let model = task::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;
    Ok(Json(model.into()))
}

pub async fn update(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(input): ValidJson<TaskInput>,
) -> ApiResult<Json<TaskNode>> {
    let title = validate::required_text("title", &input.title)?;
    let existing = task::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;
    let mut active: task::ActiveModel = existing.into();
    active.title = Set(title);
    active.description = Set(validate::optional_text(input.description));
    active.due_date = Set(input.due_date.map(Into::into));
    active.priority = Set(input.priority.unwrap_or(TaskPriority::Medium).into());
    active.contact_id = Set(input.contact_id);
    active.company_id = Set(input.company_id);
    active.deal_id = Set(input.deal_id);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db.as_ref()).await?;
    Ok(Json(updated.into()))
}

pub async fn remove(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let result = task::Entity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Task not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Flips `is_completed`, so a second call re-opens the task.
pub async fn complete(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<Json<TaskNode>> {
    let existing = task::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;
    let toggled = !existing.is_completed;
    let mut active: task::ActiveModel = existing.into();
    active.is_completed = Set(toggled);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db.as_ref()).await?;
    Ok(Json(updated.into()))
}
