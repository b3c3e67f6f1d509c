use axum::{extract::{Path, State}, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use entity::email_template;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::validate;
use crate::Db;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplateNode {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<email_template::Model> for EmailTemplateNode {
    fn from(model: email_template::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            subject: model.subject,
            body: model.body,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailTemplateInput {
    pub name: String,
    pub subject: String,
    pub body: String,
}

pub async fn list(State(db): State<Db>) -> ApiResult<Json<serde_json::Value>> {
    let rows = email_template::Entity::find()
        .order_by_desc(email_template::Column::UpdatedAt)
        .all(db.as_ref())
        .await?;
    let templates: Vec<EmailTemplateNode> = rows.into_iter().map(EmailTemplateNode::from).collect();
    Ok(Json(json!({ "data": templates })))
}

pub async fn create(
    State(db): State<Db>,
    ValidJson(input): ValidJson<EmailTemplateInput>,
) -> ApiResult<impl IntoResponse> {
    let name = validate::required_text("name", &input.name)?;
    let subject = validate::required_text("subject", &input.subject)?;
    let body = validate::required_text("body", &input.body)?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = email_template::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        subject: Set(subject),
        body: Set(body),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(EmailTemplateNode::from(model))))
}

pub async fn get_one(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EmailTemplateNode>> {
    let model = email_template::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Email template not found"))?;
    Ok(Json(model.into()))
}

pub async fn update(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(input): ValidJson<EmailTemplateInput>,
) -> ApiResult<Json<EmailTemplateNode>> {
    let name = validate::required_text("name", &input.name)?;
    let subject = validate::required_text("subject", &input.subject)?;
    let body = validate::required_text("body", &input.body)?;
    let existing = email_template::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Email template not found"))?;
    let mut active: email_template::ActiveModel = existing.into();
    active.name = Set(name);
    active.subject = Set(subject);
    active.body = Set(body);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db.as_ref()).await?;
    Ok(Json(updated.into()))
}

pub async fn remove(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let result = email_template::Entity::delete_by_id(id)
        .exec(db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Email template not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
