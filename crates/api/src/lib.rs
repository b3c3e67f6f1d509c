//! JSON REST API for the CRM.
//!
//! Exposes an axum [`Router`] over a shared sea-orm connection. Transport
//! concerns (listening, tracing layers, CORS) belong to the server binary.

pub mod activities;
pub mod companies;
pub mod contacts;
pub mod deals;
pub mod email_templates;
pub mod error;
pub mod extract;
pub mod pagination;
pub mod search;
pub mod seed;
pub mod stage;
pub mod stats;
pub mod tags;
pub mod tasks;
pub mod validate;

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, put},
    Router,
};
use sea_orm::DatabaseConnection;

pub use error::{ApiError, ApiResult};
pub use seed::{seed_demo, SeededRecords};

/// Shared connection handle threaded through every handler.
pub type Db = Arc<DatabaseConnection>;

/// Build the full API router. Mount under `/api`.
pub fn api_router(db: Db) -> Router {
    Router::new()
        .route("/companies", get(companies::list).post(companies::create))
        .route(
            "/companies/{id}",
            get(companies::get_one)
                .put(companies::update)
                .delete(companies::remove),
        )
        .route("/companies/{id}/delete-preview", get(companies::delete_preview))
        .route(
            "/companies/{id}/tags",
            get(companies::list_tags).post(companies::add_tag),
        )
        .route("/companies/{id}/tags/{tag_id}", delete(companies::remove_tag))
        .route("/contacts", get(contacts::list).post(contacts::create))
        .route(
            "/contacts/{id}",
            get(contacts::get_one)
                .put(contacts::update)
                .delete(contacts::remove),
        )
        .route(
            "/contacts/{id}/tags",
            get(contacts::list_tags).post(contacts::add_tag),
        )
        .route("/deals", get(deals::list).post(deals::create))
        .route("/deals/summary", get(deals::summary))
        .route(
            "/deals/{id}",
            get(deals::get_one).put(deals::update).delete(deals::remove),
        )
        .route("/deals/{id}/stage", patch(deals::update_stage))
        .route("/deals/{id}/tags", get(deals::list_tags).post(deals::add_tag))
        .route("/deals/{id}/tags/{tag_id}", delete(deals::remove_tag))
        .route("/activities", get(activities::list).post(activities::create))
        .route(
            "/activities/{id}",
            get(activities::get_one)
                .put(activities::update)
                .delete(activities::remove),
        )
        .route("/activities/{id}/complete", patch(activities::complete))
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/tasks/{id}",
            get(tasks::get_one).put(tasks::update).delete(tasks::remove),
        )
        .route("/tasks/{id}/complete", patch(tasks::complete))
        .route("/tags", get(tags::list).post(tags::create))
        .route("/tags/{id}", put(tags::update).delete(tags::remove))
        .route(
            "/email-templates",
            get(email_templates::list).post(email_templates::create),
        )
        .route(
            "/email-templates/{id}",
            get(email_templates::get_one)
                .put(email_templates::update)
                .delete(email_templates::remove),
        )
        .route("/search", get(search::handler))
        .route("/stats", get(stats::handler))
        .with_state(db)
}
