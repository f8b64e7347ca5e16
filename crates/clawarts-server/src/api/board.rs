use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderMap,
    Json,
};
use std::time::Instant;

use clawarts_core::board::{SyncPayload, ThreadMessage, TickProject};

use super::auth::require_sync_key;
use super::dto::*;
use crate::board::{NewThreadMessage, TaskDetail};
use crate::error::{AppError, AppResult};
use crate::AppState;

fn required(value: Option<String>, name: &str) -> AppResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing ?{}= parameter", name)))
}

pub async fn post_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SyncPayload>, JsonRejection>,
) -> AppResult<Json<SyncResponse>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/tick/sync");

    if let Err(e) = require_sync_key(&headers, &state.config.board) {
        println!("[RESPONSE] POST /api/tick/sync -> 401 Unauthorized");
        return Err(e);
    }
    let Json(payload) = payload?;
    tracing::info!(
        agents = %payload.agents.len(),
        tasks = %payload.tasks.len(),
        "Processing board sync"
    );

    let summary = state.board.sync(payload).await?;

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] POST /api/tick/sync -> 200 OK ({}ms) project={} synced={} removed={}",
        duration, summary.project, summary.tasks_synced, summary.tasks_removed
    );
    Ok(Json(SyncResponse {
        ok: true,
        project: summary.project,
        tasks_synced: summary.tasks_synced,
        tasks_removed: summary.tasks_removed,
    }))
}

pub async fn get_projects(State(state): State<AppState>) -> Json<Vec<TickProject>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/tick/projects");

    let projects = state.board.projects().await;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /api/tick/projects -> 200 OK ({}ms) count={}", duration, projects.len());
    tracing::debug!(duration_ms = %duration, count = %projects.len(), "Projects listed");
    Json(projects)
}

pub async fn get_tasks(
    State(state): State<AppState>,
    query: Result<Query<TasksQuery>, QueryRejection>,
) -> AppResult<Json<ProjectTasksResponse>> {
    let start = Instant::now();
    let Query(query) = query?;
    let slug = required(query.slug, "slug")?;
    println!("[REQUEST] GET /api/tick/tasks?slug={}", slug);

    let status = query.status.filter(|s| !s.is_empty());
    let (project, tasks) = state.board.project_tasks(&slug, status.as_deref()).await?;

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] GET /api/tick/tasks?slug={} -> 200 OK ({}ms) tasks={}",
        slug,
        duration,
        tasks.len()
    );
    tracing::debug!(
        slug = %slug,
        status = ?status,
        tasks = %tasks.len(),
        duration_ms = %duration,
        "Project tasks listed"
    );
    Ok(Json(ProjectTasksResponse { project, tasks }))
}

pub async fn get_task(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> AppResult<Json<TaskDetail>> {
    let Query(query) = query?;
    let slug = required(query.slug, "slug")?;
    let tick_id = required(query.tick_id, "tickId")?;
    println!("[REQUEST] GET /api/tick/task?slug={}&tickId={}", slug, tick_id);

    let detail = state.board.task(&slug, &tick_id).await?;
    Ok(Json(detail))
}

pub async fn post_thread(
    State(state): State<AppState>,
    payload: Result<Json<NewThreadMessage>, JsonRejection>,
) -> AppResult<Json<ThreadMessage>> {
    println!("[REQUEST] POST /api/tick/threads");
    let Json(req) = payload?;

    let message = state.board.post_thread(req).await?;
    tracing::info!(
        project = %message.project_slug,
        tick_id = %message.tick_id,
        user_id = %message.user_id,
        "Thread message posted"
    );
    Ok(Json(message))
}

pub async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> AppResult<Json<DeleteProjectResponse>> {
    println!("[REQUEST] DELETE /api/tick/projects/{}", slug);
    require_sync_key(&headers, &state.config.board)?;

    let tasks_removed = state.board.delete_project(&slug).await?;
    println!("[RESPONSE] DELETE /api/tick/projects/{} -> 200 OK removed={}", slug, tasks_removed);
    Ok(Json(DeleteProjectResponse {
        ok: true,
        tasks_removed,
    }))
}
