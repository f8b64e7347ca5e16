//! Task board models mirrored from `TICK.md` trackers
//!
//! The sync script pushes a whole project at once. Its task payloads come in
//! either snake_case (straight from the file) or camelCase, so the incoming
//! types accept both spellings and [`SyncPayload::into_parts`] normalises
//! them into stored rows.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::Millis;

pub const STATUS_DONE: &str = "done";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_BLOCKED: &str = "blocked";

const DEFAULT_SCHEMA_VERSION: &str = "1.0";
const DEFAULT_PRIORITY: &str = "medium";

// =============================================================================
// Stored rows
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "working_on")]
    pub working_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickProject {
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema_version: String,
    pub task_count: usize,
    pub done_count: usize,
    pub in_progress_count: usize,
    pub blocked_count: usize,
    pub agents: Vec<Agent>,
    pub last_synced_at: Millis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: String,
    pub who: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickTask {
    pub project_slug: String,
    pub tick_id: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub tags: Vec<String>,
    pub depends_on: Vec<String>,
    pub blocks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
}

/// A community discussion message attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    pub project_slug: String,
    pub tick_id: String,
    pub user_id: String,
    pub user_name: String,
    pub message: String,
    pub created_at: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub blocked: usize,
}

impl StatusCounts {
    pub fn of<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.total += 1;
            match status {
                STATUS_DONE => counts.done += 1,
                STATUS_IN_PROGRESS => counts.in_progress += 1,
                STATUS_BLOCKED => counts.blocked += 1,
                _ => {}
            }
        }
        counts
    }
}

// =============================================================================
// Incoming sync payload
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingProject {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "schema_version")]
    pub schema_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingTask {
    #[serde(alias = "id")]
    pub tick_id: String,
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, alias = "assigned_to")]
    pub assigned_to: Option<String>,
    #[serde(default, alias = "claimed_by")]
    pub claimed_by: Option<String>,
    #[serde(default, alias = "created_by")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "depends_on")]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncPayload {
    #[serde(default)]
    pub project: Option<IncomingProject>,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub tasks: Vec<IncomingTask>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl SyncPayload {
    /// Normalise into the project row and its task rows
    pub fn into_parts(self, now: Millis) -> CoreResult<(TickProject, Vec<TickTask>)> {
        let project = self.project.unwrap_or_default();
        let slug = non_empty(project.slug)
            .ok_or_else(|| CoreError::Invalid("Missing project.slug".to_string()))?;

        let iso_now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let tasks: Vec<TickTask> = self
            .tasks
            .into_iter()
            .map(|t| TickTask {
                project_slug: slug.clone(),
                tick_id: t.tick_id,
                title: t.title,
                status: t.status,
                priority: non_empty(t.priority).unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
                assigned_to: t.assigned_to,
                claimed_by: t.claimed_by,
                created_by: t.created_by,
                tags: t.tags,
                depends_on: t.depends_on,
                blocks: t.blocks,
                description: Some(t.description.unwrap_or_default()),
                history: t.history,
                created_at: non_empty(t.created_at).unwrap_or_else(|| iso_now.clone()),
                updated_at: non_empty(t.updated_at).unwrap_or_else(|| iso_now.clone()),
            })
            .collect();

        let counts = StatusCounts::of(tasks.iter().map(|t| t.status.as_str()));
        let project = TickProject {
            name: non_empty(project.name).unwrap_or_else(|| slug.clone()),
            slug,
            description: project.description,
            schema_version: non_empty(project.schema_version)
                .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string()),
            task_count: counts.total,
            done_count: counts.done,
            in_progress_count: counts.in_progress,
            blocked_count: counts.blocked,
            agents: self.agents,
            last_synced_at: now,
        };

        Ok((project, tasks))
    }
}
