//! Task board service: mirrors projects pushed by the tick sync script and
//! serves them to the dashboard.

use std::collections::BTreeMap;

use clawarts_core::board::{SyncPayload, ThreadMessage, TickProject, TickTask};
use clawarts_core::{now_millis, CoreError};
use serde::{Deserialize, Serialize};

use crate::cache::BoardCache;
use crate::error::AppResult;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub project: String,
    pub tasks_synced: usize,
    pub tasks_removed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    pub task: TickTask,
    pub threads: Vec<ThreadMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThreadMessage {
    pub project_slug: String,
    pub tick_id: String,
    pub user_id: String,
    pub user_name: String,
    pub message: String,
}

#[derive(Clone)]
pub struct Board {
    store: Store,
    cache: BoardCache,
}

impl Board {
    pub fn new(store: Store, cache: BoardCache) -> Self {
        Self { store, cache }
    }

    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Replace a project's state with the pushed payload. Tasks missing from
    /// the payload are removed so the board mirrors the tracker file.
    pub async fn sync(&self, payload: SyncPayload) -> AppResult<SyncSummary> {
        let (project, tasks) = payload.into_parts(now_millis())?;
        let slug = project.slug.clone();

        let summary = self
            .store
            .write(|t| {
                let incoming: BTreeMap<String, TickTask> = tasks
                    .into_iter()
                    .map(|task| (task.tick_id.clone(), task))
                    .collect();
                let tasks_synced = incoming.len();

                let previous = t.tasks.insert(slug.clone(), incoming).unwrap_or_default();
                let tasks_removed = previous
                    .keys()
                    .filter(|id| !t.tasks[&slug].contains_key(*id))
                    .count();

                t.projects.insert(slug.clone(), project);

                Ok(SyncSummary {
                    project: slug.clone(),
                    tasks_synced,
                    tasks_removed,
                })
            })
            .await?;

        self.cache.invalidate_project(&summary.project).await;
        tracing::info!(
            project = %summary.project,
            tasks_synced = %summary.tasks_synced,
            tasks_removed = %summary.tasks_removed,
            "Board synced"
        );
        Ok(summary)
    }

    pub async fn projects(&self) -> Vec<TickProject> {
        if let Some(cached) = self.cache.get_projects().await {
            tracing::debug!("Cache hit for project list");
            return cached;
        }

        let seen = self.cache.generation();
        let projects: Vec<TickProject> = self
            .store
            .read(|t| t.projects.values().cloned().collect())
            .await;
        self.cache.set_projects(projects.clone(), seen).await;
        projects
    }

    /// A project with its tasks, optionally narrowed to one status
    pub async fn project_tasks(&self, slug: &str, status: Option<&str>) -> AppResult<(TickProject, Vec<TickTask>)> {
        let entry = match self.cache.get_project_tasks(slug).await {
            Some(cached) => {
                tracing::debug!(slug = %slug, "Cache hit for project tasks");
                cached
            }
            None => {
                let seen = self.cache.generation();
                let loaded = self
                    .store
                    .read(|t| {
                        t.projects
                            .get(slug)
                            .cloned()
                            .map(|project| (project, t.project_tasks(slug)))
                    })
                    .await;
                self.cache.set_project_tasks(slug, loaded.clone(), seen).await;
                loaded
            }
        };

        let (project, mut tasks) = entry.ok_or_else(|| CoreError::not_found("Project", slug))?;
        if let Some(status) = status {
            tasks.retain(|task| task.status == status);
        }
        Ok((project, tasks))
    }

    pub async fn task(&self, slug: &str, tick_id: &str) -> AppResult<TaskDetail> {
        let detail = self
            .store
            .read(|t| {
                let task = t.tasks.get(slug)?.get(tick_id)?.clone();
                let threads = t
                    .threads
                    .iter()
                    .filter(|m| m.project_slug == slug && m.tick_id == tick_id)
                    .cloned()
                    .collect();
                Some(TaskDetail { task, threads })
            })
            .await;

        detail.ok_or_else(|| CoreError::not_found("Task", format!("{}/{}", slug, tick_id)).into())
    }

    /// Append a discussion message to an existing task
    pub async fn post_thread(&self, new: NewThreadMessage) -> AppResult<ThreadMessage> {
        let missing: Vec<&str> = [
            ("projectSlug", &new.project_slug),
            ("tickId", &new.tick_id),
            ("userId", &new.user_id),
            ("message", &new.message),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(CoreError::Invalid(format!("Missing required fields: {}", missing.join(", "))).into());
        }

        self.store
            .write(|t| {
                let exists = t
                    .tasks
                    .get(&new.project_slug)
                    .is_some_and(|tasks| tasks.contains_key(&new.tick_id));
                if !exists {
                    return Err(CoreError::not_found(
                        "Task",
                        format!("{}/{}", new.project_slug, new.tick_id),
                    ));
                }

                let message = ThreadMessage {
                    project_slug: new.project_slug,
                    tick_id: new.tick_id,
                    user_id: new.user_id,
                    user_name: new.user_name,
                    message: new.message,
                    created_at: now_millis(),
                };
                t.threads.push(message.clone());
                Ok(message)
            })
            .await
    }

    /// Remove a project with its tasks and threads
    pub async fn delete_project(&self, slug: &str) -> AppResult<usize> {
        let removed = self
            .store
            .write(|t| {
                if t.projects.remove(slug).is_none() {
                    return Err(CoreError::not_found("Project", slug));
                }
                let removed = t.tasks.remove(slug).map(|tasks| tasks.len()).unwrap_or(0);
                t.threads.retain(|m| m.project_slug != slug);
                Ok(removed)
            })
            .await?;

        self.cache.invalidate_project(slug).await;
        tracing::info!(slug = %slug, tasks_removed = %removed, "Project deleted");
        Ok(removed)
    }
}
