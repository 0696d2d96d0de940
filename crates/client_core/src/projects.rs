//! Read-through cache of the signed-in user's projects.
//!
//! The cache is only ever replaced wholesale by a successful `refresh`; local
//! mutations never patch it. A mutation that succeeded remotely marks the
//! cache stale until the next refresh lands.

use std::sync::Arc;

use shared::{domain::ProjectId, protocol::ProjectRecord};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{DocumentService, ServiceResult};

#[derive(Default)]
struct ProjectCache {
    projects: Vec<ProjectRecord>,
    stale: bool,
    /// Refreshes issued at or before this sequence predate the last mutation.
    stale_since: u64,
    issued_refreshes: u64,
    applied_refresh: u64,
}

pub struct ProjectListStore {
    service: Arc<dyn DocumentService>,
    cache: RwLock<ProjectCache>,
}

impl ProjectListStore {
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self {
            service,
            cache: RwLock::new(ProjectCache::default()),
        }
    }

    /// Re-queries the backend and swaps the whole list. When two refreshes
    /// overlap, a response older than the one already applied is dropped.
    pub async fn refresh(&self) -> ServiceResult<Vec<ProjectRecord>> {
        let seq = {
            let mut cache = self.cache.write().await;
            cache.issued_refreshes += 1;
            cache.issued_refreshes
        };

        let projects = self.service.list_projects().await?;

        let mut cache = self.cache.write().await;
        if seq > cache.applied_refresh {
            cache.applied_refresh = seq;
            cache.projects = projects;
            if seq > cache.stale_since {
                cache.stale = false;
            }
            info!(count = cache.projects.len(), "project list refreshed");
        } else {
            debug!(seq, applied = cache.applied_refresh, "dropping out-of-order project list");
        }
        Ok(cache.projects.clone())
    }

    pub async fn projects(&self) -> Vec<ProjectRecord> {
        self.cache.read().await.projects.clone()
    }

    pub async fn get(&self, project_id: ProjectId) -> Option<ProjectRecord> {
        self.cache
            .read()
            .await
            .projects
            .iter()
            .find(|project| project.id == project_id)
            .cloned()
    }

    pub async fn find_by_title(&self, title: &str) -> Option<ProjectRecord> {
        self.cache
            .read()
            .await
            .projects
            .iter()
            .find(|project| project.title == title)
            .cloned()
    }

    pub async fn is_stale(&self) -> bool {
        self.cache.read().await.stale
    }

    /// Marks the list stale. Only a refresh issued after this call clears it.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.stale = true;
        cache.stale_since = cache.issued_refreshes;
    }

    /// Deletes remotely and invalidates the cache; the caller decides when to
    /// refresh.
    pub async fn delete(&self, project_id: ProjectId) -> ServiceResult<()> {
        self.service.delete_project(project_id).await?;
        info!(project_id = project_id.0, "project deleted");
        self.invalidate().await;
        Ok(())
    }

    /// Drops everything, e.g. on sign-out. In-flight refreshes issued before
    /// the clear are ignored when they land.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.projects.clear();
        cache.stale = false;
        cache.applied_refresh = cache.issued_refreshes;
    }
}

#[cfg(test)]
#[path = "tests/projects_tests.rs"]
mod tests;
