//! Completion events and user-facing notices emitted by the workspace.

use shared::{
    domain::ProjectId,
    error::{ErrorKind, ServiceError},
};

use super::draft::WorkspacePhase;

/// Identifies one dispatched call. `epoch` is the draft generation the call
/// was issued against; a completion whose epoch no longer matches is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub epoch: u64,
    pub request_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Generate,
    Refine,
    Save,
    SyncFeedback,
    Export,
    OpenProject,
    DeleteProject,
    RefreshProjects,
}

impl CallKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::Generate => "generate",
            CallKind::Refine => "refine",
            CallKind::Save => "save",
            CallKind::SyncFeedback => "sync_feedback",
            CallKind::Export => "export",
            CallKind::OpenProject => "open_project",
            CallKind::DeleteProject => "delete_project",
            CallKind::RefreshProjects => "refresh_projects",
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    PhaseChanged(WorkspacePhase),
    ContentReplaced {
        token: RequestToken,
        kind: CallKind,
    },
    ProjectBound(ProjectId),
    DraftCleared,
    ProjectsRefreshed {
        count: usize,
    },
    StaleCompletionDiscarded {
        token: RequestToken,
        kind: CallKind,
    },
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    Auth,
    Transport,
    Validation,
    Server,
}

#[derive(Debug, Clone)]
pub struct Notice {
    category: NoticeCategory,
    context: CallKind,
    message: String,
}

impl Notice {
    pub fn from_service_error(context: CallKind, err: &ServiceError) -> Self {
        let category = match err.kind {
            ErrorKind::Network => NoticeCategory::Transport,
            ErrorKind::AuthRequired => NoticeCategory::Auth,
            ErrorKind::Validation => NoticeCategory::Validation,
            ErrorKind::Server => NoticeCategory::Server,
        };
        let message = match (category, err.status) {
            (NoticeCategory::Auth, _) => {
                format!("Sign in required to {}: {}", context.as_str(), err.message)
            }
            (NoticeCategory::Transport, _) => format!(
                "Server unreachable during {}; check the connection and retry ({})",
                context.as_str(),
                err.message
            ),
            (NoticeCategory::Server, Some(status)) => {
                format!("{} failed with status {status}: {}", context.as_str(), err.message)
            }
            _ => format!("{} failed: {}", context.as_str(), err.message),
        };
        Self {
            category,
            context,
            message,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == NoticeCategory::Auth
    }

    pub fn category(&self) -> NoticeCategory {
        self.category
    }

    pub fn context(&self) -> CallKind {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
