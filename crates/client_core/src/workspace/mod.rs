//! Workspace controller: sequences generation, refinement, editing, feedback,
//! persistence and the project list over a single draft.
//!
//! Controller state sits behind one async mutex that is never held across a
//! backend call. Each dispatched call captures a [`RequestToken`]; on
//! completion the result is applied only if the draft epoch still matches,
//! otherwise it is discarded. Generate and refine share one in-flight slot.

pub mod draft;
pub mod events;

use std::sync::Arc;

use shared::{
    domain::{ExportFormat, Feedback, ProjectId},
    error::ServiceError,
    protocol::{CreateProjectRequest, FeedbackUpdateRequest, ProjectRecord},
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{projects::ProjectListStore, session::CredentialProvider, DocumentService};

use self::{
    draft::{Draft, FeedbackUpdate, Mode, WorkspacePhase},
    events::{CallKind, Notice, RequestToken, WorkspaceEvent},
};

/// Content shown in place of generated text when generation fails.
pub const GENERATION_FAILED_SENTINEL: &str = "Error connecting to server.";

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("a {0} request is already in flight")]
    Busy(CallKind),
    #[error("content can only be edited in edit mode")]
    NotEditing,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl WorkspaceError {
    pub fn service(&self) -> Option<&ServiceError> {
        match self {
            WorkspaceError::Service(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of a generate/refine whose call went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The draft was reset while the call was pending; the result was dropped.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub project_id: ProjectId,
    /// False when the draft was replaced before the create call returned.
    pub bound: bool,
    pub feedback_synced: bool,
    pub list_refreshed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportedDocument {
    /// `<topic>.<ext>`, falling back to `presentation` for a blank-topic pptx
    /// and `document` otherwise. Path separators and control characters are
    /// replaced.
    pub fn file_name_for(topic: &str, format: ExportFormat) -> String {
        let stem: String = topic
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        let stem = stem.trim_matches('.');
        let stem = match (stem.is_empty(), format) {
            (false, _) => stem,
            (true, ExportFormat::Pptx) => "presentation",
            (true, _) => "document",
        };
        format!("{stem}.{}", format.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    pub phase: WorkspacePhase,
    pub draft: Draft,
}

#[derive(Debug, Clone, Copy)]
struct PendingCall {
    kind: CallKind,
    token: RequestToken,
}

struct WorkspaceState {
    draft: Draft,
    epoch: u64,
    next_request_id: u64,
    slot: Option<PendingCall>,
    last_phase: WorkspacePhase,
}

impl WorkspaceState {
    fn new() -> Self {
        Self {
            draft: Draft::default(),
            epoch: 0,
            next_request_id: 0,
            slot: None,
            last_phase: WorkspacePhase::Idle,
        }
    }

    fn issue(&mut self) -> RequestToken {
        self.next_request_id += 1;
        RequestToken {
            epoch: self.epoch,
            request_id: self.next_request_id,
        }
    }

    fn ensure_slot_free(&self, kind: CallKind) -> Result<(), WorkspaceError> {
        match self.slot {
            Some(pending) => {
                debug!(
                    requested = kind.as_str(),
                    pending = pending.kind.as_str(),
                    request_id = pending.token.request_id,
                    "dropping request while another is in flight"
                );
                Err(WorkspaceError::Busy(pending.kind))
            }
            None => Ok(()),
        }
    }

    fn occupy_slot(&mut self, kind: CallKind) -> Result<RequestToken, WorkspaceError> {
        self.ensure_slot_free(kind)?;
        let token = self.issue();
        self.slot = Some(PendingCall { kind, token });
        Ok(token)
    }

    fn release_slot(&mut self, token: RequestToken) {
        if self.slot.is_some_and(|pending| pending.token == token) {
            self.slot = None;
        }
    }

    fn replace_draft(&mut self, draft: Draft) {
        self.epoch += 1;
        self.draft = draft;
    }

    fn is_current(&self, token: RequestToken) -> bool {
        self.epoch == token.epoch
    }

    fn phase(&self) -> WorkspacePhase {
        match self.slot {
            Some(pending) if self.is_current(pending.token) => match pending.kind {
                CallKind::Refine => WorkspacePhase::Refining,
                _ => WorkspacePhase::Generating,
            },
            _ if !self.draft.has_content() => WorkspacePhase::Idle,
            _ => match self.draft.mode {
                Mode::Preview => WorkspacePhase::Ready,
                Mode::Edit => WorkspacePhase::Editing,
            },
        }
    }
}

pub struct WorkspaceController {
    service: Arc<dyn DocumentService>,
    session: Arc<dyn CredentialProvider>,
    projects: ProjectListStore,
    doc_type: ExportFormat,
    inner: Mutex<WorkspaceState>,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl WorkspaceController {
    pub fn new(
        service: Arc<dyn DocumentService>,
        session: Arc<dyn CredentialProvider>,
    ) -> Arc<Self> {
        Self::new_with_doc_type(service, session, ExportFormat::Docx)
    }

    pub fn new_with_doc_type(
        service: Arc<dyn DocumentService>,
        session: Arc<dyn CredentialProvider>,
        doc_type: ExportFormat,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            projects: ProjectListStore::new(Arc::clone(&service)),
            service,
            session,
            doc_type,
            inner: Mutex::new(WorkspaceState::new()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    pub fn projects(&self) -> &ProjectListStore {
        &self.projects
    }

    pub async fn snapshot(&self) -> WorkspaceSnapshot {
        let state = self.inner.lock().await;
        WorkspaceSnapshot {
            phase: state.phase(),
            draft: state.draft.clone(),
        }
    }

    pub async fn phase(&self) -> WorkspacePhase {
        self.inner.lock().await.phase()
    }

    pub async fn generate(&self, topic: &str) -> Result<Completion, WorkspaceError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(self.reject(CallKind::Generate, "topic must not be empty"));
        }

        let token = {
            let mut state = self.inner.lock().await;
            state.ensure_slot_free(CallKind::Generate)?;
            state.replace_draft(Draft::for_topic(topic));
            let token = state.occupy_slot(CallKind::Generate)?;
            self.publish_phase(&mut state);
            token
        };
        info!(request_id = token.request_id, epoch = token.epoch, topic, "generating draft");

        let result = self.service.generate(topic).await;

        let mut state = self.inner.lock().await;
        state.release_slot(token);
        if !state.is_current(token) {
            self.discard(&mut state, token, CallKind::Generate);
            return Ok(Completion::Discarded);
        }

        match result {
            Ok(content) => {
                state.draft.content = content;
                info!(
                    request_id = token.request_id,
                    chars = state.draft.content.len(),
                    "draft generated"
                );
                self.emit(WorkspaceEvent::ContentReplaced {
                    token,
                    kind: CallKind::Generate,
                });
                self.publish_phase(&mut state);
                Ok(Completion::Applied)
            }
            Err(err) => {
                state.draft.content = GENERATION_FAILED_SENTINEL.to_string();
                self.publish_phase(&mut state);
                Err(self.fail(CallKind::Generate, err))
            }
        }
    }

    /// No-op while the draft is empty. Returns the mode after the call.
    pub async fn toggle_mode(&self) -> Mode {
        let mut state = self.inner.lock().await;
        if state.draft.has_content() {
            state.draft.mode = state.draft.mode.toggled();
            self.publish_phase(&mut state);
        }
        state.draft.mode
    }

    /// Rejected with `Busy` while a call that will replace the content is
    /// still pending for this draft.
    pub async fn edit_content(&self, text: impl Into<String>) -> Result<(), WorkspaceError> {
        let mut state = self.inner.lock().await;
        if state.draft.mode != Mode::Edit {
            return Err(WorkspaceError::NotEditing);
        }
        if let Some(pending) = state.slot.filter(|p| state.is_current(p.token)) {
            debug!(
                pending = pending.kind.as_str(),
                request_id = pending.token.request_id,
                "dropping edit while content is being replaced"
            );
            return Err(WorkspaceError::Busy(pending.kind));
        }
        state.draft.content = text.into();
        self.publish_phase(&mut state);
        Ok(())
    }

    pub async fn refine(&self, instruction: &str) -> Result<Completion, WorkspaceError> {
        if instruction.trim().is_empty() {
            return Err(self.reject(CallKind::Refine, "refinement instruction must not be empty"));
        }

        let (token, content) = {
            let mut state = self.inner.lock().await;
            state.ensure_slot_free(CallKind::Refine)?;
            if !state.draft.has_content() {
                return Err(self.reject(CallKind::Refine, "there is no content to refine"));
            }
            state.draft.refinement_instruction = instruction.to_string();
            let token = state.occupy_slot(CallKind::Refine)?;
            self.publish_phase(&mut state);
            (token, state.draft.content.clone())
        };
        info!(request_id = token.request_id, epoch = token.epoch, "refining draft");

        let result = self.service.refine(&content, instruction).await;

        let mut state = self.inner.lock().await;
        state.release_slot(token);
        if !state.is_current(token) {
            self.discard(&mut state, token, CallKind::Refine);
            return Ok(Completion::Discarded);
        }

        match result {
            Ok(refined) => {
                state.draft.content = refined;
                state.draft.refinement_instruction.clear();
                self.emit(WorkspaceEvent::ContentReplaced {
                    token,
                    kind: CallKind::Refine,
                });
                self.publish_phase(&mut state);
                Ok(Completion::Applied)
            }
            Err(err) => {
                self.publish_phase(&mut state);
                Err(self.fail(CallKind::Refine, err))
            }
        }
    }

    pub async fn set_feedback(&self, update: FeedbackUpdate) -> Feedback {
        let mut state = self.inner.lock().await;
        update.apply(&mut state.draft.feedback);
        state.draft.feedback.clone()
    }

    /// Always creates a new project from the current draft and rebinds the
    /// draft to it; saving twice yields two projects.
    pub async fn save(&self) -> Result<SaveOutcome, WorkspaceError> {
        if !self.session.is_authenticated() {
            return Err(self.fail(
                CallKind::Save,
                ServiceError::auth_required("you must be logged in to save"),
            ));
        }

        let (token, request, feedback) = {
            let mut state = self.inner.lock().await;
            if !state.draft.has_content() {
                return Err(self.reject(CallKind::Save, "there is no content to save"));
            }
            let request = CreateProjectRequest {
                title: state.draft.topic.clone(),
                content: state.draft.content.clone(),
                doc_type: self.doc_type.as_str().to_string(),
            };
            (state.issue(), request, state.draft.feedback.clone())
        };
        debug!(request_id = token.request_id, title = %request.title, "saving draft");

        let project_id = match self.service.create_project(request).await {
            Ok(project_id) => project_id,
            Err(err) => return Err(self.fail(CallKind::Save, err)),
        };
        self.projects.invalidate().await;

        let bound = {
            let mut state = self.inner.lock().await;
            if state.is_current(token) {
                state.draft.project_id = Some(project_id);
                true
            } else {
                warn!(
                    request_id = token.request_id,
                    project_id = project_id.0,
                    "draft replaced before save completed; not binding project"
                );
                false
            }
        };
        if bound {
            info!(project_id = project_id.0, "draft saved");
            self.emit(WorkspaceEvent::ProjectBound(project_id));
        }

        let feedback_synced = if feedback.is_default() {
            true
        } else {
            match self
                .service
                .update_feedback(project_id, FeedbackUpdateRequest::from(&feedback))
                .await
            {
                Ok(()) => true,
                Err(err) => {
                    self.fail(CallKind::SyncFeedback, err);
                    false
                }
            }
        };

        let list_refreshed = self.refresh_projects_after(CallKind::Save).await;

        Ok(SaveOutcome {
            project_id,
            bound,
            feedback_synced,
            list_refreshed,
        })
    }

    pub async fn load_project(&self, project: &ProjectRecord) {
        let mut state = self.inner.lock().await;
        state.replace_draft(Draft::from_project(project));
        info!(project_id = project.id.0, epoch = state.epoch, "project loaded into workspace");
        self.publish_phase(&mut state);
    }

    /// Loads a project from the cached list by id.
    pub async fn open_project(&self, project_id: ProjectId) -> Result<ProjectRecord, WorkspaceError> {
        let Some(project) = self.projects.get(project_id).await else {
            return Err(self.reject(
                CallKind::OpenProject,
                format!("project {project_id} is not in the project list"),
            ));
        };
        self.load_project(&project).await;
        Ok(project)
    }

    /// Returns whether the open draft was cleared. A bound draft is matched by
    /// project id; an unbound one falls back to matching its topic against the
    /// deleted project's title.
    pub async fn delete_project(&self, project_id: ProjectId) -> Result<bool, WorkspaceError> {
        if !self.session.is_authenticated() {
            return Err(self.fail(
                CallKind::DeleteProject,
                ServiceError::auth_required("you must be logged in to delete projects"),
            ));
        }

        let deleted_title = self.lookup_project(project_id).await.map(|p| p.title);
        if let Err(err) = self.projects.delete(project_id).await {
            return Err(self.fail(CallKind::DeleteProject, err));
        }

        let cleared = {
            let mut state = self.inner.lock().await;
            let matches = match state.draft.project_id {
                Some(bound) => bound == project_id,
                None => deleted_title.as_deref().is_some_and(|title| {
                    !state.draft.topic.is_empty() && state.draft.topic == title
                }),
            };
            if matches {
                state.replace_draft(Draft::default());
                self.publish_phase(&mut state);
            }
            matches
        };
        if cleared {
            info!(project_id = project_id.0, "open draft cleared after delete");
            self.emit(WorkspaceEvent::DraftCleared);
        }

        self.refresh_projects_after(CallKind::DeleteProject).await;
        Ok(cleared)
    }

    pub async fn refresh_projects(&self) -> Result<Vec<ProjectRecord>, WorkspaceError> {
        match self.projects.refresh().await {
            Ok(projects) => {
                self.emit(WorkspaceEvent::ProjectsRefreshed {
                    count: projects.len(),
                });
                Ok(projects)
            }
            Err(err) => Err(self.fail(CallKind::RefreshProjects, err)),
        }
    }

    pub async fn export(&self, format: ExportFormat) -> Result<ExportedDocument, WorkspaceError> {
        let (topic, content) = {
            let state = self.inner.lock().await;
            (state.draft.topic.clone(), state.draft.content.clone())
        };
        if content.is_empty() {
            return Err(self.reject(CallKind::Export, "there is no content to export"));
        }
        debug!(format = format.as_str(), chars = content.len(), "exporting draft");

        match self.service.export(format, &content).await {
            Ok(bytes) => {
                info!(format = format.as_str(), bytes = bytes.len(), "draft exported");
                Ok(ExportedDocument {
                    format,
                    file_name: ExportedDocument::file_name_for(&topic, format),
                    bytes,
                })
            }
            Err(err) => Err(self.fail(CallKind::Export, err)),
        }
    }

    /// Cached lookup that refreshes the list once on a miss.
    async fn lookup_project(&self, project_id: ProjectId) -> Option<ProjectRecord> {
        if let Some(project) = self.projects.get(project_id).await {
            return Some(project);
        }
        if let Err(err) = self.projects.refresh().await {
            debug!(project_id = project_id.0, error = %err, "project lookup refresh failed");
            return None;
        }
        self.projects.get(project_id).await
    }

    async fn refresh_projects_after(&self, context: CallKind) -> bool {
        match self.refresh_projects().await {
            Ok(_) => true,
            Err(err) => {
                warn!(context = context.as_str(), error = %err, "project list refresh failed");
                false
            }
        }
    }

    fn discard(&self, state: &mut WorkspaceState, token: RequestToken, kind: CallKind) {
        warn!(
            kind = kind.as_str(),
            request_id = token.request_id,
            issued_epoch = token.epoch,
            current_epoch = state.epoch,
            "discarding stale completion"
        );
        self.emit(WorkspaceEvent::StaleCompletionDiscarded { token, kind });
        self.publish_phase(state);
    }

    fn reject(&self, context: CallKind, message: impl Into<String>) -> WorkspaceError {
        self.fail(context, ServiceError::validation(message))
    }

    fn fail(&self, context: CallKind, err: ServiceError) -> WorkspaceError {
        let notice = Notice::from_service_error(context, &err);
        warn!(context = context.as_str(), kind = ?err.kind, message = %err.message, "workspace call failed");
        self.emit(WorkspaceEvent::Notice(notice));
        WorkspaceError::Service(err)
    }

    fn publish_phase(&self, state: &mut WorkspaceState) {
        let phase = state.phase();
        if phase != state.last_phase {
            state.last_phase = phase;
            self.emit(WorkspaceEvent::PhaseChanged(phase));
        }
    }

    fn emit(&self, event: WorkspaceEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "../tests/workspace_tests.rs"]
mod tests;
