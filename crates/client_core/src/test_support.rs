//! Scripted in-memory `DocumentService` for controller and store tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{ExportFormat, ProjectId},
    error::ServiceError,
    protocol::{CreateProjectRequest, FeedbackUpdateRequest, ProjectRecord},
};
use tokio::sync::oneshot;

use crate::{DocumentService, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Call {
    Generate,
    Refine,
    Export,
    ListProjects,
    CreateProject,
    UpdateFeedback,
    DeleteProject,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    generate_results: VecDeque<ServiceResult<String>>,
    refine_results: VecDeque<ServiceResult<String>>,
    failures: HashMap<Call, VecDeque<ServiceError>>,
    gates: HashMap<Call, VecDeque<oneshot::Receiver<()>>>,
    projects: Vec<ProjectRecord>,
    next_id: i64,
    feedback_updates: Vec<(ProjectId, FeedbackUpdateRequest)>,
    refine_inputs: Vec<(String, String)>,
    export_inputs: Vec<(ExportFormat, String)>,
}

#[derive(Default)]
pub(crate) struct FakeDocumentService {
    state: Mutex<FakeState>,
}

impl FakeDocumentService {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    pub(crate) fn push_generate(&self, result: ServiceResult<String>) {
        self.with_state(|s| s.generate_results.push_back(result));
    }

    pub(crate) fn push_refine(&self, result: ServiceResult<String>) {
        self.with_state(|s| s.refine_results.push_back(result));
    }

    pub(crate) fn fail_next(&self, call: Call, err: ServiceError) {
        self.with_state(|s| s.failures.entry(call).or_default().push_back(err));
    }

    /// The next `call` blocks until the returned sender fires (or is dropped).
    pub(crate) fn hold_next(&self, call: Call) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.with_state(|s| s.gates.entry(call).or_default().push_back(rx));
        tx
    }

    pub(crate) fn seed_project(&self, title: &str, content: &str) -> ProjectRecord {
        self.with_state(|s| {
            s.next_id += 1;
            let record = ProjectRecord {
                id: ProjectId(s.next_id),
                title: title.to_string(),
                content: content.to_string(),
                doc_type: "docx".to_string(),
                is_liked: None,
                is_disliked: None,
                user_notes: None,
            };
            s.projects.push(record.clone());
            record
        })
    }

    pub(crate) fn call_count(&self, call: Call) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| **c == call).count())
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.with_state(|s| s.calls.len())
    }

    pub(crate) fn stored_projects(&self) -> Vec<ProjectRecord> {
        self.with_state(|s| s.projects.clone())
    }

    pub(crate) fn feedback_updates(&self) -> Vec<(ProjectId, FeedbackUpdateRequest)> {
        self.with_state(|s| s.feedback_updates.clone())
    }

    pub(crate) fn refine_inputs(&self) -> Vec<(String, String)> {
        self.with_state(|s| s.refine_inputs.clone())
    }

    pub(crate) fn export_inputs(&self) -> Vec<(ExportFormat, String)> {
        self.with_state(|s| s.export_inputs.clone())
    }

    pub(crate) async fn wait_for_calls(&self, call: Call, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while self.call_count(call) < count {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {count} {call:?} call(s)");
    }

    /// Records the call, waits on its gate if one is armed, then returns the
    /// scripted failure for it, if any.
    async fn enter(&self, call: Call) -> ServiceResult<()> {
        let gate = self.with_state(|s| {
            s.calls.push(call);
            s.gates.get_mut(&call).and_then(VecDeque::pop_front)
        });
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match self.with_state(|s| s.failures.get_mut(&call).and_then(VecDeque::pop_front)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentService for FakeDocumentService {
    async fn generate(&self, topic: &str) -> ServiceResult<String> {
        self.enter(Call::Generate).await?;
        self.with_state(|s| s.generate_results.pop_front())
            .unwrap_or_else(|| Ok(format!("Generated text about {topic}")))
    }

    async fn refine(&self, content: &str, instruction: &str) -> ServiceResult<String> {
        self.with_state(|s| {
            s.refine_inputs
                .push((content.to_string(), instruction.to_string()))
        });
        self.enter(Call::Refine).await?;
        self.with_state(|s| s.refine_results.pop_front())
            .unwrap_or_else(|| Ok(format!("{content} ({instruction})")))
    }

    async fn export(&self, format: ExportFormat, content: &str) -> ServiceResult<Vec<u8>> {
        self.with_state(|s| s.export_inputs.push((format, content.to_string())));
        self.enter(Call::Export).await?;
        Ok(format!("{}:{content}", format.as_str()).into_bytes())
    }

    async fn list_projects(&self) -> ServiceResult<Vec<ProjectRecord>> {
        self.enter(Call::ListProjects).await?;
        Ok(self.stored_projects())
    }

    async fn create_project(&self, request: CreateProjectRequest) -> ServiceResult<ProjectId> {
        self.enter(Call::CreateProject).await?;
        Ok(self.with_state(|s| {
            s.next_id += 1;
            let id = ProjectId(s.next_id);
            s.projects.push(ProjectRecord {
                id,
                title: request.title,
                content: request.content,
                doc_type: request.doc_type,
                is_liked: None,
                is_disliked: None,
                user_notes: None,
            });
            id
        }))
    }

    async fn update_feedback(
        &self,
        project_id: ProjectId,
        feedback: FeedbackUpdateRequest,
    ) -> ServiceResult<()> {
        self.enter(Call::UpdateFeedback).await?;
        self.with_state(|s| {
            if let Some(project) = s.projects.iter_mut().find(|p| p.id == project_id) {
                project.is_liked = Some(feedback.is_liked);
                project.is_disliked = Some(feedback.is_disliked);
                project.user_notes = Some(feedback.user_notes.clone());
            }
            s.feedback_updates.push((project_id, feedback));
        });
        Ok(())
    }

    async fn delete_project(&self, project_id: ProjectId) -> ServiceResult<()> {
        self.enter(Call::DeleteProject).await?;
        self.with_state(|s| s.projects.retain(|p| p.id != project_id));
        Ok(())
    }
}
