use async_trait::async_trait;
use shared::{
    domain::{ExportFormat, ProjectId},
    error::ServiceError,
    protocol::{CreateProjectRequest, FeedbackUpdateRequest, ProjectRecord},
};

pub mod http;
pub mod projects;
pub mod session;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use http::HttpDocumentService;
pub use projects::ProjectListStore;
pub use session::{AccessToken, CredentialProvider, SessionContext};
pub use workspace::{
    draft::{Draft, FeedbackUpdate, Mode, WorkspacePhase},
    events::{CallKind, Notice, NoticeCategory, RequestToken, WorkspaceEvent},
    Completion, ExportedDocument, SaveOutcome, WorkspaceController, WorkspaceError,
    WorkspaceSnapshot, GENERATION_FAILED_SENTINEL,
};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Backend capabilities the workspace depends on. Implementations attach the
/// session credential to the project calls themselves and report every
/// failure as a classified [`ServiceError`].
#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn generate(&self, topic: &str) -> ServiceResult<String>;
    async fn refine(&self, content: &str, instruction: &str) -> ServiceResult<String>;
    async fn export(&self, format: ExportFormat, content: &str) -> ServiceResult<Vec<u8>>;
    async fn list_projects(&self) -> ServiceResult<Vec<ProjectRecord>>;
    async fn create_project(&self, request: CreateProjectRequest) -> ServiceResult<ProjectId>;
    async fn update_feedback(
        &self,
        project_id: ProjectId,
        feedback: FeedbackUpdateRequest,
    ) -> ServiceResult<()>;
    async fn delete_project(&self, project_id: ProjectId) -> ServiceResult<()>;
}
