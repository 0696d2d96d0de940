//! reqwest-backed implementation of [`DocumentService`] plus the account calls.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ExportFormat, ProjectId},
    error::{ErrorDetail, ServiceError},
    protocol::{
        ContentResponse, CreateProjectRequest, CreateProjectResponse, CredentialsRequest,
        ExportRequest, FeedbackUpdateRequest, GenerateRequest, HealthResponse, ProjectRecord,
        RefineRequest, TokenResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    session::{AccessToken, CredentialProvider},
    DocumentService, ServiceResult,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpDocumentService {
    http: Client,
    base_url: Url,
    session: Arc<dyn CredentialProvider>,
}

impl HttpDocumentService {
    pub fn new(base_url: &str, session: Arc<dyn CredentialProvider>) -> ServiceResult<Self> {
        Self::with_timeout(base_url, session, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        session: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> ServiceResult<Self> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::network(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn health(&self) -> ServiceResult<String> {
        let response = self
            .send("health", self.http.get(self.endpoint("")?))
            .await?;
        let body: HealthResponse = decode_json("health", response).await?;
        Ok(body.message)
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AccessToken> {
        let request = credentials(email, password)?;
        let response = self
            .send("login", self.http.post(self.endpoint("login")?).json(&request))
            .await?;
        let body: TokenResponse = decode_json("login", response).await?;
        AccessToken::new(body.access_token)
            .ok_or_else(|| ServiceError::server(None, "login response carried an empty token"))
    }

    pub async fn register(&self, email: &str, password: &str) -> ServiceResult<()> {
        let request = credentials(email, password)?;
        self.send(
            "register",
            self.http.post(self.endpoint("register")?).json(&request),
        )
        .await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> ServiceResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ServiceError::validation(format!("invalid endpoint path '{path}': {e}")))
    }

    /// Auth-gated calls fail here, before any request is built, when the
    /// session holds no credential.
    fn bearer(&self, capability: &'static str) -> ServiceResult<AccessToken> {
        self.session.credential().ok_or_else(|| {
            debug!(capability, "skipping request without session credential");
            ServiceError::auth_required(format!("sign in required for {capability}"))
        })
    }

    async fn send(&self, capability: &'static str, request: RequestBuilder) -> ServiceResult<Response> {
        debug!(capability, "dispatching backend request");
        let response = request
            .send()
            .await
            .map_err(|err| classify_transport_error(capability, &err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorDetail>(&body) {
            Ok(detail) => detail.message(),
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            Err(_) => body,
        };
        warn!(capability, status = status.as_u16(), %message, "backend returned error status");
        Err(ServiceError::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn generate(&self, topic: &str) -> ServiceResult<String> {
        let response = self
            .send(
                "generate",
                self.http
                    .post(self.endpoint("generate")?)
                    .json(&GenerateRequest {
                        topic: topic.to_string(),
                    }),
            )
            .await?;
        let body: ContentResponse = decode_json("generate", response).await?;
        Ok(body.content)
    }

    async fn refine(&self, content: &str, instruction: &str) -> ServiceResult<String> {
        let response = self
            .send(
                "refine",
                self.http.post(self.endpoint("refine")?).json(&RefineRequest {
                    content: content.to_string(),
                    instruction: instruction.to_string(),
                }),
            )
            .await?;
        let body: ContentResponse = decode_json("refine", response).await?;
        Ok(body.content)
    }

    async fn export(&self, format: ExportFormat, content: &str) -> ServiceResult<Vec<u8>> {
        let response = self
            .send(
                "export",
                self.http
                    .post(self.endpoint(&format!("export/{}", format.as_str()))?)
                    .json(&ExportRequest {
                        content: content.to_string(),
                    }),
            )
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| classify_transport_error("export", &err))?;
        Ok(bytes.to_vec())
    }

    async fn list_projects(&self) -> ServiceResult<Vec<ProjectRecord>> {
        let token = self.bearer("list_projects")?;
        let response = self
            .send(
                "list_projects",
                self.http
                    .get(self.endpoint("projects")?)
                    .bearer_auth(token.as_str()),
            )
            .await?;
        decode_json("list_projects", response).await
    }

    async fn create_project(&self, request: CreateProjectRequest) -> ServiceResult<ProjectId> {
        let token = self.bearer("create_project")?;
        let response = self
            .send(
                "create_project",
                self.http
                    .post(self.endpoint("projects")?)
                    .bearer_auth(token.as_str())
                    .json(&request),
            )
            .await?;
        let body: CreateProjectResponse = decode_json("create_project", response).await?;
        Ok(body.project_id)
    }

    async fn update_feedback(
        &self,
        project_id: ProjectId,
        feedback: FeedbackUpdateRequest,
    ) -> ServiceResult<()> {
        let token = self.bearer("update_feedback")?;
        self.send(
            "update_feedback",
            self.http
                .put(self.endpoint(&format!("projects/{project_id}/feedback"))?)
                .bearer_auth(token.as_str())
                .json(&feedback),
        )
        .await?;
        Ok(())
    }

    async fn delete_project(&self, project_id: ProjectId) -> ServiceResult<()> {
        let token = self.bearer("delete_project")?;
        self.send(
            "delete_project",
            self.http
                .delete(self.endpoint(&format!("projects/{project_id}"))?)
                .bearer_auth(token.as_str()),
        )
        .await?;
        Ok(())
    }
}

fn credentials(email: &str, password: &str) -> ServiceResult<CredentialsRequest> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ServiceError::validation("email and password are required"));
    }
    Ok(CredentialsRequest {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Relative joins replace the last path segment unless the base ends in `/`.
fn normalize_base_url(raw: &str) -> ServiceResult<Url> {
    let raw = raw.trim();
    let mut url = Url::parse(raw)
        .map_err(|e| ServiceError::validation(format!("invalid server url '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ServiceError::validation(format!(
            "server url '{raw}' cannot be used as a base"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn decode_json<T: DeserializeOwned>(
    capability: &'static str,
    response: Response,
) -> ServiceResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| classify_transport_error(capability, &err))
}

fn classify_transport_error(capability: &'static str, err: &reqwest::Error) -> ServiceError {
    if err.is_decode() {
        warn!(capability, error = %err, "backend response could not be decoded");
        return ServiceError::server(
            err.status().map(|s| s.as_u16()),
            format!("malformed {capability} response: {err}"),
        );
    }
    if let Some(status) = err.status() {
        return ServiceError::from_status(status.as_u16(), err.to_string());
    }
    warn!(capability, error = %err, timeout = err.is_timeout(), "backend request did not complete");
    if err.is_timeout() {
        ServiceError::network(format!("{capability} request timed out"))
    } else {
        ServiceError::network(format!("{capability} request failed: {err}"))
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
