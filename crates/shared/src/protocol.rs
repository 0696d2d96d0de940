use serde::{Deserialize, Serialize};

use crate::domain::{Feedback, ProjectId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineRequest {
    pub content: String,
    pub instruction: String,
}

/// Response body shared by `/generate` and `/refine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResponse {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub doc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_disliked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub content: String,
    pub doc_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectResponse {
    pub project_id: ProjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackUpdateRequest {
    pub is_liked: bool,
    pub is_disliked: bool,
    pub user_notes: String,
}

impl From<&Feedback> for FeedbackUpdateRequest {
    fn from(feedback: &Feedback) -> Self {
        Self {
            is_liked: feedback.liked(),
            is_disliked: feedback.disliked(),
            user_notes: feedback.notes.clone(),
        }
    }
}
