//! The in-memory unit of work and the phase derived from it.

use shared::{
    domain::{Feedback, ProjectId},
    protocol::ProjectRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Preview,
    Edit,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Preview => Mode::Edit,
            Mode::Edit => Mode::Preview,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePhase {
    Idle,
    Generating,
    Ready,
    Editing,
    Refining,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub topic: String,
    pub content: String,
    pub mode: Mode,
    pub project_id: Option<ProjectId>,
    pub feedback: Feedback,
    pub refinement_instruction: String,
}

impl Draft {
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn is_persisted(&self) -> bool {
        self.project_id.is_some()
    }

    /// Fresh, unsaved draft for a new topic.
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Feedback stored on the record is not carried over.
    pub fn from_project(project: &ProjectRecord) -> Self {
        Self {
            topic: project.title.clone(),
            content: project.content.clone(),
            project_id: Some(project.id),
            ..Self::default()
        }
    }
}

/// Partial feedback change. `liked` is applied before `disliked`, so a call
/// setting both ends up disliked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackUpdate {
    pub liked: Option<bool>,
    pub disliked: Option<bool>,
    pub notes: Option<String>,
}

impl FeedbackUpdate {
    pub fn like() -> Self {
        Self {
            liked: Some(true),
            ..Self::default()
        }
    }

    pub fn dislike() -> Self {
        Self {
            disliked: Some(true),
            ..Self::default()
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Self::default()
        }
    }

    pub fn apply(self, feedback: &mut Feedback) {
        if let Some(liked) = self.liked {
            feedback.set_liked(liked);
        }
        if let Some(disliked) = self.disliked {
            feedback.set_disliked(disliked);
        }
        if let Some(notes) = self.notes {
            feedback.notes = notes;
        }
    }
}
