use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ProjectId);

/// Output formats the rendering service can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Pptx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Pdf, ExportFormat::Docx, ExportFormat::Pptx];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Pptx => "pptx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Like/dislike/notes metadata attached to a draft and stored with a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    liked: bool,
    disliked: bool,
    pub notes: String,
}

impl Feedback {
    pub fn liked(&self) -> bool {
        self.liked
    }

    pub fn disliked(&self) -> bool {
        self.disliked
    }

    /// Setting either flag to `true` clears the other one.
    pub fn set_liked(&mut self, liked: bool) {
        self.liked = liked;
        if liked {
            self.disliked = false;
        }
    }

    pub fn set_disliked(&mut self, disliked: bool) {
        self.disliked = disliked;
        if disliked {
            self.liked = false;
        }
    }

    pub fn is_default(&self) -> bool {
        !self.liked && !self.disliked && self.notes.is_empty()
    }
}
