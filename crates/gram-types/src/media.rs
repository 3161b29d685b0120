use serde::{Deserialize, Serialize};

/// Kind of media a post carries. Stored in the DB as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify from the declared content type: anything under `video/`
    /// is a video, everything else an image. Prefix check only — a
    /// mislabeled upload is misclassified.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("video") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
