use serde::{Deserialize, Serialize};

/// One short video entry.
///
/// Field names on disk and on the wire are `thumb`, `video` and
/// `video_text`; both URLs are guaranteed non-empty by the transform in
/// [`crate::upstream`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reel {
    #[serde(rename = "thumb")]
    pub thumbnail_url: String,
    #[serde(rename = "video")]
    pub video_url: String,
    #[serde(rename = "video_text", default)]
    pub caption: String,
}

/// Ordered collection of reels. Order defines pagination order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelsDataset {
    pub reels: Vec<Reel>,
}

impl ReelsDataset {
    pub fn new(reels: Vec<Reel>) -> Self {
        Self { reels }
    }

    pub fn len(&self) -> usize {
        self.reels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reels.is_empty()
    }
}
