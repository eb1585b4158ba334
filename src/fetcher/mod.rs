pub mod http_fetcher;
pub mod posts;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::Post;

/// Failure of a fetch cycle or of one of its entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The remote directory could not be enumerated.
    #[error("failed to list posts: {0}")]
    List(String),

    /// The listing or a post's frontmatter could not be decoded.
    #[error("failed to parse {what}: {cause}")]
    Parse { what: String, cause: String },

    /// A single post could not be downloaded.
    #[error("failed to download {name}: {cause}")]
    Download { name: String, cause: String },
}

/// Result of one fetch cycle, delivered to the browser as a single message.
pub type FetchOutcome = Result<Vec<Post>, FetchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// One item of the remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Download locator, if present and non-empty.
    pub fn locator(&self) -> Option<&str> {
        self.download_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Transport seam between the post pipeline and the network.
#[async_trait]
pub trait Fetcher {
    /// Raw directory listing payload.
    async fn fetch_listing(&self) -> Result<Vec<u8>, FetchError>;

    /// Raw body of a single document.
    async fn fetch_document(&self, url: &str) -> Result<String, FetchError>;
}
