use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blog post as described by its frontmatter, plus the body once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub slug: String,
    pub image: Option<String>,
    pub body: Option<String>,
}

impl Post {
    pub fn new(slug: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        Self {
            title: String::new(),
            summary: String::new(),
            published_at,
            category: None,
            tags: Vec::new(),
            slug: slug.into(),
            image: None,
            body: None,
        }
    }

    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "(Untitled)"
        } else {
            title
        }
    }

    pub fn display_body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    /// Case-insensitive match against title, summary, category and tags.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        self.title.to_lowercase().contains(&query)
            || self.summary.to_lowercase().contains(&query)
            || self
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&query))
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}
