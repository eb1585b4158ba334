use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::domain::Post;
use crate::fetcher::{DirEntry, FetchError, FetchOutcome, Fetcher};
use crate::normalizer;

pub const DEFAULT_WORKERS: usize = 4;

/// Runs one fetch cycle: list the remote directory, download every post,
/// parse frontmatter, and fold per-entry failures into a first error.
pub struct PostFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    suffix: String,
    semaphore: Arc<Semaphore>,
}

impl PostFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, suffix: &str) -> Self {
        Self::with_workers(fetcher, suffix, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        suffix: &str,
        workers: usize,
    ) -> Self {
        Self {
            fetcher,
            suffix: suffix.to_string(),
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub async fn fetch_posts(&self) -> FetchOutcome {
        let payload = self.fetcher.fetch_listing().await.inspect_err(|e| {
            tracing::error!("{}", e);
        })?;

        let entries = parse_listing(&payload).inspect_err(|e| {
            tracing::error!("{}", e);
        })?;

        let mut first_error: Option<FetchError> = None;
        let mut missing_locator: Option<FetchError> = None;
        let mut names = Vec::new();
        let mut handles = Vec::new();

        for entry in entries {
            if !entry.is_file() || !entry.name.ends_with(&self.suffix) {
                continue;
            }

            let Some(url) = entry.locator().map(String::from) else {
                tracing::warn!("Skipping {}: no download URL", entry.name);
                missing_locator.get_or_insert(FetchError::Download {
                    name: entry.name.clone(),
                    cause: "no download URL".into(),
                });
                continue;
            };

            let fetcher = self.fetcher.clone();
            let semaphore = self.semaphore.clone();
            let suffix = self.suffix.clone();

            names.push(entry.name.clone());
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                fetch_single_post(fetcher.as_ref(), &entry, &url, &suffix).await
            }));
        }

        // Joined in listing order so equal dates keep arrival order after the stable sort.
        let mut posts = Vec::new();
        let joined_all = futures::future::join_all(handles).await;
        for (name, joined) in names.into_iter().zip(joined_all) {
            let result = joined.unwrap_or_else(|e| {
                tracing::error!("Task join error for {}: {}", name, e);
                Err(FetchError::Download {
                    name,
                    cause: e.to_string(),
                })
            });
            match result {
                Ok(post) => posts.push(post),
                Err(e) => {
                    tracing::warn!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        sort_newest_first(&mut posts);

        match first_error.or(missing_locator) {
            Some(e) if posts.is_empty() => {
                tracing::error!("Fetch failed, no posts loaded: {}", e);
                Err(e)
            }
            _ => {
                tracing::info!("Fetched {} posts", posts.len());
                Ok(posts)
            }
        }
    }
}

async fn fetch_single_post(
    fetcher: &(dyn Fetcher + Send + Sync),
    entry: &DirEntry,
    url: &str,
    suffix: &str,
) -> Result<Post, FetchError> {
    let raw = fetcher
        .fetch_document(url)
        .await
        .map_err(|e| match e {
            FetchError::Download { cause, .. } => FetchError::Download {
                name: entry.name.clone(),
                cause,
            },
            other => other,
        })?;

    let fallback_slug = entry.name.strip_suffix(suffix).unwrap_or(&entry.name);
    normalizer::parse_post(&entry.name, fallback_slug, &raw)
}

pub fn parse_listing(payload: &[u8]) -> Result<Vec<DirEntry>, FetchError> {
    serde_json::from_slice(payload).map_err(|e| FetchError::Parse {
        what: "directory listing".into(),
        cause: e.to_string(),
    })
}

/// Newest first; `sort_by` is stable so ties keep their order.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};

    struct MockFetcher {
        listing: Result<Vec<u8>, FetchError>,
        documents: HashMap<String, Result<String, FetchError>>,
        panics: HashSet<String>,
    }

    impl MockFetcher {
        fn new(entries: &[(&str, &str, Option<&str>)]) -> Self {
            let json: Vec<serde_json::Value> = entries
                .iter()
                .map(|(name, kind, url)| {
                    serde_json::json!({
                        "name": name,
                        "path": format!("blog/{}", name),
                        "type": kind,
                        "download_url": url,
                    })
                })
                .collect();
            Self {
                listing: Ok(serde_json::to_vec(&json).unwrap()),
                documents: HashMap::new(),
                panics: HashSet::new(),
            }
        }

        fn document(mut self, url: &str, body: &str) -> Self {
            self.documents.insert(url.into(), Ok(body.into()));
            self
        }

        fn panicking(mut self, url: &str) -> Self {
            self.panics.insert(url.into());
            self
        }

        fn failing(mut self, url: &str) -> Self {
            self.documents.insert(
                url.into(),
                Err(FetchError::Download {
                    name: url.into(),
                    cause: "connection reset".into(),
                }),
            );
            self
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch_listing(&self) -> Result<Vec<u8>, FetchError> {
            self.listing.clone()
        }

        async fn fetch_document(&self, url: &str) -> Result<String, FetchError> {
            if self.panics.contains(url) {
                panic!("decoder blew up on {}", url);
            }
            self.documents.get(url).cloned().unwrap_or_else(|| {
                Err(FetchError::Download {
                    name: url.into(),
                    cause: "404 Not Found".into(),
                })
            })
        }
    }

    fn doc(title: &str, date: &str) -> String {
        format!(
            "---\ntitle: {}\nexcerpt: about {}\npublishDate: {}\ntags: [rust]\n---\n\nBody of {}\n",
            title, title, date, title
        )
    }

    fn post_fetcher(mock: MockFetcher) -> PostFetcher {
        PostFetcher::new(Arc::new(mock), ".mdx")
    }

    #[tokio::test]
    async fn test_single_download_failure_is_total_failure() {
        let mock = MockFetcher::new(&[("a.mdx", "file", Some("https://x/a.mdx"))])
            .failing("https://x/a.mdx");

        let result = post_fetcher(mock).fetch_posts().await;
        assert_eq!(
            result,
            Err(FetchError::Download {
                name: "a.mdx".into(),
                cause: "connection reset".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_panicked_download_is_total_failure() {
        let mock = MockFetcher::new(&[("a.mdx", "file", Some("https://x/a.mdx"))])
            .panicking("https://x/a.mdx");

        let result = post_fetcher(mock).fetch_posts().await;
        assert!(matches!(result, Err(FetchError::Download { name, .. }) if name == "a.mdx"));
    }

    #[tokio::test]
    async fn test_panicked_download_hidden_by_partial_success() {
        let mock = MockFetcher::new(&[
            ("a.mdx", "file", Some("https://x/a.mdx")),
            ("b.mdx", "file", Some("https://x/b.mdx")),
        ])
        .panicking("https://x/a.mdx")
        .document("https://x/b.mdx", &doc("B", "2024-01-01"));

        let posts = post_fetcher(mock).fetch_posts().await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["B"]);
    }

    #[tokio::test]
    async fn test_partial_success_hides_error() {
        let mock = MockFetcher::new(&[
            ("a.mdx", "file", Some("https://x/a.mdx")),
            ("b.mdx", "file", Some("https://x/b.mdx")),
        ])
        .document("https://x/a.mdx", &doc("A", "2024-01-01"))
        .failing("https://x/b.mdx");

        let posts = post_fetcher(mock).fetch_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "A");
        assert_eq!(posts[0].body.as_deref(), Some("Body of A"));
    }

    #[tokio::test]
    async fn test_sorted_newest_first() {
        let mock = MockFetcher::new(&[
            ("old.mdx", "file", Some("https://x/old.mdx")),
            ("new.mdx", "file", Some("https://x/new.mdx")),
            ("mid.mdx", "file", Some("https://x/mid.mdx")),
        ])
        .document("https://x/old.mdx", &doc("Old", "2021-01-01"))
        .document("https://x/new.mdx", &doc("New", "2023-06-01"))
        .document("https://x/mid.mdx", &doc("Mid", "2022-03-01"));

        let posts = post_fetcher(mock).fetch_posts().await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Mid", "Old"]);
    }

    #[tokio::test]
    async fn test_equal_dates_keep_listing_order() {
        let mock = MockFetcher::new(&[
            ("one.mdx", "file", Some("https://x/one.mdx")),
            ("two.mdx", "file", Some("https://x/two.mdx")),
            ("three.mdx", "file", Some("https://x/three.mdx")),
        ])
        .document("https://x/one.mdx", &doc("One", "2022-01-01"))
        .document("https://x/two.mdx", &doc("Two", "2022-01-01"))
        .document("https://x/three.mdx", &doc("Three", "2022-01-01"));

        let posts = post_fetcher(mock).fetch_posts().await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[tokio::test]
    async fn test_empty_directory_is_success() {
        let mock = MockFetcher::new(&[]);
        let posts = post_fetcher(mock).fetch_posts().await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_skips_directories_and_other_suffixes() {
        let mock = MockFetcher::new(&[
            ("drafts", "dir", None),
            ("README.md", "file", Some("https://x/README.md")),
            ("a.mdx", "file", Some("https://x/a.mdx")),
        ])
        .document("https://x/a.mdx", &doc("A", "2024-01-01"));

        let posts = post_fetcher(mock).fetch_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "a");
    }

    #[tokio::test]
    async fn test_listing_failure_is_list_error() {
        let mut mock = MockFetcher::new(&[]);
        mock.listing = Err(FetchError::List("503 Service Unavailable".into()));

        let result = post_fetcher(mock).fetch_posts().await;
        assert!(matches!(result, Err(FetchError::List(_))));
    }

    #[tokio::test]
    async fn test_undecodable_listing_is_parse_error() {
        let mut mock = MockFetcher::new(&[]);
        mock.listing = Ok(b"{\"message\": \"Not Found\"}".to_vec());

        let result = post_fetcher(mock).fetch_posts().await;
        assert!(matches!(result, Err(FetchError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_malformed_frontmatter_only_is_parse_error() {
        let mock = MockFetcher::new(&[("a.mdx", "file", Some("https://x/a.mdx"))])
            .document("https://x/a.mdx", "no frontmatter here");

        let result = post_fetcher(mock).fetch_posts().await;
        assert!(matches!(result, Err(FetchError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_missing_locator_only_problem_surfaces() {
        let mock = MockFetcher::new(&[("a.mdx", "file", None)]);

        let result = post_fetcher(mock).fetch_posts().await;
        assert!(matches!(result, Err(FetchError::Download { name, .. }) if name == "a.mdx"));
    }

    #[tokio::test]
    async fn test_real_error_preferred_over_missing_locator() {
        let mock = MockFetcher::new(&[
            ("a.mdx", "file", Some("")),
            ("b.mdx", "file", Some("https://x/b.mdx")),
        ])
        .document("https://x/b.mdx", "---\nbroken");

        let result = post_fetcher(mock).fetch_posts().await;
        assert!(matches!(result, Err(FetchError::Parse { what, .. }) if what == "b.mdx"));
    }

    #[tokio::test]
    async fn test_missing_locator_ignored_when_posts_load() {
        let mock = MockFetcher::new(&[
            ("a.mdx", "file", None),
            ("b.mdx", "file", Some("https://x/b.mdx")),
        ])
        .document("https://x/b.mdx", &doc("B", "2024-01-01"));

        let posts = post_fetcher(mock).fetch_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
    }
}
