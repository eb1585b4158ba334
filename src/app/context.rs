use std::sync::Arc;

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::posts::PostFetcher;
use crate::fetcher::Fetcher;
use crate::render::RenderPipeline;

/// Read-only services shared by every browser session.
pub struct AppContext {
    pub config: Arc<Config>,
    pub posts: Arc<PostFetcher>,
    pub pipeline: Arc<RenderPipeline>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.source)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        let posts = Arc::new(PostFetcher::with_workers(
            fetcher,
            &config.source.suffix,
            config.source.workers,
        ));
        let pipeline = Arc::new(RenderPipeline::new(&config.render));

        Self {
            config: Arc::new(config),
            posts,
            pipeline,
        }
    }
}
