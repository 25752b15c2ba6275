// Application state shared by all handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::error::ConfigError;
use crate::pipeline::Pipeline;
use crate::search::SearchAggregator;

/// Clone-friendly: everything sits behind `Arc`. Nothing here is mutated after
/// startup except the readiness flag.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RetrievalConfig>,
    pub pipeline: Arc<Pipeline>,
    pub search: Arc<SearchAggregator>,
    pub start_time: Instant,
    /// `true` once the listener is bound.
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: RetrievalConfig) -> Result<Self, ConfigError> {
        let pipeline = Arc::new(Pipeline::new(&config)?);
        let search = Arc::new(SearchAggregator::new(&config, pipeline.clone())?);

        tracing::info!(
            search_url = %config.search_url,
            render_url = %config.render_url,
            render_token = config.render_token.is_some(),
            proxy = pipeline.policy().proxy().is_some(),
            timeout_secs = config.request_timeout.as_secs(),
            render_only = ?config.render_only_domains,
            search_concurrency = config.search_concurrency,
            "AppState initialised"
        );

        Ok(Self {
            config: Arc::new(config),
            pipeline,
            search,
            start_time: Instant::now(),
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
        tracing::info!("Backend marked as READY");
    }
}
