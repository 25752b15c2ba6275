use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Title used when the page has no `<title>` element.
pub const UNTITLED: &str = "No title";

/// Body of `/r/<url>` when every fetch strategy failed.
pub const RETRIEVAL_FAILED: &str = "Failed to retrieve content";

/// A page normalized to Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub source_url: String,
    pub markdown: String,
}

impl Document {
    /// The three-part text layout returned to callers.
    pub fn formatted(&self) -> String {
        format!(
            "Title: {}\n\nURL Source: {}\n\nMarkdown Content:\n{}",
            self.title, self.source_url, self.markdown
        )
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// One entry of the search engine's ranked result list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// Raw SearXNG JSON response; only `results` is used.
#[derive(Debug, Deserialize)]
pub struct SearchEngineResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// A hit whose page was retrieved and converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchResultItem {
    /// Title as reported by the search engine.
    pub title: String,
    pub url: String,
    /// The formatted document (see `Document::formatted`).
    pub markdown_content: String,
}

/// Element of the `/` response array: a result, or the single error entry
/// produced when the search engine itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SearchEntry {
    Item(SearchResultItem),
    Error { error: String },
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SearchParams {
    /// Search query.
    pub q: String,
    /// Number of results (default 5).
    #[serde(default = "default_num_results")]
    pub num_results: usize,
}

fn default_num_results() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub app: String,
    pub uptime_seconds: u64,
}
