// Search engine query + per-hit retrieval.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use url::Url;

use crate::config::RetrievalConfig;
use crate::error::{ConfigError, SearchError};
use crate::models::{SearchEngineResponse, SearchEntry, SearchHit, SearchResultItem};
use crate::pipeline::Pipeline;

pub struct SearchAggregator {
    client: Client,
    endpoint: String,
    concurrency: usize,
    pipeline: Arc<Pipeline>,
}

impl SearchAggregator {
    pub fn new(config: &RetrievalConfig, pipeline: Arc<Pipeline>) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/search", config.search_url),
            concurrency: config.search_concurrency.max(1),
            pipeline,
        })
    }

    /// Search, then retrieve up to `max_results` hits in ranking order.
    /// Hits whose page cannot be retrieved are left out. An engine failure
    /// yields a single error entry instead of an `Err`.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchEntry> {
        let hits = match self.query_engine(query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!(query, "search engine failed: {}", e);
                return vec![SearchEntry::Error {
                    error: e.to_string(),
                }];
            }
        };

        let total = hits.len().min(max_results);
        let items: Vec<SearchEntry> = stream::iter(hits.into_iter().take(max_results))
            .map(|hit| self.enrich(hit))
            .buffered(self.concurrency)
            .filter_map(|item| async move { item.map(SearchEntry::Item) })
            .collect()
            .await;

        tracing::info!(
            query,
            requested = max_results,
            retrieved = items.len(),
            dropped = total - items.len(),
            "search complete"
        );
        items
    }

    /// The engine's ranked hits for `query`.
    pub async fn query_engine(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[("q", query), ("categories", "general"), ("format", "json")],
        )
        .map_err(|e| SearchError::Transport(e.to_string()))?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Status(format!(
                "{} from {}",
                status, self.endpoint
            )));
        }
        let body: SearchEngineResponse = resp
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(body.results)
    }

    async fn enrich(&self, hit: SearchHit) -> Option<SearchResultItem> {
        match self.pipeline.retrieve(&hit.url).await {
            Ok(doc) => Some(SearchResultItem {
                title: hit.title,
                url: hit.url,
                markdown_content: doc.formatted(),
            }),
            Err(e) => {
                tracing::warn!(url = %hit.url, "dropping search hit: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn aggregator(server: &MockServer, concurrency: usize) -> SearchAggregator {
        let mut cfg = RetrievalConfig::new(server.uri(), server.uri());
        cfg.render_only_domains.clear();
        cfg.search_concurrency = concurrency;
        let pipeline = Arc::new(Pipeline::new(&cfg).unwrap());
        SearchAggregator::new(&cfg, pipeline).unwrap()
    }

    async fn mount_engine(server: &MockServer, urls: &[String]) {
        let results: Vec<_> = urls
            .iter()
            .enumerate()
            .map(|(i, u)| json!({"title": format!("Hit {}", i), "url": u}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "cats"))
            .and(query_param("categories", "general"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": results})))
            .mount(server)
            .await;
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn engine_http_error_becomes_single_error_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let out = aggregator(&server, 1).search("cats", 5).await;
        assert_eq!(out.len(), 1);
        match &out[0] {
            SearchEntry::Error { error } => {
                assert!(error.starts_with("Search query failed with HTTP error:"))
            }
            other => panic!("expected error entry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn engine_unreachable_becomes_single_error_entry() {
        let mut cfg = RetrievalConfig::new("http://127.0.0.1:1", "http://127.0.0.1:1");
        cfg.request_timeout = std::time::Duration::from_secs(2);
        let pipeline = Arc::new(Pipeline::new(&cfg).unwrap());
        let agg = SearchAggregator::new(&cfg, pipeline).unwrap();

        let out = agg.search("cats", 5).await;
        assert!(matches!(
            out.as_slice(),
            [SearchEntry::Error { error }] if error.starts_with("Search query failed with error:")
        ));
    }

    #[tokio::test]
    async fn failed_hit_is_omitted_and_order_kept() {
        let server = MockServer::start().await;
        let urls: Vec<String> = ["/a", "/b", "/c"]
            .iter()
            .map(|p| format!("{}{}", server.uri(), p))
            .collect();
        mount_engine(&server, &urls).await;
        mount_page(&server, "/a", "<title>A</title><p>alpha</p>").await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_page(&server, "/c", "<title>C</title><p>gamma</p>").await;

        for concurrency in [1, 3] {
            let out = aggregator(&server, concurrency).search("cats", 3).await;
            assert_eq!(out.len(), 2, "concurrency {}", concurrency);
            let SearchEntry::Item(first) = &out[0] else { panic!("not an item") };
            let SearchEntry::Item(second) = &out[1] else { panic!("not an item") };
            assert_eq!(first.title, "Hit 0");
            assert_eq!(first.url, urls[0]);
            assert_eq!(
                first.markdown_content,
                format!("Title: A\n\nURL Source: {}\n\nMarkdown Content:\nalpha", urls[0])
            );
            assert_eq!(second.title, "Hit 2");
            assert!(second.markdown_content.ends_with("gamma"));
        }
    }

    #[tokio::test]
    async fn results_truncated_to_max() {
        let server = MockServer::start().await;
        let urls: Vec<String> = ["/a", "/b", "/c"]
            .iter()
            .map(|p| format!("{}{}", server.uri(), p))
            .collect();
        mount_engine(&server, &urls).await;
        mount_page(&server, "/a", "<p>alpha</p>").await;
        mount_page(&server, "/b", "<p>beta</p>").await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>gamma</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let out = aggregator(&server, 2).search("cats", 2).await;
        let urls_out: Vec<&str> = out
            .iter()
            .filter_map(|e| match e {
                SearchEntry::Item(item) => Some(item.url.as_str()),
                SearchEntry::Error { .. } => None,
            })
            .collect();
        assert_eq!(urls_out, vec![urls[0].as_str(), urls[1].as_str()]);
    }

    #[tokio::test]
    async fn zero_results_requested_fetches_nothing() {
        let server = MockServer::start().await;
        let urls = vec![format!("{}/a", server.uri())];
        mount_engine(&server, &urls).await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(aggregator(&server, 1).search("cats", 0).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_engine_body_becomes_error_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let out = aggregator(&server, 1).search("cats", 5).await;
        assert!(matches!(out.as_slice(), [SearchEntry::Error { .. }]));
    }
}
