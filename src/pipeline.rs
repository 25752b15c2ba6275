// URL → Document: fetch per policy, then sanitize and convert.

use crate::config::RetrievalConfig;
use crate::error::{ConfigError, FetchError};
use crate::models::{Document, UNTITLED};
use crate::retrieval::{DirectFetcher, FetchOutcome, FetchStrategy, RenderFetcher, RetrievalPolicy};
use crate::transform;

pub struct Pipeline {
    policy: RetrievalPolicy,
    direct: DirectFetcher,
    render: RenderFetcher,
}

impl Pipeline {
    pub fn new(config: &RetrievalConfig) -> Result<Self, ConfigError> {
        let policy = RetrievalPolicy::new(config);
        let direct = DirectFetcher::new(config, policy.proxy())?;
        let render = RenderFetcher::new(config)?;
        Ok(Self {
            policy,
            direct,
            render,
        })
    }

    pub fn policy(&self) -> &RetrievalPolicy {
        &self.policy
    }

    /// Raw HTML for `url`, trying each planned strategy until one succeeds.
    /// The error is the last strategy's failure.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let proxy = self.policy.proxy();
        let mut last_err = None;
        for &strategy in self.policy.plan(url) {
            let outcome = match strategy {
                FetchStrategy::Direct => self.direct.fetch(url, proxy).await,
                FetchStrategy::Render => self.render.fetch(url, proxy).await,
            };
            match outcome {
                Ok(html) => {
                    tracing::debug!(url, ?strategy, bytes = html.len(), "fetched");
                    return Ok(html);
                }
                Err(e) => {
                    tracing::warn!(url, ?strategy, "fetch failed: {}", e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| FetchError::Transport {
            url: url.to_string(),
            reason: "no fetch strategy available".into(),
        }))
    }

    /// Fetch and convert. An empty body counts as a failed retrieval; it is
    /// not retried on the next strategy.
    pub async fn retrieve(&self, url: &str) -> Result<Document, FetchError> {
        let html = self.fetch(url).await?;
        if html.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }
        Ok(build_document(url, &html))
    }
}

/// Title comes from the raw HTML, independent of sanitization.
pub fn build_document(url: &str, raw_html: &str) -> Document {
    let title = transform::extract_title(raw_html).unwrap_or_else(|| UNTITLED.to_string());
    Document {
        title,
        source_url: url.to_string(),
        markdown: transform::html_to_markdown(raw_html),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Config with both upstreams on the given server and no render-only
    /// domains, so loopback URLs take the direct path.
    fn config(server: &MockServer) -> RetrievalConfig {
        let mut cfg = RetrievalConfig::new(server.uri(), server.uri());
        cfg.render_only_domains = vec!["blocked-site".into()];
        cfg.request_timeout = Duration::from_secs(5);
        cfg
    }

    #[test]
    fn document_uses_raw_title_and_placeholder() {
        let doc = build_document("http://e.test", "<title>T</title><p>body</p>");
        assert_eq!(doc.title, "T");
        assert_eq!(doc.source_url, "http://e.test");
        assert_eq!(doc.markdown, "body");

        let doc = build_document("http://e.test", "<p>body</p>");
        assert_eq!(doc.title, UNTITLED);
    }

    #[tokio::test]
    async fn direct_success_never_calls_render() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<title>D</title><p>direct</p>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>rendered</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let pipeline = Pipeline::new(&config(&server)).unwrap();
        let doc = pipeline.retrieve(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(doc.title, "D");
        assert_eq!(doc.markdown, "direct");
    }

    #[tokio::test]
    async fn direct_failure_falls_back_to_render() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>rendered</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = Pipeline::new(&config(&server)).unwrap();
        let doc = pipeline.retrieve(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(doc.markdown, "rendered");
        assert_eq!(doc.title, UNTITLED);
    }

    #[tokio::test]
    async fn render_only_domain_skips_direct_and_render_failure_is_final() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>direct</p>"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = Pipeline::new(&config(&server)).unwrap();
        let err = pipeline
            .retrieve(&format!("{}/blocked-site/post", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UpstreamStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn empty_direct_body_fails_without_render_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>rendered</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let pipeline = Pipeline::new(&config(&server)).unwrap();
        let err = pipeline
            .retrieve(&format!("{}/empty", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody { .. }));
    }

    #[tokio::test]
    async fn whitespace_only_render_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(200).set_body_string(" \n\t "))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = Pipeline::new(&config(&server)).unwrap();
        let err = pipeline
            .retrieve(&format!("{}/blocked-site/blank", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody { .. }));
    }

    #[tokio::test]
    async fn both_failing_returns_render_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = Pipeline::new(&config(&server)).unwrap();
        let err = pipeline.retrieve(&format!("{}/gone", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::UpstreamStatus { status: 502, .. }));
    }
}
