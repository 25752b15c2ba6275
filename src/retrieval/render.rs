use std::time::Duration;

use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use super::{read_html, FetchOutcome, ProxyDescriptor};
use crate::config::RetrievalConfig;
use crate::error::{ConfigError, FetchError};

/// Browserless `/content` client: the service loads the page in a real
/// browser and returns the rendered HTML.
#[derive(Debug, Clone)]
pub struct RenderFetcher {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl RenderFetcher {
    pub fn new(config: &RetrievalConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/content", config.render_url),
            token: config.render_token.clone(),
            timeout: config.render_timeout(),
        })
    }

    pub async fn fetch(&self, url: &str, proxy: Option<&ProxyDescriptor>) -> FetchOutcome {
        let endpoint = self.endpoint_url(proxy).map_err(|e| FetchError::transport(url, e))?;
        let resp = self
            .client
            .post(endpoint)
            .header(CACHE_CONTROL, "no-cache")
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(render_request(url, proxy).to_string())
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        read_html(url, resp).await
    }

    /// Endpoint with the auth token and, when proxied, the browser's
    /// `--proxy-server` launch flag as query parameters.
    fn endpoint_url(&self, proxy: Option<&ProxyDescriptor>) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.endpoint)?;
        if self.token.is_some() || proxy.is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(ref token) = self.token {
                query.append_pair("token", token);
            }
            if let Some(p) = proxy {
                query.append_pair("--proxy-server", &p.server_url());
            }
        }
        Ok(url)
    }
}

/// JSON body for the render call. Images and stylesheets are skipped, the
/// page counts as ready once the network is idle, and `bestAttempt` makes
/// the service return whatever it captured if readiness never arrives.
/// Proxy credentials travel in the body because the service itself makes
/// the outbound request.
fn render_request(url: &str, proxy: Option<&ProxyDescriptor>) -> Value {
    let mut body = json!({
        "url": url,
        "rejectResourceTypes": ["image"],
        "rejectRequestPattern": ["/^.*\\.(css)/"],
        "gotoOptions": { "waitUntil": "networkidle2" },
        "bestAttempt": true,
    });
    if let Some((username, password)) = proxy.and_then(ProxyDescriptor::credentials) {
        body["authenticate"] = json!({ "username": username, "password": password });
    }
    body
}
