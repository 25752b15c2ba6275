use std::time::Duration;

use reqwest::Client;

use super::{read_html, FetchOutcome, ProxyDescriptor};
use crate::config::RetrievalConfig;
use crate::error::{ConfigError, FetchError};

/// Plain GET with a browser User-Agent. One attempt, no retries.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: Client,
    /// Client pre-built for the proxy the policy hands out, so pooled
    /// connections survive across requests.
    proxied: Option<(ProxyDescriptor, Client)>,
    user_agent: String,
    timeout: Duration,
}

impl DirectFetcher {
    pub fn new(config: &RetrievalConfig, proxy: Option<&ProxyDescriptor>) -> Result<Self, ConfigError> {
        let timeout = config.request_timeout;
        let user_agent = config.user_agent.clone();
        let client = build_client(&user_agent, timeout, None)
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let proxied = proxy
            .map(|p| {
                build_client(&user_agent, timeout, Some(p))
                    .map(|c| (p.clone(), c))
                    .map_err(|e| {
                        ConfigError::HttpClient(format!("proxy {}: {}", p.server_url(), e))
                    })
            })
            .transpose()?;
        Ok(Self {
            client,
            proxied,
            user_agent,
            timeout,
        })
    }

    pub async fn fetch(&self, url: &str, proxy: Option<&ProxyDescriptor>) -> FetchOutcome {
        let client = self.client_for(url, proxy)?;
        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        read_html(url, resp).await
    }

    fn client_for(&self, url: &str, proxy: Option<&ProxyDescriptor>) -> Result<Client, FetchError> {
        match (proxy, &self.proxied) {
            (None, _) => Ok(self.client.clone()),
            (Some(p), Some((cached, client))) if cached == p => Ok(client.clone()),
            (Some(p), _) => build_client(&self.user_agent, self.timeout, Some(p))
                .map_err(|e| FetchError::transport(url, e)),
        }
    }
}

fn build_client(
    user_agent: &str,
    timeout: Duration,
    proxy: Option<&ProxyDescriptor>,
) -> reqwest::Result<Client> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .pool_max_idle_per_host(10);
    if let Some(p) = proxy {
        let mut upstream = reqwest::Proxy::all(p.server_url())?;
        upstream = upstream.basic_auth(&p.username, p.password.as_deref().unwrap_or(""));
        builder = builder.proxy(upstream);
    }
    builder.build()
}
