// Retrieval configuration. Resolved once at startup, read-only afterwards.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// Browser User-Agent sent on direct fetches and search queries.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Sites that block plain HTTP clients; always fetched through the renderer.
pub const DEFAULT_RENDER_ONLY_DOMAINS: &[&str] = &["twitter", "x", "facebook"];

/// Proxy schemes the HTTP client can speak.
pub const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PORT: u16 = 8000;

/// Outbound proxy settings as configured. Every field is optional; whether
/// they add up to a usable proxy is decided by the retrieval policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    pub scheme: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Base URL of the SearXNG-compatible search engine.
    pub search_url: String,
    /// Base URL of the Browserless-compatible render service.
    pub render_url: String,
    pub render_token: Option<String>,
    pub proxy: ProxySettings,
    /// Per-request timeout; render calls get twice this.
    pub request_timeout: Duration,
    /// URL substrings that skip the direct fetch entirely.
    pub render_only_domains: Vec<String>,
    /// How many search hits are retrieved at once. 1 = strictly sequential.
    pub search_concurrency: usize,
    pub user_agent: String,
    pub bind_addr: SocketAddr,
}

impl RetrievalConfig {
    /// Minimal config pointing at the given upstreams, with every other
    /// field at its default.
    pub fn new(search_url: impl Into<String>, render_url: impl Into<String>) -> Self {
        Self {
            search_url: trim_base(search_url.into()),
            render_url: trim_base(render_url.into()),
            render_token: None,
            proxy: ProxySettings {
                scheme: "http".to_string(),
                ..Default::default()
            },
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            render_only_domains: DEFAULT_RENDER_ONLY_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            search_concurrency: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }

    /// Load from the process environment (after `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let search_url = get("SEARXNG_URL").ok_or(ConfigError::Missing("SEARXNG_URL"))?;
        let render_url = get("BROWSERLESS_URL").ok_or(ConfigError::Missing("BROWSERLESS_URL"))?;
        let mut config = Self::new(search_url, render_url);

        config.render_token = get("TOKEN");
        config.proxy = ProxySettings {
            scheme: get("PROXY_PROTOCOL").unwrap_or_else(|| "http".to_string()),
            host: get("PROXY_URL"),
            port: get("PROXY_PORT")
                .map(|p| parse_num("PROXY_PORT", &p))
                .transpose()?,
            username: get("PROXY_USERNAME"),
            password: get("PROXY_PASSWORD"),
        };
        if let Some(secs) = get("REQUEST_TIMEOUT") {
            config.request_timeout = Duration::from_secs(parse_num("REQUEST_TIMEOUT", &secs)?);
        }
        if let Some(list) = get("RENDER_ONLY_DOMAINS") {
            config.render_only_domains = list
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(n) = get("SEARCH_CONCURRENCY") {
            config.search_concurrency = parse_num("SEARCH_CONCURRENCY", &n)?;
        }
        if let Some(port) = get("PORT") {
            config.bind_addr.set_port(parse_num("PORT", &port)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Render-service timeout: browser startup plus readiness wait.
    pub fn render_timeout(&self) -> Duration {
        self.request_timeout * 2
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("SEARXNG_URL", &self.search_url), ("BROWSERLESS_URL", &self.render_url)] {
            url::Url::parse(value).map_err(|e| ConfigError::Invalid {
                key,
                reason: format!("'{}' is not a URL: {}", value, e),
            })?;
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT",
                reason: "must be greater than 0".into(),
            });
        }
        if self.proxy.host.is_some() && !PROXY_SCHEMES.contains(&self.proxy.scheme.as_str()) {
            return Err(ConfigError::Invalid {
                key: "PROXY_PROTOCOL",
                reason: format!(
                    "unsupported proxy protocol '{}' (expected one of: {})",
                    self.proxy.scheme,
                    PROXY_SCHEMES.join(", ")
                ),
            });
        }
        if self.search_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "SEARCH_CONCURRENCY",
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_num<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("'{}': {}", raw, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("SEARXNG_URL", "http://searx.local/"),
        ("BROWSERLESS_URL", "http://render.local"),
    ];

    #[test]
    fn defaults_apply_when_only_upstreams_set() {
        let config = RetrievalConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.search_url, "http://searx.local");
        assert_eq!(config.render_url, "http://render.local");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.render_timeout(), Duration::from_secs(60));
        assert_eq!(config.proxy.scheme, "http");
        assert!(config.proxy.host.is_none());
        assert!(config.render_token.is_none());
        assert_eq!(config.render_only_domains, vec!["twitter", "x", "facebook"]);
        assert_eq!(config.search_concurrency, 1);
        assert_eq!(config.bind_addr.port(), 8000);
    }

    #[test]
    fn missing_search_url_rejected() {
        let err = RetrievalConfig::from_lookup(lookup(&[("BROWSERLESS_URL", "http://r")])).unwrap_err();
        assert!(err.to_string().contains("SEARXNG_URL"));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let err = RetrievalConfig::from_lookup(lookup(&[
            ("SEARXNG_URL", "  "),
            ("BROWSERLESS_URL", "http://r"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SEARXNG_URL"));
    }

    #[test]
    fn proxy_and_timeout_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("PROXY_PROTOCOL", "socks5"),
            ("PROXY_URL", "proxy.local"),
            ("PROXY_PORT", "3128"),
            ("PROXY_USERNAME", "alice"),
            ("PROXY_PASSWORD", "s3cret"),
            ("REQUEST_TIMEOUT", "5"),
            ("TOKEN", "tok"),
        ]);
        let config = RetrievalConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.proxy.scheme, "socks5");
        assert_eq!(config.proxy.host.as_deref(), Some("proxy.local"));
        assert_eq!(config.proxy.port, Some(3128));
        assert_eq!(config.proxy.username.as_deref(), Some("alice"));
        assert_eq!(config.proxy.password.as_deref(), Some("s3cret"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.render_token.as_deref(), Some("tok"));
    }

    #[test]
    fn bad_port_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PROXY_PORT", "eighty"));
        let err = RetrievalConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("PROXY_PORT"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("REQUEST_TIMEOUT", "0"));
        let err = RetrievalConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SEARCH_CONCURRENCY", "0"));
        assert!(RetrievalConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn unknown_proxy_protocol_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.extend([("PROXY_PROTOCOL", "ftp"), ("PROXY_URL", "proxy.local")]);
        let err = RetrievalConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("PROXY_PROTOCOL"));
        assert!(err.to_string().contains("socks5"));
    }

    #[test]
    fn proxy_protocol_ignored_without_proxy_host() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PROXY_PROTOCOL", "ftp"));
        assert!(RetrievalConfig::from_lookup(lookup(&pairs)).is_ok());
    }

    #[test]
    fn render_only_domains_overridable() {
        let mut pairs = BASE.to_vec();
        pairs.push(("RENDER_ONLY_DOMAINS", "instagram, linkedin ,,"));
        let config = RetrievalConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.render_only_domains, vec!["instagram", "linkedin"]);
    }

    #[test]
    fn invalid_base_url_rejected() {
        let err = RetrievalConfig::from_lookup(lookup(&[
            ("SEARXNG_URL", "not a url"),
            ("BROWSERLESS_URL", "http://r"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SEARXNG_URL"));
    }
}
