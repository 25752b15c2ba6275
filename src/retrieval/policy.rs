use crate::config::{ProxySettings, RetrievalConfig};

/// One step of a fetch plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    Direct,
    Render,
}

const DIRECT_THEN_RENDER: &[FetchStrategy] = &[FetchStrategy::Direct, FetchStrategy::Render];
const RENDER_ONLY: &[FetchStrategy] = &[FetchStrategy::Render];

/// Resolved upstream proxy, handed unchanged to every fetcher.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
}

impl ProxyDescriptor {
    /// All-or-nothing: host, username and port must all be set.
    pub fn from_settings(settings: &ProxySettings) -> Option<Self> {
        match (&settings.host, &settings.username, settings.port) {
            (Some(host), Some(username), Some(port)) => Some(Self {
                scheme: settings.scheme.clone(),
                host: host.clone(),
                port,
                username: username.clone(),
                password: settings.password.clone(),
            }),
            _ => None,
        }
    }

    /// `scheme://host:port` without credentials.
    pub fn server_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Username and password, only when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.password
            .as_deref()
            .map(|password| (self.username.as_str(), password))
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("server", &self.server_url())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Chooses how a URL is fetched.
#[derive(Debug, Clone)]
pub struct RetrievalPolicy {
    render_only_domains: Vec<String>,
    proxy: Option<ProxyDescriptor>,
}

impl RetrievalPolicy {
    pub fn new(config: &RetrievalConfig) -> Self {
        let proxy = ProxyDescriptor::from_settings(&config.proxy);
        if let Some(ref p) = proxy {
            tracing::info!(proxy = ?p, "outbound fetches routed through proxy");
        }
        Self {
            render_only_domains: config.render_only_domains.clone(),
            proxy,
        }
    }

    /// Whether the URL matches a render-only domain (plain substring test).
    pub fn is_render_only(&self, url: &str) -> bool {
        self.render_only_domains
            .iter()
            .any(|domain| url.contains(domain.as_str()))
    }

    /// Strategies to try in order; the first one that yields HTML wins.
    pub fn plan(&self, url: &str) -> &'static [FetchStrategy] {
        if self.is_render_only(url) {
            RENDER_ONLY
        } else {
            DIRECT_THEN_RENDER
        }
    }

    pub fn proxy(&self) -> Option<&ProxyDescriptor> {
        self.proxy.as_ref()
    }
}
