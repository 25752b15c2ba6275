//! Fetching raw HTML for a URL.
//!
//! [`RetrievalPolicy`] decides which strategies run and in what order;
//! [`DirectFetcher`] and [`RenderFetcher`] each make exactly one attempt.
//! Both fetchers take the proxy descriptor as an argument and never look
//! at configuration for it themselves.

mod direct;
mod policy;
mod render;

pub use direct::DirectFetcher;
pub use policy::{FetchStrategy, ProxyDescriptor, RetrievalPolicy};
pub use render::RenderFetcher;

use crate::error::FetchError;

/// Largest page body accepted from either fetcher.
pub const MAX_PAGE_SIZE: usize = 5 * 1024 * 1024;

/// Raw HTML on success, the failure reason otherwise.
pub type FetchOutcome = Result<String, FetchError>;

/// Map a finished response to an outcome: non-2xx is a failure, and so is
/// a body that cannot be read or exceeds [`MAX_PAGE_SIZE`].
pub(crate) async fn read_html(url: &str, resp: reqwest::Response) -> FetchOutcome {
    read_html_capped(url, resp, MAX_PAGE_SIZE).await
}

async fn read_html_capped(url: &str, mut resp: reqwest::Response, limit: usize) -> FetchOutcome {
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::UpstreamStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let too_large = |bytes: usize| FetchError::TooLarge {
        url: url.to_string(),
        bytes,
    };
    if let Some(len) = resp.content_length() {
        if len as usize > limit {
            return Err(too_large(len as usize));
        }
    }

    // Streamed so an oversized body without Content-Length stops early.
    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(|e| FetchError::transport(url, e))? {
        body.extend_from_slice(&chunk);
        if body.len() > limit {
            return Err(too_large(body.len()));
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}
