//! Shared HTTP client stack and the upstream Monarch search client.

use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::warn;

use crate::error::MappingError;

pub(crate) mod monarch;
pub(crate) mod rate_limit;

const ERROR_BODY_MAX_BYTES: usize = 2048;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

static HTTP_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();
static CRAWL_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();

pub(crate) fn env_base(default: &'static str, env_var: &str) -> Cow<'static, str> {
    std::env::var(env_var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(Cow::Owned)
        .unwrap_or_else(|| Cow::Borrowed(default))
}

/// Returns a shared HTTP client with retry and rate-limit middleware.
///
/// - Retry: 3 attempts with exponential backoff for transient errors
/// - Rate limit: minimum interval between requests
pub(crate) fn shared_client() -> Result<ClientWithMiddleware, MappingError> {
    cached_client(&HTTP_CLIENT, true)
}

/// Rate-limited client without transport retries, for callers that retry
/// whole pages themselves.
pub(crate) fn crawl_client() -> Result<ClientWithMiddleware, MappingError> {
    cached_client(&CRAWL_CLIENT, false)
}

fn cached_client(
    cell: &OnceLock<ClientWithMiddleware>,
    with_retry: bool,
) -> Result<ClientWithMiddleware, MappingError> {
    if let Some(client) = cell.get() {
        return Ok(client.clone());
    }

    let base_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("monarch-omim/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(MappingError::HttpClientInit)?;

    let mut builder = ClientBuilder::new(base_client);
    if with_retry {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
    }
    let client = builder.with(rate_limit::RateLimitMiddleware::new()).build();

    match cell.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => cell.get().cloned().ok_or_else(|| MappingError::Api {
            api: "http-client".into(),
            message: "Shared HTTP client initialization race".into(),
        }),
    }
}

pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let full = String::from_utf8_lossy(bytes);

    let truncated: &str = if full.len() > ERROR_BODY_MAX_BYTES {
        let mut end = ERROR_BODY_MAX_BYTES;
        while end > 0 && !full.is_char_boundary(end) {
            end -= 1;
        }
        &full[..end]
    } else {
        full.as_ref()
    };

    let mut s = truncated.trim().replace(['\n', '\r', '\t'], " ");
    if full.len() > ERROR_BODY_MAX_BYTES {
        s.push_str(" …");
    }
    s
}

pub(crate) fn ensure_json_content_type(
    api: &str,
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), MappingError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let raw = match content_type.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            warn!(
                source = api,
                "Response content-type header was not valid UTF-8; attempting JSON parse"
            );
            return Ok(());
        }
    };
    if raw.is_empty() {
        return Ok(());
    }

    let media_type = raw
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_html = matches!(media_type.as_str(), "text/html" | "application/xhtml+xml");
    if is_html {
        return Err(MappingError::Api {
            api: api.to_string(),
            message: format!(
                "Unexpected HTML response (content-type: {raw}): {}",
                body_excerpt(body)
            ),
        });
    }

    let is_json = media_type == "application/json"
        || media_type == "text/json"
        || media_type.ends_with("+json");
    if !is_json {
        warn!(
            source = api,
            content_type = raw,
            "Unexpected non-JSON content type; attempting JSON parse for compatibility"
        );
    }

    Ok(())
}

pub(crate) async fn read_limited_body(
    mut resp: reqwest::Response,
    api: &str,
) -> Result<Vec<u8>, MappingError> {
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = resp.chunk().await? {
        let next_len = body.len().saturating_add(chunk.len());
        if next_len > DEFAULT_MAX_BODY_BYTES {
            return Err(MappingError::Api {
                api: api.to_string(),
                message: format!("Response body exceeded {DEFAULT_MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
