use std::sync::{Arc, OnceLock};
use std::time::Duration;

use http::Extensions;
use reqwest_middleware::{Middleware, Next};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

// Full-category crawls issue thousands of search calls; keep Monarch at ~10 req/sec.
const MONARCH_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Spaces consecutive requests at least `min_interval` apart.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    min_interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: Mutex::new(None),
        }
    }

    pub(crate) async fn wait(&self) {
        loop {
            let now = Instant::now();
            let mut last = self.last_sent.lock().await;
            match last.map(|at| at + self.min_interval) {
                Some(target) if target > now => {
                    drop(last);
                    sleep_until(target).await;
                }
                _ => {
                    *last = Some(now);
                    return;
                }
            }
        }
    }
}

static GLOBAL_RATE_LIMITER: OnceLock<Arc<RateLimiter>> = OnceLock::new();

fn global_limiter() -> Arc<RateLimiter> {
    GLOBAL_RATE_LIMITER
        .get_or_init(|| Arc::new(RateLimiter::new(MONARCH_MIN_INTERVAL)))
        .clone()
}

#[derive(Clone, Debug)]
pub(crate) struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub(crate) fn new() -> Self {
        Self {
            limiter: global_limiter(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        self.limiter.wait().await;
        next.run(req, extensions).await
    }
}
