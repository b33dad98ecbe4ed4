use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::{Upstream, YAHOO_REFERER};
use crate::http_client::HttpRequest;
use crate::provider::SourceError;

const COOKIE_ENDPOINT: &str = "https://fc.yahoo.com";
const CRUMB_ENDPOINTS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];

#[derive(Debug, Clone)]
struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Cookie and crumb pair required by the Yahoo quote endpoint.
///
/// The session cookie lands in the transport's cookie jar; only the crumb is kept here.
#[derive(Debug)]
pub struct YahooSession {
    crumb: Mutex<Option<CachedCrumb>>,
    ttl: Duration,
}

impl Default for YahooSession {
    fn default() -> Self {
        Self::new(Duration::from_secs(3_600))
    }
}

impl YahooSession {
    pub fn new(ttl: Duration) -> Self {
        Self {
            crumb: Mutex::new(None),
            ttl,
        }
    }

    fn cached(&self) -> Option<String> {
        let crumb = self.crumb.lock().unwrap_or_else(PoisonError::into_inner);
        crumb
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.value.clone())
    }

    /// Drops the cached crumb so the next call fetches a fresh one.
    pub fn invalidate(&self) {
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) async fn crumb(&self, upstream: &Upstream) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached() {
            return Ok(crumb);
        }

        let crumb = self.fetch_crumb(upstream).await?;
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = Some(CachedCrumb {
            value: crumb.clone(),
            fetched_at: Instant::now(),
        });
        Ok(crumb)
    }

    async fn fetch_crumb(&self, upstream: &Upstream) -> Result<String, SourceError> {
        let http_client = upstream.http_client();
        let cookie_request = HttpRequest::get(COOKIE_ENDPOINT)
            .with_header("referer", YAHOO_REFERER)
            .with_timeout_ms(upstream.timeout_ms());

        // fc.yahoo.com answers 404 but still sets the session cookie
        http_client.execute(cookie_request).await.map_err(|error| {
            SourceError::unavailable(format!("failed to open yahoo session: {}", error.message()))
        })?;

        for endpoint in CRUMB_ENDPOINTS {
            let request = HttpRequest::get(endpoint)
                .with_header("referer", YAHOO_REFERER)
                .with_timeout_ms(upstream.timeout_ms());

            let response = match http_client.execute(request).await {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    debug!(endpoint, status = response.status, "yahoo crumb endpoint refused");
                    continue;
                }
                Err(error) => {
                    debug!(endpoint, error = error.message(), "yahoo crumb endpoint failed");
                    continue;
                }
            };

            let body = response.body.trim();
            if body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited("yahoo rate limited the crumb request"));
            }
            if is_plausible_crumb(body) {
                return Ok(body.to_owned());
            }
        }

        Err(SourceError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

fn is_plausible_crumb(body: &str) -> bool {
    !body.is_empty()
        && body.len() < 100
        && !body.contains(char::is_whitespace)
        && !body.contains('<')
        && !body.contains('{')
}
