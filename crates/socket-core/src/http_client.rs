//! HTTP client: one Agent per client (connection reuse), bounded retries
//! with exponential backoff on 429 and 5xx.

use std::io::Read;
use std::time::Duration;

const REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RETRY_COUNT: usize = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;
const RETRY_BACKOFF_CAP_MS: u64 = 5_000;

fn retry_count_from_env() -> usize {
    std::env::var("SOCKET_CLI_HTTP_RETRIES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_RETRY_COUNT)
}

fn retry_backoff_ms_from_env() -> u64 {
    std::env::var("SOCKET_CLI_HTTP_RETRY_BACKOFF_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_BACKOFF_MS)
}

/// Status and body of a completed request. Non-2xx is a response here, not an
/// error; only transport failures and exhausted retries surface as Err.
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(proxy: Option<&str>) -> Result<Self, String> {
        let mut builder =
            ureq::AgentBuilder::new().timeout(Duration::from_millis(REQUEST_TIMEOUT_MS));
        if let Some(proxy_url) = proxy {
            let proxy = ureq::Proxy::new(proxy_url)
                .map_err(|e| format!("invalid proxy {}: {}", proxy_url, e))?;
            builder = builder.proxy(proxy);
        }
        Ok(HttpClient {
            agent: builder.build(),
        })
    }

    pub fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse, String> {
        self.send_with_retry(|| {
            let req = self.agent.get(url);
            let req = match bearer {
                Some(token) if !token.is_empty() => {
                    req.set("Authorization", &format!("Bearer {}", token))
                }
                _ => req,
            };
            req.call()
        })
    }

    pub fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &[u8],
    ) -> Result<HttpResponse, String> {
        self.send_with_retry(|| {
            let req = self
                .agent
                .post(url)
                .set("Content-Type", "application/json");
            let req = match bearer {
                Some(token) if !token.is_empty() => {
                    req.set("Authorization", &format!("Bearer {}", token))
                }
                _ => req,
            };
            req.send_bytes(body)
        })
    }

    fn send_with_retry<F>(&self, mut send: F) -> Result<HttpResponse, String>
    where
        F: FnMut() -> Result<ureq::Response, ureq::Error>,
    {
        let retries = retry_count_from_env();
        let mut attempt = 0usize;
        let mut backoff = retry_backoff_ms_from_env();
        loop {
            attempt += 1;
            let outcome = match send() {
                Ok(resp) => Ok(resp),
                Err(ureq::Error::Status(code, resp)) => {
                    if attempt <= retries && (code >= 500 || code == 429) {
                        std::thread::sleep(Duration::from_millis(backoff));
                        backoff = backoff.saturating_mul(2).min(RETRY_BACKOFF_CAP_MS);
                        continue;
                    }
                    Ok(resp)
                }
                Err(e) => {
                    if attempt <= retries {
                        std::thread::sleep(Duration::from_millis(backoff));
                        backoff = backoff.saturating_mul(2).min(RETRY_BACKOFF_CAP_MS);
                        continue;
                    }
                    Err(e.to_string())
                }
            };
            return outcome.and_then(|resp| {
                let status = resp.status();
                let mut body = Vec::new();
                resp.into_reader()
                    .read_to_end(&mut body)
                    .map_err(|e| e.to_string())?;
                Ok(HttpResponse { status, body })
            });
        }
    }
}
