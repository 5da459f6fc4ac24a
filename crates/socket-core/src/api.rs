//! Socket API wrapper: request shaping, CResult normalization, pagination.
//! All scanning and analytics logic lives server-side; this layer only
//! builds requests and renders responses.

use serde_json::{json, Value};

use crate::http_client::{HttpClient, HttpResponse};
use crate::result::CResult;

pub const DEFAULT_API_BASE_URL: &str = "https://api.socket.dev/v0";

/// Safety cap for "fetch everything" pagination loops.
pub const MAX_PAGES: usize = 100;

pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str, proxy: Option<&str>) -> Result<Self, String> {
        Ok(ApiClient {
            http: HttpClient::new(proxy)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// The underlying client, shared with registry lookups so one agent's
    /// connections serve the whole invocation.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn get_json(&self, path: &str) -> CResult<Value> {
        let resp = self.http.get(&self.url(path), Some(&self.token));
        normalize_response(resp)
    }

    pub fn post_json(&self, path: &str, body: &Value) -> CResult<Value> {
        let bytes = body.to_string().into_bytes();
        let resp = self
            .http
            .post_json(&self.url(path), Some(&self.token), &bytes);
        normalize_response(resp)
    }

    // -- Domain queries. Thin: one endpoint each, CResult out. --

    pub fn organizations(&self) -> CResult<Value> {
        self.get_json("organizations")
    }

    pub fn repository_list(&self, org: &str) -> CResult<Vec<Value>> {
        fetch_all_pages(|page| {
            let path = format!("orgs/{}/repos?per_page=100&page={}", org, page);
            let v = self.get_json(&path).into_result()?;
            Ok(page_from_response(&v))
        })
    }

    pub fn repository_create(&self, org: &str, name: &str, options: &Value) -> CResult<Value> {
        let mut body = options.clone();
        body["name"] = json!(name);
        self.post_json(&format!("orgs/{}/repos", org), &body)
    }

    pub fn scan_list(&self, org: &str) -> CResult<Vec<Value>> {
        fetch_all_pages(|page| {
            let path = format!("orgs/{}/full-scans?per_page=100&page={}", org, page);
            let v = self.get_json(&path).into_result()?;
            Ok(page_from_response(&v))
        })
    }

    pub fn scan_view(&self, org: &str, scan_id: &str) -> CResult<Value> {
        self.get_json(&format!("orgs/{}/full-scans/{}", org, scan_id))
    }

    /// Submit the project's package list as a new scan.
    pub fn scan_create(&self, org: &str, packages: &[String], options: &Value) -> CResult<Value> {
        let mut body = options.clone();
        body["packages"] = json!(packages);
        self.post_json(&format!("orgs/{}/full-scans", org), &body)
    }

    pub fn package_score(&self, name: &str, version: &str) -> CResult<Value> {
        let encoded = name.replace('/', "%2F");
        self.get_json(&format!("npm/{}/{}/score", encoded, version))
    }

    /// Shallow report: alert list for a single purl, no historical data.
    pub fn package_shallow(&self, purl: &str) -> CResult<Value> {
        self.post_json("purl?alerts=true", &json!({ "components": [{ "purl": purl }] }))
    }

    pub fn org_analytics(&self, days: u32) -> CResult<Value> {
        self.get_json(&format!("analytics/org/{}", days))
    }

    pub fn repo_analytics(&self, repo: &str, days: u32) -> CResult<Value> {
        self.get_json(&format!("analytics/repo/{}/{}", repo, days))
    }

    pub fn quota(&self) -> CResult<Value> {
        self.get_json("quota")
    }

    /// Alert lookup for the shadow wrapper. Plain Result: the caller fails
    /// open on Err, so quota/transport failures must stay distinguishable
    /// from an empty alert map.
    pub fn batch_package_alerts(&self, purls: &[String]) -> Result<Vec<Value>, String> {
        if purls.is_empty() {
            return Ok(Vec::new());
        }
        let components: Vec<Value> = purls.iter().map(|p| json!({ "purl": p })).collect();
        let body = json!({ "components": components });
        self.post_json("purl?alerts=true", &body)
            .into_result()
            .map(|v| match v {
                Value::Array(rows) => rows,
                other => vec![other],
            })
    }
}

fn normalize_response(resp: Result<HttpResponse, String>) -> CResult<Value> {
    let resp = match resp {
        Ok(r) => r,
        Err(e) => return CResult::fail_with_cause("Unable to reach the Socket API", e),
    };
    if resp.status == 429 {
        return CResult::fail_with_code(
            "API quota exceeded. Try again later, or contact your organization admin about the plan limits.",
            429,
        );
    }
    if !(200..300).contains(&resp.status) {
        let detail = serde_json::from_slice::<Value>(&resp.body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(String::from)
            });
        let message = match resp.status {
            401 | 403 => "Invalid or unauthorized API token".to_string(),
            _ => format!("Socket API returned HTTP {}", resp.status),
        };
        return match detail {
            Some(cause) => CResult::Err {
                message,
                cause: Some(cause),
                code: Some(resp.status),
            },
            None => CResult::fail_with_code(message, resp.status),
        };
    }
    if resp.body.is_empty() {
        return CResult::ok(Value::Null);
    }
    match serde_json::from_slice(&resp.body) {
        Ok(v) => CResult::ok(v),
        Err(e) => CResult::fail_with_cause("Unexpected API response", e.to_string()),
    }
}

/// One page of a paginated listing. `next_page` None or < 1 means done.
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<i64>,
}

fn page_from_response(v: &Value) -> Page<Value> {
    let items = v
        .get("results")
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();
    let next_page = v.get("nextPage").and_then(|n| n.as_i64());
    Page { items, next_page }
}

/// Drive a cursor loop until the source reports no next page, aggregating
/// results in order. Aborts after MAX_PAGES iterations.
pub fn fetch_all_pages<T, F>(mut fetch: F) -> CResult<Vec<T>>
where
    F: FnMut(i64) -> Result<Page<T>, String>,
{
    let mut all = Vec::new();
    let mut page: i64 = 1;
    for _ in 0..MAX_PAGES {
        match fetch(page) {
            Ok(mut result) => {
                all.append(&mut result.items);
                match result.next_page {
                    Some(next) if next > 0 => page = next,
                    _ => return CResult::ok(all),
                }
            }
            Err(e) => return CResult::fail_with_cause("Fetching pages failed", e),
        }
    }
    CResult::fail("Infinite loop detected while fetching all pages")
}
