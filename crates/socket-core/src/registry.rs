//! Minimal npm registry client: latest-version lookups only.

use crate::http_client::HttpClient;

const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

pub fn registry_url() -> String {
    std::env::var("NPM_CONFIG_REGISTRY")
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string())
}

/// Latest published version of a package. Scoped names URL-encode the slash.
pub fn latest_version(http: &HttpClient, package: &str) -> Result<String, String> {
    let encoded = if package.starts_with('@') {
        package.replace('/', "%2F")
    } else {
        package.to_string()
    };
    let url = format!("{}/{}/latest", registry_url(), encoded);
    let resp = http.get(&url, None)?;
    if resp.status != 200 {
        return Err(format!("HTTP {}", resp.status));
    }
    let v: serde_json::Value = serde_json::from_slice(&resp.body).map_err(|e| e.to_string())?;
    v.get("version")
        .and_then(|x| x.as_str())
        .map(String::from)
        .ok_or_else(|| "no version in registry response".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_url_env_override() {
        std::env::set_var("NPM_CONFIG_REGISTRY", "https://npm.example.com/");
        assert_eq!(registry_url(), "https://npm.example.com");
        std::env::remove_var("NPM_CONFIG_REGISTRY");
        assert_eq!(registry_url(), DEFAULT_REGISTRY_URL);
    }
}
