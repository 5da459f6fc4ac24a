//! Core library for the Socket CLI: config store, API client, alert checks,
//! shadow package-manager wrappers, process lock, and update store.
//! Used by the CLI binary; can be reused by other tools.

pub mod alerts;
pub mod api;
pub mod config;
pub mod env;
pub mod http_client;
pub mod lock;
pub mod log;
pub mod manifest;
pub mod output;
pub mod paths;
pub mod purl;
pub mod registry;
pub mod result;
pub mod shadow;
pub mod update_store;

// Re-export main API for the CLI
pub use api::{ApiClient, DEFAULT_API_BASE_URL};
pub use config::{ConfigStore, KNOWN_KEYS};
pub use env::EnvConfig;
pub use http_client::HttpClient;
pub use lock::{acquire as acquire_lock, release_all as release_all_locks, LockOptions};
pub use output::OutputKind;
pub use result::CResult;
pub use update_store::{check_for_update, UpdateStore};

use serde_json::Value;

/// Everything a command handler needs, built once in main and threaded
/// through calls. No process-wide singletons.
pub struct CliContext {
    pub env: EnvConfig,
    pub config: ConfigStore,
}

impl CliContext {
    /// Env snapshot plus the config store; an override via flag or env puts
    /// the store in read-only mode.
    pub fn new(config_flag: Option<&str>) -> Result<Self, String> {
        let env = EnvConfig::from_env();
        let override_blob = config_flag
            .map(String::from)
            .or_else(|| env.config_override.clone());
        let config = match override_blob {
            Some(blob) => ConfigStore::with_override(paths::settings_path(), &blob)?,
            None => ConfigStore::open(),
        };
        Ok(CliContext { env, config })
    }

    /// Token precedence: env override, then config file.
    pub fn api_token(&mut self) -> Option<String> {
        self.env
            .api_token
            .clone()
            .or_else(|| self.config.get_string("apiToken"))
    }

    pub fn api_base_url(&mut self) -> String {
        self.env
            .api_base_url
            .clone()
            .or_else(|| self.config.get_string("apiBaseUrl"))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn api_proxy(&mut self) -> Option<String> {
        self.env
            .api_proxy
            .clone()
            .or_else(|| self.config.get_string("apiProxy"))
    }

    /// Org precedence: env, then the configured default.
    pub fn org_slug(&mut self) -> Option<String> {
        self.env
            .org_slug
            .clone()
            .or_else(|| self.config.get_string("defaultOrg"))
    }

    /// API client for commands that talk to Socket. Missing token is an auth
    /// error, reported distinctly from API failures.
    pub fn api_client(&mut self) -> Result<ApiClient, String> {
        let token = self.api_token().ok_or(
            "No API token. Run `socket config set apiToken <token>` or set SOCKET_CLI_API_TOKEN.",
        )?;
        let base_url = self.api_base_url();
        let proxy = self.api_proxy();
        ApiClient::new(&base_url, &token, proxy.as_deref())
    }

    /// API client when a token happens to be configured; None otherwise.
    /// Shadow commands use this: no token means no gate, never a hard error.
    pub fn api_client_if_configured(&mut self) -> Option<ApiClient> {
        if self.api_token().is_none() {
            return None;
        }
        match self.api_client() {
            Ok(client) => Some(client),
            Err(e) => {
                log::warn(&e);
                None
            }
        }
    }

    pub fn flush_config(&mut self) -> Result<(), String> {
        self.config.flush()
    }
}

/// First org slug from an organizations response, for `config auto` and
/// unset default orgs.
pub fn first_org_slug(organizations: &Value) -> Option<String> {
    organizations
        .get("organizations")
        .and_then(|orgs| orgs.as_object())
        .and_then(|orgs| orgs.values().next())
        .and_then(|org| org.get("slug"))
        .and_then(|slug| slug.as_str())
        .map(String::from)
}
