//! Typed snapshot of SOCKET_CLI_* environment variables, read once at startup.

use std::env;

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Environment overrides. Values here take precedence over the config file
/// for the current process only; none of them are ever persisted.
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    pub api_token: Option<String>,
    pub api_base_url: Option<String>,
    pub api_proxy: Option<String>,
    pub org_slug: Option<String>,
    /// Full config override (base64 or raw JSON); puts the store in read-only mode.
    pub config_override: Option<String>,
    pub view_all_risks: bool,
    pub accept_risks: bool,
    pub debug: bool,
    pub no_update_notifier: bool,
    pub node_permissions: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        EnvConfig {
            api_token: non_empty("SOCKET_CLI_API_TOKEN"),
            api_base_url: non_empty("SOCKET_CLI_API_BASE_URL"),
            api_proxy: non_empty("SOCKET_CLI_API_PROXY"),
            org_slug: non_empty("SOCKET_CLI_ORG_SLUG"),
            config_override: non_empty("SOCKET_CLI_CONFIG"),
            view_all_risks: flag("SOCKET_CLI_VIEW_ALL_RISKS"),
            accept_risks: flag("SOCKET_CLI_ACCEPT_RISKS"),
            debug: flag("SOCKET_CLI_DEBUG"),
            no_update_notifier: flag("SOCKET_CLI_NO_UPDATE_NOTIFIER"),
            node_permissions: flag("SOCKET_CLI_NODE_PERMISSIONS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_none() {
        env::set_var("SOCKET_CLI_API_TOKEN", "  ");
        let cfg = EnvConfig::from_env();
        assert!(cfg.api_token.is_none());
        env::remove_var("SOCKET_CLI_API_TOKEN");
    }

    #[test]
    fn flags_accept_1_and_true() {
        env::set_var("SOCKET_CLI_VIEW_ALL_RISKS", "true");
        env::set_var("SOCKET_CLI_ACCEPT_RISKS", "1");
        let cfg = EnvConfig::from_env();
        assert!(cfg.view_all_risks);
        assert!(cfg.accept_risks);
        env::remove_var("SOCKET_CLI_VIEW_ALL_RISKS");
        env::remove_var("SOCKET_CLI_ACCEPT_RISKS");
    }
}
