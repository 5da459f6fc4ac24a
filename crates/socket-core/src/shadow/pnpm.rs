//! pnpm shadow: pre-spawn security gate. add/dlx invocations are checked
//! against the specifiers on the command line; install/update invocations
//! against the whole project. Lookup failures fail open; a blocking alert
//! fails closed with exit 1 before the real binary runs.

use crate::alerts;
use crate::api::ApiClient;
use crate::env::EnvConfig;
use crate::http_client::HttpClient;
use crate::log;
use crate::manifest;
use crate::purl::PackageSpec;
use crate::registry;
use crate::shadow::{find_real_binary, spawn_shadow, Handshake};

const SPEC_GATED: &[&str] = &["add", "dlx"];
const LOCKFILE_GATED: &[&str] = &["install", "i", "update", "up", "upgrade"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstallGate {
    /// Check the package specifiers given on the command line.
    Specs,
    /// Check every dependency of the project.
    Lockfile,
    /// Not an installing command; no check.
    None,
}

/// The gate is decided by the first non-flag argument (the pnpm subcommand).
pub fn classify(args: &[String]) -> InstallGate {
    match args.iter().find(|a| !a.starts_with('-')) {
        Some(cmd) if SPEC_GATED.contains(&cmd.as_str()) => InstallGate::Specs,
        Some(cmd) if LOCKFILE_GATED.contains(&cmd.as_str()) => InstallGate::Lockfile,
        _ => InstallGate::None,
    }
}

/// Package specifiers from the argv: everything non-flag after the subcommand.
pub fn collect_spec_args(args: &[String]) -> Vec<String> {
    let mut seen_subcommand = false;
    let mut specs = Vec::new();
    for arg in args {
        if arg.starts_with('-') {
            continue;
        }
        if !seen_subcommand {
            seen_subcommand = true;
            continue;
        }
        specs.push(arg.clone());
    }
    specs
}

/// Resolve command-line specifiers to purls. Versionless specs resolve to
/// the registry's latest; anything unresolvable is skipped (the lookup must
/// not block an install over a spec we cannot name).
fn spec_purls(http: &HttpClient, specs: &[String]) -> Vec<String> {
    let mut purls = Vec::new();
    for raw in specs {
        let Some(spec) = PackageSpec::parse(raw) else {
            continue;
        };
        match spec.purl() {
            Some(purl) => purls.push(purl),
            None => match registry::latest_version(http, &spec.name) {
                Ok(version) => purls.push(crate::purl::npm_purl(&spec.name, &version)),
                Err(e) => log::debug(&format!("could not resolve {}: {}", spec.name, e)),
            },
        }
    }
    purls
}

/// Shadow entry point for pnpm.
pub fn run(
    args: &[String],
    env: &EnvConfig,
    api: Option<&ApiClient>,
    api_token: Option<String>,
) -> Result<i32, String> {
    if let Some(api) = api {
        let purls = match classify(args) {
            InstallGate::Specs => Some(spec_purls(api.http(), &collect_spec_args(args))),
            InstallGate::Lockfile => {
                let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
                match manifest::project_purls(&cwd) {
                    Ok(purls) => Some(purls),
                    Err(e) => {
                        log::debug(&format!("skipping project check: {}", e));
                        None
                    }
                }
            }
            InstallGate::None => None,
        };
        if let Some(purls) = purls.filter(|p| !p.is_empty()) {
            match api.batch_package_alerts(&purls) {
                Ok(rows) => {
                    let reports = alerts::parse_alert_rows(&rows);
                    if alerts::has_blocking(&reports) && !env.accept_risks {
                        eprint!("{}", alerts::render_report(&reports, env.view_all_risks));
                        eprintln!("Set SOCKET_CLI_ACCEPT_RISKS=1 to install anyway.");
                        return Ok(1);
                    }
                }
                // Fail open: a broken lookup must not block installs.
                Err(e) => log::warn(&format!("security lookup failed, continuing: {}", e)),
            }
        }
    }

    let real = find_real_binary("pnpm").ok_or("pnpm not found on PATH")?;
    let progress = !args.iter().any(|a| a == "--no-progress" || a == "--silent");
    let handshake = Handshake {
        api_token,
        shadow_bin: "pnpm".to_string(),
        progress,
    };
    spawn_shadow(&real, args, &[], &handshake)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classify_add_and_dlx_gate_on_specs() {
        assert_eq!(classify(&argv(&["add", "lodash"])), InstallGate::Specs);
        assert_eq!(classify(&argv(&["dlx", "create-react-app"])), InstallGate::Specs);
    }

    #[test]
    fn classify_install_family_gates_on_lockfile() {
        for cmd in ["install", "i", "update", "up", "upgrade"] {
            assert_eq!(classify(&argv(&[cmd])), InstallGate::Lockfile, "{}", cmd);
        }
    }

    #[test]
    fn classify_other_commands_skip_gate() {
        assert_eq!(classify(&argv(&["run", "build"])), InstallGate::None);
        assert_eq!(classify(&argv(&["--version"])), InstallGate::None);
        assert_eq!(classify(&argv(&[])), InstallGate::None);
    }

    #[test]
    fn classify_skips_leading_flags() {
        assert_eq!(
            classify(&argv(&["--dir", "add"])),
            InstallGate::Specs,
            "first non-flag token decides"
        );
    }

    #[test]
    fn collect_specs_after_subcommand() {
        let specs = collect_spec_args(&argv(&["add", "--save-dev", "lodash@4.17.21", "react"]));
        assert_eq!(specs, vec!["lodash@4.17.21".to_string(), "react".to_string()]);
    }
}
