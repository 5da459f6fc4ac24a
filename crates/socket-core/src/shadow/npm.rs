//! npm/npx shadow: argv normalization, preload injection, permission flags.
//! Interception beyond flag rewriting happens in-process in the child via
//! the preload module; no pre-spawn scan here.

use std::path::{Path, PathBuf};

use crate::env::EnvConfig;
use crate::paths;
use crate::shadow::{find_real_binary, spawn_shadow, Handshake};

/// Flags the wrapper owns: npm's own audit is disabled (Socket does the
/// checking) and progress rendering is controlled by the wrapper.
const STRIPPED_FLAGS: &[&str] = &["--audit", "--no-audit", "--progress", "--no-progress"];
const STRIPPED_VALUE_FLAGS: &[&str] = &["--loglevel", "--node-options"];

pub const PRELOAD_MODULE_NAME: &str = "shadow-npm-inject.js";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NpmBin {
    Npm,
    Npx,
}

impl NpmBin {
    pub fn name(self) -> &'static str {
        match self {
            NpmBin::Npm => "npm",
            NpmBin::Npx => "npx",
        }
    }
}

/// Normalize the argv handed to the real binary: drop the flags we own
/// (including `--flag value` and `--flag=value` forms), leave everything
/// after `--` untouched, and ask for no progress exactly once.
pub fn rewrite_argv(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len() + 1);
    let mut past_separator = false;
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        if past_separator {
            out.push(arg.clone());
            continue;
        }
        if arg == "--" {
            past_separator = true;
            out.push(arg.clone());
            continue;
        }
        if STRIPPED_FLAGS.contains(&arg.as_str()) {
            continue;
        }
        if STRIPPED_VALUE_FLAGS.contains(&arg.as_str()) {
            // Consume the flag's value unless the next token is another flag.
            if iter.peek().map(|next| !next.starts_with('-')).unwrap_or(false) {
                iter.next();
            }
            continue;
        }
        if STRIPPED_VALUE_FLAGS
            .iter()
            .any(|f| arg.starts_with(&format!("{}=", f)))
        {
            continue;
        }
        out.push(arg.clone());
    }
    out.push("--no-progress".to_string());
    out
}

/// Preload module shipped next to the executable, when present.
pub fn preload_module_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.parent()?.join(PRELOAD_MODULE_NAME);
    candidate.is_file().then_some(candidate)
}

/// Node permission-model flags scoped to the paths npm legitimately touches:
/// the project dir, the global prefix, and the npm cache.
pub fn node_permission_options(
    cwd: &Path,
    global_prefix: Option<&Path>,
    cache_dir: &Path,
) -> Vec<String> {
    let mut scoped: Vec<&Path> = vec![cwd, cache_dir];
    if let Some(prefix) = global_prefix {
        scoped.push(prefix);
    }
    let mut opts = vec!["--permission".to_string(), "--allow-child-process".to_string()];
    for path in scoped {
        opts.push(format!("--allow-fs-read={}/*", path.display()));
        opts.push(format!("--allow-fs-write={}/*", path.display()));
    }
    opts
}

fn npm_cache_dir() -> PathBuf {
    std::env::var("NPM_CONFIG_CACHE")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| paths::home_dir().join(".npm"))
}

/// NODE_OPTIONS for the child: existing value plus our preload require and,
/// when enabled, the permission flags.
fn node_options_for_child(env: &EnvConfig, real_binary: &Path, cwd: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if let Ok(existing) = std::env::var("NODE_OPTIONS") {
        if !existing.trim().is_empty() {
            parts.push(existing);
        }
    }
    if let Some(preload) = preload_module_path() {
        parts.push(format!("--require {}", preload.display()));
    }
    if env.node_permissions {
        let global_prefix = real_binary.parent().and_then(|bin| bin.parent());
        parts.extend(node_permission_options(cwd, global_prefix, &npm_cache_dir()));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Shadow entry point for npm/npx: rewrite flags, spawn the real binary with
/// the handshake, and return its exit code.
pub fn run(bin: NpmBin, args: &[String], env: &EnvConfig, api_token: Option<String>) -> Result<i32, String> {
    let real = find_real_binary(bin.name())
        .ok_or_else(|| format!("{} not found on PATH", bin.name()))?;
    let progress = !args.iter().any(|a| a == "--no-progress" || a == "--quiet");
    let child_args = rewrite_argv(args);

    let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
    let mut extra_env = Vec::new();
    if let Some(node_options) = node_options_for_child(env, &real, &cwd) {
        extra_env.push(("NODE_OPTIONS".to_string(), node_options));
    }

    let handshake = Handshake {
        api_token,
        shadow_bin: bin.name().to_string(),
        progress,
    };
    spawn_shadow(&real, &child_args, &extra_env, &handshake)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn strips_audit_and_progress_adds_no_progress_once() {
        let out = rewrite_argv(&argv(&["install", "--audit", "left-pad", "--progress"]));
        assert!(!out.contains(&"--audit".to_string()));
        assert!(!out.contains(&"--progress".to_string()));
        assert_eq!(
            out.iter().filter(|a| a.as_str() == "--no-progress").count(),
            1
        );
        assert!(out.contains(&"install".to_string()));
        assert!(out.contains(&"left-pad".to_string()));
    }

    #[test]
    fn existing_no_progress_not_duplicated() {
        let out = rewrite_argv(&argv(&["install", "--no-progress"]));
        assert_eq!(
            out.iter().filter(|a| a.as_str() == "--no-progress").count(),
            1
        );
    }

    #[test]
    fn strips_loglevel_pair_and_equals_forms() {
        let out = rewrite_argv(&argv(&["install", "--loglevel", "silly", "react"]));
        assert!(!out.contains(&"--loglevel".to_string()));
        assert!(!out.contains(&"silly".to_string()));
        assert!(out.contains(&"react".to_string()));

        let out = rewrite_argv(&argv(&["install", "--loglevel=verbose"]));
        assert!(!out.iter().any(|a| a.starts_with("--loglevel")));
    }

    #[test]
    fn node_options_flag_stripped_but_following_flag_kept() {
        let out = rewrite_argv(&argv(&["--node-options", "--save-dev", "install"]));
        // "--save-dev" starts with '-': treated as the next flag, not the value.
        assert!(out.contains(&"--save-dev".to_string()));
        assert!(!out.contains(&"--node-options".to_string()));
    }

    #[test]
    fn args_after_separator_untouched() {
        let out = rewrite_argv(&argv(&["exec", "tool", "--", "--progress", "--audit"]));
        let sep = out.iter().position(|a| a == "--").expect("separator");
        assert!(out[sep + 1..].contains(&"--progress".to_string()));
        assert!(out[sep + 1..].contains(&"--audit".to_string()));
    }

    #[test]
    fn permission_options_cover_scoped_paths() {
        let opts = node_permission_options(
            Path::new("/work/app"),
            Some(Path::new("/usr/local")),
            Path::new("/home/dev/.npm"),
        );
        assert!(opts.contains(&"--permission".to_string()));
        assert!(opts.contains(&"--allow-fs-read=/work/app/*".to_string()));
        assert!(opts.contains(&"--allow-fs-write=/home/dev/.npm/*".to_string()));
        assert!(opts.contains(&"--allow-fs-read=/usr/local/*".to_string()));
    }
}
