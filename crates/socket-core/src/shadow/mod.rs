//! Shadow package-manager wrappers: intercept npm/npx/pnpm invocations,
//! run pre-spawn checks, then hand off to the real binary.

pub mod npm;
pub mod pnpm;

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::log;
use crate::paths;

/// Env var naming the file the one-shot handshake is written to.
pub const HANDSHAKE_ENV: &str = "SOCKET_CLI_SHADOW_HANDSHAKE";

/// The single message sent to the child after spawn. No reply is expected
/// and no further exchange happens.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub api_token: Option<String>,
    pub shadow_bin: String,
    pub progress: bool,
}

/// Find the real binary on PATH, skipping the directory of the current
/// executable so a shim installed next to us never shadows itself.
pub fn find_real_binary(name: &str) -> Option<PathBuf> {
    let own_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf));
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        if own_dir.as_deref() == Some(dir.as_path()) {
            continue;
        }
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            for ext in ["cmd", "exe", "bat"] {
                let with_ext = dir.join(format!("{}.{}", name, ext));
                if with_ext.is_file() {
                    return Some(with_ext);
                }
            }
        }
    }
    None
}

fn handshake_path() -> PathBuf {
    paths::data_dir()
        .join("shadow")
        .join(format!("handshake-{}.json", std::process::id()))
}

fn write_handshake(path: &Path, handshake: &Handshake) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let tmp = path.with_extension("tmp");
    let body = serde_json::to_string(handshake).map_err(|e| e.to_string())?;
    std::fs::write(&tmp, body).map_err(|e| e.to_string())?;
    std::fs::rename(&tmp, path).map_err(|e| e.to_string())?;
    Ok(())
}

/// Spawn the real binary with inherited stdio, deliver the handshake right
/// after spawn, and wait. Exactly one child per invocation.
pub fn spawn_shadow(
    binary: &Path,
    args: &[String],
    extra_env: &[(String, String)],
    handshake: &Handshake,
) -> Result<i32, String> {
    let hs_path = handshake_path();
    let mut command = Command::new(binary);
    command.args(args).env(HANDSHAKE_ENV, &hs_path);
    for (key, value) in extra_env {
        command.env(key, value);
    }

    let mut child = command
        .spawn()
        .map_err(|e| format!("failed to spawn {}: {}", binary.display(), e))?;

    // One message, immediately post-spawn. A handshake failure must not take
    // down the install the user asked for.
    if let Err(e) = write_handshake(&hs_path, handshake) {
        log::warn(&format!("could not deliver shadow handshake: {}", e));
    }

    let status = child
        .wait()
        .map_err(|e| format!("failed to wait for {}: {}", binary.display(), e));
    let _ = std::fs::remove_file(&hs_path);
    Ok(status?.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_serializes_camel_case() {
        let hs = Handshake {
            api_token: Some("tok".to_string()),
            shadow_bin: "npm".to_string(),
            progress: false,
        };
        let v = serde_json::to_value(&hs).unwrap();
        assert_eq!(v["apiToken"], "tok");
        assert_eq!(v["shadowBin"], "npm");
        assert_eq!(v["progress"], false);
    }

    #[cfg(unix)]
    #[test]
    fn spawn_shadow_returns_child_exit_code() {
        let hs = Handshake {
            api_token: None,
            shadow_bin: "npm".to_string(),
            progress: false,
        };
        let td = tempfile::tempdir().expect("tmp");
        std::env::set_var("SOCKET_CLI_DATA_DIR", td.path());
        let code = spawn_shadow(
            Path::new("/bin/sh"),
            &["-c".to_string(), "exit 7".to_string()],
            &[],
            &hs,
        )
        .expect("spawn");
        assert_eq!(code, 7);
        std::env::remove_var("SOCKET_CLI_DATA_DIR");
    }
}
