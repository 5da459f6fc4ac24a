//! Debug log to file, mirrored to stderr when SOCKET_CLI_DEBUG is on.
//! Warnings always reach stderr; the log file is append-only.

use std::fs::OpenOptions;
use std::io::Write;

use chrono::Local;

use crate::paths;

fn debug_enabled() -> bool {
    std::env::var("SOCKET_CLI_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn append_to_file(line: &str) {
    let path = paths::log_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    // Append-only: no read-back. Failures here must never affect the command.
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = writeln!(file, "{}", line);
    }
}

pub fn debug(message: &str) {
    let line = format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
    if debug_enabled() {
        eprintln!("{}", line);
    }
    append_to_file(&line);
}

pub fn warn(message: &str) {
    eprintln!("warning: {}", message);
    append_to_file(&format!(
        "[{}] warn: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    ));
}
