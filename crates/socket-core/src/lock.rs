//! Cross-process mutex via atomic mkdir. A lock directory older than the
//! staleness threshold is treated as abandoned and stolen.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;

use crate::log;

#[derive(Clone, Debug)]
pub struct LockOptions {
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        LockOptions {
            retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            stale_after: Duration::from_secs(10),
        }
    }
}

static HELD_LOCKS: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// A held lock. Dropping releases it; `release_all` covers process exit.
pub struct ProcessLock {
    path: PathBuf,
    released: bool,
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|mtime| mtime.elapsed().ok())
        .map(|age| age > stale_after)
        .unwrap_or(false)
}

pub fn acquire(path: &Path) -> Result<ProcessLock, String> {
    acquire_with(path, &LockOptions::default())
}

pub fn acquire_with(path: &Path, opts: &LockOptions) -> Result<ProcessLock, String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("create {}: {}", parent.display(), e))?;
    }
    let mut attempt = 0u32;
    let mut delay = opts.base_delay;
    loop {
        match fs::create_dir(path) {
            Ok(()) => {
                if let Ok(mut held) = HELD_LOCKS.lock() {
                    held.push(path.to_path_buf());
                }
                return Ok(ProcessLock {
                    path: path.to_path_buf(),
                    released: false,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if is_stale(path, opts.stale_after) && fs::remove_dir_all(path).is_ok() {
                    log::debug(&format!("removed stale lock {}", path.display()));
                    continue;
                }
                if attempt >= opts.retries {
                    return Err(format!(
                        "could not acquire lock {} after {} attempt(s)",
                        path.display(),
                        attempt + 1
                    ));
                }
                attempt += 1;
                let jitter_ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 2);
                std::thread::sleep(delay + Duration::from_millis(jitter_ms));
                delay = (delay * 2).min(opts.max_delay);
            }
            Err(e) => return Err(format!("lock {}: {}", path.display(), e)),
        }
    }
}

impl ProcessLock {
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let _ = fs::remove_dir_all(&self.path);
        if let Ok(mut held) = HELD_LOCKS.lock() {
            held.retain(|p| p != &self.path);
        }
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Remove every lock this process still holds. Called from the binary's exit
/// path (normal or signal-initiated) as a best-effort cleanup.
pub fn release_all() {
    if let Ok(mut held) = HELD_LOCKS.lock() {
        for path in held.drain(..) {
            let _ = fs::remove_dir_all(&path);
        }
    }
}
