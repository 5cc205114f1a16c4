use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install the fmt subscriber once. `RUST_LOG` wins; otherwise `default_level`.
pub fn init_tracing_once(default_level: &str) {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .try_init();
    });
}

/// Side file for diagnostics: `parse_errors.log` next to the input.
pub fn default_log_path(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.join("parse_errors.log"))
        .unwrap_or_else(|| PathBuf::from("parse_errors.log"))
}

/// Transient errors seen on Windows when AV/backup filter drivers or sharing
/// violations hold a handle briefly.
fn is_retriable_io_error(e: &io::Error) -> bool {
    // 5 access denied, 32 sharing violation, 33 lock violation, 1224 user-mapped section open
    matches!(e.raw_os_error(), Some(5) | Some(32) | Some(33) | Some(1224))
}

fn with_backoff<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let tries = tries.max(1);
    let mut attempt = 0;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) && attempt + 1 < tries => {
                attempt += 1;
                sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Open a file for reading, retrying transient errors.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, || File::open(path))
}

/// Create (truncate) a file, retrying transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, || File::create(path))
}

/// Promote a fully written temp file to `dest`. Falls back to copy+remove when the
/// rename is refused (e.g. across volumes).
pub fn replace_file_atomic(tmp: &Path, dest: &Path) -> Result<()> {
    if with_backoff(20, 50, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    with_backoff(20, 50, || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    with_backoff(20, 50, || fs::remove_file(tmp)).with_context(|| format!("remove {}", tmp.display()))?;
    Ok(())
}
