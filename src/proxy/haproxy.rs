//! Default HAProxy configuration on the host.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Minimal configuration that lets the stock HAProxy image start.
/// Serves a health check on :65535/test until the companion bundle takes over.
pub const DEFAULT_HAPROXY_CFG: &str = "\
defaults
  log global
  mode    http
  option  httplog
  option  dontlognull
  timeout connect 5000
  timeout client  50000
  timeout server  50000

frontend conductr-haproxy-test
  bind :65535
  mode http
  monitor-uri /test
";

/// Create `dir` and write the default config to `cfg_path` unless a file is already there.
///
/// Returns `true` if the file was written. Existing files are left untouched
/// so operator edits survive restarts.
pub fn ensure_config(dir: &Path, cfg_path: &Path) -> io::Result<bool> {
    fs::create_dir_all(dir)?;

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(cfg_path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %cfg_path.display(), "haproxy:config kept");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };
    file.write_all(DEFAULT_HAPROXY_CFG.as_bytes())?;
    debug!(path = %cfg_path.display(), "haproxy:config written");
    Ok(true)
}
