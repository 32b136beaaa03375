/*
 * This file is part of Thermfan.
 *
 * Copyright (C) 2025 Thermfan contributors
 *
 * Thermfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thermfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thermfan. If not, see <https://www.gnu.org/licenses/>.
 */


//! Process lifecycle: privileges, PID file, working environment.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tf_core::constants::paths;
use tf_core::{BackendMode, Config};
use tf_error::{Result, ThermfanError};
use tracing::{debug, info, warn};

pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Whether this configuration needs root at all
pub fn needs_root(config: &Config) -> bool {
    config.backend == BackendMode::Smm || !config.monitor_only
}

/// Refuse to start without the privileges the configuration needs
pub fn verify_privileges(config: &Config) -> Result<()> {
    // SAFETY: getuid and geteuid have no preconditions and cannot fail
    let (uid, euid) = unsafe { (libc::getuid(), libc::geteuid()) };

    if !needs_root(config) {
        debug!(uid, euid, "Monitor-only with the i8k driver, root not required");
        return Ok(());
    }
    if euid != 0 {
        return Err(ThermfanError::PermissionDenied(format!(
            "the {} backend needs root to {} (euid={})",
            config.backend,
            if config.backend == BackendMode::Smm { "access I/O ports" } else { "set fan speeds" },
            euid
        )));
    }
    if uid != 0 {
        warn!("Running as setuid root - this is not recommended");
    }
    info!(uid, euid, "Running as root");
    Ok(())
}

/// Restrictive file creation mask and a neutral working directory
pub fn harden_process() {
    // SAFETY: umask only sets the file creation mask of this process
    unsafe { libc::umask(0o077) };
    if std::env::set_current_dir("/").is_err() {
        warn!("Could not chdir to /");
    }
    debug!("Umask set to 0077, working directory /");
}

/// Preferred PID file location for this system
pub fn pid_file_path() -> PathBuf {
    if Path::new("/run").is_dir() {
        PathBuf::from(paths::PID_FILE)
    } else {
        PathBuf::from(paths::PID_FILE_FALLBACK)
    }
}

/// PID file held for the life of the daemon; removed on drop
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Claim `path`, refusing if another live instance owns it
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(old_pid) = content.trim().parse::<i32>() {
                    // SAFETY: signal 0 only checks whether the process exists
                    if old_pid > 0 && unsafe { libc::kill(old_pid, 0) } == 0 {
                        return Err(ThermfanError::Io(io::Error::new(
                            io::ErrorKind::AddrInUse,
                            format!("another instance is running (PID {})", old_pid),
                        )));
                    }
                }
            }
            debug!(path = %path.display(), "Removing stale PID file");
            let _ = fs::remove_file(path);
        }

        let mut file = OpenOptions::new().write(true).create_new(true).mode(0o644).open(path)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        debug!(path = %path.display(), "PID file written");
        Ok(Self { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove PID file");
        }
    }
}
