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

//! Settings sources: the JSON config file and command-line overrides.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tf_core::constants::{limits, paths};
use tf_core::Settings;
use tf_error::{Result, ThermfanError};
use tracing::{debug, info};

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "THERMFAN_CONFIG";

pub fn default_config_path() -> PathBuf {
    Path::new(paths::CONFIG_DIR).join(paths::CONFIG_FILE)
}

/// Config file to use and whether it was named explicitly
pub fn config_path(cli: Option<&Path>) -> (PathBuf, bool) {
    if let Some(path) = cli {
        return (path.to_path_buf(), true);
    }
    match env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => (PathBuf::from(path), true),
        _ => (default_config_path(), false),
    }
}

/// Read settings from `path`.
///
/// A missing file at the default location yields the built-in defaults; a
/// missing file that was asked for by name is an error.
pub fn load_settings(path: &Path, explicit: bool) -> Result<Settings> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => {
            info!(path = %path.display(), "No config file, using built-in defaults");
            return Ok(Settings::default());
        }
        Err(source) => return Err(ThermfanError::FileRead { path: path.to_path_buf(), source }),
    };

    if meta.len() > limits::MAX_CONFIG_SIZE {
        return Err(ThermfanError::FileTooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max_size: limits::MAX_CONFIG_SIZE,
        });
    }

    let data = fs::read_to_string(path)
        .map_err(|source| ThermfanError::FileRead { path: path.to_path_buf(), source })?;
    let settings: Settings = serde_json::from_str(&data)?;
    debug!(path = %path.display(), "Config file loaded");
    Ok(settings)
}

/// Command-line overrides on top of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub backend: Option<String>,
    pub monitor_only: bool,
    pub verbose: bool,
    pub disable_bios: Option<u8>,
    pub skip_validation: bool,
    pub check_config: bool,
}

impl CliOptions {
    /// Fold the flags into `settings`; flags only ever switch things on.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(backend) = &self.backend {
            settings.backend = backend.clone();
        }
        if let Some(method) = self.disable_bios {
            settings.disable_bios = true;
            settings.bios_disable_method = method;
        }
        settings.monitor_only |= self.monitor_only;
        settings.verbose |= self.verbose;
        settings.skip_validation |= self.skip_validation;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(CliOptions),
    Help,
    Version,
}

/// Parse arguments (without the program name)
pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = CliOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-c" | "--config" => {
                let path = args.next().ok_or_else(|| ThermfanError::config("--config requires a path"))?;
                opts.config = Some(PathBuf::from(path));
            }
            "-b" | "--backend" => {
                let name = args.next().ok_or_else(|| ThermfanError::config("--backend requires a name"))?;
                opts.backend = Some(name);
            }
            "-m" | "--monitor-only" => opts.monitor_only = true,
            "-v" | "--verbose" => opts.verbose = true,
            "--disable-bios" => {
                let method = args
                    .next()
                    .ok_or_else(|| ThermfanError::config("--disable-bios requires a method (1, 2 or 3)"))?;
                let method = method.parse::<u8>().map_err(|_| {
                    ThermfanError::invalid_config("bios_disable_method", format!("'{}' is not a method number", method))
                })?;
                opts.disable_bios = Some(method);
            }
            "--skip-validation" => opts.skip_validation = true,
            "--check-config" => opts.check_config = true,
            other => return Err(ThermfanError::config(format!("unknown argument: {}", other))),
        }
    }

    Ok(Command::Run(opts))
}
