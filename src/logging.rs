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


//! Tracing setup: systemd journal when available, stderr otherwise.

use std::path::Path;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. "debug", "tf_core=trace")
pub const LOG_ENV: &str = "THERMFAN_LOG";

const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";

/// Where log records end up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Journald,
    Stderr,
}

impl std::fmt::Display for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSink::Journald => f.write_str("systemd journal"),
            LogSink::Stderr => f.write_str("stderr"),
        }
    }
}

/// Filter directive from the environment, or the default for the verbosity
pub fn filter_directive(env_value: Option<String>, verbose: bool) -> String {
    match env_value {
        Some(value) if !value.trim().is_empty() => value,
        _ if verbose => "debug".to_string(),
        _ => "info".to_string(),
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(verbose: bool) -> LogSink {
    let directive = filter_directive(std::env::var(LOG_ENV).ok(), verbose);

    if Path::new(JOURNALD_SOCKET).exists() {
        match tracing_journald::layer() {
            Ok(journald) => {
                tracing_subscriber::registry()
                    .with(journald)
                    .with(EnvFilter::new(&directive))
                    .init();
                return LogSink::Journald;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stderr", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(&directive))
        .init();
    LogSink::Stderr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(None, false), "info");
        assert_eq!(filter_directive(None, true), "debug");
        assert_eq!(filter_directive(Some("  ".into()), false), "info");
        assert_eq!(filter_directive(Some("tf_core=trace".into()), false), "tf_core=trace");
    }
}
