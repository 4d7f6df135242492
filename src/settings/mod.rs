// Copyright (C) 2025  Rafael Carvalho <contact@rafaelrc.com>

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as published by
// the Free Software Foundation.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

// SPDX-License-Identifier: GPL-3.0-only

//! Module responsible with the tool's configuration

use std::{error::Error, path::PathBuf};

use chrono::Duration;
use clap::Parser;
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use log::LevelFilter;
use serde::Deserialize;

mod cli;
use cli::Args;

/// Struct that stores the settings that affect the tool behaviour
#[derive(Deserialize)]
pub struct Settings {
    #[serde(default = "default_sleep_timeout")]
    sleep_timeout: i64,

    #[serde(default)]
    sleep_while_printing: bool,

    #[serde(default = "default_verbosity")]
    verbosity: LevelFilter,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let cli = Args::parse();

        let config_path = match cli.config {
            Some(ref p) => PathBuf::from(p),
            None => xdg::BaseDirectories::with_prefix(env!("CARGO_PKG_NAME"))?
                .place_config_file("config.toml")?,
        };

        let settings = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Serialized::defaults(cli))
            .extract()?;

        Ok(settings)
    }

    /// Getter for the idle timeout with the [chrono::Duration] type. If the
    /// set timeout is not positive, [None] is returned: idle blanking is
    /// disabled.
    pub fn get_sleep_timeout(&self) -> Option<Duration> {
        match self.sleep_timeout {
            t if t > 0 => Some(Duration::seconds(t)),
            _ => None,
        }
    }

    /// Whether the display may blank while a print job is running
    pub fn get_sleep_while_printing(&self) -> bool {
        self.sleep_while_printing
    }

    /// Returns the current log verbosity
    pub fn get_verbosity(&self) -> LevelFilter {
        self.verbosity
    }
}

/// Default idle timeout, negative: disabled
fn default_sleep_timeout() -> i64 {
    -1
}

/// Default log verbosity, set to [LevelFilter::Warn]
fn default_verbosity() -> LevelFilter {
    LevelFilter::Warn
}

#[cfg(test)]
mod tests {
    use figment::{
        providers::{Format, Toml},
        Figment,
    };
    use log::LevelFilter;

    use super::Settings;

    fn from_toml(toml: &str) -> Settings {
        Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .expect("settings must parse")
    }

    #[test]
    fn defaults_disable_blanking() {
        let settings = from_toml("");
        assert_eq!(settings.get_sleep_timeout(), None);
        assert!(!settings.get_sleep_while_printing());
        assert_eq!(settings.get_verbosity(), LevelFilter::Warn);
    }

    #[test]
    fn positive_timeout_is_a_duration() {
        let settings = from_toml("sleep_timeout = 300");
        assert_eq!(
            settings.get_sleep_timeout(),
            Some(chrono::Duration::seconds(300))
        );
    }

    #[test]
    fn zero_timeout_disables_blanking() {
        let settings = from_toml("sleep_timeout = 0");
        assert_eq!(settings.get_sleep_timeout(), None);
    }

    #[test]
    fn full_config_parses() {
        let settings = from_toml(
            r#"
            sleep_timeout = 60
            sleep_while_printing = true
            verbosity = "debug"
            "#,
        );
        assert_eq!(
            settings.get_sleep_timeout(),
            Some(chrono::Duration::seconds(60))
        );
        assert!(settings.get_sleep_while_printing());
        assert_eq!(settings.get_verbosity(), LevelFilter::Debug);
    }
}
