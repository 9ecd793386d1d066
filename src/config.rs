// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::archive::ReaderOptions;
use crate::imap::{ConnectOptions, Encryption};
use crate::upload::UploadOptions;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig { level: "info".to_string() }
    }
}

/// Everything one run needs, fully populated before the run starts.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[validate(length(min = 1, message = "archive path must not be empty"))]
    pub archive_path: String,

    #[validate(length(min = 1, message = "IMAP host must not be empty"))]
    pub imap_host: String,
    #[validate(range(min = 1, message = "IMAP port must be between 1 and 65535"))]
    pub imap_port: u16,
    pub encryption: Encryption,

    // Left empty by the defaults so validation, not deserialization, reports them
    #[serde(default)]
    #[validate(length(min = 1, message = "IMAP user is required"))]
    pub imap_user: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "IMAP password is required"))]
    pub imap_pass: String,

    #[validate(length(min = 1, message = "target folder must not be empty"))]
    pub target_folder: String,

    /// Pause between appends, in milliseconds.
    pub upload_delay_ms: u64,
    #[validate(range(min = 1, message = "progress interval must be at least 1"))]
    pub progress_interval: usize,
    #[validate(range(min = 1))]
    pub connect_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub command_timeout_secs: u64,

    /// Leading records to skip, for resuming a partial run.
    pub skip_first: usize,
    pub max_message_bytes: Option<usize>,

    pub log: LogConfig,
}

/// Values given on the command line. They win over every other source.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub archive_path: Option<String>,
    pub imap_host: Option<String>,
    pub imap_port: Option<u16>,
    pub encryption: Option<Encryption>,
    pub imap_user: Option<String>,
    pub target_folder: Option<String>,
    pub upload_delay_ms: Option<u64>,
    pub progress_interval: Option<usize>,
    pub skip_first: Option<usize>,
    pub max_message_bytes: Option<usize>,
    pub log_level: Option<String>,
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load or parse configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

impl Settings {
    /// Loads settings from defaults, an optional TOML file, `MBOX2IMAP_*`
    /// environment variables, and finally `overrides`, then validates them.
    ///
    /// Nested keys use a double underscore in the environment, e.g.
    /// `MBOX2IMAP_LOG__LEVEL=debug`.
    pub fn new(config_path: Option<&str>, overrides: &SettingsOverrides) -> Result<Self, SettingsError> {
        Self::load(config_path, Self::environment(), overrides)
    }

    fn environment() -> Environment {
        Environment::with_prefix("MBOX2IMAP")
            .prefix_separator("_")
            .separator("__")
            .ignore_empty(true)
    }

    fn load(
        config_path: Option<&str>,
        environment: Environment,
        overrides: &SettingsOverrides,
    ) -> Result<Self, SettingsError> {
        let mut builder = Self::defaults()?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }
        builder = builder.add_source(environment);
        builder = Self::apply_overrides(builder, overrides)?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default("archive_path", "mail.mbox")?
            .set_default("imap_host", "imap.yandex.com")?
            .set_default("imap_port", 993)?
            .set_default("encryption", "tls")?
            .set_default("target_folder", "Imported_Mbox")?
            .set_default("upload_delay_ms", 100)?
            .set_default("progress_interval", 50)?
            .set_default("connect_timeout_secs", 30)?
            .set_default("command_timeout_secs", 120)?
            .set_default("skip_first", 0)?
            .set_default("log.level", "info")
    }

    fn apply_overrides(
        builder: ConfigBuilder<DefaultState>,
        o: &SettingsOverrides,
    ) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        builder
            .set_override_option("archive_path", o.archive_path.clone())?
            .set_override_option("imap_host", o.imap_host.clone())?
            .set_override_option("imap_port", o.imap_port.map(i64::from))?
            .set_override_option("encryption", o.encryption.map(|e| e.to_string()))?
            .set_override_option("imap_user", o.imap_user.clone())?
            .set_override_option("target_folder", o.target_folder.clone())?
            .set_override_option("upload_delay_ms", o.upload_delay_ms.map(|v| v as i64))?
            .set_override_option("progress_interval", o.progress_interval.map(|v| v as i64))?
            .set_override_option("skip_first", o.skip_first.map(|v| v as i64))?
            .set_override_option("max_message_bytes", o.max_message_bytes.map(|v| v as i64))?
            .set_override_option("log.level", o.log_level.clone())
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.imap_host.clone(),
            port: self.imap_port,
            encryption: self.encryption,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
        }
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            skip_first: self.skip_first,
            max_message_bytes: self.max_message_bytes,
        }
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            delay: Duration::from_millis(self.upload_delay_ms),
            progress_interval: self.progress_interval,
        }
    }
}

// The password never reaches a log line.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("archive_path", &self.archive_path)
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("encryption", &self.encryption)
            .field("imap_user", &self.imap_user)
            .field("imap_pass", &"<redacted>")
            .field("target_folder", &self.target_folder)
            .field("upload_delay_ms", &self.upload_delay_ms)
            .field("progress_interval", &self.progress_interval)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("skip_first", &self.skip_first)
            .field("max_message_bytes", &self.max_message_bytes)
            .field("log", &self.log)
            .finish()
    }
}
