//! Configuration loading via `ortho-config`.
//!
//! Values merge defaults, `volgrow.toml`, and `VOLGROW_*` environment
//! variables. Command-line flags are applied afterwards through
//! [`ConfigOverrides`] so the binary owns its own clap definition.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::digitalocean::DEFAULT_API_URL;
use crate::grow::DEFAULT_RESIZE2FS_BIN;
use crate::poll::PollPolicy;
use crate::resize::ResizeRequest;
use crate::space::{DEFAULT_DF_BIN, DEFAULT_FINDMNT_BIN};

/// Default free-space buffer in gigabytes.
pub const DEFAULT_BUFFER_GB: u64 = 10;

/// Settings for one resize run.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "VOLGROW",
    discovery(
        app_name = "volgrow",
        env_var = "VOLGROW_CONFIG_PATH",
        config_file_name = "volgrow.toml",
        dotfile_name = ".volgrow.toml",
        project_file_name = "volgrow.toml"
    )
)]
pub struct ResizeConfig {
    /// DigitalOcean API token used as the bearer credential. Required.
    #[ortho_config(default = String::new())]
    pub api_token: String,
    /// Mountpoint or block device whose free space is watched. Required.
    #[ortho_config(default = String::new())]
    pub device: String,
    /// Name of the block-storage volume backing the device. Required.
    #[ortho_config(default = String::new())]
    pub volume_name: String,
    /// Region slug of the volume (for example `nyc1`). Required.
    #[ortho_config(default = String::new())]
    pub region: String,
    /// Minimum free space to keep, in GB. Also the growth increment.
    #[ortho_config(default = DEFAULT_BUFFER_GB)]
    pub buffer_gb: u64,
    /// Whether progress lines carry a timestamp prefix.
    #[ortho_config(default = false)]
    pub log_timestamps: bool,
    /// Base URL of the provider API.
    #[ortho_config(default = DEFAULT_API_URL.to_owned())]
    pub api_url: String,
    /// Delay between action status checks, in seconds.
    #[ortho_config(default = 1)]
    pub poll_interval_secs: u64,
    /// Overall budget for waiting on the resize action, in seconds.
    #[ortho_config(default = 600)]
    pub poll_timeout_secs: u64,
    /// Optional cap on the number of action status checks.
    pub max_poll_attempts: Option<u32>,
    /// Per-request HTTP timeout, in seconds.
    #[ortho_config(default = 30)]
    pub http_timeout_secs: u64,
    /// Path to the `df` executable.
    #[ortho_config(default = DEFAULT_DF_BIN.to_owned())]
    pub df_bin: String,
    /// Path to the `findmnt` executable.
    #[ortho_config(default = DEFAULT_FINDMNT_BIN.to_owned())]
    pub findmnt_bin: String,
    /// Path to the `resize2fs` executable.
    #[ortho_config(default = DEFAULT_RESIZE2FS_BIN.to_owned())]
    pub resize2fs_bin: String,
    /// Plan the resize without requesting it or touching the filesystem.
    #[ortho_config(default = false)]
    pub dry_run: bool,
}

/// Values supplied on the command line. `None` keeps the loaded value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigOverrides {
    /// Overrides [`ResizeConfig::api_token`].
    pub api_token: Option<String>,
    /// Overrides [`ResizeConfig::device`].
    pub device: Option<String>,
    /// Overrides [`ResizeConfig::volume_name`].
    pub volume_name: Option<String>,
    /// Overrides [`ResizeConfig::region`].
    pub region: Option<String>,
    /// Overrides [`ResizeConfig::buffer_gb`].
    pub buffer_gb: Option<u64>,
    /// Enables [`ResizeConfig::log_timestamps`] when `true`.
    pub log_timestamps: bool,
    /// Overrides [`ResizeConfig::api_url`].
    pub api_url: Option<String>,
    /// Overrides [`ResizeConfig::poll_interval_secs`].
    pub poll_interval_secs: Option<u64>,
    /// Overrides [`ResizeConfig::poll_timeout_secs`].
    pub poll_timeout_secs: Option<u64>,
    /// Overrides [`ResizeConfig::max_poll_attempts`].
    pub max_poll_attempts: Option<u32>,
    /// Enables [`ResizeConfig::dry_run`] when `true`.
    pub dry_run: bool,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    flag: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
    value: fn(&ResizeConfig) -> &str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        flag: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
        value: fn(&ResizeConfig) -> &str,
    ) -> Self {
        Self {
            description,
            flag,
            env_var,
            toml_key,
            value,
        }
    }
}

const REQUIRED_FIELDS: [FieldMetadata; 4] = [
    FieldMetadata::new(
        "DigitalOcean API token",
        "--token",
        "VOLGROW_API_TOKEN",
        "api_token",
        |config| config.api_token.as_str(),
    ),
    FieldMetadata::new(
        "device or mountpoint",
        "--device",
        "VOLGROW_DEVICE",
        "device",
        |config| config.device.as_str(),
    ),
    FieldMetadata::new(
        "volume name",
        "--volume-name",
        "VOLGROW_VOLUME_NAME",
        "volume_name",
        |config| config.volume_name.as_str(),
    ),
    FieldMetadata::new(
        "volume region",
        "--region",
        "VOLGROW_REGION",
        "region",
        |config| config.region.as_str(),
    ),
];

impl ResizeConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("volgrow")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies command-line overrides on top of the loaded values.
    #[must_use]
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        Self {
            api_token: overrides.api_token.unwrap_or(self.api_token),
            device: overrides.device.unwrap_or(self.device),
            volume_name: overrides.volume_name.unwrap_or(self.volume_name),
            region: overrides.region.unwrap_or(self.region),
            buffer_gb: overrides.buffer_gb.unwrap_or(self.buffer_gb),
            log_timestamps: overrides.log_timestamps || self.log_timestamps,
            api_url: overrides.api_url.unwrap_or(self.api_url),
            poll_interval_secs: overrides
                .poll_interval_secs
                .unwrap_or(self.poll_interval_secs),
            poll_timeout_secs: overrides
                .poll_timeout_secs
                .unwrap_or(self.poll_timeout_secs),
            max_poll_attempts: overrides.max_poll_attempts.or(self.max_poll_attempts),
            dry_run: overrides.dry_run || self.dry_run,
            ..self
        }
    }

    /// Performs semantic validation. Missing required values produce
    /// messages naming the flag, environment variable, and TOML key that
    /// supply them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for metadata in &REQUIRED_FIELDS {
            if (metadata.value)(self).trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "missing {}: pass {}, set {}, or add {} to volgrow.toml",
                    metadata.description, metadata.flag, metadata.env_var, metadata.toml_key
                )));
            }
        }

        if !self.device.trim().starts_with('/') {
            return Err(ConfigError::invalid("device", "must be an absolute path"));
        }
        if self.buffer_gb == 0 {
            return Err(ConfigError::invalid(
                "buffer_gb",
                "must be greater than zero",
            ));
        }
        if !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://")) {
            return Err(ConfigError::invalid(
                "api_url",
                "must start with https:// or http://",
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "poll_interval_secs",
                "must be greater than zero",
            ));
        }
        if self.poll_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "poll_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.max_poll_attempts == Some(0) {
            return Err(ConfigError::invalid(
                "max_poll_attempts",
                "must be greater than zero when set",
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "http_timeout_secs",
                "must be greater than zero",
            ));
        }
        for (field, value) in [
            ("df_bin", &self.df_bin),
            ("findmnt_bin", &self.findmnt_bin),
            ("resize2fs_bin", &self.resize2fs_bin),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
        }
        Ok(())
    }

    /// Builds a [`ResizeRequest`] from the validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn as_request(&self) -> Result<ResizeRequest, ConfigError> {
        self.validate()?;
        Ok(ResizeRequest {
            path: Utf8PathBuf::from(self.device.trim()),
            volume_name: self.volume_name.trim().to_owned(),
            region: self.region.trim().to_owned(),
            buffer_gb: self.buffer_gb,
            dry_run: self.dry_run,
        })
    }

    /// Polling bounds for the resize action.
    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            timeout: Duration::from_secs(self.poll_timeout_secs),
            max_attempts: self.max_poll_attempts,
        }
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("{0}")]
    MissingField(String),
    /// Indicates a value is present but unusable.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Configuration key that failed validation.
        field: String,
        /// Why the value was rejected.
        message: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl ConfigError {
    fn invalid(field: &str, message: &str) -> Self {
        Self::Invalid {
            field: field.to_owned(),
            message: message.to_owned(),
        }
    }
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
