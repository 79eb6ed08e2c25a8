//! Daemon configuration.
//!
//! Loaded from TOML and validated before the monitor starts. Every section
//! has working defaults except alert delivery, which stays disabled until
//! credentials are configured.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::HazardThresholds;

/// Shortest accepted polling interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
/// Longest accepted polling interval.
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;
/// Default configuration path on the device.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/vigil/vigil.toml";

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Highest BCM pin number on the 40-pin header.
const MAX_BCM_PIN: u8 = 27;

/// Top-level daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Polling interval for the sensor loop, in milliseconds.
    pub poll_interval_ms: u64,
    pub pins: PinConfig,
    pub smoke: SmokeBusConfig,
    pub thresholds: HazardThresholds,
    pub alert: AlertConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            pins: PinConfig::default(),
            smoke: SmokeBusConfig::default(),
            thresholds: HazardThresholds::default(),
            alert: AlertConfig::default(),
        }
    }
}

/// BCM pin assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub flame: u8,
    pub motion: u8,
    pub buzzer: u8,
    pub pump: u8,
    pub motor: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            flame: 5,
            motion: 13,
            buzzer: 21,
            pump: 26,
            motor: 19,
        }
    }
}

impl PinConfig {
    /// Pin assignments with their field names, for validation messages.
    fn assignments(&self) -> [(&'static str, u8); 5] {
        [
            ("pins.flame", self.flame),
            ("pins.motion", self.motion),
            ("pins.buzzer", self.buzzer),
            ("pins.pump", self.pump),
            ("pins.motor", self.motor),
        ]
    }
}

/// PCF8591 smoke ADC bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeBusConfig {
    /// I2C bus number, as in `/dev/i2c-N`.
    pub i2c_bus: u8,
    /// 7-bit device address.
    pub address: u16,
    /// ADC input channel, 0-3.
    pub channel: u8,
}

impl Default for SmokeBusConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x48,
            channel: 1,
        }
    }
}

/// Alert capture and delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Whether alerts are delivered at all. Off until credentials exist.
    pub enabled: bool,
    /// Street address included in every alert message.
    pub site_address: String,
    /// Where the capture command writes its still image.
    pub image_path: PathBuf,
    /// Command invoked to capture a still image.
    pub capture_command: String,
    /// Imgur API client ID. Empty disables image upload.
    pub imgur_client_id: String,
    pub twilio: TwilioConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            site_address: String::new(),
            image_path: PathBuf::from("/tmp/vigil-capture.jpg"),
            capture_command: "libcamera-still".to_string(),
            imgur_client_id: String::new(),
            twilio: TwilioConfig::default(),
        }
    }
}

/// Twilio SMS credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sending number in E.164 form.
    pub from_number: String,
    /// Receiving number in E.164 form.
    pub to_number: String,
}

/// A single configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors from loading, saving, or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was not valid TOML for this schema.
    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The configuration could not be serialized.
    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file could not be written.
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One or more settings were rejected.
    #[error("{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    let formatted: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("configuration invalid: {}", formatted.join("; "))
}

impl MonitorConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from [`DEFAULT_CONFIG_PATH`], falling back to defaults when the
    /// file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate in one step.
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Write to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let raw = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every setting, collecting all failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            errors.push(ValidationError {
                field: "poll_interval_ms".to_string(),
                message: format!(
                    "must be between {MIN_POLL_INTERVAL_MS} and {MAX_POLL_INTERVAL_MS}"
                ),
            });
        }

        self.validate_pins(&mut errors);
        self.validate_smoke(&mut errors);
        self.validate_thresholds(&mut errors);
        self.validate_alert(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn validate_pins(&self, errors: &mut Vec<ValidationError>) {
        let mut seen = HashSet::new();
        for (field, pin) in self.pins.assignments() {
            if pin > MAX_BCM_PIN {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("BCM pin {pin} is outside 0-{MAX_BCM_PIN}"),
                });
            }
            if !seen.insert(pin) {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("BCM pin {pin} is assigned more than once"),
                });
            }
        }
    }

    fn validate_smoke(&self, errors: &mut Vec<ValidationError>) {
        if self.smoke.channel > 3 {
            errors.push(ValidationError {
                field: "smoke.channel".to_string(),
                message: "PCF8591 has channels 0-3".to_string(),
            });
        }
        if self.smoke.address > 0x7F {
            errors.push(ValidationError {
                field: "smoke.address".to_string(),
                message: "I2C address must be 7-bit".to_string(),
            });
        }
    }

    fn validate_thresholds(&self, errors: &mut Vec<ValidationError>) {
        if self.thresholds.smoke_temp_c >= self.thresholds.fire_temp_c {
            errors.push(ValidationError {
                field: "thresholds.smoke_temp_c".to_string(),
                message: "must be below thresholds.fire_temp_c".to_string(),
            });
        }
        if self.thresholds.temp_plausible_min_c >= self.thresholds.temp_plausible_max_c {
            errors.push(ValidationError {
                field: "thresholds.temp_plausible_min_c".to_string(),
                message: "must be below thresholds.temp_plausible_max_c".to_string(),
            });
        }
    }

    fn validate_alert(&self, errors: &mut Vec<ValidationError>) {
        if !self.alert.enabled {
            return;
        }
        let twilio = &self.alert.twilio;
        for (field, value) in [
            ("alert.twilio.account_sid", &twilio.account_sid),
            ("alert.twilio.auth_token", &twilio.auth_token),
        ] {
            if value.is_empty() {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: "required when alerts are enabled".to_string(),
                });
            }
        }
        for (field, number) in [
            ("alert.twilio.from_number", &twilio.from_number),
            ("alert.twilio.to_number", &twilio.to_number),
        ] {
            if !number.starts_with('+') || number.len() < 8 {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: "must be an E.164 number like +15551234567".to_string(),
                });
            }
        }
        if self.alert.capture_command.is_empty() {
            errors.push(ValidationError {
                field: "alert.capture_command".to_string(),
                message: "required when alerts are enabled".to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        MonitorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_pin_map_matches_board_wiring() {
        let pins = PinConfig::default();
        assert_eq!(pins.flame, 5);
        assert_eq!(pins.motion, 13);
        assert_eq!(pins.motor, 19);
        assert_eq!(pins.buzzer, 21);
        assert_eq!(pins.pump, 26);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");

        let mut config = MonitorConfig::default();
        config.poll_interval_ms = 250;
        config.alert.site_address = "12 Harbor Lane".to_string();
        config.save(&path).unwrap();

        let loaded = MonitorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        std::fs::write(&path, "poll_interval_ms = 500\n[pins]\nflame = 6\n").unwrap();

        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.pins.flame, 6);
        assert_eq!(config.pins.motion, 13);
        assert_eq!(config.smoke.address, 0x48);
    }

    #[test]
    fn test_load_missing_file_is_a_read_error() {
        let err = MonitorConfig::load("/nonexistent/vigil.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        std::fs::write(&path, "poll_interval_ms = \"fast\"").unwrap();
        assert!(matches!(
            MonitorConfig::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_poll_interval_bounds() {
        let mut config = MonitorConfig::default();
        config.poll_interval_ms = 50;
        assert!(config.validate().is_err());
        config.poll_interval_ms = MIN_POLL_INTERVAL_MS;
        config.validate().unwrap();
        config.poll_interval_ms = MAX_POLL_INTERVAL_MS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_pins_rejected() {
        let mut config = MonitorConfig::default();
        config.pins.pump = config.pins.buzzer;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("assigned more than once"));
    }

    #[test]
    fn test_pin_outside_header_rejected() {
        let mut config = MonitorConfig::default();
        config.pins.motor = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_smoke_channel_bounds() {
        let mut config = MonitorConfig::default();
        config.smoke.channel = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_ordering_enforced() {
        let mut config = MonitorConfig::default();
        config.thresholds.smoke_temp_c = 55.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("smoke_temp_c"));
    }

    #[test]
    fn test_enabled_alerts_require_credentials() {
        let mut config = MonitorConfig::default();
        config.alert.enabled = true;
        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("account_sid"));
        assert!(message.contains("from_number"));
    }

    #[test]
    fn test_enabled_alerts_with_credentials_pass() {
        let mut config = MonitorConfig::default();
        config.alert.enabled = true;
        config.alert.twilio = TwilioConfig {
            account_sid: "AC00000000000000000000000000000000".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15550100000".to_string(),
            to_number: "+15550100001".to_string(),
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_phone_numbers_must_be_e164() {
        let mut config = MonitorConfig::default();
        config.alert.enabled = true;
        config.alert.twilio = TwilioConfig {
            account_sid: "AC00000000000000000000000000000000".to_string(),
            auth_token: "secret".to_string(),
            from_number: "5550100000".to_string(),
            to_number: "+15550100001".to_string(),
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("E.164"));
    }

    #[test]
    fn test_validation_collects_all_failures() {
        let mut config = MonitorConfig::default();
        config.poll_interval_ms = 0;
        config.smoke.channel = 9;
        let err = config.validate().unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
