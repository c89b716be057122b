// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Engine and account configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::TableClass;
use crate::error::{Error, Result};

/// Account-scoped retention settings.
///
/// Object-level overrides are inherited down the database → schema → table
/// chain; these values apply where no level sets one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    /// Default `retention_days` for objects without an override.
    pub retention_days: u32,
    /// Account-wide floor applied on top of every effective retention.
    pub min_retention_days: u32,
    /// Default `max_extension_days`, used for stream staleness.
    pub max_extension_days: u32,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            retention_days: 1,
            min_retention_days: 0,
            max_extension_days: 14,
        }
    }
}

impl AccountSettings {
    /// Checks the settings against the permanent-class limits.
    pub fn validate(&self) -> Result<()> {
        let max = TableClass::Permanent.max_retention_days();
        if self.retention_days > max {
            return Err(Error::InvalidSetting(format!(
                "retention_days {} exceeds maximum {max}",
                self.retention_days
            )));
        }
        if self.min_retention_days > max {
            return Err(Error::InvalidSetting(format!(
                "min_retention_days {} exceeds maximum {max}",
                self.min_retention_days
            )));
        }
        Ok(())
    }
}

/// Configuration for a retention engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub account: AccountSettings,
    /// Interval between background reclamation passes.
    pub reclaim_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            account: AccountSettings::default(),
            reclaim_interval: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    /// Sets the account default retention.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.account.retention_days = days;
        self
    }

    /// Sets the account-wide retention floor.
    pub fn with_min_retention_days(mut self, days: u32) -> Self {
        self.account.min_retention_days = days;
        self
    }

    /// Sets the account default max extension.
    pub fn with_max_extension_days(mut self, days: u32) -> Self {
        self.account.max_extension_days = days;
        self
    }

    /// Sets the background reclamation interval.
    pub fn with_reclaim_interval(mut self, interval: Duration) -> Self {
        self.reclaim_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.reclaim_interval.is_zero() {
            return Err(Error::InvalidSetting(
                "reclaim_interval must be non-zero".to_string(),
            ));
        }
        self.account.validate()
    }
}

/// A single object- or account-scoped setting change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "snake_case")]
pub enum Setting {
    /// `None` removes the override and inherits again.
    RetentionDays(Option<u32>),
    MaxExtensionDays(Option<u32>),
    ChangeTrackingEnabled(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.account.retention_days, 1);
        assert_eq!(config.account.min_retention_days, 0);
        assert_eq!(config.account.max_extension_days, 14);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_retention_days(7)
            .with_min_retention_days(2)
            .with_max_extension_days(30)
            .with_reclaim_interval(Duration::from_secs(5));
        assert_eq!(config.account.retention_days, 7);
        assert_eq!(config.account.min_retention_days, 2);
        assert_eq!(config.account.max_extension_days, 30);
        assert_eq!(config.reclaim_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_excess_retention() {
        let config = EngineConfig::default().with_retention_days(91);
        assert!(matches!(config.validate(), Err(Error::InvalidSetting(_))));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = EngineConfig::default().with_reclaim_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_account_settings_from_json() {
        let settings: AccountSettings =
            serde_json::from_str(r#"{"min_retention_days": 3}"#).unwrap();
        assert_eq!(settings.min_retention_days, 3);
        assert_eq!(settings.retention_days, 1);
    }

    #[test]
    fn test_setting_json_shape() {
        let json = serde_json::to_string(&Setting::RetentionDays(Some(5))).unwrap();
        assert_eq!(json, r#"{"name":"retention_days","value":5}"#);
    }
}
