//! Firmware `$` settings as reported by the controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single `$id=value` setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSetting {
    /// Setting number
    pub id: u16,
    /// Raw value as sent by the firmware
    pub value: String,
    /// Human readable description
    pub description: String,
    /// When the value was last reported
    pub updated_at: DateTime<Utc>,
}

impl ConfigurationSetting {
    /// Create a setting stamped with the current time
    pub fn new(id: u16, value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
            description: description.into(),
            updated_at: Utc::now(),
        }
    }

    /// Value parsed as a number, if it is one
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok()
    }
}

/// All settings reported by the firmware, keyed by setting number.
///
/// Built incrementally as `$` lines arrive; only [`MachineConfiguration::reset`]
/// discards entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineConfiguration {
    settings: BTreeMap<u16, ConfigurationSetting>,
}

impl MachineConfiguration {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a setting. Returns true if the value changed.
    pub fn upsert(&mut self, setting: ConfigurationSetting) -> bool {
        match self.settings.get_mut(&setting.id) {
            Some(existing) => {
                let changed = existing.value != setting.value;
                *existing = setting;
                changed
            }
            None => {
                self.settings.insert(setting.id, setting);
                true
            }
        }
    }

    /// Look up a setting by number
    pub fn get(&self, id: u16) -> Option<&ConfigurationSetting> {
        self.settings.get(&id)
    }

    /// Raw value of a setting
    pub fn value(&self, id: u16) -> Option<&str> {
        self.settings.get(&id).map(|s| s.value.as_str())
    }

    /// Settings in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &ConfigurationSetting> {
        self.settings.values()
    }

    /// Number of known settings
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// True when no setting has been reported
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Discard every setting
    pub fn reset(&mut self) {
        self.settings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_keeps_keys_unique() {
        let mut config = MachineConfiguration::new();
        assert!(config.upsert(ConfigurationSetting::new(10, "1", "Status report options")));
        assert!(config.upsert(ConfigurationSetting::new(10, "511", "Status report options")));
        assert!(!config.upsert(ConfigurationSetting::new(10, "511", "Status report options")));

        assert_eq!(config.len(), 1);
        assert_eq!(config.value(10), Some("511"));
        assert_eq!(config.get(10).and_then(|s| s.numeric_value()), Some(511.0));
    }

    #[test]
    fn test_iteration_is_ordered() {
        let mut config = MachineConfiguration::new();
        config.upsert(ConfigurationSetting::new(130, "200.000", ""));
        config.upsert(ConfigurationSetting::new(0, "10", ""));
        config.upsert(ConfigurationSetting::new(22, "1", ""));

        let ids: Vec<u16> = config.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 22, 130]);

        config.reset();
        assert!(config.is_empty());
    }
}
