//! User settings and partial setting changes

use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "TRY";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_show_tooltip() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_currency", alias = "defaultCurrency")]
    pub default_currency: String,
    #[serde(default, alias = "autoConvert")]
    pub auto_convert: bool,
    #[serde(default = "default_show_tooltip", alias = "showTooltip")]
    pub show_tooltip: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            auto_convert: false,
            show_tooltip: true,
        }
    }
}

/// A notification that some settings changed. Absent keys are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsChange {
    #[serde(default, alias = "defaultCurrency")]
    pub default_currency: Option<String>,
    #[serde(default, alias = "autoConvert")]
    pub auto_convert: Option<bool>,
    #[serde(default, alias = "showTooltip")]
    pub show_tooltip: Option<bool>,
}

impl Settings {
    /// Applies `change` and returns the settings it produces.
    pub fn merged(&self, change: &SettingsChange) -> Self {
        Self {
            default_currency: change
                .default_currency
                .as_deref()
                .map(str::to_uppercase)
                .unwrap_or_else(|| self.default_currency.clone()),
            auto_convert: change.auto_convert.unwrap_or(self.auto_convert),
            show_tooltip: change.show_tooltip.unwrap_or(self.show_tooltip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_keys() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_currency, "TRY");
        assert!(!settings.auto_convert);
        assert!(settings.show_tooltip);
    }

    #[test]
    fn test_camel_case_keys() {
        let change: SettingsChange =
            serde_json::from_str(r#"{"defaultCurrency": "eur", "autoConvert": true}"#).unwrap();
        assert_eq!(change.default_currency.as_deref(), Some("eur"));
        assert_eq!(change.auto_convert, Some(true));
        assert!(change.show_tooltip.is_none());
    }

    #[test]
    fn test_merged() {
        let settings = Settings::default();
        let change = SettingsChange {
            default_currency: Some("eur".to_string()),
            show_tooltip: Some(false),
            ..Default::default()
        };
        let merged = settings.merged(&change);
        assert_eq!(merged.default_currency, "EUR");
        assert!(!merged.auto_convert);
        assert!(!merged.show_tooltip);
    }
}
