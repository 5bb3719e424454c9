//! Form settings.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Keys of the CAPTCHA service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecaptchaKeys {
    /// Site key, rendered into the widget.
    pub public_key: String,
    /// Secret key, used when verifying answers.
    pub private_key: String,
}

/// Read-only settings shared by the forms of an application.
///
/// ```rust
/// use ysf_forms::FormsConfig;
///
/// let config = FormsConfig::from_json(r#"{
///     "smart_placeholder": true,
///     "recaptcha": { "public_key": "site", "private_key": "secret" }
/// }"#).unwrap();
/// assert!(config.smart_placeholder);
/// assert_eq!(config.asset_root, "/system");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// Register the placeholder polyfill for fields with a placeholder.
    pub smart_placeholder: bool,
    /// URL prefix of the bundled script assets.
    pub asset_root: String,
    /// CAPTCHA keys.
    pub recaptcha: RecaptchaKeys,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            smart_placeholder: false,
            asset_root: "/system".to_string(),
            recaptcha: RecaptchaKeys::default(),
        }
    }
}

impl FormsConfig {
    /// Parses settings from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// URL of a bundled asset below [`asset_root`](Self::asset_root).
    pub fn asset_url(&self, path: &str) -> String {
        format!("{}/{}", self.asset_root.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FormsConfig::from_json("{}").unwrap();
        assert_eq!(config, FormsConfig::default());
        assert!(!config.smart_placeholder);
    }

    #[test]
    fn test_asset_url() {
        let config = FormsConfig {
            asset_root: "/static/".into(),
            ..FormsConfig::default()
        };
        assert_eq!(
            config.asset_url("javascript/placeholder.js"),
            "/static/javascript/placeholder.js"
        );
    }

    #[test]
    fn test_invalid_json() {
        assert!(FormsConfig::from_json("{").is_err());
    }
}
