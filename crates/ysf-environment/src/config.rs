//! Environment settings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings of one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    /// Whether the environment can be selected.
    pub enabled: bool,
    /// First route segment selecting the environment.
    pub trigger: String,
    /// Folder holding the environment's controllers.
    pub folder: String,
    /// Controller used when the route names none.
    pub default_controller: String,
    /// Whether visitors must log in.
    pub login: bool,
    /// Controller showing the login page.
    pub login_controller: String,
}

/// All environments, in declaration order.
///
/// ```rust
/// use ysf_environment::EnvironmentConfig;
///
/// let config = EnvironmentConfig::from_json(r#"{
///     "environment": {
///         "admin": { "enabled": true, "trigger": "admin", "login": true },
///         "public": { "enabled": true, "trigger": "" }
///     }
/// }"#).unwrap();
/// assert!(config.get("admin").unwrap().login);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environments by name. The first match wins.
    pub environment: IndexMap<String, EnvironmentSettings>,
}

impl EnvironmentConfig {
    /// Parses settings from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Settings of a named environment.
    pub fn get(&self, name: &str) -> Option<&EnvironmentSettings> {
        self.environment.get(name)
    }

    /// Returns an iterator over the environments in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvironmentSettings)> {
        self.environment.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order() {
        let config = EnvironmentConfig::from_json(
            r#"{"environment": {"zeta": {"trigger": "z"}, "alpha": {"trigger": "a"}}}"#,
        )
        .unwrap();
        let names: Vec<_> = config.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert!(!config.get("zeta").unwrap().enabled);
    }

    #[test]
    fn test_invalid_json() {
        assert!(EnvironmentConfig::from_json("[").is_err());
    }
}
