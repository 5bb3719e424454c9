//! Drop-down lists.
//!
//! Option values starting with `_` or `0` are stored with an extra leading
//! `_`, and [`Select::value`] strips it again. The optional default entry
//! renders first with the SHA-256 of its label as value, so it can never
//! collide with a real option and is rejected when still selected.

use std::ops::{Deref, DerefMut};

use sha2::{Digest, Sha256};

use crate::attributes::{html_escape, push_attr};
use crate::element::{protect, BuildScope, Element, SELECT_TAG};
use crate::request::{FieldValue, Submission};

/// One entry of a [`Select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// Text shown to the visitor.
    pub label: String,
    /// Submitted value, with the protective prefix applied.
    pub value: String,
}

/// A `<select>`.
#[derive(Debug, Clone)]
pub struct Select {
    base: Element,
    options: Vec<SelectOption>,
    default: Option<String>,
}

impl Select {
    pub(crate) fn new(default: Option<&str>) -> Self {
        Self {
            base: Element::new(SELECT_TAG, false),
            options: Vec::new(),
            default: default.map(str::to_string),
        }
    }

    /// Adds an option whose value is its label.
    pub fn option(&mut self, label: impl Into<String>) -> &mut Self {
        let label = label.into();
        let value = protect(&label);
        self.options.push(SelectOption { label, value });
        self
    }

    /// Adds an option with an explicit value.
    pub fn option_value(&mut self, label: impl Into<String>, value: &str) -> &mut Self {
        self.options.push(SelectOption {
            label: label.into(),
            value: protect(value),
        });
        self
    }

    /// Returns the options in order.
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Sets or clears the placeholder entry.
    pub fn set_default(&mut self, default: Option<&str>) -> &mut Self {
        self.default = default.map(str::to_string);
        self
    }

    /// Returns the placeholder label.
    pub fn default_label(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// The value the placeholder entry submits.
    pub fn placeholder_token(&self) -> Option<String> {
        self.default.as_deref().map(token)
    }

    /// The selected value, without the protective prefix. The placeholder
    /// maps to an empty string.
    pub fn value(&self, data: &Submission) -> FieldValue {
        match self.base.value(data) {
            FieldValue::Text(value) => {
                if self.placeholder_token().as_deref() == Some(value.as_str()) {
                    FieldValue::default()
                } else {
                    FieldValue::Text(value.strip_prefix('_').unwrap_or(value.as_str()).to_string())
                }
            }
            other => other,
        }
    }

    /// Checks the selection. Only the required flag applies.
    pub fn validate(&self, data: &Submission) -> std::result::Result<(), String> {
        if !self.is_required() {
            return Ok(());
        }

        let value = self
            .slot_value(data)
            .and_then(FieldValue::as_text)
            .unwrap_or("");

        if self.placeholder_token().as_deref() == Some(value) {
            return Err(self.error_message().to_string());
        }
        if self.options.iter().any(|option| option.value == value) {
            Ok(())
        } else {
            Err(self.error_message().to_string())
        }
    }

    /// Hydrates, then renders the list with the current value selected.
    pub fn build(&mut self, prefix: &str, scope: &mut BuildScope<'_>) -> String {
        if self.remembers() {
            if let Some(value) = self
                .slot_value(scope.submission)
                .filter(|v| !v.is_blank())
                .and_then(FieldValue::as_text)
                .map(str::to_string)
            {
                self.base.attributes_mut().set("value", value);
            }
        }
        self.base.register_assets(scope);

        let mut html = self.base.open_tag(prefix, &["value"]);
        html.push_str(">\n");

        if let Some(default) = &self.default {
            html.push_str("<option");
            push_attr(&mut html, "value", &token(default));
            html.push_str(&format!(">{}</option>\n", html_escape(default)));
        }

        let current = self.base.attributes().text("value");
        for option in &self.options {
            html.push_str("<option");
            push_attr(&mut html, "value", &option.value);
            if current == Some(option.value.as_str()) {
                push_attr(&mut html, "selected", "selected");
            }
            html.push_str(&format!(">{}</option>\n", html_escape(&option.label)));
        }

        html.push_str("</select>\n");
        html
    }
}

fn token(label: &str) -> String {
    hex::encode(Sha256::digest(label.as_bytes()))
}

impl Deref for Select {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.base
    }
}

impl DerefMut for Select {
    fn deref_mut(&mut self) -> &mut Element {
        &mut self.base
    }
}

impl AsMut<Element> for Select {
    fn as_mut(&mut self) -> &mut Element {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRegistry;
    use crate::config::FormsConfig;

    fn country() -> Select {
        let mut select = Select::new(Some("Pick a country"));
        select.attributes_mut().set("name", "country");
        select
            .option("Belgium")
            .option_value("Nowhere", "0")
            .option_value("Hidden", "_secret");
        select
    }

    #[test]
    fn test_option_values_are_protected() {
        let select = country();
        let values: Vec<_> = select.options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["Belgium", "_0", "__secret"]);
    }

    #[test]
    fn test_value_strips_prefix() {
        let select = country();
        let data = Submission::new().with("country", "_0");
        assert_eq!(select.value(&data), FieldValue::from("0"));

        let token = select.placeholder_token().unwrap();
        let data = Submission::new().with("country", token.as_str());
        assert_eq!(select.value(&data), FieldValue::from(""));
    }

    #[test]
    fn test_placeholder_fails_required() {
        let mut select = country();
        select.set_required(true, "Pick a country.").unwrap();

        let token = select.placeholder_token().unwrap();
        let data = Submission::new().with("country", token.as_str());
        assert_eq!(select.validate(&data), Err("Pick a country.".to_string()));

        let data = Submission::new().with("country", "_0");
        assert!(select.validate(&data).is_ok());

        let data = Submission::new().with("country", "Atlantis");
        assert!(select.validate(&data).is_err());
    }

    #[test]
    fn test_optional_select_accepts_anything() {
        let select = country();
        let data = Submission::new().with("country", "Atlantis");
        assert!(select.validate(&data).is_ok());
    }

    #[test]
    fn test_build_marks_selection() {
        let mut select = country();
        let data = Submission::new().with("country", "_0");
        let config = FormsConfig::default();
        let mut assets = AssetRegistry::new();
        let html = select.build("", &mut BuildScope::new(&data, &mut assets, &config));

        let token = select.placeholder_token().unwrap();
        assert!(html.starts_with("<select name=\"country\">\n"));
        assert!(html.contains(&format!("<option value=\"{token}\">Pick a country</option>\n")));
        assert!(html.contains("<option value=\"_0\" selected=\"selected\">Nowhere</option>\n"));
        assert!(html.contains("<option value=\"Belgium\">Belgium</option>\n"));
        assert!(html.ends_with("</select>\n"));
    }

    #[test]
    fn test_default_can_be_cleared() {
        let mut select = country();
        select.set_default(None);
        assert!(select.placeholder_token().is_none());
    }
}
