//! Field validators.
//!
//! A validator is an immutable rule mapping `(field name, raw value)` to
//! success or an error message. Elements hold them behind `Arc` so one rule
//! can be shared by several fields.
//!
//! Custom rules implement [`Validator`] and usually delegate to one of the
//! stock rules once their own precondition holds:
//!
//! ```rust
//! use ysf_forms::validation::{filters, RegexValidator, Validator};
//!
//! struct BusinessPhone {
//!     is_business: bool,
//!     inner: RegexValidator,
//! }
//!
//! impl Validator for BusinessPhone {
//!     fn validate(&self, name: &str, value: &str) -> Result<(), String> {
//!         if !self.is_business {
//!             return Err(self.message().to_string());
//!         }
//!         self.inner.validate(name, value)
//!     }
//!
//!     fn message(&self) -> &str {
//!         self.inner.message()
//!     }
//! }
//!
//! let rule = BusinessPhone {
//!     is_business: true,
//!     inner: RegexValidator::new(filters::PHONE, "Enter a phone number.").unwrap(),
//! };
//! assert!(rule.validate("phone", "0612345678").is_ok());
//! ```

use std::sync::Arc;

use regex::Regex;

use crate::error::Result;

/// Patterns for common input formats.
pub mod filters {
    /// Upper and lowercase letters only.
    pub const ALPHA: &str = r"^[a-zA-Z]+$";
    /// Digits only.
    pub const NUMBERS: &str = r"^[0-9]+$";
    /// Lowercase letters only.
    pub const LOWER: &str = r"^[a-z]+$";
    /// Uppercase letters only.
    pub const UPPER: &str = r"^[A-Z]+$";
    /// Letters and digits only.
    pub const ALNUM: &str = r"^[a-zA-Z0-9]+$";
    /// Ten-digit phone numbers, optionally with a `00` country prefix.
    pub const PHONE: &str = r"^([0-9]{10}|00[0-9]{2}[0-9]{9})$";
    /// Email addresses.
    pub const EMAIL: &str = r"^[a-zA-Z0-9_.-]{1,255}@[a-zA-Z0-9.-]{1,255}\.[a-z]+$";
    /// Dotted IPv4 addresses.
    pub const IP: &str =
        r"^(([0-9]|[1-9][0-9]|1[0-9][0-9]|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9][0-9]|2[0-4][0-9]|25[0-5])$";
    /// Dates written `d-m-Y`.
    pub const DATE_HUMAN: &str =
        r"^(0[1-9]|[12][0-9]|3[01])-(0[1-9]|1[012])-(2[0-9]{3}|19[0-9]{2})$";
    /// Dates written `Y-m-d`.
    pub const DATE_SYSTEM: &str =
        r"^(2[0-9]{3}|19[0-9]{2})-(0[1-9]|1[012])-(0[1-9]|[12][0-9]|3[01])$";
    /// Absolute http(s) links.
    pub const URL: &str = r"^https?://([a-zA-Z0-9_-]+\.)+[a-zA-Z]{2,}(/\S*)?$";
}

/// Trait for field validators.
pub trait Validator: Send + Sync {
    /// Validates the raw value of the field called `name`.
    fn validate(&self, name: &str, value: &str) -> std::result::Result<(), String>;

    /// Returns the error message for this validator.
    fn message(&self) -> &str;
}

/// Validator using a regex pattern.
#[derive(Debug, Clone)]
pub struct RegexValidator {
    pattern: Regex,
    message: String,
}

impl RegexValidator {
    /// Creates a new RegexValidator.
    pub fn new(pattern: &str, message: impl Into<String>) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            message: message.into(),
        })
    }

    /// Returns the pattern source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Validator for RegexValidator {
    fn validate(&self, _name: &str, value: &str) -> std::result::Result<(), String> {
        if self.pattern.is_match(value) {
            Ok(())
        } else {
            Err(self.message.clone())
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Validator that only accepts uploads of the listed MIME types.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    mime_types: Vec<String>,
    message: String,
}

impl UploadValidator {
    /// Creates a new UploadValidator.
    pub fn new<I, S>(mime_types: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mime_types: mime_types.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }

    /// Returns the accepted MIME types.
    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }
}

impl Validator for UploadValidator {
    fn validate(&self, _name: &str, mime_type: &str) -> std::result::Result<(), String> {
        if self.mime_types.iter().any(|m| m == mime_type) {
            Ok(())
        } else {
            Err(self.message.clone())
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Validator that bounds the number of characters.
#[derive(Debug, Clone)]
pub struct LengthValidator {
    min: Option<usize>,
    max: Option<usize>,
    message: String,
}

impl LengthValidator {
    /// Creates a new LengthValidator with min and max bounds.
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        let message = match (min, max) {
            (Some(min), Some(max)) => {
                format!("Ensure this value has between {min} and {max} characters.")
            }
            (Some(min), None) => format!("Ensure this value has at least {min} characters."),
            (None, Some(max)) => format!("Ensure this value has at most {max} characters."),
            (None, None) => "Invalid value.".to_string(),
        };
        Self { min, max, message }
    }

    /// Creates a new LengthValidator with custom message.
    pub fn with_message(min: Option<usize>, max: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            min,
            max,
            message: message.into(),
        }
    }
}

impl Validator for LengthValidator {
    fn validate(&self, _name: &str, value: &str) -> std::result::Result<(), String> {
        let len = value.chars().count();

        if self.min.is_some_and(|min| len < min) || self.max.is_some_and(|max| len > max) {
            return Err(self.message.clone());
        }

        Ok(())
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// The rules attached to a field: one validator or an ordered list.
///
/// Anything implementing [`Validator`] converts into `Rules`, as do
/// vectors of shared validators. [`Rules::patterns`] and
/// [`Rules::mime_types`] build lists from plain strings.
#[derive(Clone)]
pub enum Rules {
    /// A single rule.
    Rule(Arc<dyn Validator>),
    /// Rules evaluated in order; the first failure wins.
    RuleList(Vec<Arc<dyn Validator>>),
}

impl Rules {
    /// Builds regex rules from `(pattern, message)` pairs.
    pub fn patterns<I, P, M>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, M)>,
        P: AsRef<str>,
        M: Into<String>,
    {
        let rules = pairs
            .into_iter()
            .map(|(pattern, message)| {
                RegexValidator::new(pattern.as_ref(), message)
                    .map(|v| Arc::new(v) as Arc<dyn Validator>)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::RuleList(rules))
    }

    /// Builds MIME allowlists from `(message, mime types)` pairs.
    pub fn mime_types<I, M, T, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (M, T)>,
        M: Into<String>,
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RuleList(
            pairs
                .into_iter()
                .map(|(message, types)| {
                    Arc::new(UploadValidator::new(types, message)) as Arc<dyn Validator>
                })
                .collect(),
        )
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        match self {
            Self::Rule(_) => 1,
            Self::RuleList(rules) => rules.len(),
        }
    }

    /// Returns whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn into_vec(self) -> Vec<Arc<dyn Validator>> {
        match self {
            Self::Rule(rule) => vec![rule],
            Self::RuleList(rules) => rules,
        }
    }
}

impl std::fmt::Debug for Rules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rules")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<V: Validator + 'static> From<V> for Rules {
    fn from(validator: V) -> Self {
        Self::Rule(Arc::new(validator))
    }
}

impl From<Arc<dyn Validator>> for Rules {
    fn from(validator: Arc<dyn Validator>) -> Self {
        Self::Rule(validator)
    }
}

impl From<Vec<Arc<dyn Validator>>> for Rules {
    fn from(validators: Vec<Arc<dyn Validator>>) -> Self {
        Self::RuleList(validators)
    }
}

/// Runs rules in order and returns the first failure.
pub(crate) fn run_rules(
    rules: &[Arc<dyn Validator>],
    name: &str,
    value: &str,
) -> std::result::Result<(), String> {
    rules.iter().try_for_each(|rule| rule.validate(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_validator() {
        let v = RegexValidator::new(filters::DATE_SYSTEM, "Enter a valid date.").unwrap();
        assert!(v.validate("born", "2024-01-15").is_ok());
        assert_eq!(v.validate("born", "15-01-2024"), Err("Enter a valid date.".into()));
    }

    #[test]
    fn test_filters() {
        let check = |pattern: &str, value: &str| Regex::new(pattern).unwrap().is_match(value);

        assert!(check(filters::ALPHA, "Hello"));
        assert!(!check(filters::ALPHA, "Hello1"));
        assert!(check(filters::NUMBERS, "0042"));
        assert!(check(filters::PHONE, "0612345678"));
        assert!(check(filters::PHONE, "0031612345678"));
        assert!(check(filters::EMAIL, "user.name@example.com"));
        assert!(!check(filters::EMAIL, "@example.com"));
        assert!(check(filters::IP, "192.168.0.1"));
        assert!(!check(filters::IP, "300.1.1.1"));
        assert!(check(filters::DATE_HUMAN, "31-12-1999"));
        assert!(check(filters::URL, "https://example.com/path"));
        assert!(!check(filters::URL, "example.com"));
    }

    #[test]
    fn test_upload_validator() {
        let v = UploadValidator::new(["image/png", "image/jpeg"], "Images only.");
        assert!(v.validate("avatar", "image/png").is_ok());
        assert_eq!(v.validate("avatar", "text/plain"), Err("Images only.".into()));
    }

    #[test]
    fn test_length_validator() {
        let v = LengthValidator::new(Some(2), Some(4));
        assert!(v.validate("code", "abc").is_ok());
        assert!(v.validate("code", "a").is_err());
        assert!(v.validate("code", "abcde").is_err());
        assert!(LengthValidator::new(None, Some(2)).validate("code", "éé").is_ok());
    }

    #[test]
    fn test_patterns_normalize_in_order() {
        let rules = Rules::patterns([
            (filters::NUMBERS, "Numbers only."),
            (r"^.{5,}$", "At least five."),
        ])
        .unwrap();
        assert_eq!(rules.len(), 2);

        let rules = rules.into_vec();
        assert_eq!(run_rules(&rules, "pin", "12345"), Ok(()));
        assert_eq!(run_rules(&rules, "pin", "12"), Err("At least five.".into()));
        assert_eq!(run_rules(&rules, "pin", "abc"), Err("Numbers only.".into()));
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        assert!(Rules::patterns([("(unclosed", "never")]).is_err());
    }

    #[test]
    fn test_mime_type_rules() {
        let rules = Rules::mime_types([("Images only.", vec!["image/png"])]).into_vec();
        assert!(run_rules(&rules, "avatar", "image/png").is_ok());
        assert!(run_rules(&rules, "avatar", "image/gif").is_err());
    }

    #[test]
    fn test_single_rule_conversion() {
        let rules: Rules = UploadValidator::new(["text/plain"], "Text only.").into();
        assert_eq!(rules.len(), 1);
    }
}
