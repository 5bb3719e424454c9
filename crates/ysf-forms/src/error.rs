//! Error types for forms.

use thiserror::Error;

/// Configuration errors raised while a form is being set up.
///
/// These signal programmer misuse and are returned from the offending
/// setter. Validation failures are never reported through this type, see
/// [`ValidationErrors`].
#[derive(Debug, Error)]
pub enum FormError {
    /// A setter needs the `name` attribute to be set first.
    #[error("you have to set a 'name' before you set the {0}")]
    MissingName(&'static str),

    /// The form was created without upload support.
    #[error("this form does not accept file uploads")]
    UploadsDisabled,

    /// `set_validator` is not available for this kind of field.
    #[error("set_validator() does not apply to <{0}> elements")]
    ValidatorNotSupported(String),

    /// A CAPTCHA can not be made optional.
    #[error("the captcha is always required")]
    CaptchaAlwaysRequired,

    /// A validator pattern failed to compile.
    #[error("invalid validator pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Data handed to `fill_from` was not a map or struct.
    #[error("expected a map or struct, got {0}")]
    InvalidData(String),

    /// Serde conversion failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Sanitized name of the failing field.
    pub field: String,
    /// Message reported by the field.
    pub message: String,
}

/// Validation failures collected over one `validate()` pass, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Failures in the order the fields were validated.
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Creates a new empty ValidationErrors.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Adds an error for a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Returns whether there are any errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns the messages reported for a specific field.
    pub fn get(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Returns all messages in validation order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Result type alias for form operations.
pub type Result<T> = std::result::Result<T, FormError>;
