//! CAPTCHA challenges.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::config::RecaptchaKeys;
use crate::element::{Element, CAPTCHA_TAG};
use crate::request::{FieldValue, Submission};

/// Submission field carrying the challenge id.
pub const CHALLENGE_FIELD: &str = "recaptcha_challenge_field";
/// Submission field carrying the visitor's answer.
pub const RESPONSE_FIELD: &str = "recaptcha_response_field";

/// Outcome of a CAPTCHA check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptchaAnswer {
    /// Whether the answer was accepted.
    pub valid: bool,
    /// Error reported by the service.
    pub error: Option<String>,
}

impl CaptchaAnswer {
    /// An accepted answer.
    pub fn accepted() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    /// A rejected answer.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// The CAPTCHA service. Supplied by the host application.
pub trait CaptchaVerifier: Send + Sync {
    /// Checks an answer.
    fn verify(&self, secret: &str, remote_addr: &str, challenge: &str, response: &str) -> CaptchaAnswer;

    /// Markup of the challenge widget.
    fn widget(&self, site_key: &str) -> String;
}

/// A CAPTCHA field. Always required.
#[derive(Clone)]
pub struct Captcha {
    base: Element,
    keys: RecaptchaKeys,
    verifier: Arc<dyn CaptchaVerifier>,
}

impl fmt::Debug for Captcha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Captcha")
            .field("base", &self.base)
            .field("site_key", &self.keys.public_key)
            .finish_non_exhaustive()
    }
}

impl Captcha {
    pub(crate) fn new(keys: RecaptchaKeys, verifier: Arc<dyn CaptchaVerifier>) -> Self {
        let mut base = Element::new(CAPTCHA_TAG, true);
        base.attributes_mut().set("type", "captcha");
        base.mark_required();
        Self {
            base,
            keys,
            verifier,
        }
    }

    /// Asks the verifier about the submitted answer. A non-empty message
    /// set with `set_required` replaces the service's error.
    pub fn validate(&self, data: &Submission, remote_addr: &str) -> std::result::Result<(), String> {
        let text = |key: &str| data.get(key).and_then(FieldValue::as_text).unwrap_or("");
        let answer = self.verifier.verify(
            &self.keys.private_key,
            remote_addr,
            text(CHALLENGE_FIELD),
            text(RESPONSE_FIELD),
        );

        if answer.valid {
            Ok(())
        } else if !self.error_message().is_empty() {
            Err(self.error_message().to_string())
        } else {
            Err(answer.error.unwrap_or_default())
        }
    }

    /// Renders the widget.
    pub fn build(&self, prefix: &str) -> String {
        format!(
            "{prefix}<div id=\"recaptcha\">{}</div>\n",
            self.verifier.widget(&self.keys.public_key)
        )
    }
}

impl Deref for Captcha {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.base
    }
}

impl DerefMut for Captcha {
    fn deref_mut(&mut self) -> &mut Element {
        &mut self.base
    }
}

impl AsMut<Element> for Captcha {
    fn as_mut(&mut self) -> &mut Element {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormError;

    struct Expecting(&'static str);

    impl CaptchaVerifier for Expecting {
        fn verify(&self, secret: &str, _remote_addr: &str, _challenge: &str, response: &str) -> CaptchaAnswer {
            if secret == "secret" && response == self.0 {
                CaptchaAnswer::accepted()
            } else {
                CaptchaAnswer::rejected("incorrect-captcha-sol")
            }
        }

        fn widget(&self, site_key: &str) -> String {
            format!("<span data-key=\"{site_key}\"></span>")
        }
    }

    fn captcha() -> Captcha {
        let keys = RecaptchaKeys {
            public_key: "site".into(),
            private_key: "secret".into(),
        };
        let mut captcha = Captcha::new(keys, Arc::new(Expecting("42")));
        captcha.attributes_mut().set("name", "human");
        captcha
    }

    #[test]
    fn test_always_required() {
        let mut captcha = captcha();
        assert!(captcha.is_required());
        assert!(matches!(
            captcha.set_required(false, ""),
            Err(FormError::CaptchaAlwaysRequired)
        ));
    }

    #[test]
    fn test_rejects_validators() {
        let mut captcha = captcha();
        let rule = crate::validation::RegexValidator::new("^x$", "never").unwrap();
        assert!(matches!(
            captcha.set_validator(rule),
            Err(FormError::ValidatorNotSupported(tag)) if tag == "captcha"
        ));
        assert!(captcha.rules().is_none());
    }

    #[test]
    fn test_verifier_error_and_override() {
        let mut captcha = captcha();
        let wrong = Submission::new().with(RESPONSE_FIELD, "41");
        assert_eq!(
            captcha.validate(&wrong, "127.0.0.1"),
            Err("incorrect-captcha-sol".to_string())
        );

        captcha.set_required(true, "Try again.").unwrap();
        assert_eq!(captcha.validate(&wrong, "127.0.0.1"), Err("Try again.".to_string()));

        let right = Submission::new().with(RESPONSE_FIELD, "42");
        assert!(captcha.validate(&right, "127.0.0.1").is_ok());
    }

    #[test]
    fn test_build() {
        assert_eq!(
            captcha().build("\t"),
            "\t<div id=\"recaptcha\"><span data-key=\"site\"></span></div>\n"
        );
    }
}
