//! # ysf-forms
//!
//! Server-side HTML forms: build fields, remember submitted input across
//! re-renders, validate submissions and extract clean values.
//!
//! This crate provides:
//! - Inputs, textareas, selects, file uploads and CAPTCHAs
//! - Regex, MIME type and length validators
//! - Repeated fields (`color[]`) with collision-free indices
//! - Bootstrap 5 alerts for validation failures
//!
//! Request data is never read from globals: every request-dependent call
//! takes a [`RequestContext`].
//!
//! ## Quick Start
//!
//! ```rust
//! use ysf_forms::{filters, AlertPresenter, AssetRegistry, RequestContext, Rules, Submission};
//!
//! let mut form = ysf_forms::create("signup", false);
//! form.input("text", "email")
//!     .set_attribute("class", "form-control")
//!     .set_validator(Rules::patterns([(filters::EMAIL, "Enter an email address.")])?)?;
//! form.input("radio", "plan[]").set_attribute("value", "free");
//! form.input("radio", "plan[]").set_attribute("value", "pro");
//!
//! // First visit: render the empty form.
//! let mut assets = AssetRegistry::new();
//! let built = form.build(&RequestContext::default(), 1, &mut assets);
//! assert!(built.fragment("plan", 1).unwrap().contains("name=\"plan[1]\""));
//!
//! // The visitor submits it.
//! let post = Submission::new()
//!     .with(form.form_id(), "1")
//!     .with("email", "ada@example.com");
//! let ctx = RequestContext::post(post);
//!
//! let mut alerts = AlertPresenter::new();
//! assert!(form.validate(&ctx, "Please check the form", &mut alerts).is_valid());
//! assert_eq!(form.values(&ctx).text("email"), Some("ada@example.com"));
//! # Ok::<(), ysf_forms::FormError>(())
//! ```

use std::sync::atomic::AtomicUsize;

pub mod assets;
pub mod attributes;
pub mod config;
pub mod element;
pub mod error;
pub mod fields;
pub mod form;
pub mod presenter;
pub mod request;
pub mod sniff;
pub mod validation;

pub use assets::{AssetRegistry, AssetSink};
pub use attributes::{AttrValue, Attributes};
pub use config::{FormsConfig, RecaptchaKeys};
pub use element::{BuildScope, Element, FieldMut};
pub use error::{FieldError, FormError, Result, ValidationErrors};
pub use fields::{
    Captcha, CaptchaAnswer, CaptchaVerifier, Control, Select, SelectOption, Textarea, Upload,
    UploadMessages, UploadValue, CHALLENGE_FIELD, RESPONSE_FIELD,
};
pub use form::{BuiltForm, Form, FormBuilder, FormValue, FormValues, Validation};
pub use presenter::{AlertPresenter, ErrorPresenter};
pub use request::{
    FieldValue, FilesTable, Method, RequestContext, Submission, UploadError, UploadedFile,
};
pub use sniff::{MagicSniffer, MimeSniffer};
pub use validation::{filters, LengthValidator, RegexValidator, Rules, UploadValidator, Validator};

/// Instance numbers of forms created without an explicit one.
pub(crate) static FORM_INSTANCES: AtomicUsize = AtomicUsize::new(0);

/// Creates a POST form with default settings.
///
/// Each call draws a fresh instance number, so two forms with the same
/// name get different tokens.
pub fn create(name: &str, uploads: bool) -> Form {
    FormBuilder::new(name).uploads(uploads).build()
}
