//! Field kinds.

mod captcha;
mod select;
mod textarea;
mod upload;

pub use captcha::{Captcha, CaptchaAnswer, CaptchaVerifier, CHALLENGE_FIELD, RESPONSE_FIELD};
pub use select::{Select, SelectOption};
pub use textarea::Textarea;
pub use upload::{Upload, UploadMessages, UploadValue};

use crate::element::{BuildScope, Element};
use crate::request::{FieldValue, RequestContext, Submission};
use crate::sniff::MimeSniffer;

/// A field of a form.
#[derive(Debug, Clone)]
pub enum Control {
    /// Inputs and other plain tags.
    Element(Element),
    /// A `<textarea>`.
    Textarea(Textarea),
    /// A `<select>`.
    Select(Select),
    /// A file input.
    Upload(Upload),
    /// A CAPTCHA.
    Captcha(Captcha),
}

impl Control {
    /// The base element.
    pub fn element(&self) -> &Element {
        match self {
            Self::Element(e) => e,
            Self::Textarea(t) => t,
            Self::Select(s) => s,
            Self::Upload(u) => u,
            Self::Captcha(c) => c,
        }
    }

    /// The base element, mutably.
    pub fn element_mut(&mut self) -> &mut Element {
        match self {
            Self::Element(e) => e,
            Self::Textarea(t) => t,
            Self::Select(s) => s,
            Self::Upload(u) => u,
            Self::Captcha(c) => c,
        }
    }

    /// Copies values in. Uploads and CAPTCHAs have nothing to fill.
    pub(crate) fn fill(&mut self, data: &Submission) {
        match self {
            Self::Upload(_) | Self::Captcha(_) => {}
            other => other.element_mut().fill(data),
        }
    }

    pub(crate) fn build(&mut self, prefix: &str, scope: &mut BuildScope<'_>) -> String {
        match self {
            Self::Element(e) => e.build(prefix, scope),
            Self::Textarea(t) => t.build(prefix, scope),
            Self::Select(s) => s.build(prefix, scope),
            Self::Upload(u) => u.build(prefix, scope),
            Self::Captcha(c) => c.build(prefix),
        }
    }

    pub(crate) fn validate(
        &mut self,
        ctx: &RequestContext,
        data: &Submission,
        sniffer: &dyn MimeSniffer,
    ) -> std::result::Result<(), String> {
        match self {
            Self::Element(e) => e.validate(data),
            Self::Textarea(t) => t.validate(data),
            Self::Select(s) => s.validate(data),
            Self::Upload(u) => u.validate(data, &ctx.files, sniffer),
            Self::Captcha(c) => c.validate(data, &ctx.remote_addr),
        }
    }

    /// The submitted value of a non-file field.
    pub(crate) fn value(&self, data: &Submission) -> FieldValue {
        match self {
            Self::Select(s) => s.value(data),
            other => other.element().value(data),
        }
    }
}

impl AsMut<Element> for Control {
    fn as_mut(&mut self) -> &mut Element {
        self.element_mut()
    }
}

/// A field kind that can be stored as a [`Control`].
pub(crate) trait Field: AsMut<Element> + Sized {
    fn into_control(self) -> Control;

    fn from_control(control: &mut Control) -> Option<&mut Self>;
}

macro_rules! impl_field {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Field for $ty {
                fn into_control(self) -> Control {
                    Control::$ty(self)
                }

                fn from_control(control: &mut Control) -> Option<&mut Self> {
                    match control {
                        Control::$ty(field) => Some(field),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_field!(Element, Textarea, Select, Upload, Captcha);
