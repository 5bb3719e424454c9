//! Forms: an ordered collection of fields driven through one request.
//!
//! A form is identified in submissions by a hidden sentinel field whose
//! name is the form's token, a SHA-256 over its name, instance number and
//! method. [`Form::validate`] ignores requests that do not carry it.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::assets::AssetSink;
use crate::attributes::{sanitize_name, AttrValue};
use crate::config::FormsConfig;
use crate::element::{BuildScope, Element, FieldMut, NameIndexer};
use crate::error::{FormError, Result, ValidationErrors};
use crate::fields::{Captcha, CaptchaVerifier, Control, Field, Select, Textarea, Upload, UploadValue};
use crate::presenter::ErrorPresenter;
use crate::request::{FieldValue, Method, RequestContext, Submission};
use crate::sniff::{MagicSniffer, MimeSniffer};
use crate::FORM_INSTANCES;

/// Outcome of [`Form::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Every field passed.
    Valid,
    /// At least one field failed.
    Invalid(ValidationErrors),
    /// The request does not carry this form.
    NotSubmitted,
}

impl Validation {
    /// Returns whether the form was submitted and passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Returns whether the request carried this form.
    pub fn is_submitted(&self) -> bool {
        !matches!(self, Self::NotSubmitted)
    }

    /// Returns the failures, if any.
    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Rendered fields grouped by field name, plus the sentinel input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltForm {
    fields: IndexMap<String, BTreeMap<usize, String>>,
    form: String,
}

impl BuiltForm {
    /// Fragments rendered for a field, keyed by index.
    pub fn get(&self, name: &str) -> Option<&BTreeMap<usize, String>> {
        self.fields.get(name)
    }

    /// One fragment of a field.
    pub fn fragment(&self, name: &str, index: usize) -> Option<&str> {
        self.get(name)?.get(&index).map(String::as_str)
    }

    /// The hidden sentinel input.
    pub fn form(&self) -> &str {
        &self.form
    }

    /// Field names in render order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Every fragment in order, followed by the sentinel.
    pub fn to_html(&self) -> String {
        let mut html: String = self.fields.values().flat_map(BTreeMap::values).map(String::as_str).collect();
        html.push_str(&self.form);
        html
    }
}

impl Serialize for BuiltForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (name, fragments) in &self.fields {
            map.serialize_entry(name, fragments)?;
        }
        map.serialize_entry("form", &self.form)?;
        map.end()
    }
}

/// The value of one entry of [`FormValues`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormValue {
    /// A submitted field.
    Field(FieldValue),
    /// An upload.
    Upload(UploadValue),
}

/// Clean submitted values, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormValues(IndexMap<String, FormValue>);

impl FormValues {
    /// Gets a value.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.0.get(name)
    }

    /// Gets a scalar value.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FormValue::Field(value) => value.as_text(),
            FormValue::Upload(_) => None,
        }
    }

    /// Gets an upload.
    pub fn upload(&self, name: &str) -> Option<&UploadValue> {
        match self.get(name)? {
            FormValue::Upload(value) => Some(value),
            FormValue::Field(_) => None,
        }
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the values into a typed result.
    ///
    /// ```rust
    /// use serde::Deserialize;
    /// use ysf_forms::{Form, RequestContext, Submission};
    ///
    /// #[derive(Deserialize)]
    /// struct Contact {
    ///     email: String,
    /// }
    ///
    /// let mut form = Form::builder("contact").instance(0).build();
    /// form.input("email", "email");
    ///
    /// let ctx = RequestContext::post(Submission::new().with("email", "a@b.be"));
    /// let contact: Contact = form.values(&ctx).deserialize_into()?;
    /// assert_eq!(contact.email, "a@b.be");
    /// # Ok::<(), ysf_forms::FormError>(())
    /// ```
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

/// A form.
pub struct Form {
    base: Element,
    name: String,
    form_id: String,
    method: Method,
    uploads_enabled: bool,
    controls: Vec<Control>,
    uploads: IndexMap<String, usize>,
    names: NameIndexer,
    config: FormsConfig,
    sniffer: Arc<dyn MimeSniffer>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("name", &self.name)
            .field("form_id", &self.form_id)
            .field("method", &self.method)
            .field("uploads_enabled", &self.uploads_enabled)
            .field("controls", &self.controls)
            .finish_non_exhaustive()
    }
}

impl Form {
    /// Starts building a form.
    pub fn builder(name: impl Into<String>) -> FormBuilder {
        FormBuilder::new(name)
    }

    /// The sentinel token identifying this form in submissions.
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// The form's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The method the form is submitted with.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns whether the form accepts uploads.
    pub fn uploads_enabled(&self) -> bool {
        self.uploads_enabled
    }

    /// The form's settings.
    pub fn config(&self) -> &FormsConfig {
        &self.config
    }

    /// Sets an attribute of the `<form>` tag.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.base.attributes_mut().set(key, value);
        self
    }

    /// Renders the opening `<form>` tag.
    pub fn open_tag(&self) -> String {
        let mut html = self.base.open_tag("", &[]);
        html.push_str(">\n");
        html
    }

    /// Renders the closing `</form>` tag.
    pub fn close_tag(&self) -> String {
        "</form>\n".to_string()
    }

    fn attach<T: Field>(&mut self, mut field: T, name: &str) -> FieldMut<'_, T> {
        FieldMut::new(&mut field, &mut self.names).set_attribute("name", name);
        self.controls.push(field.into_control());

        match self.controls.last_mut().and_then(T::from_control) {
            Some(field) => FieldMut::new(field, &mut self.names),
            None => unreachable!("attached control was just pushed"),
        }
    }

    /// Adds an `<input>` of the given type.
    pub fn input(&mut self, kind: &str, name: &str) -> FieldMut<'_, Element> {
        let mut element = Element::new("input", true);
        element.attributes_mut().set("type", kind.to_ascii_lowercase());
        self.attach(element, name)
    }

    /// Adds a `<textarea>`.
    pub fn textarea(&mut self, name: &str) -> FieldMut<'_, Textarea> {
        self.attach(Textarea::new(), name)
    }

    /// Adds a `<select>` with an optional placeholder entry.
    pub fn select(&mut self, name: &str, default: Option<&str>) -> FieldMut<'_, Select> {
        self.attach(Select::new(default), name)
    }

    /// Adds a file input accepting files up to `max_size` bytes.
    pub fn upload(&mut self, name: &str, max_size: u64) -> Result<FieldMut<'_, Upload>> {
        if !self.uploads_enabled {
            warn!(form = %self.name, field = name, "upload added to a form without upload support");
            return Err(FormError::UploadsDisabled);
        }
        self.uploads.insert(name.to_string(), self.controls.len());
        Ok(self.attach(Upload::new(max_size), name))
    }

    /// Adds a CAPTCHA using the configured keys.
    pub fn captcha(&mut self, name: &str, verifier: Arc<dyn CaptchaVerifier>) -> FieldMut<'_, Captcha> {
        self.uploads.insert(name.to_string(), self.controls.len());
        let captcha = Captcha::new(self.config.recaptcha.clone(), verifier);
        self.attach(captcha, name)
    }

    /// Hands out the next index for a repeated name, starting at 0.
    pub fn name_index(&mut self, name: &str) -> usize {
        self.names.next(name)
    }

    /// All fields, in order.
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// The upload or CAPTCHA field registered under `name`.
    pub fn upload_field(&self, name: &str) -> Option<&Control> {
        self.uploads.get(name).and_then(|&index| self.controls.get(index))
    }

    /// Fields whose sanitized name matches `name`.
    pub fn elements(&self, name: &str) -> Vec<&Control> {
        let wanted = sanitize_name(name);
        self.controls
            .iter()
            .filter(|control| control.element().field_name().as_deref() == Some(wanted.as_str()))
            .collect()
    }

    /// The field named `name` with the given index.
    pub fn element(&self, name: &str, index: usize) -> Option<&Control> {
        self.elements(name)
            .into_iter()
            .find(|control| control.element().index() == index)
    }

    /// Mutable access to the field named `name` with the given index.
    pub fn element_mut(&mut self, name: &str, index: usize) -> Option<FieldMut<'_, Control>> {
        let wanted = sanitize_name(name);
        let control = self.controls.iter_mut().find(|control| {
            let element = control.element();
            element.field_name().as_deref() == Some(wanted.as_str()) && element.index() == index
        })?;
        Some(FieldMut::new(control, &mut self.names))
    }

    /// Clears every field and stops them from remembering submissions.
    pub fn reset(&mut self) {
        for control in &mut self.controls {
            control.element_mut().clear();
        }
    }

    /// Copies values into the fields.
    pub fn fill(&mut self, data: &Submission) {
        for control in &mut self.controls {
            control.fill(data);
        }
    }

    /// Copies values from any struct or map into the fields.
    pub fn fill_from<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<()> {
        let submission = Submission::from_serialize(data)?;
        self.fill(&submission);
        Ok(())
    }

    /// Validates every field against the request.
    ///
    /// Failures are reported once through `presenter`, under `title`.
    pub fn validate(
        &mut self,
        ctx: &RequestContext,
        title: &str,
        presenter: &mut dyn ErrorPresenter,
    ) -> Validation {
        if ctx.method != self.method {
            debug!(form = %self.name, expected = %self.method, got = %ctx.method, "form not submitted: method differs");
            return Validation::NotSubmitted;
        }

        let data = ctx.container(self.method);
        if !data.is_filled(&self.form_id) {
            debug!(form = %self.name, "form not submitted: sentinel missing");
            return Validation::NotSubmitted;
        }

        let mut errors = ValidationErrors::new();
        for control in &mut self.controls {
            if let Err(message) = control.validate(ctx, data, self.sniffer.as_ref()) {
                let field = control.element().field_name().unwrap_or_default();
                errors.add(&field, message);
            }
        }

        if errors.is_empty() {
            debug!(form = %self.name, "form validated");
            Validation::Valid
        } else {
            warn!(form = %self.name, errors = errors.len(), "form failed validation");
            presenter.show_error(title, &errors);
            Validation::Invalid(errors)
        }
    }

    /// Renders every field, each line prefixed with `indent` tabs.
    pub fn build(&mut self, ctx: &RequestContext, indent: usize, assets: &mut dyn AssetSink) -> BuiltForm {
        let prefix = "\t".repeat(indent);
        let data = ctx.container(self.method);
        let mut scope = BuildScope::new(data, assets, &self.config);
        let mut fields: IndexMap<String, BTreeMap<usize, String>> = IndexMap::new();

        for control in &mut self.controls {
            let html = control.build(&prefix, &mut scope);
            let element = control.element();
            let slots = fields.entry(element.field_name().unwrap_or_default()).or_default();

            let mut index = element.index();
            while slots.contains_key(&index) {
                index += 1;
            }
            slots.insert(index, html);
        }

        BuiltForm {
            fields,
            form: format!("<input type=\"hidden\" name=\"{}\" value=\"1\" />\n", self.form_id),
        }
    }

    /// Extracts the submitted values.
    ///
    /// Repeated names give the whole submitted sequence, uploads their
    /// accepted files. CAPTCHAs are left out.
    pub fn values(&self, ctx: &RequestContext) -> FormValues {
        let data = ctx.container(self.method);
        let mut values = IndexMap::new();

        for control in &self.controls {
            let element = control.element();
            let Some(raw) = element.name() else {
                continue;
            };

            match control {
                Control::Captcha(_) => {}
                Control::Upload(upload) => {
                    values.insert(raw.to_string(), FormValue::Upload(upload.value(data, &ctx.files)));
                }
                _ => {
                    let key = sanitize_name(raw);
                    if element.is_repeated() {
                        if !values.contains_key(&key) {
                            let value = data.get(&key).cloned().unwrap_or_default();
                            values.insert(key, FormValue::Field(value));
                        }
                    } else {
                        let value = if element.is_empty(data) {
                            FieldValue::default()
                        } else {
                            control.value(data)
                        };
                        values.insert(key, FormValue::Field(value));
                    }
                }
            }
        }

        FormValues(values)
    }
}

/// Builds a [`Form`].
pub struct FormBuilder {
    name: String,
    method: Method,
    uploads: bool,
    config: FormsConfig,
    sniffer: Arc<dyn MimeSniffer>,
    instance: Option<usize>,
}

impl FormBuilder {
    /// Starts a POST form without uploads.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: Method::Post,
            uploads: false,
            config: FormsConfig::default(),
            sniffer: Arc::new(MagicSniffer),
            instance: None,
        }
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Enables uploads.
    #[must_use]
    pub fn uploads(mut self, uploads: bool) -> Self {
        self.uploads = uploads;
        self
    }

    /// Sets the settings.
    #[must_use]
    pub fn config(mut self, config: FormsConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the MIME sniffer used for uploads.
    #[must_use]
    pub fn sniffer(mut self, sniffer: Arc<dyn MimeSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    /// Fixes the instance number instead of drawing the next one.
    #[must_use]
    pub fn instance(mut self, instance: usize) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Builds the form.
    pub fn build(self) -> Form {
        let instance = self
            .instance
            .unwrap_or_else(|| FORM_INSTANCES.fetch_add(1, Ordering::Relaxed));
        let form_id = form_token(&self.name, instance, self.method);

        let mut base = Element::new("form", false);
        base.attributes_mut().set("method", self.method.as_attr());
        if self.uploads {
            base.attributes_mut().set("enctype", "multipart/form-data");
        }

        debug!(form = %self.name, instance, "form created");
        Form {
            base,
            name: self.name,
            form_id,
            method: self.method,
            uploads_enabled: self.uploads,
            controls: Vec::new(),
            uploads: IndexMap::new(),
            names: NameIndexer::default(),
            config: self.config,
            sniffer: self.sniffer,
        }
    }
}

fn form_token(name: &str, instance: usize, method: Method) -> String {
    let digest = Sha256::digest(format!("{name}{instance}{}", method.as_attr()).as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRegistry;
    use crate::presenter::AlertPresenter;

    fn submitted(form: &Form, data: Submission) -> RequestContext {
        RequestContext::post(data.with(form.form_id(), "1"))
    }

    #[test]
    fn test_form_token_is_deterministic() {
        let a = Form::builder("login").instance(3).build();
        let b = Form::builder("login").instance(3).build();
        let c = Form::builder("login").instance(3).method(Method::Get).build();
        assert_eq!(a.form_id(), b.form_id());
        assert_ne!(a.form_id(), c.form_id());
        assert_eq!(a.form_id().len(), 64);
    }

    #[test]
    fn test_instances_are_unique() {
        let a = Form::builder("login").build();
        let b = Form::builder("login").build();
        assert_ne!(a.form_id(), b.form_id());
    }

    #[test]
    fn test_open_tag() {
        let form = Form::builder("upload").uploads(true).instance(0).build();
        assert_eq!(
            form.open_tag(),
            "<form method=\"post\" enctype=\"multipart/form-data\">\n"
        );
        assert_eq!(form.close_tag(), "</form>\n");
    }

    #[test]
    fn test_upload_requires_support() {
        let mut form = Form::builder("plain").instance(0).build();
        assert!(matches!(form.upload("file", 100), Err(FormError::UploadsDisabled)));
    }

    #[test]
    fn test_name_index_is_monotonic() {
        let mut form = Form::builder("f").instance(0).build();
        assert_eq!(form.name_index("tags[]"), 0);
        assert_eq!(form.name_index("tags[]"), 1);
        assert_eq!(form.name_index("other[]"), 0);
    }

    #[test]
    fn test_elements_lookup() {
        let mut form = Form::builder("f").instance(0).build();
        form.input("checkbox", "opt[]").set_attribute("value", "a");
        form.input("checkbox", "opt[]").set_attribute("value", "b");

        assert_eq!(form.elements("opt").len(), 2);
        let second = form.element("opt[]", 1).unwrap();
        assert_eq!(second.element().attributes().text("value"), Some("b"));

        form.element_mut("opt", 0).unwrap().set_attribute("value", "z");
        let first = form.element("opt", 0).unwrap();
        assert_eq!(first.element().attributes().text("value"), Some("z"));
    }

    #[test]
    fn test_validate_reports_once() {
        let mut form = Form::builder("f").instance(0).build();
        form.input("text", "email").set_required(true, "Enter an email.").unwrap();
        form.input("text", "name").set_required(true, "Enter a name.").unwrap();

        let ctx = submitted(&form, Submission::new());
        let mut presenter = AlertPresenter::new();
        let result = form.validate(&ctx, "Please fix", &mut presenter);

        let errors = result.errors().unwrap();
        assert_eq!(errors.messages(), ["Enter an email.", "Enter a name."]);
        assert_eq!(presenter.alerts().len(), 1);
    }

    #[test]
    fn test_reset_forgets_values() {
        let mut form = Form::builder("f").instance(0).build();
        form.input("text", "city");
        form.fill(&Submission::new().with("city", "Ghent"));
        form.reset();

        let ctx = RequestContext::post(Submission::new().with("city", "Paris"));
        let built = form.build(&ctx, 0, &mut AssetRegistry::new());
        assert_eq!(
            built.fragment("city", 0),
            Some("<input type=\"text\" name=\"city\" value=\"\" />\n")
        );
    }

    #[test]
    fn test_fill_from_struct() {
        #[derive(Serialize)]
        struct Profile {
            city: &'static str,
            newsletter: bool,
        }

        let mut form = Form::builder("f").instance(0).build();
        form.input("text", "city");
        form.input("checkbox", "newsletter").set_attribute("value", "1");
        form.fill_from(&Profile {
            city: "Ghent",
            newsletter: true,
        })
        .unwrap();

        let html = form
            .build(&RequestContext::new(Method::Post), 1, &mut AssetRegistry::new())
            .to_html();
        assert!(html.contains("\t<input type=\"text\" name=\"city\" value=\"Ghent\" />\n"));
        assert!(html.contains("checked=\"checked\""));
    }

    #[test]
    fn test_built_form_serializes() {
        let mut form = Form::builder("f").instance(0).build();
        form.input("text", "city");
        let built = form.build(&RequestContext::new(Method::Post), 0, &mut AssetRegistry::new());

        let json = serde_json::to_value(&built).unwrap();
        assert_eq!(json["city"]["0"], "<input type=\"text\" name=\"city\" />\n");
        assert_eq!(json["form"], built.form());
    }
}
