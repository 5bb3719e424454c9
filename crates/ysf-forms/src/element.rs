//! The base form field.
//!
//! Every control of a form is an [`Element`]: an HTML tag with ordered
//! attributes, a required flag and an optional validator chain. Specialized
//! controls ([`Select`](crate::Select), [`Upload`](crate::Upload), ...) wrap
//! an `Element` and dereference to it.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::warn;

use crate::assets::{self, AssetSink};
use crate::attributes::{push_attr, sanitize_name, AttrValue, Attributes, REPEATED_MARKER};
use crate::config::FormsConfig;
use crate::error::{FormError, Result};
use crate::request::{FieldValue, Submission};
use crate::validation::{run_rules, Rules, Validator};

/// Pseudo-attribute holding the content of non-self-closing tags.
pub const INNER_HTML: &str = "innerHTML";

pub(crate) const CAPTCHA_TAG: &str = "captcha";
pub(crate) const SELECT_TAG: &str = "select";

/// Hands out per-name indices for repeated fields (`color[]`).
#[derive(Debug, Clone, Default)]
pub(crate) struct NameIndexer {
    last: HashMap<String, usize>,
}

impl NameIndexer {
    /// Returns the next index for `name`, starting at 0.
    pub(crate) fn next(&mut self, name: &str) -> usize {
        let next = self.last.get(name).map_or(0, |last| last + 1);
        self.last.insert(name.to_string(), next);
        next
    }
}

/// Where a build writes its side effects.
pub struct BuildScope<'a> {
    /// Submission used to hydrate remembered fields.
    pub submission: &'a Submission,
    /// Receives the script assets the fields need.
    pub assets: &'a mut dyn AssetSink,
    /// Form settings.
    pub config: &'a FormsConfig,
}

impl<'a> BuildScope<'a> {
    /// Creates a scope.
    pub fn new(
        submission: &'a Submission,
        assets: &'a mut dyn AssetSink,
        config: &'a FormsConfig,
    ) -> Self {
        Self {
            submission,
            assets,
            config,
        }
    }
}

/// A form field.
#[derive(Clone)]
pub struct Element {
    tag: String,
    close: bool,
    attributes: Attributes,
    required: bool,
    remember: bool,
    rules: Option<Vec<Arc<dyn Validator>>>,
    error_message: String,
    name_index: Option<usize>,
    colorpicker: bool,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("close", &self.close)
            .field("attributes", &self.attributes)
            .field("required", &self.required)
            .field("remember", &self.remember)
            .field("rules", &self.rules.as_ref().map(Vec::len))
            .field("name_index", &self.name_index)
            .finish_non_exhaustive()
    }
}

impl Element {
    /// Creates an unnamed element. `close` marks self-closing tags.
    pub(crate) fn new(tag: &str, close: bool) -> Self {
        Self {
            tag: tag.to_string(),
            close,
            attributes: Attributes::new(),
            required: false,
            remember: true,
            rules: None,
            error_message: String::new(),
            name_index: None,
            colorpicker: false,
        }
    }

    /// Returns the tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The `type` attribute of inputs, lowercased, or the tag otherwise.
    pub fn field_type(&self) -> String {
        if self.tag == "input" {
            self.attributes
                .text("type")
                .map_or_else(|| "text".to_string(), str::to_ascii_lowercase)
        } else {
            self.tag.clone()
        }
    }

    /// Returns whether the tag is self-closing.
    pub fn is_closed(&self) -> bool {
        self.close
    }

    /// Gets an attribute.
    pub fn get_attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Returns all attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The raw `name` attribute, if set and non-empty.
    pub fn name(&self) -> Option<&str> {
        self.attributes.text("name").filter(|n| !n.is_empty())
    }

    /// The name reduced to `[A-Za-z0-9_]`, as submissions are keyed.
    pub fn field_name(&self) -> Option<String> {
        self.name().map(sanitize_name)
    }

    /// The index assigned to a repeated name.
    pub fn name_index(&self) -> Option<usize> {
        self.name_index
    }

    /// The name index, or 0.
    pub fn index(&self) -> usize {
        self.name_index.unwrap_or(0)
    }

    /// Returns whether the name uses the `[]` marker.
    pub fn is_repeated(&self) -> bool {
        self.name().is_some_and(|n| n.contains(REPEATED_MARKER))
    }

    /// Returns whether the field must be filled in.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns whether the next build pulls the submission into the field.
    pub fn remembers(&self) -> bool {
        self.remember
    }

    /// Sets whether the next build pulls the submission into the field.
    pub fn set_remember(&mut self, remember: bool) -> &mut Self {
        self.remember = remember;
        self
    }

    /// Marks the field as required (or not) and sets the message shown
    /// when it is left empty. Drops any validators.
    pub fn set_required(&mut self, required: bool, message: impl Into<String>) -> Result<&mut Self> {
        if self.tag == CAPTCHA_TAG && !required {
            warn!("attempted to make a captcha optional");
            return Err(FormError::CaptchaAlwaysRequired);
        }
        if required && self.name().is_none() {
            warn!(tag = %self.tag, "required flag set on an unnamed field");
            return Err(FormError::MissingName("required flag"));
        }

        self.required = required;
        self.error_message = message.into();
        self.rules = None;
        Ok(self)
    }

    /// Attaches validators and makes the field required.
    ///
    /// ```rust
    /// use ysf_forms::{filters, Rules};
    ///
    /// let mut form = ysf_forms::create("signup", false);
    /// form.input("text", "email")
    ///     .set_validator(Rules::patterns([(filters::EMAIL, "Enter an email address.")])?)?;
    /// # Ok::<(), ysf_forms::FormError>(())
    /// ```
    pub fn set_validator(&mut self, rules: impl Into<Rules>) -> Result<&mut Self> {
        if self.tag == SELECT_TAG || self.tag == CAPTCHA_TAG {
            warn!(tag = %self.tag, "set_validator called on a field without validators");
            return Err(FormError::ValidatorNotSupported(self.tag.clone()));
        }
        if self.name().is_none() {
            warn!(tag = %self.tag, "validator set on an unnamed field");
            return Err(FormError::MissingName("validator"));
        }

        self.rules = Some(rules.into().into_vec());
        self.required = true;
        Ok(self)
    }

    /// Turns the field into a colour picker.
    pub fn colorpicker(&mut self, on: bool) -> &mut Self {
        self.colorpicker = on;
        self
    }

    /// The message used when a required field is empty.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Copies this field's value out of `data` into the field.
    pub fn fill(&mut self, data: &Submission) {
        if self.name().is_none() {
            return;
        }
        if let Some(value) = self.slot_value(data).filter(|v| !v.is_blank()).cloned() {
            self.absorb(&value);
            self.remember = false;
        }
    }

    /// Returns whether `data` holds nothing for this field. `"0"` is a value.
    pub fn is_empty(&self, data: &Submission) -> bool {
        self.slot_value(data).map_or(true, FieldValue::is_blank)
    }

    /// Looks the field up in `data`.
    ///
    /// Names ending in `[]` give the whole submitted sequence; other
    /// indexed names give their own slot.
    pub fn post_value<'d>(&self, data: &'d Submission) -> Option<&'d FieldValue> {
        let name = self.name()?;
        let value = data.get(&sanitize_name(name))?;
        if name.ends_with(REPEATED_MARKER) {
            return Some(value);
        }
        match self.name_index {
            Some(index) => value.at(index),
            None => Some(value),
        }
    }

    /// The submitted value, or an empty string.
    pub fn value(&self, data: &Submission) -> FieldValue {
        self.post_value(data).cloned().unwrap_or_default()
    }

    /// The submitted value at this field's own slot.
    pub(crate) fn slot_value<'d>(&self, data: &'d Submission) -> Option<&'d FieldValue> {
        let value = data.get(&self.field_name()?)?;
        match self.name_index {
            Some(index) => value.at(index),
            None => Some(value),
        }
    }

    pub(crate) fn absorb(&mut self, value: &FieldValue) {
        let field_type = self.field_type();
        if field_type == "radio" || field_type == "checkbox" {
            let checked = value
                .as_text()
                .is_some_and(|v| self.attributes.text("value") == Some(v));
            if checked {
                self.attributes.set("checked", "checked");
            } else {
                self.attributes.remove("checked");
            }
            return;
        }

        let Some(text) = value.as_text() else {
            return;
        };
        if self.tag == SELECT_TAG {
            self.attributes.set("value", protect(text));
        } else if !self.close {
            self.attributes.set(INNER_HTML, text);
        } else {
            self.attributes.set("value", text);
        }
    }

    /// Pulls the submission in when the field still remembers.
    pub(crate) fn hydrate(&mut self, data: &Submission) {
        if !self.remember {
            return;
        }
        if let Some(value) = self.slot_value(data).filter(|v| !v.is_blank()).cloned() {
            self.absorb(&value);
        }
    }

    /// Forgets the field's value.
    pub(crate) fn clear(&mut self) {
        match self.field_type().as_str() {
            "radio" | "checkbox" => {
                self.attributes.remove("checked");
            }
            _ if !self.close => self.attributes.set(INNER_HTML, ""),
            _ => self.attributes.set("value", ""),
        }
        self.remember = false;
    }

    pub(crate) fn mark_required(&mut self) {
        self.required = true;
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub(crate) fn rules(&self) -> Option<&[Arc<dyn Validator>]> {
        self.rules.as_deref()
    }

    /// Hydrates, then renders the tag. `prefix` starts the line.
    pub fn build(&mut self, prefix: &str, scope: &mut BuildScope<'_>) -> String {
        self.hydrate(scope.submission);
        self.register_assets(scope);
        self.render(prefix)
    }

    pub(crate) fn register_assets(&self, scope: &mut BuildScope<'_>) {
        if self.colorpicker {
            let src = scope.config.asset_url("external/jscolor/jscolor.js");
            scope.assets.script(assets::JSCOLOR, &src);
        }
        if scope.config.smart_placeholder && !self.attributes.is_blank("placeholder") {
            let src = scope.config.asset_url("javascript/placeholder.js");
            scope.assets.script(assets::PLACEHOLDER, &src);
        }
    }

    /// Renders the tag with its current attributes.
    pub(crate) fn render(&self, prefix: &str) -> String {
        let mut html = self.open_tag(prefix, &[]);
        if self.close {
            html.push_str(" />\n");
        } else {
            html.push('>');
            if let Some(inner) = self.attributes.text(INNER_HTML) {
                html.push_str(&crate::attributes::html_escape(inner));
            }
            html.push_str(&format!("</{}>\n", self.tag));
        }
        html
    }

    /// Renders `prefix<tag attrs`, leaving the tag open. Attributes in
    /// `skip` are left out.
    pub(crate) fn open_tag(&self, prefix: &str, skip: &[&str]) -> String {
        let mut html = format!("{prefix}<{}", self.tag);
        let mut has_class = false;

        for (key, value) in self.attributes.iter() {
            if key == INNER_HTML || skip.contains(&key) {
                continue;
            }
            let Some(text) = value.rendered() else {
                continue;
            };
            match key {
                "name" => push_attr(&mut html, key, &self.rendered_name(text)),
                "class" if self.colorpicker => {
                    has_class = true;
                    push_attr(&mut html, key, &format!("{text} color"));
                }
                _ => push_attr(&mut html, key, text),
            }
        }

        if self.colorpicker && !has_class {
            push_attr(&mut html, "class", "color");
        }
        html
    }

    /// Splices the name index into a repeated name.
    pub(crate) fn rendered_name(&self, name: &str) -> String {
        match self.name_index {
            Some(index) if name.contains(REPEATED_MARKER) => {
                format!("{}[{index}]", sanitize_name(name))
            }
            _ => name.to_string(),
        }
    }

    /// Checks the submission. Returns the failure message.
    pub fn validate(&self, data: &Submission) -> std::result::Result<(), String> {
        if !self.required {
            return Ok(());
        }

        match &self.rules {
            None if self.is_empty(data) => Err(self.error_message.clone()),
            None => Ok(()),
            Some(rules) => {
                let name = self.field_name().unwrap_or_default();
                let value = self
                    .slot_value(data)
                    .and_then(FieldValue::as_text)
                    .unwrap_or("");
                run_rules(rules, &name, value)
            }
        }
    }
}

impl AsRef<Element> for Element {
    fn as_ref(&self) -> &Element {
        self
    }
}

impl AsMut<Element> for Element {
    fn as_mut(&mut self) -> &mut Element {
        self
    }
}

/// Prefixes values starting with `_` or `0` with `_`.
pub(crate) fn protect(value: &str) -> String {
    if value.starts_with('_') || value.starts_with('0') {
        format!("_{value}")
    } else {
        value.to_string()
    }
}

/// Mutable access to a field of a form.
///
/// Setting a repeated `name` through this handle asks the form for the
/// field's index, so attributes should be set here rather than on the
/// bare field.
pub struct FieldMut<'f, T> {
    field: &'f mut T,
    names: &'f mut NameIndexer,
}

impl<'f, T: AsMut<Element>> FieldMut<'f, T> {
    pub(crate) fn new(field: &'f mut T, names: &'f mut NameIndexer) -> Self {
        Self { field, names }
    }

    /// Sets an attribute.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttrValue>) -> &mut Self {
        let value = value.into();
        let element = self.field.as_mut();

        if key.eq_ignore_ascii_case("name") && element.name_index.is_none() {
            if let Some(name) = value.as_text().filter(|n| n.contains(REPEATED_MARKER)) {
                element.name_index = Some(self.names.next(name));
            }
        }
        element.attributes.set(key, value);
        self
    }

    /// Sets several attributes in order.
    pub fn set_attributes<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        for (key, value) in pairs {
            self.set_attribute(key.as_ref(), value);
        }
        self
    }

    /// Releases the handle, keeping the borrow of the field.
    pub fn into_inner(self) -> &'f mut T {
        self.field
    }
}

impl<T> Deref for FieldMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.field
    }
}

impl<T> DerefMut for FieldMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.field
    }
}
