//! Element attributes and the small amount of HTML escaping forms need.

use indexmap::IndexMap;

/// Marks a field name as repeated: `color[]`.
pub const REPEATED_MARKER: &str = "[]";

/// Reduces a field name to the key it is submitted under.
///
/// Everything but ASCII letters, digits and `_` is dropped, so
/// `color[]` and `color[2]` both become `color`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Escapes HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Value of an element attribute.
///
/// `Bool(false)` and `Null` are kept distinct from "not set" so callers
/// can switch an attribute off without forgetting it; both are left out of
/// the rendered tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// A string value.
    Text(String),
    /// A boolean flag; `true` renders as `"1"`.
    Bool(bool),
    /// Explicitly unset.
    Null,
}

impl AttrValue {
    /// Returns the string value, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The text written into the tag, or `None` when the attribute is
    /// omitted.
    pub fn rendered(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bool(true) => Some("1"),
            Self::Bool(false) | Self::Null => None,
        }
    }

    /// Returns whether the value counts as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Bool(b) => !b,
            Self::Null => true,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for AttrValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! attr_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for AttrValue {
                fn from(value: $t) -> Self {
                    Self::Text(value.to_string())
                }
            }
        )*
    };
}

attr_from_number!(i32, i64, u32, u64, usize);

/// Ordered attribute map of an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: IndexMap<String, AttrValue>,
}

impl Attributes {
    /// Creates new empty attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute. Any spelling of `name` is stored as `name`.
    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) {
        let key = if key.eq_ignore_ascii_case("name") {
            "name".to_string()
        } else {
            key.to_string()
        };
        self.entries.insert(key, value.into());
    }

    /// Gets an attribute.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    /// Gets the string value of an attribute.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_text)
    }

    /// Removes an attribute, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.entries.shift_remove(key)
    }

    /// Returns whether the attribute is absent or empty.
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).map_or(true, AttrValue::is_blank)
    }

    /// Returns an iterator over the attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Appends ` key="value"` with both sides escaped.
pub(crate) fn push_attr(html: &mut String, key: &str, value: &str) {
    html.push(' ');
    html.push_str(&html_escape(key));
    html.push_str("=\"");
    html.push_str(&html_escape(value));
    html.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("\"test\""), "&quot;test&quot;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("color[]"), "color");
        assert_eq!(sanitize_name("first-name"), "firstname");
        assert_eq!(sanitize_name("user_2[7]"), "user_27");
    }

    #[test]
    fn test_three_way_values() {
        let mut attrs = Attributes::new();
        attrs.set("checked", false);
        attrs.set("class", "wide");

        assert_eq!(attrs.get("checked"), Some(&AttrValue::Bool(false)));
        assert_eq!(attrs.get("checked").and_then(AttrValue::rendered), None);
        assert!(attrs.get("missing").is_none());
        assert_eq!(attrs.text("class"), Some("wide"));
    }

    #[test]
    fn test_name_key_normalized() {
        let mut attrs = Attributes::new();
        attrs.set("NAME", "email");
        assert_eq!(attrs.text("name"), Some("email"));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut attrs = Attributes::new();
        attrs.set("a", "1");
        attrs.set("b", "2");
        attrs.set("c", 3_u32);
        attrs.remove("b");
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_push_attr() {
        let mut html = String::from("<input");
        push_attr(&mut html, "value", "a\"b");
        assert_eq!(html, "<input value=\"a&quot;b\"");
    }
}
