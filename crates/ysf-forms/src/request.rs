//! Request-scoped submission data.
//!
//! Everything a form reads from the current request travels through a
//! [`RequestContext`]: the method, the query and body fields, the uploaded
//! files table and the client address.

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{FormError, Result};

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    #[default]
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
}

impl Method {
    /// Parses a method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Returns the lowercase spelling used in the `method` attribute.
    pub fn as_attr(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A submitted field value: a scalar or a nested array.
///
/// Array keys are strings so that both list-style (`0`, `1`, ...) and
/// keyed submissions (`name[info]`) fit the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A plain string value.
    Text(String),
    /// A nested array of values.
    Array(IndexMap<String, FieldValue>),
}

impl FieldValue {
    /// Builds a list-style array, keyed `0..n`.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.into()))
                .collect(),
        )
    }

    /// Builds a keyed array.
    pub fn map<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Self::Array(
            items
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the string value, if this is a scalar.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Array(_) => None,
        }
    }

    /// Looks up a key of an array value.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            Self::Array(items) => items.get(key),
            Self::Text(_) => None,
        }
    }

    /// Looks up a list slot of an array value.
    pub fn at(&self, index: usize) -> Option<&FieldValue> {
        self.get(&index.to_string())
    }

    /// Emptiness as forms understand it: an empty string or an empty
    /// array. The string `"0"` is a real value.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Array(items) => items.is_empty(),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Submitted fields of one request (query string or body).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Submission {
    fields: IndexMap<String, FieldValue>,
}

impl Submission {
    /// Creates an empty submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder method to insert a field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Gets a field.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Returns whether a field is present with a non-blank value.
    pub fn is_filled(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_blank())
    }

    /// Returns an iterator over the fields.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether no fields were submitted.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Normalizes any serializable struct or map into a submission.
    ///
    /// Numbers become their decimal text, `true` becomes `"1"`, `false`
    /// becomes `""` and `null` members are dropped.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        match serde_json::to_value(data)? {
            serde_json::Value::Object(members) => Ok(Self {
                fields: members
                    .into_iter()
                    .filter_map(|(k, v)| from_json(v).map(|v| (k, v)))
                    .collect(),
            }),
            other => Err(FormError::InvalidData(json_kind(&other).to_string())),
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Submission {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn from_json(value: serde_json::Value) -> Option<FieldValue> {
    use serde_json::Value;

    match value {
        Value::Null => None,
        Value::Bool(true) => Some(FieldValue::from("1")),
        Value::Bool(false) => Some(FieldValue::default()),
        Value::Number(n) => Some(FieldValue::Text(n.to_string())),
        Value::String(s) => Some(FieldValue::Text(s)),
        Value::Array(items) => Some(FieldValue::Array(
            items
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| from_json(v).map(|v| (i.to_string(), v)))
                .collect(),
        )),
        Value::Object(members) => Some(FieldValue::Array(
            members
                .into_iter()
                .filter_map(|(k, v)| from_json(v).map(|v| (k, v)))
                .collect(),
        )),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Transport status of an uploaded file, mirroring the usual CGI codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadError {
    /// The upload succeeded.
    #[default]
    Ok,
    /// The file exceeds the server-wide size limit.
    IniSize,
    /// The file exceeds the form's `MAX_FILE_SIZE`.
    FormSize,
    /// The file was only partially received.
    Partial,
    /// No file was sent for this slot.
    NoFile,
    /// No temporary directory is available.
    NoTmpDir,
    /// Writing the file to disk failed.
    CantWrite,
    /// A server extension stopped the upload.
    Extension,
}

impl UploadError {
    /// Maps a numeric transport code. Unknown codes map to `Extension`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            _ => Self::Extension,
        }
    }
}

/// Metadata of one uploaded file slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// Client-side filename.
    pub name: String,
    /// MIME type declared by the client (or sniffed, after validation).
    #[serde(rename = "type")]
    pub mime: String,
    /// Where the server stored the upload.
    pub tmp_name: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Transport status.
    pub error: UploadError,
}

impl UploadedFile {
    /// Creates a successfully transported file slot.
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        tmp_name: impl Into<PathBuf>,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            tmp_name: tmp_name.into(),
            size,
            error: UploadError::Ok,
        }
    }

    /// An empty slot, as browsers send for an untouched file input.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            mime: String::new(),
            tmp_name: PathBuf::new(),
            size: 0,
            error: UploadError::NoFile,
        }
    }

    /// Sets the transport status.
    #[must_use]
    pub fn with_error(mut self, error: UploadError) -> Self {
        self.error = error;
        self
    }

    /// Identifies the physical file: filename plus size.
    pub(crate) fn identity(&self) -> String {
        format!("{}_{}", self.name, self.size)
    }
}

/// Uploaded files of one request, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesTable {
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FilesTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slots of a field.
    pub fn insert(&mut self, field: impl Into<String>, slots: Vec<UploadedFile>) {
        self.files.insert(field.into(), slots);
    }

    /// Builder method to set the slots of a field.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, slots: Vec<UploadedFile>) -> Self {
        self.insert(field, slots);
        self
    }

    /// Returns the slots of a field (empty when nothing was sent).
    pub fn slots(&self, field: &str) -> &[UploadedFile] {
        self.files.get(field).map_or(&[], Vec::as_slice)
    }
}

/// Everything a form needs to know about the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Query string fields.
    pub query: Submission,
    /// Body fields.
    pub post: Submission,
    /// Uploaded files.
    pub files: FilesTable,
    /// Client address.
    pub remote_addr: String,
}

impl RequestContext {
    /// Creates a context with no submitted data.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Creates a POST context carrying `post` as its body.
    pub fn post(post: Submission) -> Self {
        Self {
            method: Method::Post,
            post,
            ..Self::default()
        }
    }

    /// Creates a GET context carrying `query` as its query string.
    pub fn get(query: Submission) -> Self {
        Self {
            method: Method::Get,
            query,
            ..Self::default()
        }
    }

    /// Sets the uploaded files.
    #[must_use]
    pub fn with_files(mut self, files: FilesTable) -> Self {
        self.files = files;
        self
    }

    /// Sets the client address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    /// The field container a form with `method` reads from.
    pub fn container(&self, method: Method) -> &Submission {
        match method {
            Method::Get => &self.query,
            _ => &self.post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("post"), Some(Method::Post));
        assert_eq!(Method::parse("GET"), Some(Method::Get));
        assert_eq!(Method::parse("TRACE"), None);
        assert_eq!(Method::Post.as_attr(), "post");
    }

    #[test]
    fn test_blank_values() {
        assert!(FieldValue::from("").is_blank());
        assert!(!FieldValue::from("0").is_blank());
        assert!(FieldValue::list(Vec::<&str>::new()).is_blank());
        assert!(!FieldValue::list(["a"]).is_blank());
    }

    #[test]
    fn test_list_indexing() {
        let colors = FieldValue::list(["red", "green"]);
        assert_eq!(colors.at(1).and_then(FieldValue::as_text), Some("green"));
        assert!(colors.at(2).is_none());
    }

    #[derive(Serialize)]
    struct Profile {
        name: String,
        age: u32,
        admin: bool,
        nickname: Option<String>,
        tags: Vec<String>,
    }

    #[test]
    fn test_from_serialize_struct() {
        let profile = Profile {
            name: "Ada".into(),
            age: 36,
            admin: true,
            nickname: None,
            tags: vec!["math".into(), "engines".into()],
        };
        let data = Submission::from_serialize(&profile).unwrap();

        assert_eq!(data.get("name"), Some(&FieldValue::from("Ada")));
        assert_eq!(data.get("age"), Some(&FieldValue::from("36")));
        assert_eq!(data.get("admin"), Some(&FieldValue::from("1")));
        assert!(data.get("nickname").is_none());
        assert_eq!(data.get("tags"), Some(&FieldValue::list(["math", "engines"])));
    }

    #[test]
    fn test_from_serialize_rejects_scalars() {
        let err = Submission::from_serialize(&"just a string").unwrap_err();
        assert!(matches!(err, FormError::InvalidData(_)));
    }

    #[test]
    fn test_container_follows_method() {
        let ctx = RequestContext::get(Submission::new().with("q", "rust"));
        assert!(ctx.container(Method::Get).is_filled("q"));
        assert!(!ctx.container(Method::Post).is_filled("q"));
    }

    #[test]
    fn test_files_table() {
        let files = FilesTable::new().with(
            "avatar",
            vec![UploadedFile::new("me.png", "image/png", "/tmp/php1", 10)],
        );
        assert_eq!(files.slots("avatar").len(), 1);
        assert!(files.slots("missing").is_empty());
        assert_eq!(UploadError::from_code(3), UploadError::Partial);
    }
}
