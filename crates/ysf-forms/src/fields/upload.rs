//! File uploads.
//!
//! An upload field does not read its value from the submission but from
//! the request's [`FilesTable`]. Each field may carry several slots; for
//! single uploads only the first real slot counts.
//!
//! A slot can be withdrawn by posting a non-empty companion field
//! `name[<filename with dots as underscores>_<size>]` (or `..._0`). The
//! multi-upload helper script uses this to drop files the visitor removed.

use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};

use serde::Serialize;

use crate::assets::MULTIUPLOAD;
use crate::attributes::push_attr;
use crate::element::{BuildScope, Element, INNER_HTML};
use crate::error::Result;
use crate::request::{FilesTable, Submission, UploadError, UploadedFile};
use crate::sniff::{MimeSniffer, OCTET_STREAM};
use crate::validation::run_rules;

/// Messages reported by upload validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMessages {
    /// Nothing was uploaded. `None` makes the upload optional.
    pub no_upload: Option<String>,
    /// The file exceeds the size limit.
    pub too_big: String,
    /// The transport reported an error.
    pub unknown: String,
    /// The filename contains a NUL byte.
    pub hacker: String,
}

impl Default for UploadMessages {
    fn default() -> Self {
        Self {
            no_upload: Some("You do need to upload a file.".to_string()),
            too_big: "This file is to big.".to_string(),
            unknown: "An error has occured, please try again later.".to_string(),
            hacker: "Please stop trying to find vulnerabilities on this website.".to_string(),
        }
    }
}

/// Files accepted by an upload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UploadValue {
    /// Nothing usable was uploaded.
    None,
    /// The file of a single upload.
    Single(UploadedFile),
    /// The files of a multiple upload.
    Many(Vec<UploadedFile>),
}

impl UploadValue {
    /// Returns the accepted files.
    pub fn files(&self) -> Vec<&UploadedFile> {
        match self {
            Self::None => Vec::new(),
            Self::Single(file) => vec![file],
            Self::Many(files) => files.iter().collect(),
        }
    }
}

/// An `<input type="file">`.
#[derive(Debug, Clone)]
pub struct Upload {
    base: Element,
    max_size: u64,
    messages: UploadMessages,
    multiple: bool,
    sniffed: HashMap<usize, String>,
}

impl Upload {
    pub(crate) fn new(max_size: u64) -> Self {
        let mut base = Element::new("input", true);
        base.attributes_mut().set("type", "file");
        Self {
            base,
            max_size,
            messages: UploadMessages::default(),
            multiple: false,
            sniffed: HashMap::new(),
        }
    }

    /// Returns the size limit in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Replaces the validation messages.
    pub fn set_messages(&mut self, messages: UploadMessages) -> &mut Self {
        self.messages = messages;
        self
    }

    /// Returns the validation messages.
    pub fn messages(&self) -> &UploadMessages {
        &self.messages
    }

    /// Makes the upload required. `message` is reported when no file
    /// arrives.
    pub fn set_required(&mut self, required: bool, message: impl Into<String>) -> Result<&mut Self> {
        let message = message.into();
        self.base.set_required(required, message.clone())?;
        if required {
            self.messages.no_upload = Some(message);
        }
        Ok(self)
    }

    /// Accepts several files at once.
    pub fn set_multiple(&mut self, multiple: bool) -> &mut Self {
        self.multiple = multiple;
        self
    }

    /// Returns whether several files are accepted.
    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    fn files_key(&self) -> &str {
        self.base.name().unwrap_or_default()
    }

    fn missing(&self) -> std::result::Result<(), String> {
        match &self.messages.no_upload {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }

    /// Returns whether the visitor withdrew `file`.
    fn is_withdrawn(&self, data: &Submission, file: &UploadedFile) -> bool {
        let Some(markers) = self.base.field_name().and_then(|name| data.get(&name)) else {
            return false;
        };
        let stem = file.name.replace('.', "_");
        [format!("{stem}_{}", file.size), format!("{stem}_0")]
            .iter()
            .any(|key| markers.get(key).is_some_and(|v| !v.is_blank()))
    }

    /// Checks the uploaded slots in order; the first failure wins.
    ///
    /// Sniffed MIME types replace the declared ones in [`Upload::value`].
    pub fn validate(
        &mut self,
        data: &Submission,
        files: &FilesTable,
        sniffer: &dyn MimeSniffer,
    ) -> std::result::Result<(), String> {
        self.sniffed.clear();
        if !self.base.is_required() {
            return Ok(());
        }

        let slots = files.slots(self.files_key());
        if slots.is_empty() {
            return self.missing();
        }

        let name = self.base.field_name().unwrap_or_default();
        let mut seen = HashSet::new();

        for (index, file) in slots.iter().enumerate() {
            if file.name.is_empty() {
                if index == 0 {
                    return self.missing();
                }
                continue;
            }
            if self.is_withdrawn(data, file) {
                continue;
            }
            if file.size > self.max_size {
                return Err(self.messages.too_big.clone());
            }
            if file.error != UploadError::Ok {
                return Err(self.messages.unknown.clone());
            }
            if file.name.contains('\0') {
                return Err(self.messages.hacker.clone());
            }
            if !seen.insert(file.identity()) {
                continue;
            }

            if let Some(rules) = self.base.rules() {
                let extension = file.name.rsplit_once('.').map_or("", |(_, ext)| ext);
                let sniffed = sniffer.sniff(&file.tmp_name, extension);
                let mime = if sniffed == OCTET_STREAM {
                    file.mime.clone()
                } else {
                    self.sniffed.insert(index, sniffed.clone());
                    sniffed
                };
                run_rules(rules, &name, &mime)?;
            }

            if !self.multiple {
                break;
            }
        }

        Ok(())
    }

    /// The accepted files: withdrawn, empty and repeated slots are left out.
    pub fn value(&self, data: &Submission, files: &FilesTable) -> UploadValue {
        let mut seen = HashSet::new();
        let mut accepted = files
            .slots(self.files_key())
            .iter()
            .enumerate()
            .filter(|(_, file)| !file.name.is_empty() && !self.is_withdrawn(data, file))
            .filter(|(_, file)| seen.insert(file.identity()))
            .map(|(index, file)| {
                let mut file = file.clone();
                if let Some(mime) = self.sniffed.get(&index) {
                    file.mime = mime.clone();
                }
                file
            });

        if self.multiple {
            UploadValue::Many(accepted.collect())
        } else {
            accepted.next().map_or(UploadValue::None, UploadValue::Single)
        }
    }

    /// Renders the size hint and the file input.
    pub fn build(&mut self, prefix: &str, scope: &mut BuildScope<'_>) -> String {
        self.base.register_assets(scope);

        let name = self.files_key().to_string();
        let mut html = String::new();

        if self.multiple {
            let src = scope.config.asset_url("javascript/multiupload.js");
            scope.assets.script(MULTIUPLOAD, &src);
            html.push_str(prefix);
            html.push_str("<input type=\"hidden\"");
            push_attr(&mut html, "name", &format!("{name}[info]"));
            html.push_str(" />\n");
        }

        html.push_str(prefix);
        html.push_str("<input type=\"hidden\" name=\"MAX_FILE_SIZE\"");
        push_attr(&mut html, "value", &self.max_size.to_string());
        html.push_str(" />\n");

        html.push_str(prefix);
        html.push_str("<input");
        for (key, value) in self.base.attributes().iter() {
            let Some(text) = value.rendered().filter(|t| !t.is_empty()) else {
                continue;
            };
            match key {
                INNER_HTML => {}
                "name" => push_attr(&mut html, key, &format!("{text}[]")),
                _ => push_attr(&mut html, key, text),
            }
        }
        if self.multiple {
            push_attr(&mut html, "multiple", "multiple");
        }
        html.push_str(" />\n");
        html
    }
}

impl Deref for Upload {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.base
    }
}

impl DerefMut for Upload {
    fn deref_mut(&mut self) -> &mut Element {
        &mut self.base
    }
}

impl AsMut<Element> for Upload {
    fn as_mut(&mut self) -> &mut Element {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRegistry;
    use crate::config::FormsConfig;
    use crate::request::FieldValue;
    use crate::validation::{Rules, UploadValidator};
    use std::path::Path;

    struct FixedSniffer(&'static str);

    impl MimeSniffer for FixedSniffer {
        fn sniff(&self, _path: &Path, _extension: &str) -> String {
            self.0.to_string()
        }
    }

    fn avatar(max_size: u64) -> Upload {
        let mut upload = Upload::new(max_size);
        upload.attributes_mut().set("name", "avatar");
        upload
            .set_validator(UploadValidator::new(["image/png"], "Only PNG images."))
            .unwrap();
        upload
    }

    fn files(slots: Vec<UploadedFile>) -> FilesTable {
        FilesTable::new().with("avatar", slots)
    }

    fn png(name: &str, size: u64) -> UploadedFile {
        UploadedFile::new(name, "image/png", format!("/tmp/{name}"), size)
    }

    #[test]
    fn test_missing_upload() {
        let mut upload = avatar(1000);
        let data = Submission::new();
        let sniffer = FixedSniffer("image/png");

        assert_eq!(
            upload.validate(&data, &FilesTable::new(), &sniffer),
            Err("You do need to upload a file.".to_string())
        );
        assert!(upload
            .validate(&data, &files(vec![UploadedFile::empty()]), &sniffer)
            .is_err());

        upload.set_messages(UploadMessages {
            no_upload: None,
            ..UploadMessages::default()
        });
        assert!(upload.validate(&data, &FilesTable::new(), &sniffer).is_ok());
    }

    #[test]
    fn test_required_message_reported_when_missing() {
        let mut upload = Upload::new(1000);
        upload.attributes_mut().set("name", "resume");
        upload.set_required(true, "Please attach your CV.").unwrap();

        assert!(upload.is_required());
        assert_eq!(
            upload.validate(&Submission::new(), &FilesTable::new(), &FixedSniffer("image/png")),
            Err("Please attach your CV.".to_string())
        );
    }

    #[test]
    fn test_build_renders_flag_attributes() {
        let mut upload = avatar(100);
        upload.attributes_mut().set("required", true);
        upload.attributes_mut().set("disabled", false);

        let data = Submission::new();
        let config = FormsConfig::default();
        let mut assets = AssetRegistry::new();
        let html = upload.build("", &mut BuildScope::new(&data, &mut assets, &config));

        assert!(html.contains("<input type=\"file\" name=\"avatar[]\" required=\"1\" />"));
        assert!(!html.contains("disabled"));
    }

    #[test]
    fn test_size_error_and_nul_checks() {
        let mut upload = avatar(1000);
        let data = Submission::new();
        let sniffer = FixedSniffer("image/png");

        let result = upload.validate(&data, &files(vec![png("big.png", 5000)]), &sniffer);
        assert_eq!(result, Err("This file is to big.".to_string()));

        let broken = png("a.png", 10).with_error(UploadError::Partial);
        let result = upload.validate(&data, &files(vec![broken]), &sniffer);
        assert_eq!(result, Err(UploadMessages::default().unknown));

        let result = upload.validate(&data, &files(vec![png("evil.php\0.png", 10)]), &sniffer);
        assert_eq!(result, Err(UploadMessages::default().hacker));
    }

    #[test]
    fn test_sniffed_type_is_checked_and_kept() {
        let mut upload = avatar(1000);
        let data = Submission::new();
        let declared = UploadedFile::new("photo.png", "text/plain", "/tmp/photo.png", 10);
        let table = files(vec![declared]);

        let result = upload.validate(&data, &table, &FixedSniffer("application/pdf"));
        assert_eq!(result, Err("Only PNG images.".to_string()));

        assert!(upload.validate(&data, &table, &FixedSniffer("image/png")).is_ok());
        match upload.value(&data, &table) {
            UploadValue::Single(file) => assert_eq!(file.mime, "image/png"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_inconclusive_sniff_trusts_client() {
        let mut upload = avatar(1000);
        let table = files(vec![png("photo.png", 10)]);
        let result = upload.validate(&Submission::new(), &table, &FixedSniffer(OCTET_STREAM));
        assert!(result.is_ok());
    }

    #[test]
    fn test_single_upload_checks_first_slot_only() {
        let mut upload = avatar(1000);
        let table = files(vec![png("ok.png", 10), png("huge.png", 99_999)]);
        let result = upload.validate(&Submission::new(), &table, &FixedSniffer("image/png"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_multiple_dedupes_and_skips_withdrawn() {
        let mut upload = avatar(1000);
        upload.set_multiple(true);
        upload
            .set_validator(Rules::mime_types([("Images only.", ["image/png", "image/gif"])]))
            .unwrap();

        let table = files(vec![
            png("a.png", 10),
            png("a.png", 10),
            png("b.png", 20),
            png("c.png", 30),
        ]);
        let data = Submission::new().with("avatar", FieldValue::map([("b_png_20", "1")]));

        assert!(upload
            .validate(&data, &table, &FixedSniffer("image/png"))
            .is_ok());

        let names: Vec<_> = upload
            .value(&data, &table)
            .files()
            .into_iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(names, ["a.png", "c.png"]);
    }

    #[test]
    fn test_build_multiple() {
        let mut upload = avatar(2048);
        upload.set_multiple(true);

        let data = Submission::new();
        let config = FormsConfig::default();
        let mut assets = AssetRegistry::new();
        let html = upload.build("\t", &mut BuildScope::new(&data, &mut assets, &config));

        assert_eq!(
            html,
            "\t<input type=\"hidden\" name=\"avatar[info]\" />\n\
             \t<input type=\"hidden\" name=\"MAX_FILE_SIZE\" value=\"2048\" />\n\
             \t<input type=\"file\" name=\"avatar[]\" multiple=\"multiple\" />\n"
        );
        assert!(assets.contains(MULTIUPLOAD));
    }
}
