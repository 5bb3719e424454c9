//! Multi-line text, optionally edited with a rich text editor.

use std::ops::{Deref, DerefMut};

use crate::assets::XINHA;
use crate::element::{BuildScope, Element};

const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A `<textarea>`.
#[derive(Debug, Clone)]
pub struct Textarea {
    base: Element,
    wysiwyg: bool,
}

impl Textarea {
    pub(crate) fn new() -> Self {
        Self {
            base: Element::new("textarea", false),
            wysiwyg: false,
        }
    }

    /// Enables the rich text editor.
    pub fn wysiwyg(&mut self, on: bool) -> &mut Self {
        self.wysiwyg = on;
        self
    }

    /// Returns whether the rich text editor is enabled.
    pub fn is_wysiwyg(&self) -> bool {
        self.wysiwyg
    }

    /// Hydrates, then renders. An editor without an `id` gets a random one.
    pub fn build(&mut self, prefix: &str, scope: &mut BuildScope<'_>) -> String {
        self.base.hydrate(scope.submission);

        if self.wysiwyg {
            let id = match self.base.attributes().text("id").filter(|id| !id.is_empty()) {
                Some(id) => id.to_string(),
                None => {
                    let id = editor_id();
                    self.base.attributes_mut().set("id", id.as_str());
                    id
                }
            };

            let config = scope.config;
            scope.assets.script(
                &format!("{XINHA}-initialize"),
                &config.asset_url("external/xinha/initialize.js"),
            );
            scope.assets.script(
                &format!("{XINHA}-core"),
                &config.asset_url("external/xinha/XinhaCore.js"),
            );
            scope.assets.script(
                &format!("{XINHA}-settings-{id}"),
                &config.asset_url(&format!("external/xinha/settings?wysiwyg_ID={id}")),
            );
        }

        self.base.register_assets(scope);
        self.base.render(prefix)
    }
}

fn editor_id() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    let mut bytes = [0u8; 8];
    rng.fill(&mut bytes);

    let suffix: String = bytes
        .iter()
        .map(|b| ID_CHARSET[*b as usize % ID_CHARSET.len()] as char)
        .collect();
    format!("wysiwyg_{suffix}")
}

impl Deref for Textarea {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.base
    }
}

impl DerefMut for Textarea {
    fn deref_mut(&mut self) -> &mut Element {
        &mut self.base
    }
}

impl AsMut<Element> for Textarea {
    fn as_mut(&mut self) -> &mut Element {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRegistry;
    use crate::config::FormsConfig;
    use crate::request::Submission;

    #[test]
    fn test_editor_gets_random_id() {
        let mut textarea = Textarea::new();
        textarea.attributes_mut().set("name", "body");
        textarea.wysiwyg(true);

        let data = Submission::new();
        let config = FormsConfig::default();
        let mut assets = AssetRegistry::new();
        let html = textarea.build("", &mut BuildScope::new(&data, &mut assets, &config));

        let id = textarea.attributes().text("id").unwrap().to_string();
        assert!(id.starts_with("wysiwyg_"));
        assert_eq!(id.len(), "wysiwyg_".len() + 8);
        assert!(html.contains(&format!("id=\"{id}\"")));
        assert_eq!(assets.len(), 3);
        assert!(assets.contains(&format!("xinha-settings-{id}")));
    }

    #[test]
    fn test_keeps_given_id() {
        let mut textarea = Textarea::new();
        textarea.attributes_mut().set("name", "body");
        textarea.attributes_mut().set("id", "editor");
        textarea.wysiwyg(true);

        let data = Submission::new().with("body", "Hello");
        let config = FormsConfig::default();
        let mut assets = AssetRegistry::new();
        let html = textarea.build("", &mut BuildScope::new(&data, &mut assets, &config));

        assert_eq!(html, "<textarea name=\"body\" id=\"editor\">Hello</textarea>\n");
        assert_eq!(
            assets.src("xinha-settings-editor"),
            Some("/system/external/xinha/settings?wysiwyg_ID=editor")
        );
    }
}
