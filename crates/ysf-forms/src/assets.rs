//! Script assets requested while building forms.
//!
//! Some fields need client-side helpers (a colour picker, a rich text
//! editor, a multi-file picker). Fields ask an [`AssetSink`] for them while
//! rendering; the sink keeps each asset once, keyed by a stable id.

use indexmap::IndexMap;
use ironhtml::typed::Element;
use ironhtml_elements::Script;

/// Id of the colour picker script.
pub const JSCOLOR: &str = "jscolor";
/// Id of the placeholder polyfill.
pub const PLACEHOLDER: &str = "placeholder";
/// Id of the multi-file upload helper.
pub const MULTIUPLOAD: &str = "multiupload";
/// Id prefix of the rich text editor scripts.
pub const XINHA: &str = "xinha";

/// Receives script assets requested by fields.
pub trait AssetSink {
    /// Registers a script. Registering an id twice has no effect.
    fn script(&mut self, id: &str, src: &str);
}

/// Collects assets in registration order.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    scripts: IndexMap<String, String>,
}

impl AssetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether an asset id was registered.
    pub fn contains(&self, id: &str) -> bool {
        self.scripts.contains_key(id)
    }

    /// Returns the source of a registered asset.
    pub fn src(&self, id: &str) -> Option<&str> {
        self.scripts.get(id).map(String::as_str)
    }

    /// Returns the number of registered assets.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Returns whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Renders one `<script>` tag per asset.
    pub fn render(&self) -> String {
        self.scripts
            .iter()
            .map(|(id, src)| {
                Element::<Script>::new()
                    .data("asset", id.as_str())
                    .attr("src", src.as_str())
                    .render()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl AssetSink for AssetRegistry {
    fn script(&mut self, id: &str, src: &str) {
        if !self.scripts.contains_key(id) {
            self.scripts.insert(id.to_string(), src.to_string());
        }
    }
}
