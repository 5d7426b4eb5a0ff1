//! Open documents, kept in full-text sync with the editor.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    uri: String,
    language_id: String,
    version: i32,
    text: String,
}

impl TextDocument {
    #[must_use]
    pub fn new(uri: String, language_id: String, version: i32, text: String) -> Self {
        Self {
            uri,
            language_id,
            version,
            text,
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Documents keyed by URI; iteration is in URI order.
#[derive(Debug, Default)]
pub(crate) struct TextDocuments {
    open: BTreeMap<String, TextDocument>,
}

impl TextDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, document: TextDocument) -> &TextDocument {
        let uri = document.uri.clone();
        self.open.insert(uri.clone(), document);
        &self.open[&uri]
    }

    /// Replace the text of an open document.
    ///
    /// Returns `None` for a document the editor never opened.
    pub fn change(&mut self, uri: &str, version: Option<i32>, text: String) -> Option<&TextDocument> {
        let document = self.open.get_mut(uri)?;
        document.version = version.unwrap_or(document.version.saturating_add(1));
        document.text = text;
        Some(document)
    }

    pub fn close(&mut self, uri: &str) -> Option<TextDocument> {
        self.open.remove(uri)
    }

    pub fn all(&self) -> impl Iterator<Item = &TextDocument> {
        self.open.values()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(uri: &str, text: &str) -> TextDocument {
        TextDocument::new(uri.to_string(), "javascript".to_string(), 1, text.to_string())
    }

    #[test]
    fn open_then_change_replaces_text() {
        let mut docs = TextDocuments::new();
        docs.open(doc("file:///a.js", "var a"));

        let changed = docs
            .change("file:///a.js", Some(5), "var a = 1;".to_string())
            .unwrap();
        assert_eq!(changed.text(), "var a = 1;");
        assert_eq!(changed.version(), 5);
    }

    #[test]
    fn change_without_version_bumps_it() {
        let mut docs = TextDocuments::new();
        docs.open(doc("file:///a.js", ""));
        let changed = docs.change("file:///a.js", None, "x".to_string()).unwrap();
        assert_eq!(changed.version(), 2);
    }

    #[test]
    fn versionless_change_at_max_version_saturates() {
        let mut docs = TextDocuments::new();
        docs.open(TextDocument::new(
            "file:///a.js".to_string(),
            "javascript".to_string(),
            i32::MAX,
            String::new(),
        ));
        let changed = docs.change("file:///a.js", None, "x".to_string()).unwrap();
        assert_eq!(changed.version(), i32::MAX);
        assert_eq!(changed.text(), "x");
    }

    #[test]
    fn change_of_unknown_document_is_ignored() {
        let mut docs = TextDocuments::new();
        assert!(docs.change("file:///nope.js", Some(2), String::new()).is_none());
        assert_eq!(docs.len(), 0);
    }

    #[test]
    fn close_removes() {
        let mut docs = TextDocuments::new();
        docs.open(doc("file:///a.js", ""));
        assert!(docs.close("file:///a.js").is_some());
        assert!(docs.close("file:///a.js").is_none());
        assert_eq!(docs.all().count(), 0);
    }

    #[test]
    fn all_is_ordered_by_uri() {
        let mut docs = TextDocuments::new();
        docs.open(doc("file:///b.js", ""));
        docs.open(doc("file:///a.js", ""));
        let uris: Vec<&str> = docs.all().map(TextDocument::uri).collect();
        assert_eq!(uris, ["file:///a.js", "file:///b.js"]);
    }
}
