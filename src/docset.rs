use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One searchable unit within a doc's index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Searchable label, e.g. `useState`.
    pub name: String,
    /// Key into the content store, optionally with a `#fragment`.
    pub path: String,
    /// Free-form category such as `Hooks` or `Guide`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl Entry {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: kind.into(),
        }
    }
}

/// Category summary as published alongside the entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryType {
    pub name: String,
    pub count: u64,
    pub slug: String,
}

/// The searchable contents of one installed doc (`index.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub types: Vec<EntryType>,
}

impl Index {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A record from the catalog manifest (`docs.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Doc {
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub release: String,
    pub mtime: i64,
    pub db_size: u64,
    pub attribution: String,
    pub alias: String,
}

/// Local metadata written next to an installed doc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub slug: String,
    pub mtime: i64,
    /// Install time as seconds since the Unix epoch.
    pub installed: u64,
    pub db_size: u64,
}

/// Turn user-facing `name@version` syntax into a slug (`name~version`).
pub fn parse_doc_slug(input: &str) -> String {
    match input.split_once('@') {
        Some((name, version)) if !version.contains('@') => {
            format!("{name}~{version}")
        }
        _ => input.to_string(),
    }
}

pub(crate) fn strip_fragment(path: &str) -> &str {
    path.split_once('#').map_or(path, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_parses_wire_shape() {
        let json = br#"{
            "entries": [{"name": "useState", "path": "hooks/use-state", "type": "Hooks"}],
            "types": [{"name": "Hooks", "count": 1, "slug": "hooks"}]
        }"#;
        let index = Index::from_json(json).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.entries[0].kind, "Hooks");
        assert_eq!(index.types[0].slug, "hooks");
    }

    #[test]
    fn index_types_are_optional() {
        let index = Index::from_json(br#"{"entries": []}"#).unwrap();
        assert!(index.is_empty());
        assert!(index.types.is_empty());
    }

    #[test]
    fn entry_serializes_kind_as_type() {
        let entry = Entry::new("map", "array/map", "Array");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "Array");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn strip_fragment_drops_anchor() {
        assert_eq!(strip_fragment("array/map#examples"), "array/map");
        assert_eq!(strip_fragment("array/map"), "array/map");
    }

    #[test]
    fn doc_tolerates_missing_fields() {
        let docs: Vec<Doc> =
            serde_json::from_str(r#"[{"name": "React", "slug": "react"}]"#)
                .unwrap();
        assert_eq!(docs[0].slug, "react");
        assert_eq!(docs[0].release, "");
    }

    #[test]
    fn parse_doc_slug_versions() {
        assert_eq!(parse_doc_slug("react@18"), "react~18");
        assert_eq!(parse_doc_slug("react"), "react");
        assert_eq!(parse_doc_slug("a@b@c"), "a@b@c");
    }
}
