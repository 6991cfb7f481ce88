//! Glossary entries as delivered by the remote content list
//!
//! Items are decoded leniently: optional fields fall back to empty values,
//! and only a missing `name` or `url` marks an item as malformed.

use serde::Serialize;
use serde_json::Value;

use crate::error::GlossError;

// ==================== TYPE DEFINITIONS ====================

/// Category of an entry. Gates whether its terms are matchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Interventions,
    /// Also covers the legacy `categories` label
    Topics,
    Glossary,
    /// Anything unrecognised; never matchable
    Other,
}

impl ContentType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "interventions" | "intervention" => ContentType::Interventions,
            "topics" | "topic" | "categories" | "category" => ContentType::Topics,
            "glossary" => ContentType::Glossary,
            _ => ContentType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Interventions => "interventions",
            ContentType::Topics => "topics",
            ContentType::Glossary => "glossary",
            ContentType::Other => "other",
        }
    }
}

/// One dictionary record. Immutable once a pass has started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlossaryEntry {
    pub name: String,
    pub synonyms: Vec<String>,
    /// Raw type label, echoed into the annotation's `data-type`
    pub content_type: String,
    pub overview: String,
    /// Unique identifier and link target path
    pub url: String,
    #[serde(skip)]
    kind: ContentType,
}

impl GlossaryEntry {
    pub fn new(
        name: impl Into<String>,
        synonyms: Vec<String>,
        content_type: impl Into<String>,
        overview: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let content_type = content_type.into();
        let kind = ContentType::parse(&content_type);
        Self {
            name: name.into(),
            synonyms,
            content_type,
            overview: overview.into(),
            url: url.into(),
            kind,
        }
    }

    pub fn kind(&self) -> ContentType {
        self.kind
    }

    /// Name followed by synonyms, in source order
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }

    /// Decode one raw item from the content list or a storage page
    pub fn from_value(value: &Value) -> Result<Self, GlossError> {
        let obj = value
            .as_object()
            .ok_or_else(|| GlossError::MalformedEntry("item is not an object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| GlossError::MalformedEntry("missing name".to_string()))?;

        let url = obj
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| GlossError::MalformedEntry(format!("'{}' has no url", name)))?;

        // Synonym arrays occasionally carry numbers; stringify scalars, drop the rest.
        let synonyms = match obj.get("synonyms") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let content_type = obj.get("content_type").and_then(Value::as_str).unwrap_or("");
        let overview = obj.get("overview").and_then(Value::as_str).unwrap_or("");

        Ok(Self::new(name, synonyms, content_type, overview, url))
    }
}

/// Decode a list of raw items, skipping (and logging) malformed ones
pub fn decode_entries(items: &[Value]) -> Vec<GlossaryEntry> {
    let mut entries = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match GlossaryEntry::from_value(item) {
            Ok(entry) => entries.push(entry),
            Err(e) => log_warn!("[Glossary] Skipping item {}: {}", idx, e),
        }
    }
    entries
}

// ==================== TESTS ====================
