// glosscore/src/config.rs
//
// User preferences and engine constants

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Engine constants
// =============================================================================

/// Terms per compiled pattern
pub const TERM_BATCH_SIZE: usize = 100;

/// Entries per storage page
pub const STORAGE_PAGE_SIZE: usize = 50;

pub const PAGE_KEY_PREFIX: &str = "glossary_chunk_";
pub const PAGE_INDEX_KEY: &str = "glossary_meta_keys";
pub const LAST_UPDATED_KEY: &str = "glossary_last_updated";

/// 24 hours in milliseconds
pub const REFRESH_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;

pub const GLOSSARY_SOURCE_URL: &str =
    "https://examine.nyc3.cdn.digitaloceanspaces.com/exports/content-list.json";

pub const LINK_BASE: &str = "https://examine.com";
pub const LINK_TRACKING: &str =
    "utm_source=browser-extension-chrome&utm_medium=external&utm_campaign=browser-extension";

pub const OUTCOMES_MARKER: &str = "/outcomes";
pub const SUPPLEMENTS_MARKER: &str = "/supplements";

pub const ANNOTATION_CLASS: &str = "glossary-highlight";
pub const PANEL_CLASS: &str = "glossary-tooltip";
/// Class used by some pages for widgets that already render as links
pub const LINK_WIDGET_CLASS: &str = "r";

/// Quiet period after page mutations before a rescan
pub const CONTENT_CHANGE_DEBOUNCE_MS: i32 = 2000;

/// Gap between anchor and panel, and minimum inset from the viewport edge
pub const PANEL_MARGIN: f64 = 5.0;

/// Hosts the annotator never runs on
pub const EXCLUDED_DOMAINS: &[&str] = &["examine.com"];

// =============================================================================
// Settings
// =============================================================================

/// Whether every occurrence of an entry is linked or only the first one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkOption {
    #[default]
    First,
    All,
}

impl LinkOption {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "first" => Some(LinkOption::First),
            "all" => Some(LinkOption::All),
            _ => None,
        }
    }
}

impl fmt::Display for LinkOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkOption::First => write!(f, "first"),
            LinkOption::All => write!(f, "all"),
        }
    }
}

/// Per-category switches.
///
/// `outcomes` is not a category of its own: it narrows topic entries whose
/// url carries the outcomes marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeFilters {
    pub interventions: bool,
    pub topics: bool,
    pub outcomes: bool,
    pub glossary: bool,
}

impl Default for ContentTypeFilters {
    fn default() -> Self {
        Self {
            interventions: true,
            topics: true,
            outcomes: false,
            glossary: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub extension_enabled: bool,
    #[serde(rename = "contentTypes", alias = "contentTypeFilters")]
    pub content_type_filters: ContentTypeFilters,
    pub link_option: LinkOption,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extension_enabled: true,
            content_type_filters: ContentTypeFilters::default(),
            link_option: LinkOption::First,
        }
    }
}

impl Settings {
    /// Build settings from whatever the preferences store returned.
    ///
    /// Missing or wrongly typed fields fall back to their defaults
    /// individually, so one bad flag never discards the rest.
    pub fn validate(raw: &Value) -> Self {
        let mut settings = Settings::default();
        settings.merge(&SettingsUpdate::from_value(raw));
        settings
    }

    /// Apply a partial update. Absent fields keep their current value.
    pub fn merge(&mut self, update: &SettingsUpdate) {
        if let Some(enabled) = update.extension_enabled {
            self.extension_enabled = enabled;
        }
        if let Some(link_option) = update.link_option {
            self.link_option = link_option;
        }
        let filters = &mut self.content_type_filters;
        let types = &update.content_types;
        if let Some(v) = types.interventions {
            filters.interventions = v;
        }
        if let Some(v) = types.topics {
            filters.topics = v;
        }
        if let Some(v) = types.outcomes {
            filters.outcomes = v;
        }
        if let Some(v) = types.glossary {
            filters.glossary = v;
        }
    }
}

/// Partial flag update carried inside a `SettingsUpdate`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentTypeUpdate {
    pub interventions: Option<bool>,
    pub topics: Option<bool>,
    pub outcomes: Option<bool>,
    pub glossary: Option<bool>,
}

/// Partial settings payload from a preferences change event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub extension_enabled: Option<bool>,
    pub content_types: ContentTypeUpdate,
    pub link_option: Option<LinkOption>,
}

impl SettingsUpdate {
    /// Lenient decode: unknown keys are ignored, wrongly typed values are
    /// treated as absent.
    pub fn from_value(raw: &Value) -> Self {
        let flag = |obj: Option<&Value>, key: &str| -> Option<bool> {
            obj.and_then(|o| o.get(key)).and_then(Value::as_bool)
        };
        let types = raw
            .get("contentTypes")
            .or_else(|| raw.get("contentTypeFilters"))
            .filter(|v| v.is_object());

        Self {
            extension_enabled: raw.get("extensionEnabled").and_then(Value::as_bool),
            content_types: ContentTypeUpdate {
                interventions: flag(types, "interventions"),
                topics: flag(types, "topics"),
                outcomes: flag(types, "outcomes"),
                glossary: flag(types, "glossary"),
            },
            link_option: raw
                .get("linkOption")
                .and_then(Value::as_str)
                .and_then(LinkOption::parse),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
