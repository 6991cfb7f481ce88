//! Error kinds for the annotation engine
//!
//! Only `ContextInvalidated` stops a pass. Everything else is logged and
//! degrades to fewer matches.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum GlossError {
    /// Network failure, non-2xx status or a payload that is not an array
    Retrieval(String),
    /// A storage page or the page index is missing or has the wrong shape
    StorageRead { key: String, reason: String },
    /// A dictionary item lacks a required field
    MalformedEntry(String),
    /// The host runtime no longer recognises this extension instance
    ContextInvalidated,
    /// A term batch failed to compile into a pattern
    InvalidPattern(String),
    /// A DOM operation was rejected by the host page
    Dom(String),
}

impl fmt::Display for GlossError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlossError::Retrieval(msg) => write!(f, "Glossary retrieval failed: {}", msg),
            GlossError::StorageRead { key, reason } => {
                write!(f, "Storage read failed for '{}': {}", key, reason)
            }
            GlossError::MalformedEntry(msg) => write!(f, "Malformed glossary entry: {}", msg),
            GlossError::ContextInvalidated => write!(f, "Extension context invalidated"),
            GlossError::InvalidPattern(msg) => write!(f, "Invalid term pattern: {}", msg),
            GlossError::Dom(msg) => write!(f, "DOM operation failed: {}", msg),
        }
    }
}

impl std::error::Error for GlossError {}

impl From<regex::Error> for GlossError {
    fn from(e: regex::Error) -> Self {
        GlossError::InvalidPattern(e.to_string())
    }
}

impl From<serde_json::Error> for GlossError {
    fn from(e: serde_json::Error) -> Self {
        GlossError::Retrieval(format!("Invalid JSON: {}", e))
    }
}
