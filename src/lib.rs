//! GlossCore: Glossary Term Annotator for Rendered Pages
//!
//! A Rust/WASM implementation of the in-page glossary linker: finds
//! dictionary terms in a page's prose, wraps them in annotation links and
//! shows an info panel on hover.
//!
//! # Architecture
//!
//! ## Dictionary
//! - `glossary/entry.rs` - GlossaryEntry: lenient decoding of content items
//! - `glossary/store.rs` - DictionaryStore: paged snapshot persistence and refresh
//!
//! ## Matching
//! - `matcher/terms.rs` - Gate + term extraction (category and outcome filters)
//! - `matcher/batch.rs` - TermPattern: batched, word-bounded, case-insensitive regexes
//! - `matcher/resolve.rs` - Resolver: matched text back to its entry
//!
//! ## Document
//! - `tree/mod.rs` - DocumentTree / DocumentMut traits
//! - `tree/scan.rs` - Eligible text node discovery
//! - `tree/rewrite.rs` - MatchRewriter: replacement plans and splices
//! - `tree/page.rs` - PageTree: arena document for native use and tests
//!
//! ## Coordination
//! - `pass/mod.rs` - Annotator: triggers, batched passes, exact revert
//! - `tooltip.rs` - Panel content, placement and hover state
//! - `web/` - web-sys DOM adapter and the wasm-bindgen classes
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { GlossAnnotator } from 'glosscore';
//!
//! await init();
//!
//! const stored = await chrome.storage.local.get(null);
//! const annotator = new GlossAnnotator(
//!   location.hostname,
//!   stored.settings,
//!   chrome.runtime.getURL('icons/icon48.png')
//! );
//! annotator.setDisabledDomains(stored.disabledDomains ?? []);
//! annotator.loadStorage(stored);
//! annotator.attachHover();
//! annotator.observeContent();
//!
//! const stats = await annotator.process();
//! console.log(stats);  // { annotations, nodes_rewritten, batches_run, ... }
//!
//! chrome.runtime.onMessage.addListener((msg) => annotator.handleMessage(msg));
//! ```

#[macro_use]
pub mod telemetry;

pub mod config;
pub mod error;
pub mod glossary;
pub mod matcher;
pub mod pass;
pub mod tooltip;
pub mod tree;
pub mod web;

pub use config::{LinkOption, Settings};
pub use error::GlossError;
pub use glossary::{DictionaryStore, GlossaryEntry};
pub use pass::{Annotator, PassState, Trigger};
pub use web::{GlossAnnotator, GlossaryStore};

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("glosscore v{}", env!("CARGO_PKG_VERSION"))
}
