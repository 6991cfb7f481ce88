//! Browser layer: the live DOM, the info panel, glossary download and the
//! wasm-bindgen classes the extension scripts construct.

pub mod bindings;
pub mod dom;
pub mod fetch;
pub mod panel;

pub use bindings::{GlossAnnotator, GlossaryStore};
pub use dom::WebDocument;
