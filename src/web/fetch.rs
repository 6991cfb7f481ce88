//! Glossary download over the Fetch API

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response, WorkerGlobalScope};

use crate::error::GlossError;

fn fetch_err(e: JsValue) -> GlossError {
    GlossError::Retrieval(format!("{:?}", e))
}

/// GET `url` and return the status code with the raw body text.
/// Status checks are left to `DictionaryStore::ingest_response`.
///
/// Works from a page (content script) and from a worker (extension
/// background).
pub async fn fetch_text(url: &str) -> Result<(u16, String), GlossError> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    let request = Request::new_with_str_and_init(url, &opts).map_err(fetch_err)?;
    let headers = request.headers();
    headers.set("Content-Type", "application/json").map_err(fetch_err)?;
    headers.set("X-Requested-With", "XMLHttpRequest").map_err(fetch_err)?;

    let pending = match web_sys::window() {
        Some(window) => window.fetch_with_request(&request),
        None => js_sys::global()
            .dyn_into::<WorkerGlobalScope>()
            .map_err(|_| GlossError::Retrieval("no fetch-capable global scope".to_string()))?
            .fetch_with_request(&request),
    };
    let value = JsFuture::from(pending)
        .await
        .map_err(fetch_err)?;
    let response: Response = value
        .dyn_into()
        .map_err(|_| GlossError::Retrieval("fetch did not return a Response".to_string()))?;

    let status = response.status();
    let text = JsFuture::from(response.text().map_err(fetch_err)?)
        .await
        .map_err(fetch_err)?;

    Ok((status, text.as_string().unwrap_or_default()))
}
