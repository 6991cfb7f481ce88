//! JavaScript-facing classes: GlossAnnotator (content script) and
//! GlossaryStore (background refresh)

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{Document, Element, Event, MutationObserver, MutationObserverInit, MutationRecord};

use crate::config::{Settings, ANNOTATION_CLASS, CONTENT_CHANGE_DEBOUNCE_MS, GLOSSARY_SOURCE_URL};
use crate::glossary::{decode_entries, now_ms, DictionaryStore, MemoryStore};
use crate::pass::{Annotator, Directive, StepOutcome, Trigger};
use crate::tooltip::HoverState;
use crate::tree::{is_relevant_addition, DocumentTree};
use crate::web::dom::WebDocument;
use crate::web::fetch::fetch_text;
use crate::web::panel::{content_of, PanelView};

fn to_js_err<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Resolve on the next macrotask so the page can paint between batches
async fn yield_now() {
    let promise = Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window()
            .map(|w| w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 0).is_ok())
            .unwrap_or(false);
        if !scheduled {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    let _ = JsFuture::from(promise).await;
}

// ==================== SESSION ====================

/// Everything the event handlers and the async pass driver share
struct Session {
    annotator: Annotator<WebDocument>,
    hover: HoverState<Element>,
    panel: Option<PanelView>,
    icon_url: String,
    /// Pending debounce timer of the content observer
    rescan_timer: Option<i32>,
}

impl Session {
    fn show_panel(&mut self, anchor: Element) {
        if self.hover.anchor() == Some(&anchor) {
            return;
        }
        self.hide_panel();

        let window = match web_sys::window() {
            Some(w) => w,
            None => return,
        };
        let document = self.annotator.doc().document().clone();
        let content = content_of(&anchor);
        match PanelView::open(&window, &document, &anchor, &content, &self.icon_url) {
            Ok(view) => {
                self.hover.show(anchor);
                self.panel = Some(view);
            }
            Err(e) => log_warn!("[GlossAnnotator] Could not open panel: {}", e),
        }
    }

    fn hide_panel(&mut self) {
        self.hover.hide();
        if let Some(view) = self.panel.take() {
            view.close();
        }
    }

    fn hide_panel_for(&mut self, anchor: &Element) {
        if self.hover.hide_if(anchor).is_some() {
            if let Some(view) = self.panel.take() {
                view.close();
            }
        }
    }

    /// Close the panel if the page removed its anchor
    fn hide_panel_if_detached(&mut self) {
        if self.hover.hide_unless(|anchor| anchor.is_connected()).is_some() {
            if let Some(view) = self.panel.take() {
                view.close();
            }
        }
    }
}

/// Run pass `generation` one batch per macrotask until it finishes or a
/// newer pass takes over
async fn drive(session: Rc<RefCell<Session>>, generation: u64) -> Result<JsValue, JsValue> {
    loop {
        let outcome = session.borrow_mut().annotator.step(generation);
        match outcome.map_err(to_js_err)? {
            StepOutcome::Continue => yield_now().await,
            StepOutcome::Finished(stats) => return Ok(serde_wasm_bindgen::to_value(&stats)?),
            StepOutcome::Superseded => return Ok(JsValue::NULL),
        }
    }
}

/// Resolve a trigger, close the panel if the page is about to change, and
/// start driving any pass it begins
fn dispatch_trigger(session: &Rc<RefCell<Session>>, trigger: Trigger) -> (Directive, Promise) {
    let directive = session.borrow_mut().annotator.resolve(trigger);
    if directive != Directive::Nothing {
        session.borrow_mut().hide_panel();
    }

    let started = session.borrow_mut().annotator.apply(directive);
    let promise = match started {
        Some(generation) => future_to_promise(drive(Rc::clone(session), generation)),
        None => Promise::resolve(&JsValue::NULL),
    };
    (directive, promise)
}

fn annotation_for(event: &Event) -> Option<Element> {
    let target: Element = event.target()?.dyn_into().ok()?;
    target.closest(&format!(".{}", ANNOTATION_CLASS)).ok().flatten()
}

/// Document-level hover delegation; removed again on drop
struct HoverListeners {
    document: Document,
    over: Closure<dyn FnMut(Event)>,
    out: Closure<dyn FnMut(Event)>,
}

impl Drop for HoverListeners {
    fn drop(&mut self) {
        let _ = self
            .document
            .remove_event_listener_with_callback("mouseover", self.over.as_ref().unchecked_ref());
        let _ = self
            .document
            .remove_event_listener_with_callback("mouseout", self.out.as_ref().unchecked_ref());
    }
}

/// Debounced rescan on page-inserted content; disconnects on drop
struct ContentObserver {
    observer: MutationObserver,
    _on_mutation: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
    _on_quiet: Closure<dyn FnMut()>,
    session: Rc<RefCell<Session>>,
}

impl Drop for ContentObserver {
    fn drop(&mut self) {
        self.observer.disconnect();
        if let Ok(mut session) = self.session.try_borrow_mut() {
            if let (Some(handle), Some(window)) = (session.rescan_timer.take(), web_sys::window()) {
                window.clear_timeout_with_handle(handle);
            }
        }
    }
}

// ==================== GLOSS ANNOTATOR ====================

/// Content-script entry point: owns the page's annotations and panel
#[wasm_bindgen]
pub struct GlossAnnotator {
    session: Rc<RefCell<Session>>,
    listeners: Option<HoverListeners>,
    observer: Option<ContentObserver>,
}

#[wasm_bindgen]
impl GlossAnnotator {
    /// `settings` is the raw stored preferences object; missing or invalid
    /// fields take their defaults
    #[wasm_bindgen(constructor)]
    pub fn new(hostname: &str, settings: JsValue, icon_url: &str) -> Result<GlossAnnotator, JsValue> {
        let raw: Value = if settings.is_undefined() || settings.is_null() {
            Value::Null
        } else {
            serde_wasm_bindgen::from_value(settings)?
        };
        let doc = WebDocument::from_window().ok_or_else(|| JsValue::from_str("No document available"))?;

        let annotator = Annotator::new(doc, hostname, Settings::validate(&raw));
        log_info!("[GlossAnnotator] Ready on {}", hostname);

        Ok(GlossAnnotator {
            session: Rc::new(RefCell::new(Session {
                annotator,
                hover: HoverState::Hidden,
                panel: None,
                icon_url: icon_url.to_string(),
                rescan_timer: None,
            })),
            listeners: None,
            observer: None,
        })
    }

    /// Load the snapshot from a storage dump (`chrome.storage.local.get(null)`).
    /// Returns the number of usable entries.
    #[wasm_bindgen(js_name = "loadStorage")]
    pub fn load_storage(&self, snapshot: JsValue) -> Result<usize, JsValue> {
        let raw: Value = serde_wasm_bindgen::from_value(snapshot)?;
        let entries = DictionaryStore::new(MemoryStore::from_snapshot(raw)).load_all();
        let count = entries.len();
        self.session.borrow_mut().annotator.set_dictionary(entries);
        Ok(count)
    }

    /// Load the snapshot from a plain array of glossary items
    #[wasm_bindgen(js_name = "loadEntries")]
    pub fn load_entries(&self, items: JsValue) -> Result<usize, JsValue> {
        let raw: Vec<Value> = serde_wasm_bindgen::from_value(items)?;
        let entries = decode_entries(&raw);
        let count = entries.len();
        self.session.borrow_mut().annotator.set_dictionary(entries);
        Ok(count)
    }

    #[wasm_bindgen(js_name = "setDisabledDomains")]
    pub fn set_disabled_domains(&self, domains: JsValue) -> Result<(), JsValue> {
        let domains: Vec<String> = serde_wasm_bindgen::from_value(domains)?;
        self.session.borrow_mut().annotator.set_disabled_domains(domains);
        Ok(())
    }

    /// Run the initial pass. Resolves with the pass stats, or null when
    /// nothing was scanned or a newer pass took over.
    #[wasm_bindgen(js_name = "process")]
    pub fn process(&mut self) -> Promise {
        self.dispatch(Trigger::Initial)
    }

    /// Feed a runtime message (`toggleExtension`, `updateSettings`,
    /// `updateDisabledDomains`, `glossaryUpdated`, `contextInvalidated`).
    /// Unknown messages resolve to null.
    #[wasm_bindgen(js_name = "handleMessage")]
    pub fn handle_message(&mut self, message: JsValue) -> Result<Promise, JsValue> {
        let raw: Value = serde_wasm_bindgen::from_value(message)?;
        match Trigger::from_message(&raw) {
            Some(trigger) => Ok(self.dispatch(trigger)),
            None => Ok(Promise::resolve(&JsValue::NULL)),
        }
    }

    /// Remove every annotation. Returns the number of nodes restored.
    #[wasm_bindgen(js_name = "revert")]
    pub fn revert(&self) -> usize {
        let mut session = self.session.borrow_mut();
        session.hide_panel();
        session.annotator.revert()
    }

    #[wasm_bindgen(js_name = "attachHover")]
    pub fn attach_hover(&mut self) -> Result<(), JsValue> {
        if self.listeners.is_some() {
            return Ok(());
        }
        let document = self.session.borrow().annotator.doc().document().clone();

        let session = Rc::clone(&self.session);
        let over = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if let Some(anchor) = annotation_for(&event) {
                if let Ok(mut session) = session.try_borrow_mut() {
                    session.show_panel(anchor);
                }
            }
        });

        let session = Rc::clone(&self.session);
        let out = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if let Some(anchor) = annotation_for(&event) {
                if let Ok(mut session) = session.try_borrow_mut() {
                    session.hide_panel_for(&anchor);
                }
            }
        });

        document.add_event_listener_with_callback("mouseover", over.as_ref().unchecked_ref())?;
        document.add_event_listener_with_callback("mouseout", out.as_ref().unchecked_ref())?;

        self.listeners = Some(HoverListeners { document, over, out });
        Ok(())
    }

    /// Rescan after the page inserts content of its own, once it has been
    /// quiet for the debounce interval
    #[wasm_bindgen(js_name = "observeContent")]
    pub fn observe_content(&mut self) -> Result<(), JsValue> {
        if self.observer.is_some() {
            return Ok(());
        }
        let root = self
            .session
            .borrow()
            .annotator
            .doc()
            .content_root()
            .ok_or_else(|| JsValue::from_str("No content root"))?;

        let session = Rc::clone(&self.session);
        let on_quiet = Closure::<dyn FnMut()>::new(move || {
            session.borrow_mut().rescan_timer = None;
            let _ = dispatch_trigger(&session, Trigger::ContentChanged);
        });
        let quiet_fn: js_sys::Function = on_quiet.as_ref().unchecked_ref::<js_sys::Function>().clone();

        let session = Rc::clone(&self.session);
        let on_mutation = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                let mut session = match session.try_borrow_mut() {
                    Ok(session) => session,
                    Err(_) => return,
                };
                session.hide_panel_if_detached();
                if !session.annotator.settings().extension_enabled {
                    return;
                }

                let relevant = {
                    let doc = session.annotator.doc();
                    records
                        .iter()
                        .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
                        .any(|record| {
                            let added = record.added_nodes();
                            (0..added.length())
                                .filter_map(|i| added.item(i))
                                .any(|node| is_relevant_addition(doc, &node))
                        })
                };
                if !relevant {
                    return;
                }

                let window = match web_sys::window() {
                    Some(window) => window,
                    None => return,
                };
                if let Some(handle) = session.rescan_timer.take() {
                    window.clear_timeout_with_handle(handle);
                }
                match window.set_timeout_with_callback_and_timeout_and_arguments_0(
                    &quiet_fn,
                    CONTENT_CHANGE_DEBOUNCE_MS,
                ) {
                    Ok(handle) => session.rescan_timer = Some(handle),
                    Err(_) => log_warn!("[GlossAnnotator] Could not schedule rescan"),
                }
            },
        );

        let observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        observer.observe_with_options(&root, &options)?;

        self.observer = Some(ContentObserver {
            observer,
            _on_mutation: on_mutation,
            _on_quiet: on_quiet,
            session: Rc::clone(&self.session),
        });
        Ok(())
    }

    /// Stop reacting to anything, leaving the page as it is
    #[wasm_bindgen(js_name = "detach")]
    pub fn detach(&mut self) {
        let _ = self.dispatch(Trigger::ContextInvalidated);
    }

    #[wasm_bindgen(js_name = "stats")]
    pub fn stats(&self) -> JsValue {
        match self.session.borrow().annotator.last_stats() {
            Some(stats) => serde_wasm_bindgen::to_value(stats).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = "state")]
    pub fn state(&self) -> String {
        self.session.borrow().annotator.state().as_str().to_string()
    }

    #[wasm_bindgen(js_name = "entryCount")]
    pub fn entry_count(&self) -> usize {
        self.session.borrow().annotator.dictionary_len()
    }
}

impl GlossAnnotator {
    fn dispatch(&mut self, trigger: Trigger) -> Promise {
        let (directive, promise) = dispatch_trigger(&self.session, trigger);
        if directive == Directive::Shutdown {
            self.listeners = None;
            self.observer = None;
        }
        promise
    }
}

// ==================== GLOSSARY STORE ====================

/// Background-side owner of the paged snapshot. The host persists
/// `snapshot()` to extension storage after a successful refresh.
#[wasm_bindgen]
pub struct GlossaryStore {
    inner: Rc<RefCell<DictionaryStore<MemoryStore>>>,
}

#[wasm_bindgen]
impl GlossaryStore {
    #[wasm_bindgen(constructor)]
    pub fn new(snapshot: JsValue) -> Result<GlossaryStore, JsValue> {
        let raw: Value = if snapshot.is_undefined() || snapshot.is_null() {
            Value::Null
        } else {
            serde_wasm_bindgen::from_value(snapshot)?
        };
        Ok(GlossaryStore {
            inner: Rc::new(RefCell::new(DictionaryStore::new(MemoryStore::from_snapshot(raw)))),
        })
    }

    #[wasm_bindgen(js_name = "isStale")]
    pub fn is_stale(&self) -> bool {
        self.inner.borrow().is_stale(now_ms())
    }

    #[wasm_bindgen(js_name = "lastUpdated")]
    pub fn last_updated(&self) -> Option<f64> {
        self.inner.borrow().last_updated().map(|ts| ts as f64)
    }

    #[wasm_bindgen(js_name = "entryCount")]
    pub fn entry_count(&self) -> usize {
        self.inner.borrow().load_all().len()
    }

    /// Fetch and store a new snapshot. Resolves to false (previous snapshot
    /// kept) on any network, status or format failure.
    #[wasm_bindgen(js_name = "refresh")]
    pub fn refresh(&self, url: Option<String>) -> Promise {
        let inner = Rc::clone(&self.inner);
        let url = url.unwrap_or_else(|| GLOSSARY_SOURCE_URL.to_string());

        future_to_promise(async move {
            let updated = match fetch_text(&url).await {
                Ok((status, body)) => inner.borrow_mut().ingest_response(status, &body, now_ms()),
                Err(e) => {
                    log_warn!("[GlossaryStore] Glossary fetch failed: {}", e);
                    false
                }
            };
            Ok(JsValue::from_bool(updated))
        })
    }

    /// All stored keys as a plain object, ready for `chrome.storage.local.set`
    #[wasm_bindgen(js_name = "snapshot")]
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let snapshot = self.inner.borrow().inner().to_snapshot();
        Ok(snapshot.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
    }

    #[wasm_bindgen(js_name = "clear")]
    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}
