//! Floating info panel for a hovered annotation

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, HtmlImageElement, Window};

use crate::config::PANEL_CLASS;
use crate::error::GlossError;
use crate::tooltip::{place_panel, PanelContent, Rect, Viewport};

fn dom_err(e: JsValue) -> GlossError {
    GlossError::Dom(format!("{:?}", e))
}

fn rect_of(element: &Element) -> Rect {
    let r = element.get_bounding_client_rect();
    Rect {
        left: r.left(),
        top: r.top(),
        width: r.width(),
        height: r.height(),
    }
}

fn viewport_of(window: &Window) -> Viewport {
    let dimension = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    Viewport {
        width: dimension(window.inner_width()),
        height: dimension(window.inner_height()),
        scroll_x: window.scroll_x().unwrap_or(0.0),
        scroll_y: window.scroll_y().unwrap_or(0.0),
    }
}

/// Read the panel content back from an annotation's data attributes
pub fn content_of(anchor: &Element) -> PanelContent {
    let attr = |name: &str| anchor.get_attribute(name).unwrap_or_default();
    PanelContent::new(&attr("data-description"), &attr("data-type"), &attr("data-url"))
}

pub struct PanelView {
    element: HtmlElement,
}

impl PanelView {
    /// Build the panel, attach it to the body and position it next to `anchor`
    pub fn open(
        window: &Window,
        document: &Document,
        anchor: &Element,
        content: &PanelContent,
        icon_url: &str,
    ) -> Result<Self, GlossError> {
        let body = document
            .body()
            .ok_or_else(|| GlossError::Dom("document has no body".to_string()))?;

        let element: HtmlElement = document
            .create_element("div")
            .map_err(dom_err)?
            .dyn_into()
            .map_err(|_| GlossError::Dom("div is not an HtmlElement".to_string()))?;
        element.set_class_name(PANEL_CLASS);
        element
            .append_child(&document.create_text_node(&content.description))
            .map_err(dom_err)?;

        let brand = document.create_element("div").map_err(dom_err)?;
        brand.set_class_name("glossary-tooltip-brand");
        brand
            .append_child(&document.create_text_node("From: "))
            .map_err(dom_err)?;

        let icon: HtmlImageElement = document
            .create_element("img")
            .map_err(dom_err)?
            .dyn_into()
            .map_err(|_| GlossError::Dom("img is not an HtmlImageElement".to_string()))?;
        icon.set_src(icon_url);
        icon.set_alt("Examine");
        icon.set_class_name("glossary-icon");
        brand.append_child(&icon).map_err(dom_err)?;
        brand
            .append_child(&document.create_text_node(&format!(" {}", content.label)))
            .map_err(dom_err)?;
        element.append_child(&brand).map_err(dom_err)?;

        body.append_child(&element).map_err(dom_err)?;

        let view = Self { element };
        if let Err(e) = view.settle(window, anchor) {
            view.close();
            return Err(e);
        }
        Ok(view)
    }

    /// Position the attached panel next to `anchor` and make it visible
    fn settle(&self, window: &Window, anchor: &Element) -> Result<(), GlossError> {
        // Measured after insertion so layout has a size for the panel
        let panel_rect = rect_of(&self.element);
        let placement = place_panel(
            rect_of(anchor),
            panel_rect.width,
            panel_rect.height,
            viewport_of(window),
        );

        let style = self.element.style();
        style
            .set_property("left", &format!("{}px", placement.left))
            .map_err(dom_err)?;
        style
            .set_property("top", &format!("{}px", placement.top))
            .map_err(dom_err)?;

        let classes = self.element.class_list();
        classes.add_1(placement.side.class_name()).map_err(dom_err)?;
        // Force a reflow so the visibility transition runs
        let _ = self.element.offset_width();
        classes.add_1("visible").map_err(dom_err)?;
        Ok(())
    }

    pub fn close(&self) {
        self.element.remove();
    }
}
