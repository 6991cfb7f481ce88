//! Annotation presentation: panel content, placement and hover state
//!
//! Geometry is pure so it can be tested without layout. The `web` module
//! measures real rectangles and feeds them through `place_panel`.

use serde::{Deserialize, Serialize};

use crate::config::{OUTCOMES_MARKER, PANEL_MARGIN, SUPPLEMENTS_MARKER};
use crate::glossary::ContentType;

// ==================== CONTENT ====================

/// Category line shown under the description
pub fn category_label(kind: ContentType, url: &str) -> &'static str {
    match kind {
        ContentType::Interventions if url.contains(SUPPLEMENTS_MARKER) => "Supplements",
        ContentType::Interventions => "Interventions",
        ContentType::Topics if url.contains(OUTCOMES_MARKER) => "Outcomes",
        ContentType::Topics => "Conditions/Goals",
        _ => "Glossary",
    }
}

/// What the panel shows, read back from an annotation's data attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelContent {
    pub description: String,
    pub label: String,
    pub url: String,
}

impl PanelContent {
    pub fn new(description: &str, content_type: &str, url: &str) -> Self {
        Self {
            description: description.to_string(),
            label: category_label(ContentType::parse(content_type), url).to_string(),
            url: url.to_string(),
        }
    }
}

// ==================== PLACEMENT ====================

/// Viewport-relative rectangle, as returned by `getBoundingClientRect`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelSide {
    Below,
    Above,
}

impl PanelSide {
    pub fn class_name(&self) -> &'static str {
        match self {
            PanelSide::Below => "tooltip-below",
            PanelSide::Above => "tooltip-above",
        }
    }
}

/// Document coordinates for the panel's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub side: PanelSide,
}

/// Below-left of the anchor by default; flips above when the panel would
/// overflow the viewport bottom; shifts left so the right edge stays one
/// margin inside the viewport. Never closer than one margin to the
/// document's left or top edge.
pub fn place_panel(anchor: Rect, panel_width: f64, panel_height: f64, viewport: Viewport) -> Placement {
    let (top, side) = if anchor.bottom() + panel_height + PANEL_MARGIN > viewport.height {
        (anchor.top - panel_height - PANEL_MARGIN, PanelSide::Above)
    } else {
        (anchor.bottom() + PANEL_MARGIN, PanelSide::Below)
    };

    let mut left = anchor.left;
    if left + panel_width > viewport.width {
        left = viewport.width - panel_width - PANEL_MARGIN;
    }
    let left = left.max(PANEL_MARGIN);

    Placement {
        left: left + viewport.scroll_x,
        top: (top + viewport.scroll_y).max(PANEL_MARGIN),
        side,
    }
}

// ==================== HOVER STATE ====================

/// At most one panel exists; `A` identifies its anchor
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HoverState<A> {
    #[default]
    Hidden,
    Shown(A),
}

impl<A: PartialEq> HoverState<A> {
    pub fn is_shown(&self) -> bool {
        matches!(self, HoverState::Shown(_))
    }

    pub fn anchor(&self) -> Option<&A> {
        match self {
            HoverState::Shown(anchor) => Some(anchor),
            HoverState::Hidden => None,
        }
    }

    /// Show for `anchor`. Returns the previously shown anchor, whose panel
    /// must be destroyed first.
    pub fn show(&mut self, anchor: A) -> Option<A> {
        match std::mem::replace(self, HoverState::Shown(anchor)) {
            HoverState::Shown(previous) => Some(previous),
            HoverState::Hidden => None,
        }
    }

    /// Hide whatever is shown; returns its anchor
    pub fn hide(&mut self) -> Option<A> {
        match std::mem::replace(self, HoverState::Hidden) {
            HoverState::Shown(previous) => Some(previous),
            HoverState::Hidden => None,
        }
    }

    /// Hide only if `anchor` is the one shown (pointer-leave)
    pub fn hide_if(&mut self, anchor: &A) -> Option<A> {
        if self.anchor() == Some(anchor) {
            self.hide()
        } else {
            None
        }
    }

    /// Hide when the shown anchor is no longer `attached` to the page.
    /// Pointer-leave never fires for a removed anchor.
    pub fn hide_unless(&mut self, attached: impl Fn(&A) -> bool) -> Option<A> {
        let gone = self.anchor().map_or(false, |anchor| !attached(anchor));
        if gone {
            self.hide()
        } else {
            None
        }
    }
}
