//! # Popup Placement
//!
//! Pure geometry for positioning floating panels (word editor, sentence
//! translation, grammar point tools) next to a node's rendered rectangle.
//! The host UI measures rectangles; nothing here touches a DOM.

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Popup dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Which side of the anchor the popup ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
}

/// Computed placement: top-left corner plus the side actually used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub side: Side,
}

/// Gap between anchor and popup, and minimum distance to viewport edges.
const GAP: f64 = 6.0;
const EDGE_PADDING: f64 = 8.0;

/// Place a popup next to `anchor` inside `viewport`.
///
/// Below the anchor by default; flips above when the bottom would overflow
/// and there is room above. Horizontally aligned to the anchor's left edge,
/// clamped into the viewport (left edge wins when the popup is wider than
/// the viewport).
pub fn compute_placement(anchor: Rect, popup: Size, viewport: Rect) -> Placement {
    let below_y = anchor.bottom() + GAP;
    let above_y = anchor.y - GAP - popup.height;

    let overflows_below = below_y + popup.height > viewport.bottom() - EDGE_PADDING;
    let fits_above = above_y >= viewport.y + EDGE_PADDING;

    let (y, side) = if overflows_below && fits_above {
        (above_y, Side::Above)
    } else {
        (below_y, Side::Below)
    };

    let max_x = viewport.right() - popup.width - EDGE_PADDING;
    let min_x = viewport.x + EDGE_PADDING;
    let x = anchor.x.min(max_x).max(min_x);

    Placement { x, y, side }
}
