//! Pure overlay geometry.

use content_link_dom::Rect;
use serde::Serialize;

/// Position and size of one highlight box, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayBox {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Rect> for OverlayBox {
    fn from(rect: Rect) -> Self {
        Self {
            top: rect.top,
            left: rect.left,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl OverlayBox {
    pub fn transform(&self) -> String {
        format!("translate({}px, {}px)", self.left, self.top)
    }
}

/// The union box plus one segment per line box when there is more than one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayBoxes {
    pub union: OverlayBox,
    /// Relative to `union`
    pub segments: Vec<OverlayBox>,
}

/// Geometry for a set of client rects; `None` when every rect is empty.
pub fn compute_geometry(rects: &[Rect]) -> Option<OverlayBoxes> {
    let visible: Vec<Rect> = rects.iter().copied().filter(|r| !r.is_empty()).collect();
    let union = visible
        .iter()
        .copied()
        .reduce(|acc, rect| acc.union(&rect))?;

    let segments = if visible.len() > 1 {
        visible
            .iter()
            .map(|rect| OverlayBox::from(rect.relative_to(&union)))
            .collect()
    } else {
        Vec::new()
    };

    Some(OverlayBoxes {
        union: union.into(),
        segments,
    })
}

pub(crate) fn px(value: f64) -> String {
    format!("{}px", value)
}
