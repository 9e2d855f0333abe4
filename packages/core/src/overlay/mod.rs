//! # Overlay/Geometry Manager
//!
//! Draws the highlight over the active edit target.
//!
//! ```text
//! <body>
//!   ...
//!   <div data-datocms-overlay>             position: fixed, translate(union)
//!     <div data-datocms-overlay-segment>   one per line box, multi-line only
//!   </div>
//! </body>
//! ```
//!
//! Geometry is read and written at most once per animation frame: target
//! changes, scrolls and resizes only request a frame, and the frame callback
//! does the sync. Nothing is scheduled in `off` mode.

mod geometry;

pub use geometry::{compute_geometry, OverlayBox, OverlayBoxes};

use crate::attributes;
use content_link_dom::{Dom, FrameId, NodeId, Scheduler};
use geometry::px;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    Off,
    #[default]
    Hover,
}

const LAYER_STYLES: [(&str, &str); 6] = [
    ("position", "fixed"),
    ("top", "0"),
    ("left", "0"),
    ("pointer-events", "none"),
    ("z-index", "2147483647"),
    ("display", "none"),
];

#[derive(Debug)]
pub struct OverlayManager {
    mode: OverlayMode,
    layer: Option<NodeId>,
    segments: Vec<NodeId>,
    target: Option<NodeId>,
    pending_frame: Option<FrameId>,
    rendered: Option<OverlayBoxes>,
}

impl OverlayManager {
    pub fn new(mode: OverlayMode) -> Self {
        Self {
            mode,
            layer: None,
            segments: Vec::new(),
            target: None,
            pending_frame: None,
            rendered: None,
        }
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn layer(&self) -> Option<NodeId> {
        self.layer
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn pending_frame(&self) -> Option<FrameId> {
        self.pending_frame
    }

    /// Last geometry written to the layer; `None` while hidden.
    pub fn rendered(&self) -> Option<&OverlayBoxes> {
        self.rendered.as_ref()
    }

    /// Create the layer under the body, or under `root` when there is no body.
    pub fn mount<D: Dom + ?Sized>(&mut self, dom: &mut D, root: NodeId) {
        if self.mode == OverlayMode::Off || self.layer.is_some() {
            return;
        }
        let layer = dom.create_element("div");
        dom.set_attribute(layer, attributes::OVERLAY, "");
        for (property, value) in LAYER_STYLES {
            dom.set_style(layer, property, Some(value));
        }
        let parent = dom.body().unwrap_or(root);
        dom.append_child(parent, layer);
        self.layer = Some(layer);
        debug!(layer = %layer, "Overlay mounted");
    }

    /// Remove the layer and drop any pending frame.
    pub fn unmount<D, S>(&mut self, dom: &mut D, scheduler: &mut S)
    where
        D: Dom + ?Sized,
        S: Scheduler + ?Sized,
    {
        if let Some(frame) = self.pending_frame.take() {
            scheduler.cancel_animation_frame(frame);
        }
        if let Some(layer) = self.layer.take() {
            dom.remove(layer);
            debug!(layer = %layer, "Overlay unmounted");
        }
        self.segments.clear();
        self.target = None;
        self.rendered = None;
    }

    /// Highlight `target`, or nothing.
    pub fn set_target<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, target: Option<NodeId>) {
        if self.target == target {
            return;
        }
        self.target = target;
        self.request_sync(scheduler);
    }

    /// Ask for a sync on the next animation frame; coalesced.
    pub fn request_sync<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.mode == OverlayMode::Off || self.layer.is_none() || self.pending_frame.is_some() {
            return;
        }
        self.pending_frame = Some(scheduler.request_animation_frame());
    }

    /// Frame callback. Returns whether `frame` was ours and a sync ran.
    pub fn on_frame<D: Dom + ?Sized>(&mut self, dom: &mut D, frame: FrameId) -> bool {
        if self.pending_frame != Some(frame) {
            return false;
        }
        self.pending_frame = None;
        self.sync(dom);
        true
    }

    /// Read the target's rects and write the layer, skipping unchanged geometry.
    pub fn sync<D: Dom + ?Sized>(&mut self, dom: &mut D) {
        let Some(layer) = self.layer else {
            return;
        };

        let geometry = self
            .target
            .filter(|target| dom.is_connected(*target))
            .and_then(|target| compute_geometry(&dom.client_rects(target)));

        let Some(geometry) = geometry else {
            if self.target.is_some_and(|t| !dom.is_connected(t)) {
                self.target = None;
            }
            self.hide(dom, layer);
            return;
        };

        if self.rendered.as_ref() == Some(&geometry) {
            return;
        }

        write_box(dom, layer, &geometry.union);
        dom.set_style(layer, "display", Some("block"));
        self.sync_segments(dom, layer, &geometry.segments);
        self.rendered = Some(geometry);
    }

    fn hide<D: Dom + ?Sized>(&mut self, dom: &mut D, layer: NodeId) {
        if self.rendered.take().is_some() {
            dom.set_style(layer, "display", Some("none"));
            self.sync_segments(dom, layer, &[]);
        }
    }

    fn sync_segments<D: Dom + ?Sized>(&mut self, dom: &mut D, layer: NodeId, boxes: &[OverlayBox]) {
        while self.segments.len() > boxes.len() {
            if let Some(segment) = self.segments.pop() {
                dom.remove(segment);
            }
        }
        while self.segments.len() < boxes.len() {
            let segment = dom.create_element("div");
            dom.set_attribute(segment, attributes::OVERLAY_SEGMENT, "");
            dom.set_style(segment, "position", Some("absolute"));
            dom.set_style(segment, "top", Some("0"));
            dom.set_style(segment, "left", Some("0"));
            dom.append_child(layer, segment);
            self.segments.push(segment);
        }
        for (segment, overlay_box) in self.segments.iter().zip(boxes) {
            write_box(dom, *segment, overlay_box);
        }
    }
}

fn write_box<D: Dom + ?Sized>(dom: &mut D, node: NodeId, overlay_box: &OverlayBox) {
    dom.set_style(node, "transform", Some(&overlay_box.transform()));
    dom.set_style(node, "width", Some(&px(overlay_box.width)));
    dom.set_style(node, "height", Some(&px(overlay_box.height)));
}
