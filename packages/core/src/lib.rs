//! # Content Link
//!
//! Click-to-edit for CMS-driven pages.
//!
//! Content fetched with stega encoding carries invisible markers naming the
//! record and field it came from. This crate finds them on the page, stamps
//! the enclosing elements with `data-datocms-*` edit metadata, keeps that
//! metadata current as the page changes, and turns clicks on those elements
//! into editor deep links.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────── Controller ─────────────────────────────┐
//! │                                                                      │
//! │  on_mutations / refresh ──► MutationBatch ──► Observer ──► mark pass │
//! │                               (microtask)     (caches)       │       │
//! │                                                              ▼       │
//! │  pointer / focus / click ──► Resolver ──► OverlayManager   Stamper   │
//! │                                 │        (animation frame)           │
//! │                                 ▼                                    │
//! │                             deep link ──► Dom::open_url              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The page itself is reached through the `content-link-dom` host traits;
//! `MemoryDom` with `ManualScheduler` is enough to drive everything here.
//!
//! ## Usage
//!
//! ```rust
//! use content_link::{ContentLinkOptions, Controller, EventKind};
//! use content_link_dom::{Dom, ManualScheduler, MemoryDom};
//!
//! let mut dom = MemoryDom::new();
//! let body = dom.body().unwrap();
//! let p = dom.append_element(body, "p");
//! dom.set_attribute(p, "data-datocms-item-id", "123");
//!
//! let options = ContentLinkOptions::new("https://acme.admin.datocms.com");
//! let controller = Controller::builder(dom, ManualScheduler::new(), options)
//!     .on(EventKind::Ready, |event| {
//!         println!("{:?}", event);
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(controller.last_summary().unwrap().editable_total, 1);
//! ```

pub mod attributes;
pub mod codec;
pub mod config;
pub mod controller;
pub mod deep_link;
pub mod errors;
pub mod field_path;
pub mod info;
pub mod observer;
pub mod overlay;
pub mod resolver;
pub mod stamper;

mod tree;

pub use codec::{decode, derive_from_href, info_from_payload, strip, CMS_DOMAIN};
pub use config::{ContentLinkOptions, DevPanelOption, DevPanelPosition};
pub use controller::{
    ClickOutcome, Controller, ControllerBuilder, ControllerEvent, ControllerState, EventKind,
    MarkScope, MarkSummary, StateDetail, Warning,
};
pub use deep_link::build_deep_link;
pub use errors::{
    ConfigError, ContentLinkError, ContentLinkResult, DeepLinkError, DeepLinkResult,
};
pub use field_path::{normalize_field_path, normalize_field_path_str};
pub use info::{CmsTag, DecodedInfo, EditInfo};
pub use observer::{Match, MatchSource, Observer, ObserverOptions};
pub use overlay::{OverlayBox, OverlayBoxes, OverlayManager, OverlayMode};
pub use resolver::{ClickConflict, Resolution, Resolver, Target};
