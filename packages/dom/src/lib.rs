//! # Content Link DOM
//!
//! The host contract the content link engine runs against.
//!
//! The engine never touches a browser directly. Everything it needs from the
//! page (tree walks, attribute writes, geometry, mutation records, event
//! listener registration, navigation) goes through the [`Dom`] trait, and
//! everything it defers (microtasks, animation frames) goes through the
//! [`Scheduler`] trait.
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │ content-link Controller  │ ──▶ │ Dom + Scheduler (host)   │
//! └──────────────────────────┘     └──────────────────────────┘
//!                                    │            │
//!                              browser glue   MemoryDom +
//!                              (external)     ManualScheduler
//! ```
//!
//! [`MemoryDom`] and [`ManualScheduler`] are complete reference hosts. They
//! back the test-suites and any embedder that mirrors a page into a
//! virtual tree.

mod geometry;
mod host;
mod memory;
mod mutation;
mod node;
mod scheduler;

pub use geometry::Rect;
pub use host::{Dom, DispatchedEvent, ListenerId, ListenerKind, Scheduler};
pub use memory::MemoryDom;
pub use mutation::{MutationRecord, ObserveOptions, SubscriptionId};
pub use node::{NodeId, NodeKind};
pub use scheduler::{FrameId, ManualScheduler};
