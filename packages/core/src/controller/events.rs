//! Lifecycle events and the callbacks that receive them.
//!
//! Every event goes out twice: to the registered callbacks, and as a DOM
//! custom event on the root (`datocms:content-link:<name>`) whose `detail`
//! is the JSON payload. A callback that errors or panics is logged and
//! skipped; the others still run.

use super::summary::MarkSummary;
use serde::Serialize;
use serde_json::{json, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

pub const EVENT_PREFIX: &str = "datocms:content-link:";

pub const NO_EDITABLE_ELEMENTS: &str = "no-editable-elements";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Ready,
    Marked,
    State,
    Warn,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::Marked => "marked",
            EventKind::State => "state",
            EventKind::Warn => "warn",
        }
    }

    pub fn dom_name(self) -> String {
        format!("{}{}", EVENT_PREFIX, self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateDetail {
    pub enabled: bool,
    pub disposed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

impl Warning {
    pub fn no_editable_elements() -> Self {
        Self {
            code: NO_EDITABLE_ELEMENTS.to_string(),
            message: "No editable elements were found. Make sure the content is fetched with \
                      stega encoding enabled, or tag elements with data-datocms-* attributes."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Ready(MarkSummary),
    Marked(MarkSummary),
    State(StateDetail),
    Warn(Warning),
}

impl ControllerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ControllerEvent::Ready(_) => EventKind::Ready,
            ControllerEvent::Marked(_) => EventKind::Marked,
            ControllerEvent::State(_) => EventKind::State,
            ControllerEvent::Warn(_) => EventKind::Warn,
        }
    }

    /// JSON `detail` of the DOM custom event.
    pub fn detail(&self) -> Value {
        let detail = match self {
            ControllerEvent::Ready(summary) | ControllerEvent::Marked(summary) => {
                serde_json::to_value(summary)
            }
            ControllerEvent::State(state) => serde_json::to_value(state),
            ControllerEvent::Warn(warning) => serde_json::to_value(warning),
        };
        detail.unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }
}

pub type Callback = Box<dyn FnMut(&ControllerEvent) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub u64);

/// Registered callbacks, run in registration order.
#[derive(Default)]
pub struct EventHub {
    callbacks: Vec<(CallbackId, EventKind, Callback)>,
    next_id: u64,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, callback: Callback) -> CallbackId {
        self.next_id += 1;
        let id = CallbackId(self.next_id);
        self.callbacks.push((id, kind, callback));
        id
    }

    pub fn unsubscribe(&mut self, id: CallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(cid, _, _)| *cid != id);
        before != self.callbacks.len()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Run every callback for the event's kind. Returns how many failed.
    pub fn emit(&mut self, event: &ControllerEvent) -> usize {
        let kind = event.kind();
        let mut failures = 0;

        for (id, _, callback) in self.callbacks.iter_mut().filter(|(_, k, _)| *k == kind) {
            match catch_unwind(AssertUnwindSafe(|| (*callback)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    error!(event = kind.as_str(), callback = id.0, error = %err, "Event callback failed");
                }
                Err(panic) => {
                    failures += 1;
                    error!(
                        event = kind.as_str(),
                        callback = id.0,
                        panic = panic_message(panic.as_ref()),
                        "Event callback panicked"
                    );
                }
            }
        }

        failures
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::summary::MarkScope;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_failing_callbacks_are_isolated() {
        let mut hub = EventHub::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        hub.subscribe(EventKind::Marked, Box::new(|_| anyhow::bail!("boom")));
        hub.subscribe(EventKind::Marked, Box::new(|_| panic!("kaboom")));
        let sink = seen.clone();
        hub.subscribe(
            EventKind::Marked,
            Box::new(move |event| {
                sink.borrow_mut().push(event.kind());
                Ok(())
            }),
        );

        let failures = hub.emit(&ControllerEvent::Marked(MarkSummary::new(MarkScope::Full)));
        assert_eq!(failures, 2);
        assert_eq!(*seen.borrow(), vec![EventKind::Marked]);
    }

    #[test]
    fn test_only_matching_kind_runs() {
        let mut hub = EventHub::new();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let id = hub.subscribe(
            EventKind::Warn,
            Box::new(move |_| {
                *sink.borrow_mut() += 1;
                Ok(())
            }),
        );

        hub.emit(&ControllerEvent::State(StateDetail {
            enabled: true,
            disposed: false,
        }));
        assert_eq!(*count.borrow(), 0);

        hub.emit(&ControllerEvent::Warn(Warning::no_editable_elements()));
        assert_eq!(*count.borrow(), 1);

        assert!(hub.unsubscribe(id));
        assert!(hub.is_empty());
    }

    #[test]
    fn test_detail_shapes() {
        let detail = ControllerEvent::Marked(MarkSummary::new(MarkScope::Full)).detail();
        assert_eq!(detail["editableTotal"], 0);
        assert_eq!(detail["scope"]["kind"], "full");

        let detail = ControllerEvent::Warn(Warning::no_editable_elements()).detail();
        assert_eq!(detail["code"], "no-editable-elements");
        assert_eq!(EventKind::Warn.dom_name(), "datocms:content-link:warn");
    }
}
