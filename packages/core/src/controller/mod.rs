//! # Controller
//!
//! Owns the host, the observer, the overlay and the callbacks, and moves
//! between three states:
//!
//! ```text
//!            enable()              dispose()
//! Disabled ───────────► Enabled ─────────────► Disposed
//!     ▲                    │                       ▲
//!     └──── disable() ─────┘                       │
//!     └────────────────── dispose() ───────────────┘
//! ```
//!
//! ## Passes
//!
//! Mutation notifications and `refresh` calls only collect work and queue
//! one microtask. When the host runs it, the controller pulls the remaining
//! records, lets the observer re-evaluate what changed, then walks the
//! observer's matches once to stamp, update and clear attributes. Every pass
//! emits exactly one `marked` event.

mod events;
mod summary;

pub use events::{
    Callback, CallbackId, ControllerEvent, EventHub, EventKind, StateDetail, Warning,
    EVENT_PREFIX, NO_EDITABLE_ELEMENTS,
};
pub use summary::{MarkScope, MarkSummary};

use crate::config::ContentLinkOptions;
use crate::deep_link::build_deep_link;
use crate::errors::{ContentLinkError, ContentLinkResult};
use crate::info::EditInfo;
use crate::observer::{MatchSource, MutationBatch, Observer, ObserverOptions};
use crate::overlay::OverlayManager;
use crate::resolver::{ClickConflict, Resolution, Resolver};
use crate::stamper;
use crate::tree;
use content_link_dom::{Dom, FrameId, ListenerId, ListenerKind, NodeId, Scheduler};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

const PROMPT_MESSAGE: &str =
    "Open this content in the DatoCMS editor? Choose Cancel to follow the page link instead.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Disabled,
    Enabled,
    Disposed,
}

/// What the controller did with a click or key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Not an edit target, or the controller is not enabled
    Ignored,
    /// The page keeps the event
    Passthrough,
    /// The editor was opened; the host should cancel the native action
    OpenedEditor(String),
    /// The user declined the prompt; the page keeps the event
    Declined,
}

impl ClickOutcome {
    pub fn prevents_default(&self) -> bool {
        matches!(self, ClickOutcome::OpenedEditor(_))
    }
}

/// Collects callbacks before the controller is built, so an auto-enabled
/// controller can report its first pass.
pub struct ControllerBuilder<D: Dom, S: Scheduler> {
    dom: D,
    scheduler: S,
    options: ContentLinkOptions,
    events: EventHub,
}

impl<D: Dom, S: Scheduler> ControllerBuilder<D, S> {
    pub fn on<F>(mut self, kind: EventKind, callback: F) -> Self
    where
        F: FnMut(&ControllerEvent) -> anyhow::Result<()> + 'static,
    {
        self.events.subscribe(kind, Box::new(callback));
        self
    }

    pub fn build(self) -> ContentLinkResult<Controller<D, S>> {
        Controller::with_events(self.dom, self.scheduler, self.options, self.events)
    }
}

pub struct Controller<D: Dom, S: Scheduler> {
    dom: D,
    scheduler: S,
    options: ContentLinkOptions,
    base_editing_url: String,
    root: NodeId,
    state: ControllerState,
    observer: Observer,
    overlay: OverlayManager,
    resolver: Resolver,
    events: EventHub,
    listeners: Vec<ListenerId>,
    batch: MutationBatch,
    full_pass: bool,
    microtask_pending: bool,
    generated: BTreeSet<NodeId>,
    explicit: BTreeSet<NodeId>,
    last_summary: Option<MarkSummary>,
    ready_emitted: bool,
    warned: bool,
}

impl<D: Dom, S: Scheduler> Controller<D, S> {
    /// Validate `options` and build a controller; enables right away unless
    /// `autoEnable` is off.
    pub fn new(dom: D, scheduler: S, options: ContentLinkOptions) -> ContentLinkResult<Self> {
        Self::with_events(dom, scheduler, options, EventHub::new())
    }

    pub fn builder(dom: D, scheduler: S, options: ContentLinkOptions) -> ControllerBuilder<D, S> {
        ControllerBuilder {
            dom,
            scheduler,
            options,
            events: EventHub::new(),
        }
    }

    fn with_events(
        dom: D,
        scheduler: S,
        options: ContentLinkOptions,
        events: EventHub,
    ) -> ContentLinkResult<Self> {
        options.validate()?;

        let base_editing_url = options.base_editing_url.trim().to_string();
        let root = options.root.unwrap_or_else(|| dom.document());
        let observer = Observer::new(
            root,
            ObserverOptions {
                persist_after_clean: options.persist_after_clean,
            },
        );
        let resolver = Resolver::new(root, &base_editing_url, options.environment());

        let mut controller = Self {
            dom,
            scheduler,
            overlay: OverlayManager::new(options.overlay),
            base_editing_url,
            root,
            state: ControllerState::Disabled,
            observer,
            resolver,
            events,
            listeners: Vec::new(),
            batch: MutationBatch::new(),
            full_pass: false,
            microtask_pending: false,
            generated: BTreeSet::new(),
            explicit: BTreeSet::new(),
            last_summary: None,
            ready_emitted: false,
            warned: false,
            options,
        };

        info!(
            root = %controller.root,
            base_editing_url = %controller.base_editing_url,
            environment = ?controller.options.environment(),
            "Content link controller created"
        );

        if controller.options.auto_enable {
            controller.enable()?;
        }
        Ok(controller)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == ControllerState::Enabled
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn options(&self) -> &ContentLinkOptions {
        &self.options
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// Mutable host access, e.g. to change the page between ticks.
    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn overlay(&self) -> &OverlayManager {
        &self.overlay
    }

    pub fn last_summary(&self) -> Option<&MarkSummary> {
        self.last_summary.as_ref()
    }

    pub fn has_pending_work(&self) -> bool {
        self.microtask_pending || self.overlay.pending_frame().is_some()
    }

    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> CallbackId
    where
        F: FnMut(&ControllerEvent) -> anyhow::Result<()> + 'static,
    {
        self.events.subscribe(kind, Box::new(callback))
    }

    pub fn off(&mut self, id: CallbackId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Subscribe to mutations and page events, then run the initial pass.
    pub fn enable(&mut self) -> ContentLinkResult<()> {
        match self.state {
            ControllerState::Disposed => return Err(ContentLinkError::Disposed),
            ControllerState::Enabled => return Ok(()),
            ControllerState::Disabled => {}
        }

        self.observer.connect(&mut self.dom);
        self.listeners = ListenerKind::ALL
            .iter()
            .map(|kind| self.dom.add_listener(*kind))
            .collect();
        self.overlay.mount(&mut self.dom, self.root);

        self.state = ControllerState::Enabled;
        info!(root = %self.root, "Content link enabled");
        self.emit_state();

        let report = self.observer.scan(&self.dom, self.root);
        debug!(matched = report.matched, visited = report.visited, "Initial scan");
        let summary = self.mark(MarkScope::Full);

        if summary.editable_total == 0 && !self.warned {
            self.warned = true;
            let warning = Warning::no_editable_elements();
            warn!(code = %warning.code, "{}", warning.message);
            self.emit(ControllerEvent::Warn(warning));
        }
        Ok(())
    }

    /// Detach from the page. Stamped attributes stay.
    pub fn disable(&mut self) -> ContentLinkResult<()> {
        match self.state {
            ControllerState::Disposed => return Err(ContentLinkError::Disposed),
            ControllerState::Disabled => return Ok(()),
            ControllerState::Enabled => {}
        }

        self.teardown();
        self.state = ControllerState::Disabled;
        info!(root = %self.root, "Content link disabled");
        self.emit_state();
        Ok(())
    }

    pub fn toggle(&mut self) -> ContentLinkResult<()> {
        match self.state {
            ControllerState::Enabled => self.disable(),
            ControllerState::Disabled => self.enable(),
            ControllerState::Disposed => Err(ContentLinkError::Disposed),
        }
    }

    /// Detach, erase everything the engine wrote, and stop for good.
    pub fn dispose(&mut self) {
        if self.state == ControllerState::Disposed {
            return;
        }
        if self.state == ControllerState::Enabled {
            self.teardown();
        }

        let cleared = stamper::clear(&mut self.dom, self.root);
        self.generated.clear();
        self.explicit.clear();
        self.observer.clear();

        self.state = ControllerState::Disposed;
        info!(root = %self.root, cleared, "Content link disposed");
        self.emit_state();
    }

    fn teardown(&mut self) {
        self.observer.disconnect(&mut self.dom);
        for listener in self.listeners.drain(..) {
            self.dom.remove_listener(listener);
        }
        self.overlay.unmount(&mut self.dom, &mut self.scheduler);
        self.batch = MutationBatch::new();
        self.full_pass = false;
        self.microtask_pending = false;
    }

    /// Queue a re-scan of `subtree`, or of the whole root.
    pub fn refresh(&mut self, subtree: Option<NodeId>) -> ContentLinkResult<()> {
        match self.state {
            ControllerState::Disposed => return Err(ContentLinkError::Disposed),
            ControllerState::Disabled => {
                debug!("Refresh ignored while disabled");
                return Ok(());
            }
            ControllerState::Enabled => {}
        }

        match subtree {
            Some(node) if node != self.root && self.dom.contains(self.root, node) => {
                self.batch.request_subtree(node);
            }
            _ => self.full_pass = true,
        }
        self.schedule_flush();
        Ok(())
    }

    /// Host signal that mutation records are waiting.
    pub fn on_mutations(&mut self) {
        if !self.is_enabled() {
            return;
        }
        if self.collect_records() == 0 {
            return;
        }
        self.schedule_flush();
    }

    /// Move pending records into the batch, leaving out overlay writes.
    fn collect_records(&mut self) -> usize {
        let records = self.observer.take_records(&mut self.dom);
        let relevant: Vec<_> = records
            .iter()
            .filter(|record| !tree::is_ignored_record(&self.dom, record))
            .collect();
        self.batch.extend(relevant.iter().copied());
        relevant.len()
    }

    fn schedule_flush(&mut self) {
        if !self.microtask_pending {
            self.microtask_pending = true;
            self.scheduler.queue_microtask();
        }
    }

    /// Microtask callback: flush everything collected this tick as one pass.
    pub fn run_microtask(&mut self) -> Option<MarkSummary> {
        if !self.microtask_pending || !self.is_enabled() {
            return None;
        }
        self.microtask_pending = false;

        self.collect_records();
        let batch = std::mem::take(&mut self.batch);
        let full = std::mem::take(&mut self.full_pass);

        let scope = if full {
            self.observer.scan(&self.dom, self.root);
            self.observer.sweep(&self.dom);
            MarkScope::Full
        } else {
            self.observer.process_batch(&self.dom, &batch);
            match (batch.record_count(), batch.subtrees().len()) {
                (0, 1) => batch
                    .subtrees()
                    .iter()
                    .next()
                    .map_or(MarkScope::Mutations, |node| MarkScope::Subtree(*node)),
                _ => MarkScope::Mutations,
            }
        };

        Some(self.mark(scope))
    }

    /// Walk the observer's matches and bring attributes in line with them.
    fn mark(&mut self, scope: MarkScope) -> MarkSummary {
        let mut summary = MarkSummary::new(scope);
        let matches = self.observer.matches_within(&self.dom, self.root);
        let environment = self.options.environment().map(str::to_string);
        let debug_attributes = self.options.debug;

        let mut targets = BTreeSet::new();
        let mut generated = BTreeSet::new();
        let mut explicit = BTreeSet::new();

        for found in &matches {
            let element = found.element;
            match found.source {
                MatchSource::Text | MatchSource::ImageAlt => {
                    if stamper::is_explicit(&self.dom, element) {
                        targets.insert(element);
                        continue;
                    }
                    if generated.contains(&element) {
                        continue;
                    }

                    let url = match build_deep_link(
                        &found.info,
                        &self.base_editing_url,
                        environment.as_deref(),
                    ) {
                        Ok(url) => url,
                        Err(err) => {
                            debug!(element = %element, error = %err, "Skipping match without editor link");
                            continue;
                        }
                    };

                    let edit = EditInfo::from_decoded(&found.info, url, environment.as_deref());
                    let existed = stamper::is_generated(&self.dom, element);
                    if stamper::stamp(&mut self.dom, element, &edit) {
                        if existed {
                            summary.generated_updated += 1;
                        } else {
                            summary.generated_stamped += 1;
                        }
                    }
                    if debug_attributes {
                        let info = serde_json::to_string(&found.info).ok();
                        stamper::stamp_debug(
                            &mut self.dom,
                            element,
                            found.source.reason(),
                            Some(&edit.edit_url),
                            info.as_deref(),
                        );
                    }
                    generated.insert(element);
                    targets.insert(element);
                }
                MatchSource::Explicit => {
                    stamper::mark_editable(&mut self.dom, element);
                    if debug_attributes {
                        let url = self.resolver.edit_url(&self.dom, &self.observer, element);
                        let info = serde_json::to_string(&found.info).ok();
                        stamper::stamp_debug(
                            &mut self.dom,
                            element,
                            found.source.reason(),
                            url.as_deref(),
                            info.as_deref(),
                        );
                    }
                    summary.explicit_total += 1;
                    explicit.insert(element);
                    targets.insert(element);
                }
            }
        }

        for stale in self.generated.difference(&generated) {
            if stamper::unstamp(&mut self.dom, *stale) {
                summary.generated_cleared += 1;
            }
        }
        for stale in self.explicit.difference(&explicit) {
            if !generated.contains(stale) {
                stamper::unstamp(&mut self.dom, *stale);
            }
        }
        self.generated = generated;
        self.explicit = explicit;
        summary.editable_total = targets.len();

        // Records caused by our own writes would only schedule an empty pass.
        self.observer.take_records(&mut self.dom);

        debug!(
            editable_total = summary.editable_total,
            generated_stamped = summary.generated_stamped,
            generated_updated = summary.generated_updated,
            generated_cleared = summary.generated_cleared,
            explicit_total = summary.explicit_total,
            scope = ?summary.scope,
            "Marking pass complete"
        );

        self.last_summary = Some(summary);
        if !self.ready_emitted {
            self.ready_emitted = true;
            self.emit(ControllerEvent::Ready(summary));
        }
        self.emit(ControllerEvent::Marked(summary));
        summary
    }

    /// Animation-frame callback for the overlay.
    pub fn run_animation_frame(&mut self, frame: FrameId) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.overlay.on_frame(&mut self.dom, frame)
    }

    pub fn resolve(&self, target: NodeId) -> Option<Resolution> {
        self.resolver.resolve(&self.dom, &self.observer, target)
    }

    pub fn handle_pointer_over(&mut self, target: NodeId) {
        self.highlight(target);
    }

    pub fn handle_pointer_out(&mut self, related: Option<NodeId>) {
        self.unhighlight(related);
    }

    pub fn handle_focus_in(&mut self, target: NodeId) {
        self.highlight(target);
    }

    pub fn handle_focus_out(&mut self, related: Option<NodeId>) {
        self.unhighlight(related);
    }

    pub fn handle_scroll(&mut self) {
        if self.is_enabled() {
            self.overlay.request_sync(&mut self.scheduler);
        }
    }

    pub fn handle_resize(&mut self) {
        self.handle_scroll();
    }

    fn highlight(&mut self, target: NodeId) {
        if !self.is_enabled() {
            return;
        }
        let element = self
            .resolve(target)
            .filter(Resolution::highlights)
            .map(|resolution| resolution.target.element);
        self.overlay.set_target(&mut self.scheduler, element);
    }

    fn unhighlight(&mut self, related: Option<NodeId>) {
        if !self.is_enabled() {
            return;
        }
        let still_inside = match (self.overlay.target(), related) {
            (Some(current), Some(next)) => self.dom.contains(current, next),
            _ => false,
        };
        if !still_inside {
            self.overlay.set_target(&mut self.scheduler, None);
        }
    }

    pub fn handle_click(&mut self, target: NodeId) -> ClickOutcome {
        if !self.is_enabled() {
            return ClickOutcome::Ignored;
        }
        let Some(resolution) = self.resolve(target) else {
            return ClickOutcome::Ignored;
        };

        match resolution.policy() {
            ClickConflict::Ignore => ClickOutcome::Ignored,
            ClickConflict::PreferPage => ClickOutcome::Passthrough,
            ClickConflict::PreferDato => self.open_editor(resolution.target.edit_url),
            ClickConflict::Prompt => {
                if self.dom.confirm(PROMPT_MESSAGE) {
                    self.open_editor(resolution.target.edit_url)
                } else {
                    debug!(element = %resolution.target.element, "Editor prompt declined");
                    ClickOutcome::Declined
                }
            }
        }
    }

    /// Enter or Space on a focused edit target that has no keyboard behavior of its own.
    pub fn handle_key_down(&mut self, target: NodeId, key: &str) -> ClickOutcome {
        if !self.is_enabled() || !matches!(key, "Enter" | " " | "Space" | "Spacebar") {
            return ClickOutcome::Ignored;
        }
        let Some(resolution) = self.resolve(target) else {
            return ClickOutcome::Ignored;
        };
        if resolution.target.element != target
            || resolution.interactive
            || resolution.policy() != ClickConflict::PreferDato
        {
            return ClickOutcome::Ignored;
        }
        self.open_editor(resolution.target.edit_url)
    }

    fn open_editor(&mut self, url: String) -> ClickOutcome {
        info!(url = %url, "Opening editor");
        self.dom.open_url(&url, true);
        ClickOutcome::OpenedEditor(url)
    }

    fn emit_state(&mut self) {
        let detail = StateDetail {
            enabled: self.state == ControllerState::Enabled,
            disposed: self.state == ControllerState::Disposed,
        };
        self.emit(ControllerEvent::State(detail));
    }

    fn emit(&mut self, event: ControllerEvent) {
        let failures = self.events.emit(&event);
        if failures > 0 {
            debug!(event = event.kind().as_str(), failures, "Some callbacks failed");
        }
        self.dom
            .dispatch_custom_event(self.root, &event.kind().dom_name(), &event.detail());
    }
}

impl<D: Dom, S: Scheduler> std::fmt::Debug for Controller<D, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("root", &self.root)
            .field("state", &self.state)
            .field("generated", &self.generated.len())
            .field("explicit", &self.explicit.len())
            .field("microtask_pending", &self.microtask_pending)
            .finish()
    }
}
