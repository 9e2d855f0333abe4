//! Integration tests for the controller lifecycle and marking passes

use content_link::attributes;
use content_link::{
    ContentLinkError, ContentLinkOptions, Controller, ControllerEvent, ControllerState, EventKind,
    MarkScope,
};
use content_link_dom::{Dom, ManualScheduler, MemoryDom, NodeId};
use content_link_stega::combine;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

const BASE: &str = "https://acme.admin.datocms.com";

type Page = Controller<MemoryDom, ManualScheduler>;
type Seen = Rc<RefCell<Vec<ControllerEvent>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn marked(visible: &str, payload: Value) -> String {
    combine(visible, &payload).unwrap()
}

/// `<h1>` with a marker, `<p>` tagged by hand.
fn sample_page() -> (MemoryDom, NodeId, NodeId) {
    let mut dom = MemoryDom::new();
    let body = dom.body().unwrap();
    let h1 = dom.append_element(body, "h1");
    dom.append_text(
        h1,
        &marked(
            "Hello",
            json!({ "itemId": "123", "itemTypeId": "post", "fieldPath": "title" }),
        ),
    );
    let p = dom.append_element(body, "p");
    dom.set_attribute(p, attributes::ITEM_ID, "7");
    (dom, h1, p)
}

fn recorded(dom: MemoryDom, options: ContentLinkOptions) -> (Page, Seen) {
    let seen: Seen = Rc::new(RefCell::new(Vec::new()));
    let mut builder = Controller::builder(dom, ManualScheduler::new(), options);
    for kind in [EventKind::Ready, EventKind::Marked, EventKind::State, EventKind::Warn] {
        let sink = seen.clone();
        builder = builder.on(kind, move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
    }
    (builder.build().unwrap(), seen)
}

fn count(seen: &Seen, kind: EventKind) -> usize {
    seen.borrow().iter().filter(|e| e.kind() == kind).count()
}

#[test]
fn test_enable_stamps_and_reports() {
    init_tracing();
    let (dom, h1, p) = sample_page();
    let (page, seen) = recorded(dom, ContentLinkOptions::new(BASE));

    assert_eq!(page.state(), ControllerState::Enabled);

    let dom = page.dom();
    assert_eq!(
        dom.attribute(h1, attributes::EDIT_URL).as_deref(),
        Some("https://acme.admin.datocms.com/editor/item_types/post/items/123/edit#fieldPath=title")
    );
    assert_eq!(dom.attribute(h1, attributes::GENERATED).as_deref(), Some("stega"));
    assert_eq!(dom.attribute(h1, attributes::ITEM_TYPE_ID).as_deref(), Some("post"));
    assert!(dom.has_attribute(h1, attributes::EDITABLE));
    assert!(dom.has_attribute(p, attributes::EDITABLE));
    assert!(!dom.has_attribute(p, attributes::GENERATED));

    let summary = page.last_summary().unwrap();
    assert_eq!(summary.editable_total, 2);
    assert_eq!(summary.generated_stamped, 1);
    assert_eq!(summary.explicit_total, 1);
    assert_eq!(summary.scope, MarkScope::Full);

    let kinds: Vec<EventKind> = seen.borrow().iter().map(ControllerEvent::kind).collect();
    assert_eq!(kinds, vec![EventKind::State, EventKind::Ready, EventKind::Marked]);

    assert_eq!(dom.events_named("datocms:content-link:ready").count(), 1);
    let marked = dom.events_named("datocms:content-link:marked").next().unwrap();
    assert_eq!(marked.detail["editableTotal"], 2);
    assert_eq!(marked.target, dom.document());

    assert_eq!(dom.listener_count(), 8);
    assert_eq!(dom.subscription_count(), 1);
    assert!(page.overlay().layer().is_some());
}

#[test]
fn test_disable_keeps_attributes_and_detaches() {
    init_tracing();
    let (dom, h1, _) = sample_page();
    let (mut page, seen) = recorded(dom, ContentLinkOptions::new(BASE));

    page.disable().unwrap();
    assert_eq!(page.state(), ControllerState::Disabled);

    let dom = page.dom();
    assert_eq!(dom.listener_count(), 0);
    assert_eq!(dom.subscription_count(), 0);
    assert!(dom.find_by_attribute(dom.document(), attributes::OVERLAY).is_empty());
    assert!(dom.has_attribute(h1, attributes::EDIT_URL));

    let state = dom.events_named("datocms:content-link:state").last().unwrap();
    assert_eq!(state.detail, json!({ "enabled": false, "disposed": false }));

    page.toggle().unwrap();
    assert!(page.is_enabled());
    assert_eq!(count(&seen, EventKind::Ready), 1);
    assert_eq!(count(&seen, EventKind::Marked), 2);
    assert_eq!(count(&seen, EventKind::State), 3);
}

#[test]
fn test_dispose_strips_everything_once() {
    init_tracing();
    let (dom, _, p) = sample_page();
    let (mut page, seen) = recorded(dom, ContentLinkOptions::new(BASE).with_debug(true));

    page.refresh(None).unwrap();
    page.dispose();
    assert_eq!(page.state(), ControllerState::Disposed);

    let dom = page.dom();
    let document = dom.document();
    for name in [
        attributes::GENERATED,
        attributes::EDITABLE,
        attributes::EDIT_URL,
        attributes::DEBUG_REASON,
        attributes::DEBUG_INFO,
    ] {
        assert!(dom.find_by_attribute(document, name).is_empty(), "{} left behind", name);
    }
    assert_eq!(dom.attribute(p, attributes::ITEM_ID).as_deref(), Some("7"));

    let states = count(&seen, EventKind::State);
    let last = seen.borrow().last().cloned().unwrap();
    assert!(matches!(
        last,
        ControllerEvent::State(detail) if detail.disposed && !detail.enabled
    ));

    page.dispose();
    assert_eq!(count(&seen, EventKind::State), states);

    assert!(page.run_microtask().is_none());
    assert!(matches!(page.enable(), Err(ContentLinkError::Disposed)));
    assert!(matches!(page.refresh(None), Err(ContentLinkError::Disposed)));
}

#[test]
fn test_dispose_discards_pending_work() {
    init_tracing();
    let (dom, h1, _) = sample_page();
    let mut page = Controller::new(dom, ManualScheduler::new(), ContentLinkOptions::new(BASE)).unwrap();

    page.refresh(None).unwrap();
    page.handle_pointer_over(h1);
    assert!(page.has_pending_work());
    assert_eq!(page.scheduler().pending_frames(), 1);

    page.dispose();
    assert!(!page.has_pending_work());
    assert_eq!(page.scheduler().cancelled_frames(), 1);

    let frames = page.scheduler_mut().take_frames();
    assert!(frames.is_empty());
    assert!(page.run_microtask().is_none());
    assert!(!page.run_animation_frame(content_link_dom::FrameId(1)));
}

#[test]
fn test_mutations_in_one_tick_make_one_pass() {
    init_tracing();
    let (mut page, seen) = recorded(MemoryDom::new(), ContentLinkOptions::new(BASE));
    assert_eq!(count(&seen, EventKind::Warn), 1);
    page.scheduler_mut().take_microtasks();

    let dom = page.dom_mut();
    let body = dom.body().unwrap();
    let p = dom.append_element(body, "p");
    let text = dom.append_text(p, &marked("One", json!({ "itemId": "1" })));
    dom.set_text(text, &marked("Two", json!({ "itemId": "2" })));

    page.on_mutations();
    page.on_mutations();
    page.refresh(Some(p)).unwrap();
    assert_eq!(page.scheduler_mut().take_microtasks(), 1);

    let summary = page.run_microtask().unwrap();
    assert_eq!(summary.scope, MarkScope::Mutations);
    assert_eq!(summary.generated_stamped, 1);
    assert!(page.run_microtask().is_none());
    assert_eq!(count(&seen, EventKind::Marked), 2);

    assert_eq!(
        page.dom().attribute(p, attributes::EDIT_URL).as_deref(),
        Some("https://acme.admin.datocms.com/editor/items/2/edit")
    );

    // Our own attribute writes never schedule another pass.
    page.on_mutations();
    assert_eq!(page.scheduler().pending_microtasks(), 0);
}

#[test]
fn test_refresh_of_subtree_is_scoped() {
    init_tracing();
    let (dom, h1, _) = sample_page();
    let mut page = Controller::new(dom, ManualScheduler::new(), ContentLinkOptions::new(BASE)).unwrap();

    page.refresh(Some(h1)).unwrap();
    page.refresh(Some(h1)).unwrap();
    let summary = page.run_microtask().unwrap();
    assert_eq!(summary.scope, MarkScope::Subtree(h1));
    assert_eq!(summary.generated_stamped, 0);
    assert_eq!(summary.generated_updated, 0);
    assert_eq!(summary.editable_total, 2);
}

#[test]
fn test_unchanged_page_costs_no_decode() {
    init_tracing();
    let (dom, _, _) = sample_page();
    let mut page = Controller::new(dom, ManualScheduler::new(), ContentLinkOptions::new(BASE)).unwrap();

    let before = page.observer().stats();
    page.refresh(None).unwrap();
    page.run_microtask().unwrap();
    let after = page.observer().stats();

    assert_eq!(after.decode_calls, before.decode_calls);
    assert!(after.memo_hits > before.memo_hits);
}

#[test]
fn test_removed_nodes_are_cleared() {
    init_tracing();
    let (dom, h1, _) = sample_page();
    let mut page = Controller::new(dom, ManualScheduler::new(), ContentLinkOptions::new(BASE)).unwrap();

    page.dom_mut().remove(h1);
    page.on_mutations();
    let summary = page.run_microtask().unwrap();

    assert_eq!(summary.generated_cleared, 1);
    assert_eq!(summary.editable_total, 1);
    let document = page.dom().document();
    assert!(page
        .observer()
        .entry(page.dom().children(h1)[0])
        .is_none());
    assert!(page.dom().find_by_attribute(document, attributes::GENERATED).is_empty());
    assert!(!page.dom().has_attribute(h1, attributes::GENERATED));
}

#[test]
fn test_attribute_changes_are_reevaluated() {
    init_tracing();
    let mut dom = MemoryDom::new();
    let body = dom.body().unwrap();
    let img = dom.append_element(body, "img");
    dom.set_attribute(img, attributes::ALT, &marked("A cat", json!({ "itemId": "1" })));
    let tagged = dom.append_element(body, "p");
    dom.set_attribute(tagged, attributes::ITEM_ID, "7");
    let plain = dom.append_element(body, "div");
    dom.append_text(plain, "Later tagged");

    let mut page = Controller::new(dom, ManualScheduler::new(), ContentLinkOptions::new(BASE)).unwrap();
    assert_eq!(page.last_summary().unwrap().editable_total, 2);

    page.dom_mut()
        .set_attribute(img, attributes::ALT, &marked("A cat", json!({ "itemId": "2" })));
    page.on_mutations();
    let summary = page.run_microtask().unwrap();
    assert_eq!(summary.generated_updated, 1);
    assert_eq!(
        page.dom().attribute(img, attributes::EDIT_URL).as_deref(),
        Some("https://acme.admin.datocms.com/editor/items/2/edit")
    );

    page.dom_mut().set_attribute(plain, attributes::ITEM_ID, "9");
    page.dom_mut().remove_attribute(tagged, attributes::ITEM_ID);
    page.on_mutations();
    let summary = page.run_microtask().unwrap();

    assert_eq!(summary.editable_total, 2);
    assert_eq!(summary.explicit_total, 1);
    assert!(page.dom().has_attribute(plain, attributes::EDITABLE));
    assert!(!page.dom().has_attribute(tagged, attributes::EDITABLE));
    assert!(page.dom().has_attribute(img, attributes::EDIT_URL));
}

#[test]
fn test_cleaned_text_keeps_metadata() {
    init_tracing();
    let (dom, h1, _) = sample_page();
    let mut page = Controller::new(dom, ManualScheduler::new(), ContentLinkOptions::new(BASE)).unwrap();

    let text = page.dom().children(h1)[0];
    page.dom_mut().set_text(text, "Hello");
    page.on_mutations();
    let summary = page.run_microtask().unwrap();

    assert_eq!(summary.generated_cleared, 0);
    assert_eq!(summary.editable_total, 2);
    assert!(page.dom().has_attribute(h1, attributes::EDIT_URL));

    page.dom_mut().set_text(text, "Something else");
    page.on_mutations();
    let summary = page.run_microtask().unwrap();
    assert_eq!(summary.generated_cleared, 1);
}

#[test]
fn test_clean_text_without_persistence_clears() {
    init_tracing();
    let (dom, h1, _) = sample_page();
    let options = ContentLinkOptions::new(BASE).with_persist_after_clean(false);
    let mut page = Controller::new(dom, ManualScheduler::new(), options).unwrap();

    let text = page.dom().children(h1)[0];
    page.dom_mut().set_text(text, "Hello");
    page.on_mutations();
    assert_eq!(page.run_microtask().unwrap().generated_cleared, 1);
}

#[test]
fn test_warns_once_per_lifetime() {
    init_tracing();
    let (mut page, seen) = recorded(MemoryDom::new(), ContentLinkOptions::new(BASE));
    page.disable().unwrap();
    page.enable().unwrap();

    assert_eq!(count(&seen, EventKind::Warn), 1);
    let warn = page.dom().events_named("datocms:content-link:warn").next().unwrap();
    assert_eq!(warn.detail["code"], "no-editable-elements");
}

#[test]
fn test_failing_callbacks_do_not_stop_others() {
    init_tracing();
    let (dom, _, _) = sample_page();
    let calls = Rc::new(RefCell::new(0));
    let sink = calls.clone();

    let page = Controller::builder(dom, ManualScheduler::new(), ContentLinkOptions::new(BASE))
        .on(EventKind::Marked, |_| anyhow::bail!("listener exploded"))
        .on(EventKind::Marked, |_| panic!("listener panicked"))
        .on(EventKind::Marked, move |_| {
            *sink.borrow_mut() += 1;
            Ok(())
        })
        .build()
        .unwrap();

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(page.dom().events_named("datocms:content-link:marked").count(), 1);
}

#[test]
fn test_auto_enable_off_waits() {
    init_tracing();
    let (dom, h1, _) = sample_page();
    let options = ContentLinkOptions::new(BASE).with_auto_enable(false);
    let mut page = Controller::new(dom, ManualScheduler::new(), options).unwrap();

    assert_eq!(page.state(), ControllerState::Disabled);
    assert!(!page.dom().has_attribute(h1, attributes::EDIT_URL));
    page.refresh(None).unwrap();
    assert!(page.run_microtask().is_none());

    page.enable().unwrap();
    assert!(page.dom().has_attribute(h1, attributes::EDIT_URL));
}

#[test]
fn test_invalid_options_fail_fast() {
    let result = Controller::new(
        MemoryDom::new(),
        ManualScheduler::new(),
        ContentLinkOptions::new("mailto:someone@example.com"),
    );
    assert!(matches!(result, Err(ContentLinkError::Config(_))));
}

#[test]
fn test_environment_and_debug_attributes() {
    init_tracing();
    let mut dom = MemoryDom::new();
    let body = dom.body().unwrap();
    let img = dom.append_element(body, "img");
    dom.set_attribute(
        img,
        "alt",
        &marked("A cat", json!({ "itemId": "9", "locale": "en", "fieldPath": "cover.alt" })),
    );

    let options = ContentLinkOptions::new(BASE)
        .with_environment("staging")
        .with_debug(true);
    let page = Controller::new(dom, ManualScheduler::new(), options).unwrap();
    let dom = page.dom();

    let url = "https://acme.admin.datocms.com/environments/staging/editor/items/9/edit#fieldPath=cover.alt.en";
    assert_eq!(dom.attribute(img, attributes::EDIT_URL).as_deref(), Some(url));
    assert_eq!(dom.attribute(img, attributes::ENVIRONMENT).as_deref(), Some("staging"));
    assert_eq!(dom.attribute(img, attributes::LOCALE).as_deref(), Some("en"));
    assert_eq!(dom.attribute(img, attributes::DEBUG_REASON).as_deref(), Some("stega-alt"));
    assert_eq!(dom.attribute(img, attributes::DEBUG_URL).as_deref(), Some(url));

    let info: Value =
        serde_json::from_str(&dom.attribute(img, attributes::DEBUG_INFO).unwrap()).unwrap();
    assert_eq!(info["itemId"], "9");
}

#[test]
fn test_root_limits_the_scope() {
    init_tracing();
    let mut dom = MemoryDom::new();
    let body = dom.body().unwrap();
    let main = dom.append_element(body, "main");
    let inside = dom.append_element(main, "p");
    dom.append_text(inside, &marked("In", json!({ "itemId": "1" })));
    let outside = dom.append_element(body, "p");
    dom.append_text(outside, &marked("Out", json!({ "itemId": "2" })));

    let page = Controller::new(
        dom,
        ManualScheduler::new(),
        ContentLinkOptions::new(BASE).with_root(main),
    )
    .unwrap();

    assert!(page.dom().has_attribute(inside, attributes::EDIT_URL));
    assert!(!page.dom().has_attribute(outside, attributes::EDIT_URL));
    assert_eq!(page.dom().events_named("datocms:content-link:ready").next().unwrap().target, main);
}
