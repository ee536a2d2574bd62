//! Integration tests for the page: markup, queries, events and observers together.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;
use selleckt_dom::{select, Document, EventKind, EventTarget, Key, Page, Rect};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("selleckt_dom=trace")
        .with_test_writer()
        .try_init();
}

const FORM: &str = r#"
<form>
  <div class="wrapper" style="overflow-y: auto">
    <select name="fruit">
      <option value="a" data-colour="red">Apple</option>
      <option value="b" selected>Banana</option>
    </select>
  </div>
</form>
"#;

#[test]
fn test_select_value_follows_document_edits() {
    setup();
    let page = Page::from_html(FORM).unwrap();
    let select_node = {
        let doc = page.document();
        doc.query_selector(doc.body(), "select[name=fruit]")
            .unwrap()
            .unwrap()
    };

    assert_eq!(
        select::value(&page.document(), select_node).as_deref(),
        Some("b")
    );

    {
        let mut doc = page.document_mut();
        let option = doc.create_element_with_attrs("option", &[("value", "c")]);
        doc.set_text_content(option, "Cherry").unwrap();
        doc.append_child(select_node, option).unwrap();
        select::set_value(&mut doc, select_node, "c").unwrap();
    }

    let doc = page.document();
    assert_eq!(select::value(&doc, select_node).as_deref(), Some("c"));
    assert_eq!(select::options(&doc, select_node).len(), 3);
}

#[test]
fn test_change_listener_sees_origin() {
    setup();
    let page = Page::from_html(FORM).unwrap();
    let select_node = {
        let doc = page.document();
        doc.query_selector(doc.body(), "select").unwrap().unwrap()
    };

    let origins = Rc::new(RefCell::new(Vec::new()));
    let seen = origins.clone();
    page.on(select_node, EventKind::Change, Some("test"), move |_, event| {
        seen.borrow_mut().push(event.origin.clone());
    });

    page.change(select_node, None);
    page.change(select_node, Some("widget"));
    assert_eq!(
        *origins.borrow(),
        vec![None, Some("widget".to_string())]
    );
}

#[test]
fn test_keyboard_events_carry_keys() {
    let page = Page::from_html("<input class=search>").unwrap();
    let input = {
        let doc = page.document();
        doc.query_selector(doc.body(), ".search").unwrap().unwrap()
    };

    let keys = Rc::new(RefCell::new(Vec::new()));
    let seen = keys.clone();
    page.on(EventTarget::Document, EventKind::KeyUp, None, move |_, event| {
        seen.borrow_mut().push(event.key.clone());
    });

    page.key_down(input, Key::ArrowDown);
    page.key_up(input, Key::Escape);
    assert_eq!(*keys.borrow(), vec![Some(Key::Escape)]);
}

#[test]
fn test_observer_sees_removals() {
    setup();
    let page = Page::from_html(FORM).unwrap();
    let select_node = {
        let doc = page.document();
        doc.query_selector(doc.body(), "select").unwrap().unwrap()
    };
    let removed = Rc::new(RefCell::new(0usize));
    let count = removed.clone();
    page.observe(select_node, move |_, records| {
        *count.borrow_mut() += records.iter().map(|r| r.removed.len()).sum::<usize>();
    });

    {
        let mut doc = page.document_mut();
        let first = select::options(&doc, select_node)[0];
        doc.remove(first).unwrap();
    }
    page.advance(Duration::ZERO);
    assert_eq!(*removed.borrow(), 1);
}

#[test]
fn test_closest_and_computed_styles() {
    let mut doc = Document::from_html(FORM).unwrap();
    let select_node = doc.query_selector(doc.body(), "select").unwrap().unwrap();
    let wrapper = doc.closest(select_node, ".wrapper").unwrap().unwrap();

    assert_eq!(doc.overflow_y(wrapper), "auto");
    assert_eq!(doc.display(select_node), "inline-block");

    doc.set_style(select_node, "display", "none").unwrap();
    assert!(!doc.is_displayed(select_node));

    doc.set_rect(wrapper, Rect::new(0.0, 10.0, 200.0, 40.0)).unwrap();
    assert_eq!(doc.rect(wrapper).bottom(), 50.0);
}

proptest! {
    #[test]
    fn test_text_survives_markup_roundtrip(text in "[a-zA-Z0-9 <>&\"']{0,40}") {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.append_child(doc.body(), p).unwrap();
        doc.set_text_content(p, &text).unwrap();

        let markup = doc.outer_html(p);
        let reparsed = Document::from_html(&markup).unwrap();
        let p2 = reparsed.query_selector(reparsed.body(), "p").unwrap().unwrap();
        prop_assert_eq!(reparsed.text_content(p2), text);
    }
}
