//! Repeating forms: item state follows its item through removal and insertion.

use formstate::{converters, DocCell, Field, Form, FormError, FormState, RepeatingForm, SubForm};
use serde_json::{json, Value};
use std::sync::Arc;

fn items_state(items: Value) -> (Arc<DocCell>, FormState) {
    let item = Form::new()
        .field("a", Field::new(converters::number()))
        .field("label", Field::new(converters::string()).required());
    let doc = Arc::new(DocCell::new(json!({ "items": items })));
    let state = Form::new()
        .repeating_form("items", RepeatingForm::new(item))
        .state(doc.clone())
        .unwrap();
    (doc, state)
}

fn three_items() -> Value {
    json!([
        {"a": 0, "label": "zero"},
        {"a": 1, "label": "one"},
        {"a": 2, "label": "two"}
    ])
}

#[tokio::test]
async fn test_remove_renumbers_item_state() {
    let (doc, state) = items_state(three_items());
    let items = state.repeating_form("items").unwrap();

    items.index(0).field("a").unwrap().set_raw("zero?").await.unwrap();
    items.index(1).field("a").unwrap().set_raw("x").await.unwrap();
    items.index(2).field("a").unwrap().set_raw("not a number").await.unwrap();
    assert_eq!(items.len(), 3);

    let removed = items.remove(1).unwrap();
    assert_eq!(removed, json!({"a": 1, "label": "one"}));
    assert_eq!(items.len(), 2);

    let first = items.index(0).field("a").unwrap();
    assert_eq!(first.raw(), json!("zero?"));
    assert!(first.is_dirty());

    // the former third item now answers at index 1
    let second = items.index(1).field("a").unwrap();
    assert_eq!(second.raw(), json!("not a number"));
    assert_eq!(second.error().as_deref(), Some("Could not convert"));
    assert!(second.is_dirty());
    assert_eq!(doc.snapshot()["items"][1], json!({"a": 2, "label": "two"}));

    // nothing is left behind at the old index
    let gone = items.index(2).field("a").unwrap();
    assert_eq!(gone.error(), None);
    assert!(!gone.is_dirty());
}

#[tokio::test]
async fn test_remove_makes_form_valid_again() {
    let (_, state) = items_state(three_items());
    let items = state.repeating_form("items").unwrap();

    items.index(1).field("label").unwrap().set_raw("").await.unwrap();
    assert!(!items.is_valid());
    assert!(!state.is_valid());

    items.remove(1).unwrap();
    assert!(items.is_valid());
    assert!(state.is_valid());
}

#[tokio::test]
async fn test_insert_shifts_item_state_up() {
    let (doc, state) = items_state(three_items());
    let items = state.repeating_form("items").unwrap();

    items.index(1).field("a").unwrap().set_raw("bad").await.unwrap();
    items.insert(0, json!({"a": 9, "label": "new"})).unwrap();

    assert_eq!(items.len(), 4);
    assert_eq!(doc.snapshot()["items"][0]["label"], json!("new"));
    assert_eq!(items.index(1).field("a").unwrap().error(), None);
    let moved = items.index(2).field("a").unwrap();
    assert_eq!(moved.raw(), json!("bad"));
    assert!(!moved.is_valid());
}

#[tokio::test]
async fn test_push_creates_missing_array() {
    let doc = Arc::new(DocCell::default());
    let item = Form::new().field("a", Field::new(converters::number()));
    let state = Form::new()
        .repeating_form("items", RepeatingForm::new(item))
        .state(doc.clone())
        .unwrap();
    let items = state.repeating_form("items").unwrap();
    assert!(items.is_empty());
    assert!(items.is_valid());

    items.push(json!({"a": 1})).unwrap();
    items.push(json!({"a": 2})).unwrap();
    assert_eq!(doc.snapshot(), json!({"items": [{"a": 1}, {"a": 2}]}));

    items.index(1).field("a").unwrap().set_raw("2.5").await.unwrap();
    assert_eq!(doc.snapshot()["items"][1]["a"], json!(2.5));
}

#[test]
fn test_remove_out_of_range() {
    let (_, state) = items_state(json!([]));
    let items = state.repeating_form("items").unwrap();
    assert!(matches!(items.remove(0), Err(FormError::IndexOutOfBounds { .. })));
}

#[test]
fn test_insert_past_end_of_missing_array() {
    let doc = Arc::new(DocCell::new(json!({"other": 1})));
    let item = Form::new().field("a", Field::new(converters::number()));
    let state = Form::new()
        .repeating_form("items", RepeatingForm::new(item))
        .state(doc.clone())
        .unwrap();
    let items = state.repeating_form("items").unwrap();

    assert!(matches!(
        items.insert(3, json!({"a": 1})),
        Err(FormError::IndexOutOfBounds { index: 3, len: 0, .. })
    ));
    assert_eq!(doc.snapshot(), json!({"other": 1}));

    items.insert(0, json!({"a": 1})).unwrap();
    assert_eq!(doc.snapshot(), json!({"other": 1, "items": [{"a": 1}]}));
}

#[tokio::test]
async fn test_nested_repeating_forms() {
    let line = Form::new().field("qty", Field::new(converters::integer()));
    let order = Form::new()
        .field("ref", Field::new(converters::string()))
        .repeating_form("lines", RepeatingForm::new(line));
    let doc = Arc::new(DocCell::new(json!({
        "orders": [
            {"ref": "A", "lines": [{"qty": 1}, {"qty": 2}]},
            {"ref": "B", "lines": [{"qty": 3}]}
        ]
    })));
    let state = Form::new()
        .repeating_form("orders", RepeatingForm::new(order))
        .state(doc.clone())
        .unwrap();
    let orders = state.repeating_form("orders").unwrap();
    let lines_a = orders.index(0).repeating_form("lines").unwrap();
    let lines_b = orders.index(1).repeating_form("lines").unwrap();

    lines_a.index(1).field("qty").unwrap().set_raw("two").await.unwrap();
    lines_b.index(0).field("qty").unwrap().set_raw("three").await.unwrap();

    lines_a.remove(0).unwrap();
    assert_eq!(lines_a.index(0).field("qty").unwrap().raw(), json!("two"));
    // the other order's lines are untouched
    assert_eq!(lines_b.index(0).field("qty").unwrap().raw(), json!("three"));
    assert!(!lines_b.is_valid());
    assert_eq!(doc.snapshot()["orders"][0]["lines"], json!([{"qty": 2}]));
}

#[tokio::test]
async fn test_sub_form_inside_item_follows_renumbering() {
    let address = Form::new().field("city", Field::new(converters::string()).required());
    let person = Form::new().sub_form("address", SubForm::new(address));
    let doc = Arc::new(DocCell::new(json!({
        "people": [{"address": {"city": "Ghent"}}, {"address": {"city": "Delft"}}]
    })));
    let state = Form::new()
        .repeating_form("people", RepeatingForm::new(person))
        .state(doc)
        .unwrap();
    let people = state.repeating_form("people").unwrap();

    let city = people.index(1).sub_form("address").unwrap().field("city").unwrap();
    city.set_raw("").await.unwrap();
    assert_eq!(city.error().as_deref(), Some("Required"));

    people.remove(0).unwrap();
    let city = state.field_at(&"/people/0/address/city".parse().unwrap()).unwrap();
    assert_eq!(city.error().as_deref(), Some("Required"));
    assert!(state.is_dirty());
}
