use super::*;
use crate::element::{MemoryDocument, RULE_ATTRIBUTE, field_id};
use crate::hidden::FormView;
use std::sync::Arc;

const HIDDEN: &str = "data-validate-hidden";

struct Form {
    doc: MemoryDocument,
    view: FormView,
    section: ElementRef,
    name: ElementRef,
    company: ElementRef,
    memo: ElementRef,
}

/// `name` (required, top level), `company` (required, inside `section`),
/// `memo` (optional).
fn form() -> Form {
    let doc = MemoryDocument::new();
    let root = doc.root();
    let name = doc.input(root, "text", "name").flag("required").build();
    let section = doc.append(root, "div").build();
    let company = doc
        .input(section, "text", "company")
        .attr(RULE_ATTRIBUTE, "required")
        .build();
    let memo = doc.append(root, "textarea").attr("name", "memo").build();
    let view = FormView::with_default_marker(Arc::new(doc.clone()));
    Form {
        doc,
        view,
        section,
        name,
        company,
        memo,
    }
}

fn store_for(f: &Form) -> FieldStateStore {
    let mut store = FieldStateStore::new();
    for el in f.view.doc().fields() {
        let id = field_id(f.view.doc(), el).unwrap();
        store.initialize(&id, el, None, &f.view);
    }
    store
}

#[test]
fn initial_validity_follows_required_and_value() {
    let f = form();
    f.doc.set_value(f.company, "ACME");
    let store = store_for(&f);

    assert!(!store.get("name").unwrap().is_valid);
    assert!(store.get("company").unwrap().is_valid);
    assert_eq!(store.get("company").unwrap().value, "ACME");
    assert!(store.get("memo").unwrap().is_valid);
    assert_eq!(store.required_field_ids(&f.view), ["company", "name"]);
    assert_eq!(store.valid_required_count(&f.view), 1);
    assert_eq!(store.total_required_count(&f.view), 2);
}

#[test]
fn overrides_apply_last() {
    let f = form();
    let mut store = FieldStateStore::new();
    store.initialize(
        "name",
        f.name,
        Some(StateOverrides::new().with_valid(true).with_touched(true)),
        &f.view,
    );
    let state = store.get("name").unwrap();
    assert!(state.is_valid);
    assert!(state.is_touched);

    store.initialize("name", f.name, None, &f.view);
    assert!(!store.get("name").unwrap().is_touched);
}

#[test]
fn hidden_field_is_valid_and_not_required() {
    let f = form();
    f.doc.set_attribute(f.section, HIDDEN, "");
    let mut store = store_for(&f);

    assert!(store.get("company").unwrap().is_valid);
    assert_eq!(store.required_field_ids(&f.view), ["name"]);

    // Even an explicit invalid write does not veto the aggregate.
    store.update("name", StateOverrides::new().with_valid(true));
    store.update("company", StateOverrides::new().with_valid(false));
    assert!(store.is_valid(&f.view));
    assert_eq!(store.valid_required_count(&f.view), 1);
    assert_eq!(store.total_required_count(&f.view), 1);
}

#[test]
fn update_merges_and_ignores_unknown_ids() {
    let f = form();
    let mut store = store_for(&f);
    assert!(store.update(
        "memo",
        StateOverrides::new().with_value("hello").with_dirty(true)
    ));
    assert!(!store.update("gone", StateOverrides::new().with_valid(false)));
    assert!(!store.contains("gone"));

    let memo = store.get("memo").unwrap();
    assert_eq!(memo.value, "hello");
    assert!(memo.is_dirty);
    assert!(memo.is_valid);
}

#[test]
fn dirty_is_sticky_until_reset() {
    let f = form();
    let mut store = store_for(&f);
    assert!(!store.is_dirty());

    store.update("memo", StateOverrides::new().with_dirty(true));
    store.update("memo", StateOverrides::new().with_dirty(false));
    assert!(store.is_dirty());

    // A hidden field still counts as dirty.
    f.doc.set_attribute(f.memo, HIDDEN, "");
    assert!(store.is_dirty());

    store.reset();
    assert!(!store.is_dirty());
}

#[test]
fn get_all_returns_copies() {
    let f = form();
    let store = store_for(&f);
    let mut all = store.get_all();
    all.get_mut("name").unwrap().is_valid = true;
    assert!(!store.get("name").unwrap().is_valid);
    assert_eq!(all.len(), 3);
}

#[test]
fn reset_forces_valid_without_recomputing() {
    let f = form();
    let mut store = store_for(&f);
    store.update(
        "name",
        StateOverrides::new()
            .with_value("x")
            .with_errors(vec![ValidationError::new("required", "missing")])
            .with_touched(true),
    );
    store.reset();

    let name = store.get("name").unwrap();
    assert_eq!(*name, FieldState::default());
    assert_eq!(
        store.valid_required_count(&f.view),
        store.total_required_count(&f.view)
    );
}

#[test]
fn readiness_counts_are_stable() {
    let f = form();
    let store = store_for(&f);
    let first = (
        store.valid_required_count(&f.view),
        store.total_required_count(&f.view),
    );
    let second = (
        store.valid_required_count(&f.view),
        store.total_required_count(&f.view),
    );
    assert_eq!(first, second);
}

#[test]
fn remove_and_clear() {
    let f = form();
    let mut store = store_for(&f);
    assert_eq!(store.len(), 3);
    assert!(store.remove("memo").is_some());
    assert!(store.remove("memo").is_none());
    assert_eq!(store.ids().collect::<Vec<_>>(), ["company", "name"]);
    store.clear();
    assert!(store.is_empty());
}

#[test]
fn groups_always_count_as_required() {
    let doc = MemoryDocument::new();
    let container = doc
        .append(doc.root(), "div")
        .attr("data-check_validate", "")
        .build();
    doc.input(container, "checkbox", "topic").build();
    let view = FormView::with_default_marker(Arc::new(doc.clone()));

    let mut store = FieldStateStore::new();
    store.initialize("checkbox_group_0", container, None, &view);
    assert!(store.required_field_ids(&view).is_empty());

    assert!(store.mark_group("checkbox_group_0", GroupKind::Checkbox));
    assert!(store.is_group("checkbox_group_0"));
    assert!(!store.mark_group("nope", GroupKind::Radio));
    assert_eq!(store.required_field_ids(&view), ["checkbox_group_0"]);
    assert_eq!(store.valid_required_count(&view), 1);
}

#[test]
fn reevaluate_when_section_is_hidden() {
    let f = form();
    let mut store = store_for(&f);
    store.update(
        "company",
        StateOverrides::new()
            .with_valid(false)
            .with_errors(vec![ValidationError::new("required", "missing")])
            .with_touched(true),
    );

    f.doc.set_attribute(f.section, HIDDEN, "");
    assert!(store.reevaluate_required_state("company", &f.view));
    let company = store.get("company").unwrap();
    assert!(company.is_valid);
    assert!(company.errors.is_empty());
    assert!(!company.is_touched);
    assert!(!store.reevaluate_required_state("gone", &f.view));
}

#[test]
fn reevaluate_when_section_is_revealed() {
    let f = form();
    f.doc.set_attribute(f.section, HIDDEN, "");
    let mut store = store_for(&f);
    store.update("company", StateOverrides::new().with_touched(true));

    f.doc.remove_attribute(f.section, HIDDEN);
    store.reevaluate_all_required_state(&f.view);
    let company = store.get("company").unwrap();
    assert!(!company.is_valid);
    assert!(!company.is_touched);
    assert!(company.errors.is_empty());
    assert_eq!(store.total_required_count(&f.view), 2);
}

#[test]
fn reevaluate_keeps_non_required_errors() {
    let f = form();
    f.doc.set_value(f.name, "Taro");
    let mut store = store_for(&f);
    store.update(
        "name",
        StateOverrides::new()
            .with_valid(false)
            .with_errors(vec![ValidationError::new("hiragana", "ひらがなで")]),
    );
    store.reevaluate_required_state("name", &f.view);
    assert!(!store.get("name").unwrap().is_valid);

    store.update(
        "name",
        StateOverrides::new().with_errors(vec![ValidationError::new("required", "missing")]),
    );
    store.reevaluate_required_state("name", &f.view);
    let name = store.get("name").unwrap();
    assert!(name.is_valid);
    assert!(name.errors.is_empty());
}
