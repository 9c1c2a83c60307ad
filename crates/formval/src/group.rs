//! Checkbox, radio and select groups.
//!
//! A group is a container whose member controls share one validity slot in
//! the state store. Its value is derived from the members: any checked
//! checkbox or radio, or any select with a value. Only a `required` token on
//! the container's group attribute makes a group required.

use crate::element::{ElementAccessor, ElementRef};
use crate::hidden::FormView;
use crate::state::{FieldStateStore, StateOverrides};
use formval_rules::registry::MESSAGE_KEY_PREFIX;
use formval_rules::{ElementType, RuleContext, ValidationError, parse_rules, required_message};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Kind of group, selected by the attribute on its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Checkbox,
    Radio,
    Select,
}

impl GroupKind {
    /// Discovery order.
    pub const ALL: [GroupKind; 3] = [GroupKind::Checkbox, GroupKind::Radio, GroupKind::Select];

    /// Container attribute holding the group's rule list.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Checkbox => "data-check_validate",
            Self::Radio => "data-radio_validate",
            Self::Select => "data-select_validate",
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Select => "select",
        }
    }

    fn element_type(self) -> ElementType {
        match self {
            Self::Checkbox => ElementType::Checkbox,
            Self::Radio => ElementType::Radio,
            Self::Select => ElementType::Select,
        }
    }
}

/// What caused a group to be validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTrigger {
    /// A member changed. Marks the group touched.
    User,
    /// Setup or bulk re-check. Keeps the touched flag as it is.
    Programmatic,
    /// Submit attempt. Marks the group touched so its error shows.
    Forced,
}

/// A discovered group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub kind: GroupKind,
    pub container: ElementRef,
}

/// What the presenter should do after a group was validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupDisplay {
    Show(String),
    Clear,
}

/// Find every group container.
///
/// The id is the container's name, else its id, else
/// `{checkbox|radio|select}_group_{N}` with `N` the index among containers of
/// the same kind.
pub fn discover(doc: &dyn ElementAccessor) -> Vec<Group> {
    let mut groups = Vec::new();
    for kind in GroupKind::ALL {
        for (index, container) in doc.group_containers(kind).into_iter().enumerate() {
            let id = doc
                .name(container)
                .or_else(|| doc.id(container))
                .unwrap_or_else(|| format!("{}_group_{index}", kind.type_name()));
            groups.push(Group {
                id,
                kind,
                container,
            });
        }
    }
    groups
}

fn rule_tokens(doc: &dyn ElementAccessor, container: ElementRef, kind: GroupKind) -> Vec<String> {
    doc.group_rule_list(container, kind)
        .map(|r| parse_rules(&r))
        .unwrap_or_default()
}

/// Whether the container's group attribute carries `required`.
pub fn is_required(doc: &dyn ElementAccessor, container: ElementRef, kind: GroupKind) -> bool {
    rule_tokens(doc, container, kind).iter().any(|t| t == "required")
}

/// Whether any member is checked (checkbox, radio) or has a value (select).
pub fn is_satisfied(doc: &dyn ElementAccessor, container: ElementRef, kind: GroupKind) -> bool {
    let members = doc.group_members(container, kind);
    match kind {
        GroupKind::Checkbox | GroupKind::Radio => members.into_iter().any(|m| doc.is_checked(m)),
        GroupKind::Select => members.into_iter().any(|m| !doc.raw_value(m).is_empty()),
    }
}

/// Message for a missing group selection.
///
/// Goes through the same ladder as the required rule, so `agree` tokens,
/// `emesse*` keys and the custom-message dictionary all apply.
pub fn group_message(doc: &dyn ElementAccessor, group: &Group, base: &RuleContext) -> String {
    let tokens = rule_tokens(doc, group.container, group.kind);
    let mut ctx = base.clone();
    ctx.element_type = Some(group.kind.element_type());
    ctx.field_type = doc.field_type(group.container);
    ctx.custom_message_key = tokens
        .iter()
        .find(|t| t.starts_with(MESSAGE_KEY_PREFIX))
        .cloned();
    ctx.validation_types = tokens;
    required_message(&ctx)
}

fn hidden_reset(store: &mut FieldStateStore, id: &str) -> GroupDisplay {
    store.update(
        id,
        StateOverrides::new()
            .with_valid(true)
            .with_errors(Vec::new())
            .with_touched(false),
    );
    GroupDisplay::Clear
}

/// Validate one group and write the result to the store.
///
/// A group inside a hidden area is always valid and untouched, whatever the
/// trigger. Otherwise the error is shown only if the group is touched after
/// applying the trigger.
pub fn validate_group(
    store: &mut FieldStateStore,
    view: &FormView,
    group: &Group,
    trigger: GroupTrigger,
    base: &RuleContext,
) -> GroupDisplay {
    if view.is_hidden(group.container) {
        trace!(target: "formval", group = %group.id, "group in hidden area");
        return hidden_reset(store, &group.id);
    }

    let doc = view.doc();
    let valid = !is_required(doc, group.container, group.kind)
        || is_satisfied(doc, group.container, group.kind);

    let touched = match trigger {
        GroupTrigger::User | GroupTrigger::Forced => true,
        GroupTrigger::Programmatic => store.get(&group.id).is_some_and(|s| s.is_touched),
    };

    let message = (!valid).then(|| group_message(doc, group, base));
    let errors = message
        .iter()
        .map(|m| ValidationError::new("required", m.clone()))
        .collect();

    store.update(
        &group.id,
        StateOverrides::new()
            .with_valid(valid)
            .with_errors(errors)
            .with_touched(touched),
    );
    trace!(target: "formval", group = %group.id, valid, touched, ?trigger, "group validated");

    match message {
        Some(m) if touched => GroupDisplay::Show(m),
        _ => GroupDisplay::Clear,
    }
}
