//! Access to the live form elements.
//!
//! The session never touches a document directly. Everything it needs from
//! an element (its value, its rule list, its required marker, its parent) goes
//! through [`ElementAccessor`], so a browser binding, a server-side form model
//! or the in-memory [`MemoryDocument`] can all sit behind it.

use crate::group::GroupKind;
use formval_rules::{ElementType, FieldType, parse_rules};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Attribute holding a field's comma-separated rule list.
pub const RULE_ATTRIBUTE: &str = "data-validate";

/// Attribute holding a field's semantic type (see [`FieldType`]).
pub const FIELD_TYPE_ATTRIBUTE: &str = "data-field-type";

/// Opaque handle to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(pub u64);

/// Read access to the form's elements.
pub trait ElementAccessor: Send + Sync {
    /// First element whose `name`, or failing that `id`, equals `id`.
    fn resolve(&self, id: &str) -> Option<ElementRef>;

    /// Every input, select and textarea, in document order.
    fn fields(&self) -> Vec<ElementRef>;

    /// Elements carrying the group attribute of `kind`, in document order.
    fn group_containers(&self, kind: GroupKind) -> Vec<ElementRef>;

    /// Member controls of a group container.
    fn group_members(&self, container: ElementRef, kind: GroupKind) -> Vec<ElementRef>;

    fn kind(&self, el: ElementRef) -> ElementType;

    fn raw_value(&self, el: ElementRef) -> String;

    fn is_checked(&self, el: ElementRef) -> bool;

    fn attribute(&self, el: ElementRef, name: &str) -> Option<String>;

    fn parent(&self, el: ElementRef) -> Option<ElementRef>;

    fn has_attribute(&self, el: ElementRef, name: &str) -> bool {
        self.attribute(el, name).is_some()
    }

    fn name(&self, el: ElementRef) -> Option<String> {
        self.attribute(el, "name").filter(|v| !v.is_empty())
    }

    fn id(&self, el: ElementRef) -> Option<String> {
        self.attribute(el, "id").filter(|v| !v.is_empty())
    }

    fn rule_list(&self, el: ElementRef) -> Option<String> {
        self.attribute(el, RULE_ATTRIBUTE)
    }

    fn group_rule_list(&self, el: ElementRef, kind: GroupKind) -> Option<String> {
        self.attribute(el, kind.attribute())
    }

    fn has_required_marker(&self, el: ElementRef) -> bool {
        self.has_attribute(el, "required")
    }

    fn field_type(&self, el: ElementRef) -> Option<FieldType> {
        self.attribute(el, FIELD_TYPE_ATTRIBUTE)?.parse().ok()
    }
}

/// Identifier a field is tracked under: its name, else its id.
pub fn field_id(doc: &dyn ElementAccessor, el: ElementRef) -> Option<String> {
    doc.name(el).or_else(|| doc.id(el))
}

/// Value handed to the rule chain.
///
/// A checkbox yields `true` when checked and `null` otherwise, a radio its
/// value when checked and `""` otherwise, anything else its text.
pub fn element_value(doc: &dyn ElementAccessor, el: ElementRef) -> Value {
    match doc.kind(el) {
        ElementType::Checkbox if doc.is_checked(el) => Value::Bool(true),
        ElementType::Checkbox => Value::Null,
        ElementType::Radio if doc.is_checked(el) => Value::String(doc.raw_value(el)),
        ElementType::Radio => Value::String(String::new()),
        _ => Value::String(doc.raw_value(el)),
    }
}

/// Rule tokens for a field: its rule attribute, then `email` / `tel` /
/// `password` implied by the input type, then `required` from the marker.
pub fn rules_for(doc: &dyn ElementAccessor, el: ElementRef) -> Vec<String> {
    let mut rules = doc.rule_list(el).map(|r| parse_rules(&r)).unwrap_or_default();
    let mut push = |token: &str| {
        if !rules.iter().any(|r| r == token) {
            rules.push(token.to_string());
        }
    };
    match doc.kind(el) {
        ElementType::Email => push("email"),
        ElementType::Tel => push("tel"),
        ElementType::Password => push("password"),
        _ => {}
    }
    if doc.has_required_marker(el) {
        push("required");
    }
    rules
}

/// Whether `el` is required by its own markup: the required attribute or a
/// `required` token in its rule list.
pub fn declares_required(doc: &dyn ElementAccessor, el: ElementRef) -> bool {
    doc.has_required_marker(el)
        || doc
            .rule_list(el)
            .is_some_and(|r| parse_rules(&r).iter().any(|t| t == "required"))
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    value: String,
    checked: bool,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn node(&self, el: ElementRef) -> Option<&Node> {
        usize::try_from(el.0).ok().and_then(|i| self.nodes.get(i))
    }

    fn node_mut(&mut self, el: ElementRef) -> Option<&mut Node> {
        usize::try_from(el.0).ok().and_then(|i| self.nodes.get_mut(i))
    }

    /// Descendants of `from` (excluding it) in document order.
    fn descendants(&self, from: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[from].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.nodes[i].children.iter().rev().copied());
        }
        out
    }

    fn kind_of(node: &Node) -> ElementType {
        if node.tag == "input" {
            ElementType::from_html(node.attrs.get("type").map_or("text", String::as_str))
        } else {
            ElementType::from_html(&node.tag)
        }
    }
}

fn to_ref(index: usize) -> ElementRef {
    ElementRef(index as u64)
}

/// In-memory element tree.
///
/// Cloning yields another handle to the same tree, so a test can keep one
/// handle to flip values and markers while the session reads through another.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    tree: Arc<RwLock<Tree>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// A document containing only the root `<form>`.
    pub fn new() -> Self {
        let root = Node {
            tag: "form".to_string(),
            attrs: BTreeMap::new(),
            value: String::new(),
            checked: false,
            parent: None,
            children: Vec::new(),
        };
        Self {
            tree: Arc::new(RwLock::new(Tree { nodes: vec![root] })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn root(&self) -> ElementRef {
        ElementRef(0)
    }

    /// Append a `tag` element under `parent`.
    ///
    /// An unknown `parent` attaches to the root.
    pub fn append(&self, parent: ElementRef, tag: &str) -> ElementBuilder<'_> {
        let mut tree = self.write();
        let parent_index = usize::try_from(parent.0)
            .ok()
            .filter(|i| *i < tree.nodes.len())
            .unwrap_or(0);
        let index = tree.nodes.len();
        tree.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            value: String::new(),
            checked: false,
            parent: Some(parent_index),
            children: Vec::new(),
        });
        tree.nodes[parent_index].children.push(index);
        ElementBuilder {
            doc: self,
            el: to_ref(index),
        }
    }

    /// Append `<input type=input_type name=name>` under `parent`.
    pub fn input(&self, parent: ElementRef, input_type: &str, name: &str) -> ElementBuilder<'_> {
        self.append(parent, "input")
            .attr("type", input_type)
            .attr("name", name)
    }

    pub fn set_value(&self, el: ElementRef, value: impl Into<String>) {
        if let Some(node) = self.write().node_mut(el) {
            node.value = value.into();
        }
    }

    /// Set the checked state. Checking a radio unchecks the other radios
    /// sharing its name.
    pub fn set_checked(&self, el: ElementRef, checked: bool) {
        let mut tree = self.write();
        let Some(node) = tree.node(el) else {
            return;
        };
        let radio_name = (checked && Tree::kind_of(node) == ElementType::Radio)
            .then(|| node.attrs.get("name").cloned())
            .flatten();
        if let Some(name) = radio_name {
            for other in tree.nodes.iter_mut() {
                if other.tag == "input"
                    && Tree::kind_of(other) == ElementType::Radio
                    && other.attrs.get("name") == Some(&name)
                {
                    other.checked = false;
                }
            }
        }
        if let Some(node) = tree.node_mut(el) {
            node.checked = checked;
        }
    }

    pub fn set_attribute(&self, el: ElementRef, name: &str, value: impl Into<String>) {
        if let Some(node) = self.write().node_mut(el) {
            node.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attribute(&self, el: ElementRef, name: &str) {
        if let Some(node) = self.write().node_mut(el) {
            node.attrs.remove(name);
        }
    }

    /// Detach `el` (and its subtree) from its parent.
    pub fn detach(&self, el: ElementRef) {
        let mut tree = self.write();
        let Some(index) = usize::try_from(el.0).ok().filter(|i| *i > 0 && *i < tree.nodes.len())
        else {
            return;
        };
        if let Some(parent) = tree.nodes[index].parent.take() {
            tree.nodes[parent].children.retain(|c| *c != index);
        }
    }

    /// Whether `el` is reachable from the root.
    fn attached(tree: &Tree, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if i == 0 {
                return true;
            }
            current = tree.nodes[i].parent;
        }
        false
    }
}

/// Returned by [`MemoryDocument::append`] to set up the new element.
pub struct ElementBuilder<'a> {
    doc: &'a MemoryDocument,
    el: ElementRef,
}

impl ElementBuilder<'_> {
    pub fn attr(self, name: &str, value: impl Into<String>) -> Self {
        self.doc.set_attribute(self.el, name, value);
        self
    }

    /// Set a boolean attribute such as `required`.
    pub fn flag(self, name: &str) -> Self {
        self.attr(name, "")
    }

    pub fn value(self, value: impl Into<String>) -> Self {
        self.doc.set_value(self.el, value);
        self
    }

    pub fn checked(self, checked: bool) -> Self {
        self.doc.set_checked(self.el, checked);
        self
    }

    pub fn build(self) -> ElementRef {
        self.el
    }
}

impl ElementAccessor for MemoryDocument {
    fn resolve(&self, id: &str) -> Option<ElementRef> {
        let tree = self.read();
        let order = tree.descendants(0);
        let find_by = |key: &str| {
            order
                .iter()
                .copied()
                .find(|i| tree.nodes[*i].attrs.get(key).is_some_and(|v| v == id))
        };
        find_by("name").or_else(|| find_by("id")).map(to_ref)
    }

    fn fields(&self) -> Vec<ElementRef> {
        let tree = self.read();
        tree.descendants(0)
            .into_iter()
            .filter(|i| matches!(tree.nodes[*i].tag.as_str(), "input" | "select" | "textarea"))
            .map(to_ref)
            .collect()
    }

    fn group_containers(&self, kind: GroupKind) -> Vec<ElementRef> {
        let tree = self.read();
        tree.descendants(0)
            .into_iter()
            .filter(|i| tree.nodes[*i].attrs.contains_key(kind.attribute()))
            .map(to_ref)
            .collect()
    }

    fn group_members(&self, container: ElementRef, kind: GroupKind) -> Vec<ElementRef> {
        let tree = self.read();
        let Some(index) = usize::try_from(container.0)
            .ok()
            .filter(|i| *i < tree.nodes.len() && Self::attached(&tree, *i))
        else {
            return Vec::new();
        };
        tree.descendants(index)
            .into_iter()
            .filter(|i| {
                let node = &tree.nodes[*i];
                match kind {
                    GroupKind::Select => node.tag == "select",
                    GroupKind::Checkbox => {
                        node.tag == "input" && Tree::kind_of(node) == ElementType::Checkbox
                    }
                    GroupKind::Radio => {
                        node.tag == "input" && Tree::kind_of(node) == ElementType::Radio
                    }
                }
            })
            .map(to_ref)
            .collect()
    }

    fn kind(&self, el: ElementRef) -> ElementType {
        self.read().node(el).map_or(ElementType::Other, Tree::kind_of)
    }

    fn raw_value(&self, el: ElementRef) -> String {
        self.read().node(el).map(|n| n.value.clone()).unwrap_or_default()
    }

    fn is_checked(&self, el: ElementRef) -> bool {
        self.read().node(el).is_some_and(|n| n.checked)
    }

    fn attribute(&self, el: ElementRef, name: &str) -> Option<String> {
        self.read().node(el)?.attrs.get(name).cloned()
    }

    fn parent(&self, el: ElementRef) -> Option<ElementRef> {
        self.read().node(el)?.parent.map(to_ref)
    }
}
