//! Hidden-area membership.
//!
//! A field inside a hidden area is always valid and never counted as
//! required. Membership is never stored; it is asked again every time.

use crate::config::DEFAULT_HIDDEN_MARKER;
use crate::element::{ElementAccessor, ElementRef};
use std::fmt;
use std::sync::Arc;

/// Decides whether an element is currently excluded from validation.
pub trait HiddenArea: Send + Sync {
    fn is_hidden(&self, doc: &dyn ElementAccessor, el: ElementRef) -> bool;
}

impl<F> HiddenArea for F
where
    F: Fn(&dyn ElementAccessor, ElementRef) -> bool + Send + Sync,
{
    fn is_hidden(&self, doc: &dyn ElementAccessor, el: ElementRef) -> bool {
        self(doc, el)
    }
}

/// Default predicate: the element or any ancestor carries `marker`.
#[derive(Debug, Clone)]
pub struct MarkerWalk {
    pub marker: String,
}

impl Default for MarkerWalk {
    fn default() -> Self {
        Self::new(DEFAULT_HIDDEN_MARKER)
    }
}

impl MarkerWalk {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl HiddenArea for MarkerWalk {
    fn is_hidden(&self, doc: &dyn ElementAccessor, el: ElementRef) -> bool {
        let mut current = Some(el);
        while let Some(node) = current {
            if doc.has_attribute(node, &self.marker) {
                return true;
            }
            current = doc.parent(node);
        }
        false
    }
}

/// The document together with the hidden-area predicate in force.
#[derive(Clone)]
pub struct FormView {
    doc: Arc<dyn ElementAccessor>,
    hidden: Arc<dyn HiddenArea>,
}

impl fmt::Debug for FormView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormView").finish_non_exhaustive()
    }
}

impl FormView {
    pub fn new(doc: Arc<dyn ElementAccessor>, hidden: Arc<dyn HiddenArea>) -> Self {
        Self { doc, hidden }
    }

    /// A view using [`MarkerWalk`] with the default marker.
    pub fn with_default_marker(doc: Arc<dyn ElementAccessor>) -> Self {
        Self::new(doc, Arc::new(MarkerWalk::default()))
    }

    pub fn doc(&self) -> &dyn ElementAccessor {
        self.doc.as_ref()
    }

    pub fn shared_doc(&self) -> Arc<dyn ElementAccessor> {
        Arc::clone(&self.doc)
    }

    pub fn is_hidden(&self, el: ElementRef) -> bool {
        self.hidden.is_hidden(self.doc.as_ref(), el)
    }

    /// Hidden-area membership of the element tracked under `id`.
    ///
    /// Ids that no longer resolve are not hidden.
    pub fn is_hidden_id(&self, id: &str) -> bool {
        self.doc.resolve(id).is_some_and(|el| self.is_hidden(el))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryDocument;

    #[test]
    fn marker_on_self_or_any_ancestor() {
        let doc = MemoryDocument::new();
        let section = doc.append(doc.root(), "div").build();
        let inner = doc.append(section, "div").build();
        let field = doc.input(inner, "text", "company").build();
        let own = doc.input(doc.root(), "text", "own").flag("data-validate-hidden").build();
        let view = FormView::with_default_marker(Arc::new(doc.clone()));

        assert!(!view.is_hidden(field));
        assert!(view.is_hidden(own));

        doc.set_attribute(section, "data-validate-hidden", "");
        assert!(view.is_hidden(field));
        assert!(view.is_hidden_id("company"));

        doc.remove_attribute(section, "data-validate-hidden");
        assert!(!view.is_hidden_id("company"));
        assert!(!view.is_hidden_id("missing"));
    }

    #[test]
    fn custom_marker_and_closure_predicates() {
        let doc = MemoryDocument::new();
        let field = doc.input(doc.root(), "text", "x").flag("hidden").build();
        let shared: Arc<dyn ElementAccessor> = Arc::new(doc);

        let walk = FormView::new(Arc::clone(&shared), Arc::new(MarkerWalk::new("hidden")));
        assert!(walk.is_hidden(field));

        let never = FormView::new(shared, Arc::new(|_: &dyn ElementAccessor, _: ElementRef| false));
        assert!(!never.is_hidden(field));
    }
}
