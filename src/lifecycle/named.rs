//! Ordered, optionally named component storage.

use crate::lifecycle::Component;

/// A component tagged with a name.
pub struct NamedComponent {
    pub name: String,
    pub component: Box<dyn Component>,
}

impl NamedComponent {
    pub fn new(name: impl Into<String>, component: Box<dyn Component>) -> Self {
        Self {
            name: name.into(),
            component,
        }
    }
}

impl std::fmt::Debug for NamedComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedComponent")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An ordered list of zero or more components tagged with optional names.
///
/// Insertion order is start order. Components without a name get
/// `__anonymous<len>` where `len` is the list length at insertion time;
/// names are never renumbered, so a front insertion can produce a
/// duplicate anonymous name. Lookup returns the first match.
#[derive(Debug, Default)]
pub struct NamedComponentList {
    list: Vec<NamedComponent>,
}

impl NamedComponentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn push_back<C: Component + 'static>(&mut self, component: C) {
        self.push_back_boxed(None, Box::new(component));
    }

    pub fn push_back_named<C: Component + 'static>(&mut self, name: impl Into<String>, component: C) {
        self.push_back_boxed(Some(name.into()), Box::new(component));
    }

    pub fn push_back_boxed(&mut self, name: Option<String>, component: Box<dyn Component>) {
        let name = name.unwrap_or_else(|| self.anonymous_name());
        self.list.push(NamedComponent::new(name, component));
    }

    pub fn push_front<C: Component + 'static>(&mut self, component: C) {
        self.push_front_boxed(None, Box::new(component));
    }

    pub fn push_front_named<C: Component + 'static>(&mut self, name: impl Into<String>, component: C) {
        self.push_front_boxed(Some(name.into()), Box::new(component));
    }

    pub fn push_front_boxed(&mut self, name: Option<String>, component: Box<dyn Component>) {
        let name = name.unwrap_or_else(|| self.anonymous_name());
        self.list.insert(0, NamedComponent::new(name, component));
    }

    /// First component whose name equals `name`, in insertion order.
    pub fn find_component(&self, name: &str) -> Option<&dyn Component> {
        self.list
            .iter()
            .find(|named| named.name == name)
            .map(|named| named.component.as_ref())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, NamedComponent> {
        self.list.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.list.iter().map(|named| named.name.as_str()).collect()
    }

    fn anonymous_name(&self) -> String {
        format!("__anonymous{}", self.list.len())
    }
}

impl<'a> IntoIterator for &'a NamedComponentList {
    type Item = &'a NamedComponent;
    type IntoIter = std::slice::Iter<'a, NamedComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::SimpleComponent;

    #[test]
    fn test_anonymous_names_follow_length() {
        let mut list = NamedComponentList::new();
        list.push_back(SimpleComponent::new());
        list.push_back(SimpleComponent::new());
        assert_eq!(list.names(), vec!["__anonymous0", "__anonymous1"]);
    }

    #[test]
    fn test_push_front_prepends() {
        let mut list = NamedComponentList::new();
        list.push_back_named("b", SimpleComponent::new());
        list.push_front_named("a", SimpleComponent::new());
        list.push_back_named("c", SimpleComponent::new());
        assert_eq!(list.names(), vec!["a", "b", "c"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_front_insertion_can_duplicate_anonymous_names() {
        let mut list = NamedComponentList::new();
        list.push_back(SimpleComponent::new());
        list.push_front(SimpleComponent::new());
        list.push_back_named("x", SimpleComponent::new());
        list.push_front(SimpleComponent::new());
        assert_eq!(
            list.names(),
            vec!["__anonymous3", "__anonymous1", "__anonymous0", "x"]
        );
    }

    #[test]
    fn test_find_returns_first_match() {
        let mut list = NamedComponentList::new();
        list.push_back_named("dup", SimpleComponent::new());
        list.push_back_named("other", SimpleComponent::new());
        list.push_back_named("dup", SimpleComponent::new());

        let found = list.find_component("dup").expect("present");
        let first = list.iter().next().unwrap().component.as_ref();
        let last = list.iter().last().unwrap().component.as_ref();
        assert!(std::ptr::addr_eq(found, first));
        assert!(!std::ptr::addr_eq(found, last));
    }

    #[test]
    fn test_find_missing_is_none() {
        let mut list = NamedComponentList::new();
        list.push_back_named("a", SimpleComponent::new());
        assert!(list.find_component("b").is_none());
        assert!(NamedComponentList::new().find_component("a").is_none());
    }

    #[test]
    fn test_empty_list() {
        let list = NamedComponentList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }
}
