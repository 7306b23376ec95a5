//! Path addressing: computing and resolving location paths.
//!
//! A step prefers an identifying attribute whose value is unique among the
//! element's same-tag siblings, so the address survives sibling reordering.
//! Without one, a tag that occurs once is addressed by name alone and
//! anything else falls back to its 1-based occurrence index.

use recon_doc::{Element, Node};
use recon_types::{LocationPath, ParsedPath, Segment, Selector};

use crate::config::DiffConfig;

/// Computes location paths using a fixed list of identifying attributes.
#[derive(Clone, Debug)]
pub struct PathAddresser {
    key_attributes: Vec<String>,
}

impl PathAddresser {
    pub fn new(key_attributes: Vec<String>) -> Self {
        Self { key_attributes }
    }

    pub fn from_config(config: &DiffConfig) -> Self {
        Self::new(config.key_attributes.clone())
    }

    /// The first identifying attribute present on `element`, with its value.
    pub fn key_of<'e>(&self, element: &'e Element) -> Option<(&'e str, &'e str)> {
        self.key_attributes.iter().find_map(|attr| {
            element
                .attributes()
                .iter()
                .find(|(k, _)| k == attr)
                .map(|(k, v)| (k.as_str(), v.as_str()))
        })
    }

    /// The step addressing `siblings[index]` among its siblings.
    ///
    /// `siblings` are all element children of one parent, in document order.
    pub fn segment_for(&self, siblings: &[&Element], index: usize) -> Segment {
        let element = siblings[index];
        let tag = element.name();

        if let Some((attr, value)) = self.key_of(element) {
            let clash = siblings
                .iter()
                .enumerate()
                .any(|(i, s)| i != index && s.name() == tag && s.attribute(attr) == Some(value));
            if !clash {
                return Segment::key(tag, attr, value);
            }
        }

        let same_tag: Vec<usize> = siblings
            .iter()
            .enumerate()
            .filter(|(_, s)| s.name() == tag)
            .map(|(i, _)| i)
            .collect();
        if same_tag.len() == 1 {
            return Segment::only(tag);
        }
        let position = same_tag.iter().position(|&i| i == index).unwrap_or(0) + 1;
        Segment::index(tag, position)
    }

    /// Compute the path of `target` within the tree rooted at `root`.
    ///
    /// `target` is located by identity, not by value. Returns `None` if it
    /// is not part of the tree.
    pub fn compute(&self, root: &Element, target: &Element) -> Option<LocationPath> {
        if std::ptr::eq(root, target) {
            return Some(LocationPath::root());
        }
        self.search(root, target, LocationPath::root())
    }

    fn search(&self, parent: &Element, target: &Element, path: LocationPath) -> Option<LocationPath> {
        let siblings: Vec<&Element> = parent.elements().collect();
        for (i, child) in siblings.iter().enumerate() {
            let child_path = path.child(&self.segment_for(&siblings, i));
            if std::ptr::eq(*child, target) {
                return Some(child_path);
            }
            if let Some(found) = self.search(child, target, child_path) {
                return Some(found);
            }
        }
        None
    }
}

impl Default for PathAddresser {
    fn default() -> Self {
        Self::from_config(&DiffConfig::default())
    }
}

/// Resolve the element steps of `path` to a route of child indices.
///
/// Each entry of the route indexes [`Element::children`] of the element
/// reached so far, so the route stays meaningful for mutable access. A
/// `tag` step takes the first child with that tag, `tag[N]` the N-th and a
/// key step the first child whose attribute carries the value.
pub fn resolve_route(root: &Element, segments: &[Segment]) -> Option<Vec<usize>> {
    let mut route = Vec::with_capacity(segments.len());
    let mut current = root;
    for segment in segments {
        let index = find_child(current, segment)?;
        current = current.children[index].as_element()?;
        route.push(index);
    }
    Some(route)
}

/// Resolve a parsed path to the element it addresses.
pub fn resolve<'e>(root: &'e Element, path: &ParsedPath) -> Option<&'e Element> {
    let route = resolve_route(root, &path.segments)?;
    element_at(root, &route)
}

/// Follow a route produced by [`resolve_route`].
pub fn element_at<'e>(root: &'e Element, route: &[usize]) -> Option<&'e Element> {
    route
        .iter()
        .try_fold(root, |el, &i| el.children.get(i).and_then(Node::as_element))
}

/// Follow a route produced by [`resolve_route`] mutably.
pub fn element_at_mut<'e>(root: &'e mut Element, route: &[usize]) -> Option<&'e mut Element> {
    route
        .iter()
        .try_fold(root, |el, &i| el.children.get_mut(i).and_then(Node::as_element_mut))
}

/// Index into `parent.children` of the child matching `segment`.
pub fn find_child(parent: &Element, segment: &Segment) -> Option<usize> {
    let mut same_tag = parent
        .children
        .iter()
        .enumerate()
        .filter_map(|(i, n)| n.as_element().map(|e| (i, e)))
        .filter(|(_, e)| e.name() == segment.tag);

    match &segment.selector {
        Selector::Only => same_tag.next().map(|(i, _)| i),
        Selector::Index(n) => same_tag.nth(n.checked_sub(1)?).map(|(i, _)| i),
        Selector::Key { attr, value } => same_tag
            .find(|(_, e)| e.attribute(attr) == Some(value.as_str()))
            .map(|(i, _)| i),
    }
}
