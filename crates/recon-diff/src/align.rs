//! Tree alignment: pairing elements of an original and a revised tree.
//!
//! Children of a matched parent are grouped by tag. Within a group, elements
//! carrying the same identifying attribute value are paired first; the
//! remaining unkeyed elements are paired in document order. Matched pairs
//! are aligned recursively. Reordering alone is never reported.

use recon_doc::Element;
use recon_types::LocationPath;

use crate::address::PathAddresser;

/// An element together with the path it was found at.
#[derive(Clone, Debug)]
pub struct Located<'t> {
    pub path: LocationPath,
    pub element: &'t Element,
}

/// Two elements judged to be the same logical element.
#[derive(Clone, Debug)]
pub struct MatchedPair<'t> {
    /// Path of the element in the original tree.
    pub path: LocationPath,
    pub original: &'t Element,
    pub revised: &'t Element,
}

impl MatchedPair<'_> {
    /// Direct text differs (ignoring surrounding whitespace).
    pub fn text_changed(&self) -> bool {
        self.original.text() != self.revised.text()
    }

    /// Attribute changes as `(name, old, new)`, with `None` for an absent
    /// side. Attribute order is not significant.
    pub fn attribute_changes(&self) -> Vec<(&str, Option<&str>, Option<&str>)> {
        let mut changes = Vec::new();
        for (name, old) in self.original.attributes() {
            match self.revised.attribute(name) {
                Some(new) if new == old.as_str() => {}
                new => changes.push((name.as_str(), Some(old.as_str()), new)),
            }
        }
        for (name, new) in self.revised.attributes() {
            if self.original.attribute(name).is_none() {
                changes.push((name.as_str(), None, Some(new.as_str())));
            }
        }
        changes
    }

    /// The pair differs in its own text or attributes.
    pub fn is_modified(&self) -> bool {
        self.text_changed() || !self.attribute_changes().is_empty()
    }
}

/// The outcome of aligning two trees.
#[derive(Clone, Debug, Default)]
pub struct Alignment<'t> {
    /// Every matched pair, roots first, in original document order.
    pub matched: Vec<MatchedPair<'t>>,
    /// Original elements with no partner.
    pub removed: Vec<Located<'t>>,
    /// Revised elements with no partner. The path is the original parent's
    /// path extended by the element's step among its revised siblings.
    pub added: Vec<Located<'t>>,
}

impl<'t> Alignment<'t> {
    /// Matched pairs whose own text or attributes differ.
    pub fn modified(&self) -> impl Iterator<Item = &MatchedPair<'t>> {
        self.matched.iter().filter(|pair| pair.is_modified())
    }

    /// Returns `true` when the trees align with no differences.
    pub fn is_identical(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.modified().next().is_none()
    }
}

/// Aligns trees using a [`PathAddresser`] to identify keyed elements.
#[derive(Clone, Debug, Default)]
pub struct TreeAligner {
    addresser: PathAddresser,
}

impl TreeAligner {
    pub fn new(addresser: PathAddresser) -> Self {
        Self { addresser }
    }

    pub fn addresser(&self) -> &PathAddresser {
        &self.addresser
    }

    /// Align two trees starting from their roots.
    ///
    /// Roots with different tags do not match: the original root is removed
    /// and the revised root added, both at `/`.
    pub fn align<'t>(&self, original: &'t Element, revised: &'t Element) -> Alignment<'t> {
        let mut alignment = Alignment::default();
        if original.name() != revised.name() {
            alignment.removed.push(Located {
                path: LocationPath::root(),
                element: original,
            });
            alignment.added.push(Located {
                path: LocationPath::root(),
                element: revised,
            });
            return alignment;
        }

        alignment.matched.push(MatchedPair {
            path: LocationPath::root(),
            original,
            revised,
        });
        self.align_children(original, revised, &LocationPath::root(), &mut alignment);
        alignment
    }

    fn align_children<'t>(
        &self,
        original: &'t Element,
        revised: &'t Element,
        path: &LocationPath,
        alignment: &mut Alignment<'t>,
    ) {
        let old: Vec<&Element> = original.elements().collect();
        let new: Vec<&Element> = revised.elements().collect();
        let pairs = self.pair_children(&old, &new);

        let mut old_paired = vec![false; old.len()];
        let mut new_paired = vec![false; new.len()];
        for &(i, j) in &pairs {
            old_paired[i] = true;
            new_paired[j] = true;
        }

        for (i, element) in old.iter().enumerate() {
            if !old_paired[i] {
                alignment.removed.push(Located {
                    path: path.child(&self.addresser.segment_for(&old, i)),
                    element,
                });
            }
        }
        for (j, element) in new.iter().enumerate() {
            if !new_paired[j] {
                alignment.added.push(Located {
                    path: path.child(&self.addresser.segment_for(&new, j)),
                    element,
                });
            }
        }

        for (i, j) in pairs {
            let child_path = path.child(&self.addresser.segment_for(&old, i));
            alignment.matched.push(MatchedPair {
                path: child_path.clone(),
                original: old[i],
                revised: new[j],
            });
            self.align_children(old[i], new[j], &child_path, alignment);
        }
    }

    /// Pair sibling lists, returning `(original, revised)` indices ordered
    /// by original position.
    fn pair_children(&self, old: &[&Element], new: &[&Element]) -> Vec<(usize, usize)> {
        let mut taken = vec![false; new.len()];
        let mut pairs = Vec::new();
        let mut unkeyed = Vec::new();

        for (i, o) in old.iter().enumerate() {
            match self.addresser.key_of(o) {
                Some(key) => {
                    let partner = new.iter().enumerate().position(|(j, n)| {
                        !taken[j] && n.name() == o.name() && self.addresser.key_of(n) == Some(key)
                    });
                    if let Some(j) = partner {
                        taken[j] = true;
                        pairs.push((i, j));
                    }
                }
                None => unkeyed.push(i),
            }
        }

        for i in unkeyed {
            let partner = new.iter().enumerate().position(|(j, n)| {
                !taken[j] && n.name() == old[i].name() && self.addresser.key_of(n).is_none()
            });
            if let Some(j) = partner {
                taken[j] = true;
                pairs.push((i, j));
            }
        }

        pairs.sort_unstable();
        pairs
    }
}
