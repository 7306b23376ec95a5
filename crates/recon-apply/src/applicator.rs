//! Replaying approved change records onto an original document.
//!
//! Records are applied in three stages:
//!
//! 1. Whole-file DELETEs remove the document.
//! 2. DELETE, MODIFY and MOVE-source records are resolved against the
//!    original tree and applied in reverse document order, so no resolved
//!    position is disturbed by an earlier edit.
//! 3. ADD and MOVE-target records are inserted under parents that were
//!    also located in the original tree and followed through the earlier
//!    edits, then whole-file ADDs create the document if it does not exist.
//!
//! Only approved records are considered. The result depends on nothing but
//! the original document and the record list, so replaying the same records
//! always produces the same bytes.

use recon_diff::{element_at_mut, find_child, resolve_route};
use recon_doc::{Document, Element, Node};
use recon_types::{ChangeRecord, ChangeType, MoveRole, ParsedPath, Segment, Selector};
use tracing::{debug, warn};

use crate::error::ApplyResult;
use crate::report::{ApplyReport, ApplyWarning, FileApplication, TextApplication};

/// Applies approved records to one document at a time.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChangeApplicator;

/// An edit resolved against the original tree.
struct Resolved<'r> {
    route: Vec<usize>,
    edit: Edit<'r>,
}

enum Edit<'r> {
    Modify {
        record: &'r ChangeRecord,
        attribute: Option<String>,
    },
    Remove,
}

impl Edit<'_> {
    /// Modifications sort after removals at the same position, so with the
    /// order reversed they run first.
    fn rank(&self) -> u8 {
        match self {
            Edit::Remove => 0,
            Edit::Modify { .. } => 1,
        }
    }
}

impl ChangeApplicator {
    pub fn new() -> Self {
        Self
    }

    /// Apply the approved subset of `records` to `original`.
    ///
    /// `original` is `None` when the file does not exist in the source set;
    /// only a whole-file ADD can then produce a document.
    pub fn apply(&self, original: Option<&Document>, records: &[ChangeRecord]) -> FileApplication {
        let mut report = ApplyReport::new();
        let approved: Vec<&ChangeRecord> = records.iter().filter(|r| r.approval.is_approved()).collect();
        report.not_approved = records.len() - approved.len();

        let (whole_file, targeted): (Vec<&ChangeRecord>, Vec<&ChangeRecord>) =
            approved.into_iter().partition(|r| r.is_whole_file());

        let mut document = original.cloned();
        for record in whole_file.iter().filter(|r| r.change_type == ChangeType::Delete) {
            if document.take().is_some() {
                report.applied += 1;
            } else {
                report.warn(missing_document(record));
            }
        }

        match document.as_mut() {
            Some(doc) => self.apply_targeted(&mut doc.root, &targeted, &mut report),
            None => {
                for record in targeted {
                    report.warn(missing_document(record));
                }
            }
        }

        for record in whole_file.iter().filter(|r| r.change_type == ChangeType::Add) {
            if document.is_some() {
                report.warn(ApplyWarning::AlreadyPresent {
                    path: record.xml_path.clone(),
                });
                continue;
            }
            match Document::parse(&record.new_content) {
                Ok(created) => {
                    document = Some(created);
                    report.applied += 1;
                }
                Err(e) => report.warn(ApplyWarning::InvalidContent {
                    change_type: record.change_type,
                    path: record.xml_path.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        for warning in &report.warnings {
            warn!(%warning, "record skipped");
        }
        debug!(
            applied = report.applied,
            skipped = report.skipped(),
            not_approved = report.not_approved,
            "applied records"
        );
        FileApplication { document, report }
    }

    /// Parse `source`, apply the records and serialize the result.
    pub fn apply_source(&self, source: Option<&str>, records: &[ChangeRecord]) -> ApplyResult<TextApplication> {
        let original = source.map(Document::parse).transpose()?;
        let FileApplication { document, report } = self.apply(original.as_ref(), records);
        let text = document.as_ref().map(Document::to_xml).transpose()?;
        Ok(TextApplication { text, report })
    }

    fn apply_targeted(&self, root: &mut Element, records: &[&ChangeRecord], report: &mut ApplyReport) {
        let mut resolved = Vec::new();
        let mut inserts = Vec::new();

        for &record in records {
            let parsed = match record.xml_path.parse() {
                Ok(parsed) => parsed,
                Err(e) => {
                    report.warn(ApplyWarning::InvalidRecord {
                        change_type: record.change_type,
                        path: record.xml_path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let stage = match record.change_type {
                ChangeType::Modify => Stage::Modify,
                ChangeType::Delete => Stage::Remove,
                ChangeType::Add => Stage::Insert,
                ChangeType::Move => match record.move_link().map(|link| link.role) {
                    Some(MoveRole::Source) => Stage::Remove,
                    Some(MoveRole::Target) => Stage::Insert,
                    None => {
                        report.warn(invalid(record, "MOVE record without a move section"));
                        continue;
                    }
                },
            };

            match stage {
                Stage::Insert => match pending_insert(root, record, parsed) {
                    Ok(pending) => inserts.push(pending),
                    Err(warning) => report.warn(warning),
                },
                Stage::Modify => match resolve_route(root, &parsed.segments) {
                    Some(route) => resolved.push(Resolved {
                        route,
                        edit: Edit::Modify {
                            record,
                            attribute: parsed.attribute,
                        },
                    }),
                    None => report.warn(unresolved(record, "no element at this path")),
                },
                Stage::Remove => {
                    if parsed.attribute.is_some() || parsed.is_root() {
                        report.warn(invalid(record, "only elements below the root can be removed"));
                        continue;
                    }
                    match resolve_route(root, &parsed.segments) {
                        Some(route) => resolved.push(Resolved {
                            route,
                            edit: Edit::Remove,
                        }),
                        None => report.warn(unresolved(record, "no element at this path")),
                    }
                }
            }
        }

        resolved.sort_by(|a, b| (&b.route, b.edit.rank()).cmp(&(&a.route, a.edit.rank())));
        let mut removed: Vec<Vec<usize>> = Vec::new();
        for Resolved { route, edit } in resolved {
            match edit {
                Edit::Modify { record, attribute } => {
                    let Some(element) = element_at_mut(root, &route) else {
                        report.warn(unresolved(record, "element disappeared"));
                        continue;
                    };
                    match attribute {
                        Some(name) if record.new_content.is_empty() => {
                            element.remove_attribute(&name);
                        }
                        Some(name) => element.set_attribute(name, record.new_content.clone()),
                        None => element.set_text(&record.new_content),
                    }
                    report.applied += 1;
                }
                Edit::Remove => {
                    if !removed.contains(&route) {
                        if let Some((&index, parent)) = route.split_last() {
                            for shift in remove_at(root, parent, index) {
                                for pending in &mut inserts {
                                    rebase(&mut pending.parent, parent, shift);
                                }
                            }
                        }
                        removed.push(route);
                    }
                    report.applied += 1;
                }
            }
        }

        for i in 0..inserts.len() {
            let (done, later) = inserts.split_at_mut(i + 1);
            let pending = &done[i];
            let Some(parent_route) = pending.parent.as_deref() else {
                report.warn(unresolved(pending.record, "parent was removed by another record"));
                continue;
            };
            match insert(root, pending, parent_route) {
                Ok(shift) => {
                    report.applied += 1;
                    for other in later {
                        rebase(&mut other.parent, parent_route, shift);
                    }
                }
                Err(warning) => report.warn(warning),
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Stage {
    Modify,
    Remove,
    Insert,
}

/// An ADD or MOVE target whose parent was located in the original tree.
struct PendingInsert<'r> {
    record: &'r ChangeRecord,
    segment: Segment,
    /// Route to the parent in the working tree; `None` once the parent or
    /// one of its ancestors has been removed.
    parent: Option<Vec<usize>>,
}

/// A change to one element's list of children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shift {
    Removed(usize),
    Inserted { at: usize, count: usize },
}

/// Keep `route` pointing at the same element after `shift` was applied to
/// the children of the element at `parent`.
fn rebase(route: &mut Option<Vec<usize>>, parent: &[usize], shift: Shift) {
    let Some(steps) = route.as_mut() else {
        return;
    };
    if steps.len() <= parent.len() || !steps.starts_with(parent) {
        return;
    }
    let depth = parent.len();
    match shift {
        Shift::Removed(index) if steps[depth] == index => *route = None,
        Shift::Removed(index) if steps[depth] > index => steps[depth] -= 1,
        Shift::Inserted { at, count } if steps[depth] >= at => steps[depth] += count,
        _ => {}
    }
}

fn pending_insert<'r>(
    root: &Element,
    record: &'r ChangeRecord,
    parsed: ParsedPath,
) -> Result<PendingInsert<'r>, ApplyWarning> {
    if parsed.attribute.is_some() {
        return Err(invalid(record, "cannot insert an attribute"));
    }
    let Some(segment) = parsed.last().cloned() else {
        return Err(invalid(record, "cannot insert the root element here"));
    };
    let parent_segments = parsed.parent_segments();
    let route = resolve_route(root, parent_segments).ok_or_else(|| {
        let parent = ParsedPath {
            segments: parent_segments.to_vec(),
            attribute: None,
        };
        unresolved(record, &format!("parent {} not found", parent.element_path()))
    })?;
    Ok(PendingInsert {
        record,
        segment,
        parent: Some(route),
    })
}

fn unresolved(record: &ChangeRecord, reason: &str) -> ApplyWarning {
    ApplyWarning::PathResolution {
        change_type: record.change_type,
        path: record.xml_path.clone(),
        reason: reason.to_string(),
    }
}

fn invalid(record: &ChangeRecord, reason: &str) -> ApplyWarning {
    ApplyWarning::InvalidRecord {
        change_type: record.change_type,
        path: record.xml_path.clone(),
        reason: reason.to_string(),
    }
}

fn missing_document(record: &ChangeRecord) -> ApplyWarning {
    unresolved(record, "document does not exist")
}

/// Remove child `index` of the element at `parent` together with the layout
/// whitespace immediately before it, returning the removals in the order
/// they happened.
fn remove_at(root: &mut Element, parent: &[usize], index: usize) -> Vec<Shift> {
    let Some(parent) = element_at_mut(root, parent) else {
        return Vec::new();
    };
    if index >= parent.children.len() {
        return Vec::new();
    }
    parent.children.remove(index);
    let mut shifts = vec![Shift::Removed(index)];
    if index > 0 && parent.children[index - 1].is_blank_text() {
        parent.children.remove(index - 1);
        shifts.push(Shift::Removed(index - 1));
    }
    shifts
}

fn insert(root: &mut Element, pending: &PendingInsert<'_>, parent_route: &[usize]) -> Result<Shift, ApplyWarning> {
    let record = pending.record;
    let segment = &pending.segment;
    let parent = element_at_mut(root, parent_route)
        .ok_or_else(|| unresolved(record, "parent disappeared"))?;

    if matches!(segment.selector, Selector::Key { .. }) && find_child(parent, segment).is_some() {
        return Err(ApplyWarning::AlreadyPresent {
            path: record.xml_path.clone(),
        });
    }

    let element = Element::parse_fragment(&record.new_content).map_err(|e| ApplyWarning::InvalidContent {
        change_type: record.change_type,
        path: record.xml_path.clone(),
        reason: e.to_string(),
    })?;
    if element.name() != segment.tag {
        return Err(ApplyWarning::InvalidContent {
            change_type: record.change_type,
            path: record.xml_path.clone(),
            reason: format!("content is <{}>, path expects <{}>", element.name(), segment.tag),
        });
    }

    Ok(insert_child(parent, element, segment))
}

/// Insert `element` among `parent`'s children at the place `segment`
/// implies, copying the indentation of a neighbouring sibling.
fn insert_child(parent: &mut Element, element: Element, segment: &Segment) -> Shift {
    let same_tag: Vec<usize> = parent
        .children
        .iter()
        .enumerate()
        .filter(|(_, n)| n.as_element().is_some_and(|e| e.name() == segment.tag))
        .map(|(i, _)| i)
        .collect();

    if let Selector::Index(n) = segment.selector {
        if let Some(&anchor) = same_tag.get(n.saturating_sub(1)) {
            let indent = indent_before(parent, anchor);
            let mut nodes = vec![Node::Element(element)];
            nodes.extend(indent.map(Node::Text));
            let count = nodes.len();
            parent.children.splice(anchor..anchor, nodes);
            return Shift::Inserted { at: anchor, count };
        }
    }

    let anchor = same_tag.last().copied().or_else(|| {
        parent
            .children
            .iter()
            .rposition(|n| matches!(n, Node::Element(_)))
    });
    match anchor {
        Some(anchor) => {
            let mut nodes: Vec<Node> = indent_before(parent, anchor).map(Node::Text).into_iter().collect();
            nodes.push(Node::Element(element));
            let count = nodes.len();
            parent.children.splice(anchor + 1..anchor + 1, nodes);
            Shift::Inserted { at: anchor + 1, count }
        }
        None => {
            parent.children.push(Node::Element(element));
            Shift::Inserted {
                at: parent.children.len() - 1,
                count: 1,
            }
        }
    }
}

fn indent_before(parent: &Element, index: usize) -> Option<String> {
    match index.checked_sub(1).map(|i| &parent.children[i]) {
        Some(Node::Text(raw)) if raw.trim().is_empty() => Some(raw.clone()),
        _ => None,
    }
}
