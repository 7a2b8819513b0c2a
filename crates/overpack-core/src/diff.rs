//! Structural comparison of two packages.
//!
//! Components are matched by identity and codes by path. Configuration
//! components are walked in lockstep; every leaf divergence yields one
//! [`Change`]. Comments carry no meaning here and are skipped.

use crate::code::CodeEntry;
use crate::component::{Component, ComponentId};
use crate::options::DiffOptions;
use crate::package::Package;
use overpack_mdl::{statement_to_string, value_to_string, Statement, PATH_SEPARATOR};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// What a change refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ChangeTarget {
    /// A whole component: added, removed, moved, recategorized, or a data payload change.
    Component { id: ComponentId },
    Code { path: String },
    /// A key or block inside a configuration component.
    Field { component: ComponentId, path: String },
    /// The relative order of the blocks directly inside `path`.
    Ordering { component: ComponentId, path: String },
}

impl ChangeTarget {
    /// Component identity this change belongs to, if any.
    pub fn component(&self) -> Option<&ComponentId> {
        match self {
            Self::Component { id } => Some(id),
            Self::Field { component, .. } | Self::Ordering { component, .. } => Some(component),
            Self::Code { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    #[serde(flatten)]
    pub target: ChangeTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl Change {
    fn added(target: ChangeTarget, after: String) -> Self {
        Self {
            kind: ChangeKind::Added,
            target,
            before: None,
            after: Some(after),
        }
    }

    fn removed(target: ChangeTarget, before: String) -> Self {
        Self {
            kind: ChangeKind::Removed,
            target,
            before: Some(before),
            after: None,
        }
    }

    fn modified(target: ChangeTarget, before: String, after: String) -> Self {
        Self {
            kind: ChangeKind::Modified,
            target,
            before: Some(before),
            after: Some(after),
        }
    }
}

/// Serializable summary of a diff.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    pub changes: Vec<Change>,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub has_changes: bool,
}

impl DiffReport {
    pub fn new(a: &Package, b: &Package) -> Self {
        Self::with_options(a, b, &DiffOptions::default())
    }

    pub fn with_options(a: &Package, b: &Package, options: &DiffOptions) -> Self {
        let changes = diff_with(a, b, options);
        let count = |kind| changes.iter().filter(|c| c.kind == kind).count();
        let (added, removed, modified) = (
            count(ChangeKind::Added),
            count(ChangeKind::Removed),
            count(ChangeKind::Modified),
        );
        Self {
            has_changes: !changes.is_empty(),
            changes,
            added,
            removed,
            modified,
        }
    }
}

pub fn diff(a: &Package, b: &Package) -> Vec<Change> {
    diff_with(a, b, &DiffOptions::default())
}

/// Removals and modifications follow `a`'s order, additions follow `b`'s.
/// Component changes come before code changes.
pub fn diff_with(a: &Package, b: &Package, options: &DiffOptions) -> Vec<Change> {
    let mut changes = Vec::new();

    let b_components: HashMap<ComponentId, &Component> =
        b.components().iter().map(|c| (c.id(), c)).collect();
    for old in a.components() {
        let id = old.id();
        match b_components.get(&id) {
            None => changes.push(Change::removed(
                ChangeTarget::Component { id },
                old.path().to_string(),
            )),
            Some(new) => diff_component(&id, old, new, options, &mut changes),
        }
    }
    let a_components: HashSet<ComponentId> = a.components().iter().map(Component::id).collect();
    for new in b.components() {
        if !a_components.contains(&new.id()) {
            changes.push(Change::added(
                ChangeTarget::Component { id: new.id() },
                new.path().to_string(),
            ));
        }
    }

    let b_codes: HashMap<&str, &CodeEntry> =
        b.codes().iter().map(|c| (c.path.as_str(), c)).collect();
    for old in a.codes() {
        let target = ChangeTarget::Code {
            path: old.path.to_string(),
        };
        match b_codes.get(old.path.as_str()) {
            None => changes.push(Change::removed(target, old.checksum().into_inner())),
            Some(new) if old.kind != new.kind || old.payload != new.payload => {
                changes.push(Change::modified(
                    target,
                    format!("{}:{}", old.kind, old.checksum()),
                    format!("{}:{}", new.kind, new.checksum()),
                ));
            }
            Some(_) => {}
        }
    }
    let a_codes: HashSet<&str> = a.codes().iter().map(|c| c.path.as_str()).collect();
    for new in b.codes() {
        if !a_codes.contains(new.path.as_str()) {
            changes.push(Change::added(
                ChangeTarget::Code {
                    path: new.path.to_string(),
                },
                new.checksum().into_inner(),
            ));
        }
    }

    changes
}

fn diff_component(
    id: &ComponentId,
    old: &Component,
    new: &Component,
    options: &DiffOptions,
    changes: &mut Vec<Change>,
) {
    let target = || ChangeTarget::Component { id: id.clone() };
    if old.kind() != new.kind() {
        changes.push(Change::modified(
            target(),
            old.kind().to_string(),
            new.kind().to_string(),
        ));
        return;
    }
    if old.path() != new.path() {
        changes.push(Change::modified(
            target(),
            old.path().to_string(),
            new.path().to_string(),
        ));
    }
    match (old, new) {
        (Component::Configuration(a), Component::Configuration(b)) => {
            let mut walk = TreeWalk {
                component: id,
                options,
                changes,
            };
            walk.bodies(&[], &a.document.statements, &b.document.statements);
        }
        (Component::Data(a), Component::Data(b)) => {
            if a.payload != b.payload {
                changes.push(Change::modified(
                    target(),
                    a.checksum().into_inner(),
                    b.checksum().into_inner(),
                ));
            }
        }
        _ => {}
    }
}

/// Identity of a statement among its siblings. Repeated keys pair up by
/// occurrence, so ambiguous unnamed blocks are matched positionally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SiblingKey<'a> {
    Key(&'a str, usize),
    Block(&'a str, Option<&'a str>, usize),
}

impl<'a> SiblingKey<'a> {
    /// What a path lookup matches: the key, the block name, or the keyword
    /// of an unnamed block.
    fn label(&self) -> &'a str {
        match *self {
            Self::Key(key, _) => key,
            Self::Block(keyword, name, _) => name.unwrap_or(keyword),
        }
    }

    /// The keyword of a block, `None` for a key.
    fn owner(&self) -> Option<&'a str> {
        match *self {
            Self::Key(..) => None,
            Self::Block(keyword, ..) => Some(keyword),
        }
    }

    /// Path segment for this statement. A block whose label is in
    /// `ambiguous` is written `keyword:label`.
    fn segment(&self, ambiguous: &HashSet<&str>) -> String {
        let label = self.label();
        let (segment, occurrence) = match *self {
            Self::Block(keyword, _, n) if ambiguous.contains(label) => {
                (format!("{keyword}:{label}"), n)
            }
            Self::Block(_, _, n) | Self::Key(_, n) => (label.to_owned(), n),
        };
        if occurrence == 0 {
            segment
        } else {
            format!("{segment}[{occurrence}]")
        }
    }

    fn is_block(&self) -> bool {
        matches!(self, Self::Block(..))
    }
}

/// Labels carried by siblings of more than one kind (a key and a block, or
/// blocks of different keywords) on either side of the comparison.
fn ambiguous_labels<'a>(
    old: &[(SiblingKey<'a>, &Statement)],
    new: &[(SiblingKey<'a>, &Statement)],
) -> HashSet<&'a str> {
    let mut owners: HashMap<&'a str, HashSet<Option<&'a str>>> = HashMap::new();
    for (key, _) in old.iter().chain(new) {
        owners.entry(key.label()).or_default().insert(key.owner());
    }
    owners
        .into_iter()
        .filter(|(_, kinds)| kinds.len() > 1)
        .map(|(label, _)| label)
        .collect()
}

fn keyed(body: &[Statement]) -> Vec<(SiblingKey<'_>, &Statement)> {
    let mut seen: HashMap<SiblingKey<'_>, usize> = HashMap::new();
    let mut out = Vec::with_capacity(body.len());
    for stmt in body {
        let base = match stmt {
            Statement::KeyValue { key, .. } => SiblingKey::Key(key, 0),
            Statement::Block(block) => SiblingKey::Block(&block.keyword, block.name.as_deref(), 0),
            Statement::Comment { .. } => continue,
        };
        let counter = seen.entry(base.clone()).or_insert(0);
        let key = match base {
            SiblingKey::Key(k, _) => SiblingKey::Key(k, *counter),
            SiblingKey::Block(kw, name, _) => SiblingKey::Block(kw, name, *counter),
        };
        *counter += 1;
        out.push((key, stmt));
    }
    out
}

struct TreeWalk<'a> {
    component: &'a ComponentId,
    options: &'a DiffOptions,
    changes: &'a mut Vec<Change>,
}

impl TreeWalk<'_> {
    fn target(&self, segments: &[String]) -> ChangeTarget {
        ChangeTarget::Field {
            component: self.component.clone(),
            path: join(segments),
        }
    }

    fn bodies(&mut self, prefix: &[String], old: &[Statement], new: &[Statement]) {
        let old_items = keyed(old);
        let new_items = keyed(new);
        let ambiguous = ambiguous_labels(&old_items, &new_items);
        let new_index: HashMap<&SiblingKey<'_>, usize> = new_items
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key, i))
            .collect();

        let mut shared_blocks_old = Vec::new();
        for (key, stmt) in &old_items {
            let path = extend(prefix, key.segment(&ambiguous));
            match new_index.get(key) {
                None => {
                    let target = self.target(&path);
                    self.changes
                        .push(Change::removed(target, statement_to_string(stmt)));
                }
                Some(&i) => {
                    if key.is_block() {
                        shared_blocks_old.push(key);
                    }
                    self.statements(&path, stmt, new_items[i].1);
                }
            }
        }

        let old_keys: HashSet<&SiblingKey<'_>> = old_items.iter().map(|(key, _)| key).collect();
        let mut shared_blocks_new = Vec::new();
        for (key, stmt) in &new_items {
            if old_keys.contains(key) {
                if key.is_block() {
                    shared_blocks_new.push(key);
                }
            } else {
                let target = self.target(&extend(prefix, key.segment(&ambiguous)));
                self.changes
                    .push(Change::added(target, statement_to_string(stmt)));
            }
        }

        if !self.options.ignore_block_order && shared_blocks_old != shared_blocks_new {
            self.changes.push(Change::modified(
                ChangeTarget::Ordering {
                    component: self.component.clone(),
                    path: join(prefix),
                },
                render_order(&shared_blocks_old, &ambiguous),
                render_order(&shared_blocks_new, &ambiguous),
            ));
        }
    }

    fn statements(&mut self, path: &[String], old: &Statement, new: &Statement) {
        match (old, new) {
            (Statement::KeyValue { value: a, .. }, Statement::KeyValue { value: b, .. }) => {
                if a != b {
                    let target = self.target(path);
                    self.changes.push(Change::modified(
                        target,
                        value_to_string(a),
                        value_to_string(b),
                    ));
                }
            }
            (Statement::Block(a), Statement::Block(b)) => self.bodies(path, &a.body, &b.body),
            _ => {}
        }
    }
}

/// Comma-separated segments of `keys`, in the order given.
fn render_order(keys: &[&SiblingKey<'_>], ambiguous: &HashSet<&str>) -> String {
    keys.iter()
        .map(|key| key.segment(ambiguous))
        .collect::<Vec<_>>()
        .join(", ")
}

fn extend(prefix: &[String], segment: String) -> Vec<String> {
    let mut path = prefix.to_vec();
    path.push(segment);
    path
}

fn join(segments: &[String]) -> String {
    segments.join(&PATH_SEPARATOR.to_string())
}
