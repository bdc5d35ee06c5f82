//! Dependency trees: where a value embeds references to other stores.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::store::State;
use crate::value::Value;

/// A reference to another store found inside a value, with what it last
/// resolved to.
#[derive(Debug)]
pub struct Dependency {
    target: State,
    resolved: RefCell<Value>,
}

impl Dependency {
    /// Wraps `target`, resolving it immediately.
    pub fn new(target: State) -> Self {
        let resolved = target.get();
        Self {
            target,
            resolved: RefCell::new(resolved),
        }
    }

    /// The referenced optic.
    pub const fn target(&self) -> &State {
        &self.target
    }

    /// What the reference resolved to when it was last read.
    pub fn resolved(&self) -> Value {
        self.resolved.borrow().clone()
    }

    /// Re-reads the target. Returns `true` when it resolves to a new value.
    pub(crate) fn refresh(&self) -> bool {
        let next = self.target.get();
        let changed = !next.same(&self.resolved.borrow());
        if changed {
            self.resolved.replace(next);
        }
        changed
    }
}

/// The shape of the references embedded in a value.
///
/// Mirrors the value's arrays and objects, keeping only the branches that
/// lead to a reference.
#[derive(Debug)]
pub enum DependencyTree {
    /// A reference.
    Leaf(Dependency),
    /// An array; `None` marks elements without references.
    Array(Vec<Option<DependencyTree>>),
    /// An object, holding only the fields that contain references.
    Object(BTreeMap<Rc<str>, DependencyTree>),
}

impl DependencyTree {
    /// Every reference in the tree, depth first.
    pub fn leaves(&self) -> Vec<&Dependency> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a Dependency>) {
        match self {
            Self::Leaf(dependency) => leaves.push(dependency),
            Self::Array(children) => {
                for child in children.iter().flatten() {
                    child.collect_leaves(leaves);
                }
            }
            Self::Object(children) => {
                for child in children.values() {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    /// Re-reads every reference. Returns `true` when any resolves to a new
    /// value.
    pub(crate) fn refresh(&self) -> bool {
        self.leaves()
            .into_iter()
            .fold(false, |changed, dependency| dependency.refresh() || changed)
    }
}

/// Scans `value` for references to other stores.
///
/// Returns `None` when there are none, which is the common case.
pub fn get_dependencies(value: &Value) -> Option<DependencyTree> {
    match value {
        Value::Ref(state) => Some(DependencyTree::Leaf(Dependency::new(state.clone()))),
        Value::Array(items) => {
            let children: Vec<Option<DependencyTree>> =
                items.iter().map(get_dependencies).collect();
            children
                .iter()
                .any(Option::is_some)
                .then_some(DependencyTree::Array(children))
        }
        Value::Object(fields) => {
            let children: BTreeMap<Rc<str>, DependencyTree> = fields
                .iter()
                .filter_map(|(key, field)| Some((Rc::clone(key), get_dependencies(field)?)))
                .collect();
            (!children.is_empty()).then_some(DependencyTree::Object(children))
        }
        _ => None,
    }
}

/// Replaces the references in `value` that `tree` describes with what they
/// resolved to.
///
/// Branches without references are shared with `value`.
pub fn denormalize_state(value: &Value, tree: &DependencyTree) -> Value {
    match (tree, value) {
        (DependencyTree::Leaf(dependency), _) => dependency.resolved(),
        (DependencyTree::Array(children), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(position, item)| match children.get(position) {
                Some(Some(child)) => denormalize_state(item, child),
                _ => item.clone(),
            })
            .collect(),
        (DependencyTree::Object(children), Value::Object(fields)) => {
            let mut fields = (**fields).clone();
            for (key, child) in children {
                if let Some(field) = fields.get_mut(key) {
                    *field = denormalize_state(field, child);
                }
            }
            Value::from(fields)
        }
        _ => value.clone(),
    }
}
