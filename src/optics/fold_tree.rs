//! Resolution of fold selections into the array positions a write may touch.
//!
//! A write through `items.map().reduce(..).field("name")` must only rewrite the
//! element the fold picked. The write interpreter cannot run the fold itself
//! (it walks the source one branch at a time), so before writing, the chain is
//! replayed as a read that remembers, for every focused value, the positions it
//! was reached through at each `Map`. The positions that survive the last fold
//! become a [`FoldTree`].

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::optics::step::{LensStep, StepKind};
use crate::value::Value;

/// Positions selected by the folds of a chain, nested by `Map` level.
///
/// Each level maps a position in the array traversed by a `Map` to the
/// positions selected below it. A node is `open` when every position below it
/// is writable, which happens for `Map` steps after the last fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldTree {
    children: FxHashMap<usize, FoldTree>,
    open: bool,
}

impl FoldTree {
    /// The subtree for `position`, or `None` when the position was not
    /// selected.
    pub fn child(&self, position: usize) -> Option<&Self> {
        self.children.get(&position)
    }

    /// Returns `true` when no fold restricts the positions below this node.
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Returns `true` when nothing at all was selected below this node.
    pub fn is_empty(&self) -> bool {
        !self.open && self.children.is_empty()
    }

    fn insert(&mut self, path: &[usize]) {
        match path.split_first() {
            None => self.open = true,
            Some((position, rest)) => self.children.entry(*position).or_default().insert(rest),
        }
    }
}

type Path = SmallVec<[usize; 4]>;

#[derive(Clone)]
struct Cursor {
    value: Value,
    path: Path,
}

/// Replays `steps` over `source` and collects the positions the folds select.
///
/// Returns `None` for chains without a fold, which write to every focused
/// element.
pub fn resolve(source: &Value, steps: &[LensStep]) -> Option<FoldTree> {
    let last_fold = steps.iter().rposition(LensStep::is_fold)?;

    let mut cursors = vec![Cursor {
        value: source.clone(),
        path: Path::new(),
    }];
    let mut in_traversal = false;

    for (index, step) in steps[..=last_fold].iter().enumerate() {
        cursors = match step.kind() {
            StepKind::Map => {
                in_traversal = true;
                cursors.iter().flat_map(|cursor| fan_out(cursor, step)).collect()
            }
            StepKind::Fold => {
                in_traversal = false;
                step.select_one(&values(&cursors))
                    .map(|position| cursors.swap_remove(position))
                    .into_iter()
                    .collect()
            }
            StepKind::FoldN => {
                in_traversal = true;
                step.select_many(&values(&cursors))
                    .into_iter()
                    .map(|position| cursors[position].clone())
                    .collect()
            }
            StepKind::Plain | StepKind::Nullable | StepKind::Unstable => cursors
                .into_iter()
                .map(|cursor| Cursor {
                    value: step.get(&cursor.value),
                    path: cursor.path,
                })
                .collect(),
        };

        if let Some(next) = steps.get(index + 1)
            && !next.is_fold()
            && (in_traversal || !next.tolerates_nullish())
        {
            cursors.retain(|cursor| !cursor.value.is_nullish());
        }
    }

    let mut tree = FoldTree::default();
    for cursor in &cursors {
        tree.insert(&cursor.path);
    }
    Some(tree)
}

fn fan_out(cursor: &Cursor, step: &LensStep) -> Vec<Cursor> {
    let Value::Array(items) = step.get(&cursor.value) else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let mut path = cursor.path.clone();
            path.push(position);
            Cursor {
                value: item.clone(),
                path,
            }
        })
        .collect()
}

fn values(cursors: &[Cursor]) -> Vec<Value> {
    cursors.iter().map(|cursor| cursor.value.clone()).collect()
}
