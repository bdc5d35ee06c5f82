//! Read and write interpreters over a chain of lens steps.
//!
//! Both interpreters walk the step list recursively. Reads carry an
//! `in_traversal` flag: once a `Map` has fanned out, the current value is the
//! array of focused elements and plain steps apply element-wise, while a
//! `Fold` collapses the array back to a single focus.
//!
//! Writes rebuild only the path they touch. Every level compares the rebuilt
//! child with the original by reference and hands back the untouched parent
//! when nothing changed, so a write that changes nothing returns its input.
//!
//! Null handling follows two rules that are easy to get backwards:
//!
//! - inside a traversal, nullish elements are dropped before the next step,
//!   except when that step is a fold, which must see the gaps so positions
//!   line up with the source array;
//! - outside a traversal, a nullish focus ends the read, except when the next
//!   step is `Nullable`.

use std::rc::Rc;

use crate::optics::Modifier;
use crate::optics::fold_tree::{self, FoldTree};
use crate::optics::step::{LensStep, StepKind};
use crate::value::Value;

/// What a write does at the focus.
pub enum Update<'a> {
    /// Replaces the focus.
    Replace(Value),
    /// Computes the new focus from the current one.
    Apply(&'a mut dyn FnMut(&Value) -> Value),
}

impl Update<'_> {
    fn apply(&mut self, current: &Value) -> Value {
        match self {
            Self::Replace(value) => value.clone(),
            Self::Apply(function) => function(current),
        }
    }
}

thread_local! {
    static EMPTY: Value = Value::array([]);
}

/// Reads the focus of `steps` out of `source`.
///
/// A mapped chain never returns a nullish value: an empty traversal reads as
/// an empty array. The empty array is shared, so repeated empty reads are the
/// same reference.
pub fn get(source: &Value, steps: &[LensStep], modifier: Modifier) -> Value {
    let focus = get_focus(source, steps, false);
    if focus.is_nullish() && modifier.is_mapped() {
        EMPTY.with(Value::clone)
    } else {
        focus
    }
}

fn get_focus(value: &Value, steps: &[LensStep], in_traversal: bool) -> Value {
    let Some((step, rest)) = steps.split_first() else {
        return value.clone();
    };
    let next = rest.first();

    match step.kind() {
        StepKind::Map => {
            let elements = if in_traversal {
                flatten(value, step)
            } else {
                match step.get(value) {
                    Value::Array(items) => items,
                    _ => return Value::Undefined,
                }
            };
            match retain_focused(elements, next) {
                Some(items) => get_focus(&Value::Array(items), rest, true),
                None => Value::Undefined,
            }
        }
        StepKind::Fold => {
            let Some(items) = value.as_array() else {
                return Value::Undefined;
            };
            match step.select_one(items) {
                Some(position) => get_focus(&items[position], rest, false),
                None => Value::Undefined,
            }
        }
        StepKind::FoldN => {
            let Some(items) = value.as_array() else {
                return Value::Undefined;
            };
            let selected = step
                .select_many(items)
                .into_iter()
                .map(|position| items[position].clone());
            get_focus(&Value::array(selected), rest, true)
        }
        StepKind::Plain | StepKind::Nullable | StepKind::Unstable => {
            if in_traversal {
                let Some(items) = value.as_array() else {
                    return Value::Undefined;
                };
                let focused = Rc::new(items.iter().map(|item| step.get(item)).collect());
                match retain_focused(focused, next) {
                    Some(items) => get_focus(&Value::Array(items), rest, true),
                    None => Value::Undefined,
                }
            } else {
                let focus = step.get(value);
                if focus.is_nullish() && !next.is_some_and(LensStep::tolerates_nullish) {
                    return focus;
                }
                get_focus(&focus, rest, false)
            }
        }
    }
}

/// Concatenates the arrays a `Map` step reads out of each traversed element.
fn flatten(value: &Value, step: &LensStep) -> Rc<Vec<Value>> {
    let mut flattened = Vec::new();
    for element in value.as_array().unwrap_or_default() {
        if let Value::Array(inner) = step.get(element) {
            flattened.extend(inner.iter().cloned());
        }
    }
    Rc::new(flattened)
}

/// Drops nullish elements unless `next` is a fold, then treats an empty
/// traversal as no focus at all.
///
/// When nothing is dropped the original allocation is kept.
fn retain_focused(items: Rc<Vec<Value>>, next: Option<&LensStep>) -> Option<Rc<Vec<Value>>> {
    let keep_gaps = next.is_some_and(LensStep::is_fold);
    let items = if !keep_gaps && items.iter().any(Value::is_nullish) {
        Rc::new(
            items
                .iter()
                .filter(|item| !item.is_nullish())
                .cloned()
                .collect(),
        )
    } else {
        items
    };
    (!items.is_empty()).then_some(items)
}

/// Writes through `steps` into `source`.
///
/// Chains with a fold first resolve which elements the fold selects, so only
/// those branches are rewritten.
pub fn set(source: &Value, update: Update<'_>, steps: &[LensStep]) -> Value {
    let tree = fold_tree::resolve(source, steps);
    let mut update = update;
    set_focus(source, &mut update, steps, tree.as_ref())
}

fn set_focus(
    value: &Value,
    update: &mut Update<'_>,
    steps: &[LensStep],
    tree: Option<&FoldTree>,
) -> Value {
    let Some((step, rest)) = steps.split_first() else {
        return update.apply(value);
    };

    match step.kind() {
        StepKind::Fold | StepKind::FoldN => set_focus(value, update, rest, tree),
        _ if value.is_nullish() && !step.tolerates_nullish() => value.clone(),
        StepKind::Map => {
            let Value::Array(items) = step.get(value) else {
                return value.clone();
            };
            let tree = tree.filter(|tree| !tree.is_open());
            let mut changed = false;
            let rewritten: Vec<Value> = items
                .iter()
                .enumerate()
                .map(|(position, item)| {
                    let branch = match tree {
                        Some(tree) => match tree.child(position) {
                            Some(branch) => Some(branch),
                            None => return item.clone(),
                        },
                        None if item.is_nullish() => return item.clone(),
                        None => None,
                    };
                    let next = set_focus(item, update, rest, branch);
                    changed |= !next.same(item);
                    next
                })
                .collect();
            if changed {
                step.set(Value::from(rewritten), value)
            } else {
                value.clone()
            }
        }
        StepKind::Plain | StepKind::Nullable | StepKind::Unstable => {
            let slice = step.get(value);
            let next = set_focus(&slice, update, rest, tree);
            if next.same(&slice) {
                value.clone()
            } else {
                step.set(next, value)
            }
        }
    }
}
