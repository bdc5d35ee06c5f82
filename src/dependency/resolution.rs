//! The thread's stack of optic instances whose references are being resolved.
//!
//! A denormalized read of one instance reads the instances its focus
//! references, which may lead back to an instance still being resolved. That
//! inner read is cut short: it returns the normalized focus. Where the cut
//! happens depends on where the outermost read started, so every read records
//! the [`Context`] it ran in, and a cached result is only reused by a read
//! that would cut at the same places.

use std::cell::RefCell;

use rustc_hash::FxHashSet;

use crate::store::Store;

/// Identifies an optic instance by the address of its tracker.
pub(crate) type InstanceId = usize;

/// What one resolution depended on.
#[derive(Default)]
pub(crate) struct Context {
    /// Every instance read while resolving, other than the resolved one.
    reached: FxHashSet<InstanceId>,
    /// The instances of `reached` that were read as normalized because an
    /// outer resolution was already working on them.
    cuts: FxHashSet<InstanceId>,
    /// The stores of every instance in `reached`.
    stores: Vec<Store>,
}

impl Context {
    /// Whether a resolution running inside `stack` would cut at exactly the
    /// same instances.
    pub(crate) fn fits(&self, stack: &FxHashSet<InstanceId>) -> bool {
        self.cuts.iter().all(|id| stack.contains(id))
            && self.reached.iter().filter(|id| stack.contains(id)).count() == self.cuts.len()
    }

    /// Whether both contexts describe the same cuts over the same instances.
    pub(crate) fn same_key(&self, other: &Self) -> bool {
        self.reached == other.reached && self.cuts == other.cuts
    }

    pub(crate) fn stores(&self) -> &[Store] {
        &self.stores
    }

    fn note(&mut self, id: InstanceId, store: &Store) {
        self.reached.insert(id);
        if !self.stores.iter().any(|known| known.ptr_eq(store)) {
            self.stores.push(store.clone());
        }
    }

    fn merge(&mut self, other: &Self) {
        self.reached.extend(other.reached.iter().copied());
        self.cuts.extend(other.cuts.iter().copied());
        for store in &other.stores {
            if !self.stores.iter().any(|known| known.ptr_eq(store)) {
                self.stores.push(store.clone());
            }
        }
    }
}

struct Frame {
    id: InstanceId,
    context: Context,
    cyclic: bool,
}

thread_local! {
    static STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// An open resolution of one instance.
///
/// Dropping it without [`finish`](Resolution::finish) still pops its frame.
pub(crate) struct Resolution {
    finished: bool,
}

impl Resolution {
    /// Opens a resolution of `id`, whose focus lives in `store`.
    ///
    /// Returns the instances already being resolved further out, or `None`
    /// when `id` is one of them. In that case the read is recorded as a cut
    /// and the caller should read the normalized focus.
    pub(crate) fn enter(id: InstanceId, store: &Store) -> Option<(Self, FxHashSet<InstanceId>)> {
        STACK.with_borrow_mut(|stack| {
            if let Some(top) = stack.last_mut() {
                top.context.note(id, store);
            }
            if let Some(open) = stack.iter_mut().find(|frame| frame.id == id) {
                open.cyclic = true;
                if let Some(top) = stack.last_mut() {
                    top.context.cuts.insert(id);
                }
                return None;
            }

            let outer = stack.iter().map(|frame| frame.id).collect();
            stack.push(Frame {
                id,
                context: Context::default(),
                cyclic: false,
            });
            Some((Self { finished: false }, outer))
        })
    }

    /// Closes the resolution and hands what it depended on to the enclosing
    /// one.
    ///
    /// Returns the context, without the resolved instance itself, and whether
    /// a reference led back to it.
    pub(crate) fn finish(mut self) -> (Context, bool) {
        self.finished = true;
        STACK.with_borrow_mut(|stack| {
            let Some(mut frame) = stack.pop() else {
                return (Context::default(), false);
            };
            frame.context.reached.remove(&frame.id);
            frame.context.cuts.remove(&frame.id);
            if let Some(outer) = stack.last_mut() {
                outer.context.merge(&frame.context);
            }
            (frame.context, frame.cyclic)
        })
    }
}

impl Drop for Resolution {
    fn drop(&mut self) {
        if !self.finished {
            STACK.with_borrow_mut(|stack| {
                stack.pop();
            });
        }
    }
}
