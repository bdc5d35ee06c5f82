//! Optics over dynamic, immutable values.
//!
//! An optic is a chain of [`LensStep`]s that focuses on a part of a larger
//! [`Value`](crate::Value). Reading through an optic returns the focus; writing
//! through it returns a new root that shares every untouched subtree with the
//! old one.
//!
//! # Modifiers
//!
//! Every chain carries a [`Modifier`]:
//!
//! ```text
//! Total   - always resolves to one value
//! Partial - resolves to one value or to Undefined
//! Mapped  - resolves to zero or more values, read as an array
//! ```
//!
//! `map()` turns a chain into a mapped one, `reduce(..)` narrows it back down to
//! one element and `reduce_n(..)` to a sub-selection that stays mapped.
//!
//! # Example
//!
//! ```
//! use refract::optics::{Derive, Optic};
//! use refract::value;
//!
//! let inventory = value!({
//!     items: [
//!         { name: "sword", durability: 12 },
//!         { name: "shield", durability: 6 },
//!         { name: "bow", durability: 2 },
//!         { name: "axe", durability: 7 },
//!     ],
//! });
//!
//! let worn = Optic::new()
//!     .field("items")
//!     .map()
//!     .field("durability")
//!     .reduce(|values| {
//!         values
//!             .iter()
//!             .find(|candidate| candidate.value.as_f64().is_some_and(|d| d < 10.0))
//!     });
//!
//! assert_eq!(worn.get(&inventory), value!(6));
//!
//! let repaired = worn.update(&inventory, |d| (d.as_f64().unwrap_or(0.0) + 10.0).into());
//! let durabilities = Optic::new().field("items").map().field("durability");
//! assert_eq!(durabilities.get(&repaired), value!([12, 16, 2, 7]));
//!
//! // The untouched root is returned when a write changes nothing.
//! assert!(worn.set(&inventory, 6).same(&inventory));
//! ```

use crate::value::Value;

mod fold_tree;
mod modifier;
mod optic;
mod step;
mod traversal;

pub use fold_tree::FoldTree;
pub use modifier::Modifier;
pub use optic::Derive;
pub use optic::Optic;
pub use step::CustomStep;
pub use step::FoldNSelector;
pub use step::FoldSelector;
pub use step::Getter;
pub use step::LensStep;
pub use step::MAX_INDEX_GAP;
pub use step::ReduceValue;
pub use step::Setter;
pub use step::StepKind;

pub(crate) use traversal::Update;

/// Resolves the positions the folds of `steps` select inside `source`.
///
/// Returns `None` when the chain has no fold.
pub fn resolve_fold_tree(source: &Value, steps: &[LensStep]) -> Option<FoldTree> {
    fold_tree::resolve(source, steps)
}
