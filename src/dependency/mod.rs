//! Cross-store references and their resolution.
//!
//! A stored value may embed [`State`](crate::State)s rooted in other stores
//! (as [`Value::Ref`](crate::Value::Ref)). Reading it "normalized" returns the
//! references as they are; reading it "denormalized" replaces each one with
//! what it currently resolves to.
//!
//! Every optic instance owns a tracker that caches its last denormalized read
//! and, while it has denormalized subscribers, listens to every store its
//! focus references, directly or through other references. Swapping a
//! reference for another moves those listeners to the new stores.
//!
//! References may form cycles. A read that comes back to an optic it is
//! still resolving reads that optic's normalized focus, and repeated reads
//! return the same cached value until a store changes.
//!
//! # Example
//!
//! ```
//! use refract::dependency::{denormalize_state, get_dependencies};
//! use refract::{create_state, value};
//!
//! let city = create_state(value!({ inhabitants: 1000 }));
//! let row = value!({ name: "Ada", city: (city.clone()) });
//!
//! let tree = get_dependencies(&row).expect("row references a city");
//! assert_eq!(tree.leaves().len(), 1);
//! assert_eq!(
//!     denormalize_state(&row, &tree),
//!     value!({ name: "Ada", city: { inhabitants: 1000 } })
//! );
//! assert!(get_dependencies(&value!({ name: "Grace" })).is_none());
//! ```

mod hub;
mod resolution;
mod tracker;
mod tree;

pub use tree::Dependency;
pub use tree::DependencyTree;
pub use tree::denormalize_state;
pub use tree::get_dependencies;

pub(crate) use tracker::Tracker;
