//! # refract
//!
//! Composable optics over immutable values, and reactive stores built on them.
//!
//! ## Overview
//!
//! - **Values**: [`Value`] is a dynamic, immutable tree whose arrays and
//!   objects are reference counted, so unchanged branches are shared between
//!   versions and change detection is a pointer comparison.
//! - **Optics**: an [`Optic`] is a chain of [`LensStep`]s that reads and
//!   rewrites a focus inside a value. Chains are total, partial or mapped
//!   (see [`Modifier`]); mapped chains traverse arrays and can be narrowed
//!   back down with folds.
//! - **Stores**: [`create_state`] creates a store and returns a [`State`], an
//!   optic rooted in it. States read, write and subscribe; listeners only run
//!   when their own focus changes.
//! - **Dependencies**: values may embed states from other stores. Reads and
//!   subscriptions resolve them transparently (see [`dependency`]).
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize` and `Deserialize` for [`Value`]
//!
//! ## Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use refract::prelude::*;
//!
//! let city = create_state(value!({ name: "Lyon", inhabitants: 1000 }));
//! let person = create_state(value!({ name: "Ada", city: (city.clone()) }));
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let subscription = person.field("city").subscribe({
//!     let seen = Rc::clone(&seen);
//!     move |city| seen.borrow_mut().push(city.clone())
//! });
//!
//! city.field("inhabitants").update(|n| (n.as_f64().unwrap_or(0.0) + 1.0).into());
//!
//! assert_eq!(
//!     *seen.borrow(),
//!     [value!({ name: "Lyon", inhabitants: 1001 })]
//! );
//! subscription.unsubscribe();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use refract::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{OpticError, OpticResult};
    pub use crate::optics::{Derive, LensStep, Modifier, Optic};
    pub use crate::store::{
        GetOptions, State, StateOptions, SubscribeOptions, Subscription, create_state,
        create_state_with,
    };
    pub use crate::value;
    pub use crate::value::Value;
}

pub mod dependency;
pub mod error;
pub mod optics;
pub mod store;
pub mod value;

pub use error::{OpticError, OpticResult};
pub use optics::{CustomStep, Derive, LensStep, Modifier, Optic, ReduceValue, StepKind};
pub use store::{
    GetOptions, State, StateOptions, StoreId, SubscribeOptions, Subscription, create_state,
    create_state_with,
};
pub use value::{Value, ValueKind};
