//! Optic chains and the builder methods that extend them.
//!
//! An [`Optic`] is an ordered, immutable list of [`LensStep`]s plus the
//! [`Modifier`] derived from them. Extending a chain never touches the original:
//! every builder method returns a new chain.
//!
//! The builder methods live on the [`Derive`] trait so that store-rooted optics
//! ([`State`](crate::State)) extend the same way detached ones do.
//!
//! # Examples
//!
//! ```
//! use refract::{Derive, Modifier, Optic, value};
//!
//! let durabilities = Optic::new().field("items").map().field("durability");
//! assert_eq!(durabilities.modifier(), Modifier::Mapped);
//!
//! let inventory = value!({
//!     items: [
//!         { durability: 12 },
//!         { durability: 6 },
//!     ],
//! });
//! assert_eq!(durabilities.get(&inventory), value!([12, 6]));
//!
//! let repaired = durabilities.update(&inventory, |durability| {
//!     durability.as_f64().map_or(durability.clone(), |d| (d + 1.0).into())
//! });
//! assert_eq!(durabilities.get(&repaired), value!([13, 7]));
//! ```

use std::fmt;
use std::rc::Rc;

use crate::error::{OpticError, OpticResult};
use crate::optics::Modifier;
use crate::optics::step::{CustomStep, LensStep, ReduceValue, StepKind};
use crate::optics::traversal::{self, Update};
use crate::value::Value;

/// Builder methods shared by every kind of optic.
///
/// Implementors provide access to their steps and a way to rebuild themselves
/// around a longer chain; everything else is derived from [`try_derive`] and
/// [`try_splice`].
///
/// [`try_derive`]: Derive::try_derive
/// [`try_splice`]: Derive::try_splice
pub trait Derive: Sized {
    /// The steps of the chain, root first.
    fn steps(&self) -> &[LensStep];

    /// The chain's modifier.
    fn modifier(&self) -> Modifier;

    /// Rebuilds this optic around `steps`, whose modifier has been validated.
    fn rebuild(&self, steps: Rc<[LensStep]>, modifier: Modifier) -> Self;

    /// Appends several steps.
    ///
    /// # Errors
    ///
    /// Returns [`OpticError::NotMapped`] when a fold step would be appended to
    /// a chain that does not traverse.
    fn try_splice<I>(&self, steps: I) -> OpticResult<Self>
    where
        I: IntoIterator<Item = LensStep>,
    {
        let mut chain = self.steps().to_vec();
        let start = chain.len();
        chain.extend(steps);
        let modifier = self.modifier().through(&chain[start..])?;
        Ok(self.rebuild(chain.into(), modifier))
    }

    /// Appends one step.
    ///
    /// # Errors
    ///
    /// Returns [`OpticError::NotMapped`] when `step` is a fold and this optic
    /// does not traverse.
    fn try_derive(&self, step: LensStep) -> OpticResult<Self> {
        self.try_splice(std::iter::once(step))
    }

    /// Appends one step.
    ///
    /// # Panics
    ///
    /// Panics when `step` is a fold and this optic does not traverse.
    #[track_caller]
    fn derive(&self, step: LensStep) -> Self {
        self.try_derive(step).unwrap_or_else(|error| panic!("{error}"))
    }

    /// Appends another chain's steps.
    ///
    /// The result's modifier is recomputed over the appended steps rather
    /// than taken as `self.modifier().combine(other.modifier())`. The two
    /// agree unless `other` contains a fold that closes this chain's
    /// traversal: `map()` composed with `map().first()` is `Partial`, since
    /// its read is a single element, not an array.
    ///
    /// # Panics
    ///
    /// Panics when `other` starts with a fold and this optic does not traverse.
    ///
    /// # Example
    ///
    /// ```
    /// use refract::{Derive, Optic, value};
    ///
    /// let address = Optic::new().field("address");
    /// let street = Optic::new().field("street");
    /// let composed = address.compose(&street);
    ///
    /// let manual = Optic::new().field("address").field("street");
    /// let person = value!({ address: { street: "Main St" } });
    ///
    /// assert_eq!(composed.get(&person), manual.get(&person));
    /// assert_eq!(composed.modifier(), manual.modifier());
    /// ```
    #[track_caller]
    fn compose(&self, other: &Optic) -> Self {
        self.try_splice(other.steps().iter().cloned())
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Focuses on an object field that is expected to be present.
    fn field(&self, name: impl Into<Rc<str>>) -> Self {
        self.derive(LensStep::field(name))
    }

    /// Focuses on an object field that may be absent.
    fn field_opt(&self, name: impl Into<Rc<str>>) -> Self {
        self.derive(LensStep::field_opt(name))
    }

    /// Focuses on an array element.
    fn index(&self, index: usize) -> Self {
        self.derive(LensStep::index(index))
    }

    /// Focuses on every element of an array.
    fn map(&self) -> Self {
        self.derive(LensStep::Map)
    }

    /// Appends a user-defined plain step.
    fn custom(&self, step: CustomStep) -> Self {
        self.derive(LensStep::Custom(step))
    }

    /// Substitutes `default` for a nullish focus on read.
    ///
    /// Writes go through unchanged. Because the step accepts nullish input, a
    /// read does not short-circuit before it.
    ///
    /// # Example
    ///
    /// ```
    /// use refract::{Derive, Optic, value};
    ///
    /// let nickname = Optic::new().field_opt("nickname").or_default("anonymous");
    /// assert_eq!(nickname.get(&value!({})), value!("anonymous"));
    /// assert_eq!(nickname.get(&value!({ nickname: "ada" })), value!("ada"));
    /// ```
    fn or_default(&self, default: impl Into<Value>) -> Self {
        let default = default.into();
        self.derive(LensStep::Nullable(CustomStep::new(
            "orDefault",
            move |source: &Value| {
                if source.is_nullish() {
                    default.clone()
                } else {
                    source.clone()
                }
            },
            |value: Value, _: &Value| value,
        )))
    }

    /// Appends a step that converts between representations.
    ///
    /// The getter is expected to build a fresh value on every call, so
    /// subscribers of the resulting optic compare structurally.
    fn convert<G, S>(&self, key: impl Into<Rc<str>>, getter: G, setter: S) -> Self
    where
        G: Fn(&Value) -> Value + 'static,
        S: Fn(Value, &Value) -> Value + 'static,
    {
        self.derive(LensStep::Unstable(CustomStep::new(key, getter, setter)))
    }

    /// Narrows a traversal to the element `selector` picks.
    ///
    /// # Panics
    ///
    /// Panics when this optic does not traverse.
    ///
    /// # Example
    ///
    /// ```
    /// use refract::{Derive, Optic, value};
    ///
    /// let low = Optic::new().map().reduce(|values| {
    ///     values
    ///         .iter()
    ///         .find(|candidate| candidate.value.as_f64().is_some_and(|d| d < 10.0))
    /// });
    ///
    /// let durabilities = value!([12, 6, 2, 7]);
    /// assert_eq!(low.get(&durabilities), value!(6));
    /// ```
    #[track_caller]
    fn reduce<F>(&self, selector: F) -> Self
    where
        F: Fn(&[ReduceValue]) -> Option<&ReduceValue> + 'static,
    {
        self.derive(LensStep::fold(selector))
    }

    /// Fallible form of [`reduce`](Derive::reduce).
    ///
    /// # Errors
    ///
    /// Returns [`OpticError::NotMapped`] when this optic does not traverse.
    fn try_reduce<F>(&self, selector: F) -> OpticResult<Self>
    where
        F: Fn(&[ReduceValue]) -> Option<&ReduceValue> + 'static,
    {
        self.try_derive(LensStep::fold(selector))
    }

    /// Narrows a traversal to the elements `selector` picks.
    ///
    /// # Panics
    ///
    /// Panics when this optic does not traverse.
    #[track_caller]
    fn reduce_n<F>(&self, selector: F) -> Self
    where
        F: Fn(&[ReduceValue]) -> Vec<&ReduceValue> + 'static,
    {
        self.derive(LensStep::fold_n(selector))
    }

    /// Fallible form of [`reduce_n`](Derive::reduce_n).
    ///
    /// # Errors
    ///
    /// Returns [`OpticError::NotMapped`] when this optic does not traverse.
    fn try_reduce_n<F>(&self, selector: F) -> OpticResult<Self>
    where
        F: Fn(&[ReduceValue]) -> Vec<&ReduceValue> + 'static,
    {
        self.try_derive(LensStep::fold_n(selector))
    }

    /// Narrows a traversal to the first element matching `predicate`.
    #[track_caller]
    fn reduce_find<P>(&self, predicate: P) -> Self
    where
        P: Fn(&Value) -> bool + 'static,
    {
        self.reduce(move |values| values.iter().find(|candidate| predicate(&candidate.value)))
    }

    /// Narrows a traversal to every element matching `predicate`, keeping
    /// their positions for writes.
    ///
    /// # Example
    ///
    /// ```
    /// use refract::{Derive, Optic, value};
    ///
    /// let even = Optic::new()
    ///     .map()
    ///     .reduce_filter(|value| value.as_f64().is_some_and(|n| n % 2.0 == 0.0));
    ///
    /// let numbers = value!([12, 6, 2, 7]);
    /// assert_eq!(even.get(&numbers), value!([12, 6, 2]));
    ///
    /// let doubled = even.update(&numbers, |n| n.as_f64().map_or(n.clone(), |n| (n * 2.0).into()));
    /// assert_eq!(doubled, value!([24, 12, 4, 7]));
    /// ```
    #[track_caller]
    fn reduce_filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&Value) -> bool + 'static,
    {
        self.reduce_n(move |values| {
            values
                .iter()
                .filter(|candidate| predicate(&candidate.value))
                .collect()
        })
    }

    /// Narrows a traversal to its first element.
    #[track_caller]
    fn first(&self) -> Self {
        self.reduce(|values| values.first())
    }

    /// Narrows a traversal to its last element.
    #[track_caller]
    fn last(&self) -> Self {
        self.reduce(|values| values.last())
    }

    /// The chain's path, with step keys joined by dots.
    fn path(&self) -> String {
        self.steps()
            .iter()
            .map(|step| step.key())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A detached optic: a chain of steps applied to values passed in by the caller.
#[derive(Clone)]
pub struct Optic {
    steps: Rc<[LensStep]>,
    modifier: Modifier,
}

impl Optic {
    /// Creates the identity optic, which focuses on its whole input.
    pub fn new() -> Self {
        Self {
            steps: Rc::from(Vec::new()),
            modifier: Modifier::Total,
        }
    }

    /// Builds a chain from a list of steps.
    ///
    /// # Errors
    ///
    /// Returns [`OpticError::NotMapped`] when a fold appears outside a traversal.
    pub fn from_steps<I>(steps: I) -> OpticResult<Self>
    where
        I: IntoIterator<Item = LensStep>,
    {
        Self::new().try_splice(steps)
    }

    /// Reads the focus out of `source`.
    ///
    /// Partial optics return `Undefined` when the focus is missing; mapped
    /// optics always return an array.
    pub fn get(&self, source: &Value) -> Value {
        traversal::get(source, &self.steps, self.modifier)
    }

    /// Replaces the focus inside `source`.
    ///
    /// For mapped optics every focused element is replaced. When nothing
    /// changes the result is `source` itself.
    pub fn set(&self, source: &Value, value: impl Into<Value>) -> Value {
        traversal::set(source, Update::Replace(value.into()), &self.steps)
    }

    /// Applies `function` to the focus inside `source`.
    ///
    /// For mapped optics `function` runs once per focused element.
    pub fn update<F>(&self, source: &Value, mut function: F) -> Value
    where
        F: FnMut(&Value) -> Value,
    {
        traversal::set(source, Update::Apply(&mut function), &self.steps)
    }

    pub(crate) fn apply(&self, source: &Value, update: Update<'_>) -> Value {
        traversal::set(source, update, &self.steps)
    }

    /// Returns `true` when the chain contains an `Unstable` step.
    pub fn is_unstable(&self) -> bool {
        self.steps
            .iter()
            .any(|step| step.kind() == StepKind::Unstable)
    }

    /// Whether a subscriber should be told that the focus moved from
    /// `previous` to `next`.
    pub(crate) fn focus_changed(&self, previous: &Value, next: &Value) -> bool {
        if self.is_unstable() {
            previous != next
        } else if self.modifier.is_mapped() {
            !previous.shallow_same(next)
        } else {
            !previous.same(next)
        }
    }
}

impl Default for Optic {
    fn default() -> Self {
        Self::new()
    }
}

impl Derive for Optic {
    fn steps(&self) -> &[LensStep] {
        &self.steps
    }

    fn modifier(&self) -> Modifier {
        self.modifier
    }

    fn rebuild(&self, steps: Rc<[LensStep]>, modifier: Modifier) -> Self {
        Self { steps, modifier }
    }
}

impl fmt::Debug for Optic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Optic")
            .field("path", &self.path())
            .field("modifier", &self.modifier)
            .finish()
    }
}

impl TryFrom<Vec<LensStep>> for Optic {
    type Error = OpticError;

    fn try_from(steps: Vec<LensStep>) -> Result<Self, Self::Error> {
        Self::from_steps(steps)
    }
}
