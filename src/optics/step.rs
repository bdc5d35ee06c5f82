//! Lens steps: the single traversal instructions an optic is made of.
//!
//! A step knows how to read one level down from a value and how to write a new
//! child back into its parent. Plain steps (`Field`, `OptionalField`, `Index`,
//! `Custom`) address one child. `Map` fans out over an array, and `Fold` /
//! `FoldN` narrow that fan-out back down. `Nullable` and `Unstable` are custom
//! steps with a special contract:
//!
//! - a `Nullable` getter accepts a nullish input, so reads and writes do not
//!   short-circuit before it;
//! - an `Unstable` getter builds a fresh value on every call, so subscribers
//!   compare its focus structurally instead of by reference.
//!
//! # Examples
//!
//! ```
//! use refract::{LensStep, value};
//!
//! let step = LensStep::field("name");
//! let person = value!({ name: "Ada" });
//!
//! assert_eq!(step.get(&person), value!("Ada"));
//! assert_eq!(step.set(value!("Grace"), &person), value!({ name: "Grace" }));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::optics::Modifier;
use crate::value::Value;

/// How many missing elements an index write may fill with `Undefined`.
pub const MAX_INDEX_GAP: usize = 4096;

/// Reads the child a step focuses on.
pub type Getter = Rc<dyn Fn(&Value) -> Value>;

/// Writes a new child into a parent, returning the new parent.
pub type Setter = Rc<dyn Fn(Value, &Value) -> Value>;

/// Picks one element out of the values a traversal currently focuses on.
pub type FoldSelector = Rc<dyn Fn(&[ReduceValue]) -> Option<&ReduceValue>>;

/// Picks any number of elements out of the values a traversal focuses on.
pub type FoldNSelector = Rc<dyn Fn(&[ReduceValue]) -> Vec<&ReduceValue>>;

/// Positions chosen by a fold selector.
pub(crate) type Positions = SmallVec<[usize; 8]>;

/// One element handed to a fold selector.
///
/// Selectors work over plain slices and return references into them; the
/// position each `ReduceValue` carries lets the engine map the choice back to
/// the element it came from.
#[derive(Debug, Clone)]
pub struct ReduceValue {
    /// The focused element. Nullish elements are included so positions line up.
    pub value: Value,
    position: usize,
}

impl ReduceValue {
    /// Position of this element in the slice passed to the selector.
    pub const fn position(&self) -> usize {
        self.position
    }

    fn wrap(values: &[Value]) -> Vec<Self> {
        values
            .iter()
            .enumerate()
            .map(|(position, value)| Self {
                value: value.clone(),
                position,
            })
            .collect()
    }
}

/// A user-defined step.
///
/// # Example
///
/// ```
/// use refract::{CustomStep, Value, value};
///
/// // Focus on the first character of a string.
/// let initial = CustomStep::new(
///     "initial",
///     |source: &Value| {
///         source
///             .as_str()
///             .and_then(|text| text.chars().next())
///             .map_or(Value::Undefined, |first| Value::from(first.to_string()))
///     },
///     |first: Value, source: &Value| {
///         let rest: String = source.as_str().unwrap_or_default().chars().skip(1).collect();
///         Value::from(format!("{}{rest}", first.as_str().unwrap_or_default()))
///     },
/// )
/// .partial();
///
/// assert_eq!(initial.get(&value!("hello")), value!("h"));
/// assert_eq!(initial.set(value!("j"), &value!("hello")), value!("jello"));
/// ```
#[derive(Clone)]
pub struct CustomStep {
    key: Rc<str>,
    getter: Getter,
    setter: Setter,
    modifier: Modifier,
}

impl CustomStep {
    /// Creates a total custom step.
    pub fn new<G, S>(key: impl Into<Rc<str>>, getter: G, setter: S) -> Self
    where
        G: Fn(&Value) -> Value + 'static,
        S: Fn(Value, &Value) -> Value + 'static,
    {
        Self {
            key: key.into(),
            getter: Rc::new(getter),
            setter: Rc::new(setter),
            modifier: Modifier::Total,
        }
    }

    /// Marks the step as possibly resolving to nothing.
    #[must_use]
    pub fn partial(mut self) -> Self {
        self.modifier = Modifier::Partial;
        self
    }

    /// The step's key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the focus.
    pub fn get(&self, source: &Value) -> Value {
        (self.getter)(source)
    }

    /// Writes the focus.
    pub fn set(&self, value: Value, source: &Value) -> Value {
        (self.setter)(value, source)
    }
}

impl fmt::Debug for CustomStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CustomStep")
            .field("key", &self.key)
            .field("modifier", &self.modifier)
            .finish_non_exhaustive()
    }
}

/// The kind of a [`LensStep`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Structural access to one child.
    Plain,
    /// Traversal over every element of an array.
    Map,
    /// Narrowing of a traversal to one element.
    Fold,
    /// Narrowing of a traversal to a sub-selection.
    FoldN,
    /// A custom step that accepts nullish input.
    Nullable,
    /// A custom step that returns a fresh value on every read.
    Unstable,
}

impl StepKind {
    /// A short name for the kind, used in errors and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Map => "map",
            Self::Fold => "fold",
            Self::FoldN => "foldN",
            Self::Nullable => "nullable",
            Self::Unstable => "unstable",
        }
    }
}

/// A single, immutable traversal instruction.
#[derive(Clone)]
pub enum LensStep {
    /// An object field that is expected to be present.
    Field(Rc<str>),
    /// An object field that may be absent.
    OptionalField(Rc<str>),
    /// An array element.
    Index(usize),
    /// A user-defined plain step.
    Custom(CustomStep),
    /// Every element of an array.
    Map,
    /// One element chosen from a traversal.
    Fold(FoldSelector),
    /// A sub-selection of a traversal.
    FoldN(FoldNSelector),
    /// A user-defined step whose getter accepts nullish input.
    Nullable(CustomStep),
    /// A user-defined step whose getter returns a fresh value on every call.
    Unstable(CustomStep),
}

impl LensStep {
    /// Creates a [`LensStep::Field`] step.
    pub fn field(name: impl Into<Rc<str>>) -> Self {
        Self::Field(name.into())
    }

    /// Creates a [`LensStep::OptionalField`] step.
    pub fn field_opt(name: impl Into<Rc<str>>) -> Self {
        Self::OptionalField(name.into())
    }

    /// Creates a [`LensStep::Index`] step.
    pub const fn index(index: usize) -> Self {
        Self::Index(index)
    }

    /// Creates a [`LensStep::Fold`] step.
    pub fn fold<F>(selector: F) -> Self
    where
        F: Fn(&[ReduceValue]) -> Option<&ReduceValue> + 'static,
    {
        Self::Fold(Rc::new(selector))
    }

    /// Creates a [`LensStep::FoldN`] step.
    pub fn fold_n<F>(selector: F) -> Self
    where
        F: Fn(&[ReduceValue]) -> Vec<&ReduceValue> + 'static,
    {
        Self::FoldN(Rc::new(selector))
    }

    /// The step's kind.
    pub const fn kind(&self) -> StepKind {
        match self {
            Self::Field(_) | Self::OptionalField(_) | Self::Index(_) | Self::Custom(_) => {
                StepKind::Plain
            }
            Self::Map => StepKind::Map,
            Self::Fold(_) => StepKind::Fold,
            Self::FoldN(_) => StepKind::FoldN,
            Self::Nullable(_) => StepKind::Nullable,
            Self::Unstable(_) => StepKind::Unstable,
        }
    }

    /// The step's key, as it appears in an optic's path.
    pub fn key(&self) -> Cow<'_, str> {
        match self {
            Self::Field(name) | Self::OptionalField(name) => Cow::Borrowed(&**name),
            Self::Index(index) => Cow::Owned(index.to_string()),
            Self::Custom(step) | Self::Nullable(step) | Self::Unstable(step) => {
                Cow::Borrowed(step.key())
            }
            Self::Map | Self::Fold(_) | Self::FoldN(_) => Cow::Borrowed(self.kind().name()),
        }
    }

    /// What this step alone contributes to an optic's modifier.
    pub const fn contribution(&self) -> Modifier {
        match self {
            Self::Field(_) => Modifier::Total,
            Self::OptionalField(_) | Self::Index(_) | Self::Fold(_) => Modifier::Partial,
            Self::Custom(step) | Self::Nullable(step) | Self::Unstable(step) => step.modifier,
            Self::Map | Self::FoldN(_) => Modifier::Mapped,
        }
    }

    /// Returns `true` for `Fold` and `FoldN`.
    pub const fn is_fold(&self) -> bool {
        matches!(self, Self::Fold(_) | Self::FoldN(_))
    }

    /// Returns `true` when the getter accepts a nullish input.
    pub const fn tolerates_nullish(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    /// Reads the child this step focuses on.
    ///
    /// `Map`, `Fold` and `FoldN` return their input: the array itself is what
    /// they traverse.
    pub fn get(&self, source: &Value) -> Value {
        match self {
            Self::Field(name) | Self::OptionalField(name) => {
                source.get(name).cloned().unwrap_or_default()
            }
            Self::Index(index) => source.at(*index).cloned().unwrap_or_default(),
            Self::Custom(step) | Self::Nullable(step) | Self::Unstable(step) => step.get(source),
            Self::Map | Self::Fold(_) | Self::FoldN(_) => source.clone(),
        }
    }

    /// Writes `value` as this step's child of `source`.
    ///
    /// Field steps leave non-object parents untouched and index steps leave
    /// non-array parents untouched. Writing past the end of an array pads it
    /// with `Undefined`, up to [`MAX_INDEX_GAP`] missing elements; a write
    /// further out leaves the array untouched.
    pub fn set(&self, value: Value, source: &Value) -> Value {
        match self {
            Self::Field(name) | Self::OptionalField(name) => match source {
                Value::Object(fields) => {
                    let mut fields = (**fields).clone();
                    fields.insert(Rc::clone(name), value);
                    Value::from(fields)
                }
                _ => source.clone(),
            },
            Self::Index(index) => match source {
                Value::Array(items) if index.saturating_sub(items.len()) <= MAX_INDEX_GAP => {
                    let mut items = (**items).clone();
                    if *index >= items.len() {
                        items.resize(*index + 1, Value::Undefined);
                    }
                    items[*index] = value;
                    Value::from(items)
                }
                _ => source.clone(),
            },
            Self::Custom(step) | Self::Nullable(step) | Self::Unstable(step) => {
                step.set(value, source)
            }
            Self::Map | Self::Fold(_) | Self::FoldN(_) => value,
        }
    }

    /// Runs a `Fold` selector over `candidates`.
    ///
    /// Returns `None` for any other kind of step.
    pub(crate) fn select_one(&self, candidates: &[Value]) -> Option<usize> {
        let Self::Fold(selector) = self else {
            return None;
        };
        let wrapped = ReduceValue::wrap(candidates);
        selector(&wrapped)
            .map(ReduceValue::position)
            .filter(|position| *position < candidates.len())
    }

    /// Runs a `FoldN` selector over `candidates`, in the order it returned them.
    ///
    /// Returns no positions for any other kind of step.
    pub(crate) fn select_many(&self, candidates: &[Value]) -> Positions {
        let Self::FoldN(selector) = self else {
            return Positions::new();
        };
        let wrapped = ReduceValue::wrap(candidates);
        selector(&wrapped)
            .into_iter()
            .map(ReduceValue::position)
            .filter(|position| *position < candidates.len())
            .collect()
    }
}

impl fmt::Debug for LensStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => formatter.debug_tuple("Field").field(name).finish(),
            Self::OptionalField(name) => formatter.debug_tuple("OptionalField").field(name).finish(),
            Self::Index(index) => formatter.debug_tuple("Index").field(index).finish(),
            Self::Custom(step) => formatter.debug_tuple("Custom").field(step).finish(),
            Self::Map => formatter.write_str("Map"),
            Self::Fold(_) => formatter.debug_tuple("Fold").finish_non_exhaustive(),
            Self::FoldN(_) => formatter.debug_tuple("FoldN").finish_non_exhaustive(),
            Self::Nullable(step) => formatter.debug_tuple("Nullable").field(step).finish(),
            Self::Unstable(step) => formatter.debug_tuple("Unstable").field(step).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;
    use rstest::rstest;

    #[rstest]
    fn test_field_get_missing_is_undefined() {
        let step = LensStep::field("missing");
        assert!(step.get(&value!({ present: 1 })).is_undefined());
        assert!(step.get(&value!(12)).is_undefined());
    }

    #[rstest]
    fn test_field_set_keeps_siblings_shared() {
        let sibling = value!([1, 2, 3]);
        let source = Value::object([("kept", sibling.clone()), ("changed", value!(1))]);

        let updated = LensStep::field("changed").set(value!(2), &source);

        assert_eq!(updated.get("changed"), Some(&value!(2)));
        assert!(updated.get("kept").is_some_and(|kept| kept.same(&sibling)));
    }

    #[rstest]
    fn test_field_set_on_scalar_is_noop() {
        let source = value!(5);
        assert!(LensStep::field("a").set(value!(1), &source).same(&source));
    }

    #[rstest]
    #[case(usize::MAX)]
    #[case(MAX_INDEX_GAP + 2)]
    fn test_index_set_far_past_end_is_noop(#[case] index: usize) {
        let source = value!([1]);
        assert!(LensStep::index(index).set(value!(9), &source).same(&source));
    }

    #[rstest]
    fn test_index_set_pads_up_to_gap_limit() {
        let updated = LensStep::index(MAX_INDEX_GAP + 1).set(value!(9), &value!([1]));
        assert_eq!(updated.as_array().map(<[Value]>::len), Some(MAX_INDEX_GAP + 2));
    }

    #[rstest]
    fn test_index_set_pads_with_undefined() {
        let updated = LensStep::index(3).set(value!(9), &value!([1]));
        assert_eq!(updated, value!([1, undefined, undefined, 9]));
    }

    #[rstest]
    #[case(LensStep::field("a"), StepKind::Plain, Modifier::Total)]
    #[case(LensStep::field_opt("a"), StepKind::Plain, Modifier::Partial)]
    #[case(LensStep::index(0), StepKind::Plain, Modifier::Partial)]
    #[case(LensStep::Map, StepKind::Map, Modifier::Mapped)]
    fn test_kind_and_contribution(
        #[case] step: LensStep,
        #[case] kind: StepKind,
        #[case] contribution: Modifier,
    ) {
        assert_eq!(step.kind(), kind);
        assert_eq!(step.contribution(), contribution);
    }

    #[rstest]
    fn test_select_one_returns_position() {
        let step = LensStep::fold(|values| {
            values
                .iter()
                .find(|candidate| candidate.value.as_f64().is_some_and(|number| number < 10.0))
        });
        let candidates = [value!(12), value!(6), value!(2)];
        assert_eq!(step.select_one(&candidates), Some(1));
    }

    #[rstest]
    fn test_select_one_sees_gaps() {
        let step = LensStep::fold(|values| values.iter().find(|candidate| candidate.value.is_nullish()));
        let candidates = [value!(1), Value::Null, value!(3)];
        assert_eq!(step.select_one(&candidates), Some(1));
    }

    #[rstest]
    fn test_select_many_keeps_selector_order() {
        let step = LensStep::fold_n(|values| values.iter().rev().collect());
        let candidates = [value!(1), value!(2), value!(3)];
        assert_eq!(step.select_many(&candidates).as_slice(), &[2, 1, 0]);
    }

    #[rstest]
    fn test_keys() {
        assert_eq!(LensStep::field("name").key(), "name");
        assert_eq!(LensStep::index(4).key(), "4");
        assert_eq!(LensStep::Map.key(), "map");
        assert_eq!(LensStep::fold_n(|values| values.iter().collect()).key(), "foldN");
    }
}
