//! Dynamic immutable values focused by optics.
//!
//! [`Value`] is the data model every optic reads from and writes into. Composite
//! values (`Array`, `Object`) are reference counted, so cloning a value is O(1)
//! and an update that leaves a subtree alone keeps that subtree's allocation.
//! This structural sharing is what makes reference-based change detection work:
//!
//! - [`Value::same`] compares composites by pointer and scalars by content.
//! - [`PartialEq`] compares structurally.
//!
//! # Examples
//!
//! ```
//! use refract::{Value, value};
//!
//! let city = value!({ name: "Lyon", inhabitants: 1000 });
//! let alias = city.clone();
//!
//! assert!(city.same(&alias));
//! assert_eq!(city.get("inhabitants").and_then(Value::as_f64), Some(1000.0));
//!
//! // Structurally equal, but a different allocation.
//! let copy = value!({ name: "Lyon", inhabitants: 1000 });
//! assert_eq!(city, copy);
//! assert!(!city.same(&copy));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::OpticError;
use crate::store::State;

/// Field map of an object value. Keys iterate in sorted order.
pub type Map = BTreeMap<Rc<str>, Value>;

/// A dynamic, immutable value.
///
/// `Undefined` marks an absent focus (a missing field, an out-of-range index, a
/// fold that selected nothing) and is distinct from an explicit `Null`. Both are
/// "nullish" for the purposes of traversal.
///
/// `Ref` embeds a store-rooted optic, which is how one store refers to data
/// owned by another. See [`crate::dependency`].
#[derive(Clone, Default)]
pub enum Value {
    /// No value at all.
    #[default]
    Undefined,
    /// An explicit empty value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// An immutable string.
    String(Rc<str>),
    /// A point in time, in milliseconds since the Unix epoch. Treated as a leaf.
    Date(i64),
    /// An ordered sequence of values.
    Array(Rc<Vec<Self>>),
    /// A map from field names to values.
    Object(Rc<Map>),
    /// A reference to a focus inside a store.
    Ref(State),
}

/// The kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Undefined`]
    Undefined,
    /// [`Value::Null`]
    Null,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Number`]
    Number,
    /// [`Value::String`]
    String,
    /// [`Value::Date`]
    Date,
    /// [`Value::Array`]
    Array,
    /// [`Value::Object`]
    Object,
    /// [`Value::Ref`]
    Ref,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Date => "date",
            Self::Array => "array",
            Self::Object => "object",
            Self::Ref => "ref",
        };
        formatter.write_str(name)
    }
}

impl Value {
    /// Creates an array value from any sequence of values.
    ///
    /// # Example
    ///
    /// ```
    /// use refract::Value;
    ///
    /// let numbers = Value::array([1, 2, 3].map(Value::from));
    /// assert_eq!(numbers.as_array().map(<[Value]>::len), Some(3));
    /// ```
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self::Array(Rc::new(items.into_iter().collect()))
    }

    /// Creates an object value from `(key, value)` pairs.
    ///
    /// Later duplicates of a key overwrite earlier ones.
    ///
    /// # Example
    ///
    /// ```
    /// use refract::Value;
    ///
    /// let point = Value::object([("x", Value::from(1)), ("y", Value::from(2))]);
    /// assert_eq!(point.get("y").and_then(Value::as_f64), Some(2.0));
    /// ```
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<Rc<str>>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Object(Rc::new(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        ))
    }

    /// Returns the kind of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Undefined => ValueKind::Undefined,
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
            Self::Date(_) => ValueKind::Date,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
            Self::Ref(_) => ValueKind::Ref,
        }
    }

    /// Returns `true` for `Undefined` and `Null`.
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Returns `true` for `Undefined`.
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns the number, if this is one.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(&**text),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns the field map, if this is an object.
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(fields) => Some(&**fields),
            _ => None,
        }
    }

    /// Returns the embedded store reference, if this is one.
    pub const fn as_state(&self) -> Option<&State> {
        match self {
            Self::Ref(state) => Some(state),
            _ => None,
        }
    }

    /// Looks up an object field.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    /// Looks up an array element.
    pub fn at(&self, index: usize) -> Option<&Self> {
        self.as_array().and_then(|items| items.get(index))
    }

    /// Reference identity.
    ///
    /// Arrays and objects are the same only when they share an allocation.
    /// Scalars are the same when their contents are, except that `NaN` is the
    /// same as `NaN` and `0.0` is not the same as `-0.0`. Refs are
    /// the same when they are clones of one optic instance.
    ///
    /// # Example
    ///
    /// ```
    /// use refract::{Value, value};
    ///
    /// let items = value!([1, 2]);
    /// assert!(items.same(&items.clone()));
    /// assert!(!items.same(&value!([1, 2])));
    /// assert!(Value::from(f64::NAN).same(&Value::from(f64::NAN)));
    /// ```
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => {
                (left.is_nan() && right.is_nan()) || left.to_bits() == right.to_bits()
            }
            (Self::String(left), Self::String(right)) => Rc::ptr_eq(left, right) || left == right,
            (Self::Date(left), Self::Date(right)) => left == right,
            (Self::Array(left), Self::Array(right)) => Rc::ptr_eq(left, right),
            (Self::Object(left), Self::Object(right)) => Rc::ptr_eq(left, right),
            (Self::Ref(left), Self::Ref(right)) => left.same_instance(right),
            _ => false,
        }
    }

    /// Element-wise reference identity for arrays, [`same`](Self::same) otherwise.
    ///
    /// Mapped optics build a fresh array on every read, so their focus is
    /// compared one element at a time.
    pub fn shallow_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(left), Self::Array(right)) => {
                Rc::ptr_eq(left, right)
                    || (left.len() == right.len()
                        && left.iter().zip(right.iter()).all(|(l, r)| l.same(r)))
            }
            _ => self.same(other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            #[allow(clippy::float_cmp)]
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Date(left), Self::Date(right)) => left == right,
            (Self::Array(left), Self::Array(right)) => Rc::ptr_eq(left, right) || left == right,
            (Self::Object(left), Self::Object(right)) => Rc::ptr_eq(left, right) || left == right,
            (Self::Ref(left), Self::Ref(right)) => left.same_instance(right),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => formatter.write_str("undefined"),
            Self::Null => formatter.write_str("null"),
            Self::Bool(flag) => write!(formatter, "{flag}"),
            Self::Number(number) => write!(formatter, "{number}"),
            Self::String(text) => write!(formatter, "{text:?}"),
            Self::Date(millis) => write!(formatter, "Date({millis})"),
            Self::Array(items) => formatter.debug_list().entries(items.iter()).finish(),
            Self::Object(fields) => formatter.debug_map().entries(fields.iter()).finish(),
            Self::Ref(state) => write!(formatter, "Ref({state:?})"),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Self::Number(f64::from(number))
    }
}

impl From<u32> for Value {
    fn from(number: u32) -> Self {
        Self::Number(f64::from(number))
    }
}

#[allow(clippy::cast_precision_loss)]
impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Self::Number(number as f64)
    }
}

#[allow(clippy::cast_precision_loss)]
impl From<usize> for Value {
    fn from(number: usize) -> Self {
        Self::Number(number as f64)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::String(Rc::from(text))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::String(Rc::from(text))
    }
}

impl From<Rc<str>> for Value {
    fn from(text: Rc<str>) -> Self {
        Self::String(text)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::Array(Rc::new(items))
    }
}

impl From<Map> for Value {
    fn from(fields: Map) -> Self {
        Self::Object(Rc::new(fields))
    }
}

impl From<State> for Value {
    fn from(state: State) -> Self {
        Self::Ref(state)
    }
}

impl From<&State> for Value {
    fn from(state: &State) -> Self {
        Self::Ref(state.clone())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map_or(Self::Undefined, Into::into)
    }
}

impl<T: Into<Self>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::array(iter.into_iter().map(Into::into))
    }
}

impl TryFrom<Value> for f64 {
    type Error = OpticError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or(OpticError::KindMismatch {
            expected: ValueKind::Number,
            found: value.kind(),
        })
    }
}

impl TryFrom<Value> for bool {
    type Error = OpticError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or(OpticError::KindMismatch {
            expected: ValueKind::Bool,
            found: value.kind(),
        })
    }
}

impl TryFrom<Value> for String {
    type Error = OpticError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(text.to_string()),
            other => Err(OpticError::KindMismatch {
                expected: ValueKind::String,
                found: other.kind(),
            }),
        }
    }
}

// =============================================================================
// value! macro
// =============================================================================

/// Builds a [`Value`] from a JSON-like literal.
///
/// Object keys are identifiers or string literals. Anything that is not an
/// array or object literal is converted with [`Value::from`]; wrap compound
/// expressions in parentheses. Negative number literals need no parentheses.
///
/// # Example
///
/// ```
/// use refract::{Value, value};
///
/// let extra = 3;
/// let data = value!({
///     name: "forest",
///     "tree-count": 12,
///     sizes: [1, 2, (extra + 1)],
///     owner: null,
/// });
///
/// assert_eq!(data.get("tree-count").and_then(Value::as_f64), Some(12.0));
/// assert_eq!(data.get("sizes").and_then(|sizes| sizes.at(2)).and_then(Value::as_f64), Some(4.0));
/// assert!(data.get("owner").is_some_and(Value::is_nullish));
/// ```
#[macro_export]
macro_rules! value {
    (undefined) => {
        $crate::Value::Undefined
    };
    (null) => {
        $crate::Value::Null
    };
    ([ $($elements:tt)* ]) => {
        $crate::value!(@array [] $($elements)*)
    };
    ({ $($fields:tt)* }) => {
        $crate::value!(@object [] $($fields)*)
    };
    (@array [ $($done:expr,)* ]) => {
        $crate::Value::array([ $($done,)* ])
    };
    (@array [ $($done:expr,)* ] - $number:literal $(, $($rest:tt)*)?) => {
        $crate::value!(@array [ $($done,)* $crate::Value::from(-$number), ] $($($rest)*)?)
    };
    (@array [ $($done:expr,)* ] $element:tt $(, $($rest:tt)*)?) => {
        $crate::value!(@array [ $($done,)* $crate::value!($element), ] $($($rest)*)?)
    };
    (@object [ $($done:expr,)* ]) => {
        $crate::Value::object::<&str, _>([ $($done,)* ])
    };
    (@object [ $($done:expr,)* ] $key:tt : - $number:literal $(, $($rest:tt)*)?) => {
        $crate::value!(
            @object [ $($done,)* ($crate::__value_key!($key), $crate::Value::from(-$number)), ]
            $($($rest)*)?
        )
    };
    (@object [ $($done:expr,)* ] $key:tt : $field:tt $(, $($rest:tt)*)?) => {
        $crate::value!(
            @object [ $($done,)* ($crate::__value_key!($key), $crate::value!($field)), ]
            $($($rest)*)?
        )
    };
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __value_key {
    ($key:ident) => {
        stringify!($key)
    };
    ($key:literal) => {
        $key
    };
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    /// Refs serialize as their denormalized focus; `Undefined` serializes as
    /// a unit, like `Null`.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{SerializeMap, SerializeSeq};

        match self {
            Self::Undefined | Self::Null => serializer.serialize_unit(),
            Self::Bool(flag) => serializer.serialize_bool(*flag),
            #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
            Self::Number(number) => {
                let integral = number.trunc();
                if integral == *number && integral.abs() < 9_007_199_254_740_992.0 {
                    serializer.serialize_i64(integral as i64)
                } else {
                    serializer.serialize_f64(*number)
                }
            }
            Self::String(text) => serializer.serialize_str(text),
            Self::Date(millis) => serializer.serialize_i64(*millis),
            Self::Array(items) => {
                let mut sequence = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    sequence.serialize_element(item)?;
                }
                sequence.end()
            }
            Self::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields.iter() {
                    map.serialize_entry(&**key, value)?;
                }
                map.end()
            }
            Self::Ref(state) => state.get().serialize(serializer),
        }
    }
}

#[cfg(feature = "serde")]
struct ValueVisitor;

#[cfg(feature = "serde")]
impl<'de> serde::de::Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON-like value")
    }

    fn visit_bool<E>(self, flag: bool) -> Result<Self::Value, E> {
        Ok(Value::Bool(flag))
    }

    fn visit_i64<E>(self, number: i64) -> Result<Self::Value, E> {
        Ok(Value::from(number))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E>(self, number: u64) -> Result<Self::Value, E> {
        Ok(Value::Number(number as f64))
    }

    fn visit_f64<E>(self, number: f64) -> Result<Self::Value, E> {
        Ok(Value::Number(number))
    }

    fn visit_str<E>(self, text: &str) -> Result<Self::Value, E> {
        Ok(Value::from(text))
    }

    fn visit_string<E>(self, text: String) -> Result<Self::Value, E> {
        Ok(Value::from(text))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde::Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(Value::from(items))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut fields = Map::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            fields.insert(Rc::from(key), value);
        }
        Ok(Value::from(fields))
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

// =============================================================================
// Tests
// =============================================================================
