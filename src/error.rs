//! Error types.
//!
//! Missing focuses are not errors: they read as [`Value::Undefined`] and make
//! writes no-ops. The errors here cover misuse that is detected at optic
//! construction time and failed conversions out of a [`Value`].
//!
//! [`Value::Undefined`]: crate::Value::Undefined
//! [`Value`]: crate::Value

use crate::optics::Modifier;
use crate::value::ValueKind;

/// Errors reported by optic construction and value conversion.
///
/// # Examples
///
/// ```rust
/// use refract::{Modifier, OpticError};
///
/// let error = OpticError::NotMapped {
///     combinator: "fold",
///     found: Modifier::Partial,
/// };
/// assert_eq!(
///     error.to_string(),
///     "fold requires a mapped optic, but the optic is partial"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpticError {
    /// A fold combinator was applied to an optic that does not traverse.
    #[error("{combinator} requires a mapped optic, but the optic is {found}")]
    NotMapped {
        /// The step kind that was being appended.
        combinator: &'static str,
        /// The modifier of the optic it was appended to.
        found: Modifier,
    },

    /// A value could not be converted because it has the wrong kind.
    #[error("expected a {expected} value, found {found}")]
    KindMismatch {
        /// The kind the conversion needed.
        expected: ValueKind,
        /// The kind that was found.
        found: ValueKind,
    },
}

/// Shorthand for results carrying an [`OpticError`].
pub type OpticResult<T> = Result<T, OpticError>;
