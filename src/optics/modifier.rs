//! Optic modifiers: whether a chain always resolves, may fail, or traverses.
//!
//! ```text
//! Total < Partial < Mapped
//! ```
//!
//! Combining two modifiers keeps the more permissive one, which makes
//! [`Modifier::combine`] associative and commutative with `Total` as identity.
//! Appending a step folds its contribution in with [`Modifier::then`]; the one
//! exception to plain combination is `Fold`, which closes a traversal and turns
//! `Mapped` back into `Partial`.

use std::fmt;

use crate::error::{OpticError, OpticResult};
use crate::optics::step::{LensStep, StepKind};

/// How many values an optic focuses on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Modifier {
    /// Always resolves to exactly one value.
    #[default]
    Total,
    /// Resolves to one value or to `Undefined`.
    Partial,
    /// Resolves to zero or more values; reads always return an array.
    Mapped,
}

impl Modifier {
    /// Combines two modifiers, keeping the more permissive one.
    ///
    /// # Example
    ///
    /// ```
    /// use refract::Modifier;
    ///
    /// assert_eq!(Modifier::Total.combine(Modifier::Partial), Modifier::Partial);
    /// assert_eq!(Modifier::Mapped.combine(Modifier::Partial), Modifier::Mapped);
    /// assert_eq!(Modifier::Total.combine(Modifier::Total), Modifier::Total);
    /// ```
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Mapped, _) | (_, Self::Mapped) => Self::Mapped,
            (Self::Partial, _) | (_, Self::Partial) => Self::Partial,
            (Self::Total, Self::Total) => Self::Total,
        }
    }

    /// Returns the modifier of a chain after appending `step`.
    ///
    /// # Errors
    ///
    /// Returns [`OpticError::NotMapped`] when `step` is a fold and `self` is not
    /// [`Modifier::Mapped`].
    pub fn then(self, step: &LensStep) -> OpticResult<Self> {
        match step.kind() {
            StepKind::Fold | StepKind::FoldN if !self.is_mapped() => Err(OpticError::NotMapped {
                combinator: step.kind().name(),
                found: self,
            }),
            StepKind::Fold => Ok(Self::Partial),
            _ => Ok(self.combine(step.contribution())),
        }
    }

    /// Folds [`then`](Self::then) over a sequence of steps.
    ///
    /// # Errors
    ///
    /// Returns the first [`OpticError::NotMapped`] encountered.
    pub fn through<'a, I>(self, steps: I) -> OpticResult<Self>
    where
        I: IntoIterator<Item = &'a LensStep>,
    {
        steps
            .into_iter()
            .try_fold(self, |modifier, step| modifier.then(step))
    }

    /// Returns `true` for [`Modifier::Mapped`].
    pub const fn is_mapped(self) -> bool {
        matches!(self, Self::Mapped)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Total => "total",
            Self::Partial => "partial",
            Self::Mapped => "mapped",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ALL: [Modifier; 3] = [Modifier::Total, Modifier::Partial, Modifier::Mapped];

    #[rstest]
    fn test_combine_is_associative() {
        for a in ALL {
            for b in ALL {
                for c in ALL {
                    assert_eq!(a.combine(b).combine(c), a.combine(b.combine(c)));
                }
            }
        }
    }

    #[rstest]
    fn test_total_is_identity() {
        for modifier in ALL {
            assert_eq!(Modifier::Total.combine(modifier), modifier);
            assert_eq!(modifier.combine(Modifier::Total), modifier);
        }
    }

    #[rstest]
    fn test_fold_closes_traversal() {
        let fold = LensStep::fold(|values| values.first());
        assert_eq!(Modifier::Mapped.then(&fold), Ok(Modifier::Partial));
    }

    #[rstest]
    fn test_fold_n_keeps_traversal() {
        let fold_n = LensStep::fold_n(|values| values.iter().collect());
        assert_eq!(Modifier::Mapped.then(&fold_n), Ok(Modifier::Mapped));
    }

    #[rstest]
    #[case(Modifier::Total)]
    #[case(Modifier::Partial)]
    fn test_fold_requires_mapped(#[case] modifier: Modifier) {
        let fold = LensStep::fold(|values| values.first());
        assert_eq!(
            modifier.then(&fold),
            Err(OpticError::NotMapped {
                combinator: "fold",
                found: modifier,
            })
        );
    }

    #[rstest]
    fn test_through_plain_steps() {
        let steps = [LensStep::field("a"), LensStep::index(0), LensStep::field("b")];
        assert_eq!(Modifier::Total.through(&steps), Ok(Modifier::Partial));
    }
}
