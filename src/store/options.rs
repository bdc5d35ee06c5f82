//! Runtime options for reads, subscriptions and store creation.

use std::rc::Rc;

/// Options for [`State::get_with`](crate::State::get_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// Resolve embedded references to other stores.
    pub denormalize: bool,
}

impl GetOptions {
    /// Reads the value as stored, references left in place.
    pub const fn normalized() -> Self {
        Self { denormalize: false }
    }

    /// Reads the value with every reference resolved.
    pub const fn denormalized() -> Self {
        Self { denormalize: true }
    }
}

impl Default for GetOptions {
    fn default() -> Self {
        Self::denormalized()
    }
}

/// Options for [`State::subscribe_with`](crate::State::subscribe_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Also notify when a referenced store changes what this focus resolves
    /// to.
    pub denormalize: bool,
}

impl SubscribeOptions {
    /// Notifies on changes to the stored value only.
    pub const fn normalized() -> Self {
        Self { denormalize: false }
    }

    /// Notifies on changes to the resolved value.
    pub const fn denormalized() -> Self {
        Self { denormalize: true }
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self::denormalized()
    }
}

/// Options for [`create_state_with`](crate::create_state_with).
///
/// # Example
///
/// ```
/// use refract::{StateOptions, create_state_with, value};
///
/// let settings = create_state_with(value!({ theme: "dark" }), StateOptions::named("settings"));
/// assert_eq!(settings.store_name().as_deref(), Some("settings"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateOptions {
    /// A name for the store, reported in log events.
    pub name: Option<Rc<str>>,
}

impl StateOptions {
    /// Options for a named store.
    pub fn named(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_boundary_defaults_denormalize() {
        assert!(GetOptions::default().denormalize);
        assert!(SubscribeOptions::default().denormalize);
    }

    #[rstest]
    fn test_state_options_default_is_anonymous() {
        assert_eq!(StateOptions::default().name, None);
    }
}
