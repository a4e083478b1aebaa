//! Identity of a rate-limited operation.

use std::borrow::Cow;

/// A key that identifies one rate-limited operation.
///
/// Operations that share a key share a quota.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey(Cow<'static, str>);

impl OperationKey {
    /// Create a key from an explicit name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Derive a key from the type of a callable.
    ///
    /// Every `fn` item and closure has its own type, so the name is stable for
    /// the lifetime of the process. Closures yield names such as
    /// `my_crate::main::{{closure}}`, which may collide between closures in the
    /// same function; pass an explicit name when that matters.
    ///
    /// Function pointers are named after their signature, not the function
    /// they point to: every `fn(&str) -> String` pointer yields the same key
    /// and so shares one quota. Pass the function item itself, or a name.
    pub fn of<F: ?Sized>(_operation: &F) -> Self {
        Self(Cow::Borrowed(std::any::type_name::<F>()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for OperationKey {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for OperationKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}
