//! Symbolic variable names of the CFG language.
//!
//! A [`SymbolName`] is an interned identity: comparisons and ordering
//! use the intern id (total, deterministic), while `Display` uses the
//! human-readable text so statements print without consulting any
//! factory. Names are issued by the translator's variable factory;
//! nothing in the CFG layer cares where they came from.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An interned symbolic variable name.
///
/// Cheap to clone. Equality, hashing and ordering are by intern id, so
/// two names issued by the same factory compare consistently across
/// runs.
#[derive(Debug, Clone)]
pub struct SymbolName {
    id: u32,
    text: Arc<str>,
}

impl SymbolName {
    /// Creates a symbol with the given intern id and display text.
    #[must_use]
    pub fn new(id: u32, text: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// The intern id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// The display text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl PartialEq for SymbolName {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SymbolName {}

impl PartialOrd for SymbolName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for SymbolName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// The declared kind of a symbol in declarations, call sites and
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// An integer register.
    Int,
    /// A pointer register.
    Ptr,
    /// A smashed array summary.
    Arr,
    /// Untranslatable.
    Unknown,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VarKind::Int => "int",
            VarKind::Ptr => "ptr",
            VarKind::Arr => "arr",
            VarKind::Unknown => "unk",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_by_id() {
        let a = SymbolName::new(0, "x");
        let b = SymbolName::new(0, "renamed");
        let c = SymbolName::new(1, "x");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }

    #[test]
    fn test_display_is_text() {
        let s = SymbolName::new(42, "__t0");
        assert_eq!(s.to_string(), "__t0");
        assert_eq!(VarKind::Arr.to_string(), "arr");
    }
}
