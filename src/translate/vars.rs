//! The variable factory: deterministic symbol issuance.
//!
//! Every IR entity that needs a CFG name — a local value, a global, a
//! memory region, a function — maps to exactly one [`SymbolName`] for
//! the factory's lifetime. Fresh anonymous names come from the same
//! monotone counter, so a translation run over identical input produces
//! identical symbols, and with them byte-identical printouts.

use rustc_hash::FxHashMap;

use crate::cfg::SymbolName;
use crate::ir::{FunctionId, GlobalId, ValueId};
use crate::translate::ArrayId;

/// The identity a symbol is issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    /// A value local to a function.
    Local(FunctionId, ValueId),
    /// A module-level global.
    Global(GlobalId),
    /// A memory region summary.
    Array(ArrayId),
    /// A function defined in the module.
    Function(FunctionId),
    /// An external function known only by name.
    Extern(String),
}

/// Issues symbolic names.
///
/// One factory typically serves a whole module translation so that
/// region and function symbols agree across the per-function CFGs.
#[derive(Debug, Default)]
pub struct VariableFactory {
    map: FxHashMap<SymbolKey, SymbolName>,
    next_id: u32,
    next_fresh: u32,
}

impl VariableFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh anonymous name, distinct from every name this
    /// factory has issued or will issue.
    pub fn fresh(&mut self) -> SymbolName {
        let text = format!("__t{}", self.next_fresh);
        self.next_fresh += 1;
        self.mint(text)
    }

    /// The symbol for `key`, minting it with `text` on first request.
    ///
    /// The text is only consulted the first time a key is seen; later
    /// requests return the original symbol.
    pub fn symbol(&mut self, key: SymbolKey, text: impl FnOnce() -> String) -> SymbolName {
        if let Some(sym) = self.map.get(&key) {
            return sym.clone();
        }
        let sym = self.mint(text());
        self.map.insert(key, sym.clone());
        sym
    }

    fn mint(&mut self, text: String) -> SymbolName {
        let sym = SymbolName::new(self.next_id, text);
        self.next_id += 1;
        sym
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_mapping() {
        let mut vfac = VariableFactory::new();
        let key = SymbolKey::Global(GlobalId::from_index(0));
        let a = vfac.symbol(key.clone(), || "g".to_string());
        let b = vfac.symbol(key, || "ignored".to_string());
        assert_eq!(a, b);
        assert_eq!(b.text(), "g");
    }

    #[test]
    fn test_fresh_names_are_distinct() {
        let mut vfac = VariableFactory::new();
        let a = vfac.fresh();
        let b = vfac.fresh();
        assert_ne!(a, b);
        assert_eq!(a.text(), "__t0");
        assert_eq!(b.text(), "__t1");
    }

    #[test]
    fn test_determinism_across_factories() {
        let issue = || {
            let mut vfac = VariableFactory::new();
            let x = vfac.symbol(
                SymbolKey::Local(FunctionId::from_index(0), ValueId::from_index(0)),
                || "x".to_string(),
            );
            let t = vfac.fresh();
            let a = vfac.symbol(SymbolKey::Array(ArrayId::from_index(3)), || {
                "arr3".to_string()
            });
            (x.id(), t.id(), a.id(), a.text().to_string())
        };
        assert_eq!(issue(), issue());
    }
}
