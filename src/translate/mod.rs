//! The SSA-to-CFG translator.
//!
//! [`CfgBuilder`] drives a per-function translation: one CFG node per
//! input block, conditional branches split across synthetic edge
//! blocks, phi nodes lowered to parallel assignments on predecessor
//! edges, memory reduced to smashed arrays through a [`MemoryOracle`],
//! and returns unified into a single exit. The translation is a pure,
//! deterministic traversal — no recoverable errors, only sound
//! over-approximation.
//!
//! ```rust
//! use numflow::ir::{BinOp, FunctionBuilder, Module, Operand, Ty};
//! use numflow::translate::{translate_function, RegisterModel, TranslateOptions, VariableFactory};
//!
//! let mut module = Module::default();
//! let mut f = FunctionBuilder::new("inc", Ty::I32);
//! let x = f.param("x", Ty::I32);
//! f.block("entry")?;
//! let r = f.binary(BinOp::Add, "r", Ty::I32, x, Operand::const_int(1, 32))?;
//! f.ret(Some(r))?;
//! let id = module.add_function(f.finish()?);
//!
//! let mut vfac = VariableFactory::new();
//! let cfg = translate_function(
//!     &module,
//!     id,
//!     &mut vfac,
//!     &RegisterModel::default(),
//!     &TranslateOptions::default(),
//! )?;
//! assert_eq!(cfg.exit().map(ToString::to_string).as_deref(), Some("entry"));
//! # Ok::<(), numflow::Error>(())
//! ```

mod builder;
mod cond;
mod eval;
mod instr;
mod memory;
mod phi;
mod vars;

pub use builder::{translate_function, translate_module, CfgBuilder};
pub use eval::SymEval;
pub use memory::{
    ArrayId, CallSiteRef, MemoryOracle, RegionSets, RegisterModel, RegionModel, TrackLevel,
};
pub use vars::{SymbolKey, VariableFactory};

/// Name of the program entry function. Its return value is not
/// modeled, its globals receive the initializer prelude, and calls it
/// makes to allocators apply the array initialization hook.
pub const ENTRY_FUNCTION: &str = "main";

/// Callees whose names start with this prefix are instrumentation
/// shadowing memory state; their calls are ignored.
pub const SHADOW_MEM_PREFIX: &str = "shadow.mem";

/// A marker call some front ends insert at function entry; ignored.
pub const FN_ENTRY_MARKER: &str = "verifier.fn.enter";

/// Debug-intrinsic prefix; such calls carry no runtime semantics.
pub const DEBUG_INTRINSIC_PREFIX: &str = "llvm.dbg";

/// Configuration of one translation run.
///
/// Carried as an explicit value so several configurations can coexist
/// in one process; nothing here is global state.
#[derive(Debug, Clone, Copy)]
pub struct TranslateOptions {
    /// Run the CFG's own simplifier after translation.
    pub simplify_cfg: bool,
    /// Print the textual CFG to standard output after translation.
    pub print_cfg: bool,
    /// Skip translating address arithmetic and any cast, select, call
    /// or phi whose type is not an integer.
    pub disable_pointer_arith: bool,
    /// Emit explicit havoc statements for otherwise-unconstrained SSA
    /// destinations. Redundant under SSA, but downstream passes that
    /// expect a defining statement per name may want them.
    pub include_havoc: bool,
    /// Translate function boundaries: emit declarations, `ret`
    /// statements, and call sites with marshalled scalar and array
    /// actuals instead of havocking call effects.
    pub inter_proc: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            simplify_cfg: false,
            print_cfg: false,
            disable_pointer_arith: false,
            include_havoc: true,
            inter_proc: false,
        }
    }
}
