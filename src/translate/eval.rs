//! Symbolic evaluation: from IR operands to linear expressions.
//!
//! [`SymEval`] is the per-function translation context shared by every
//! lowering pass. It answers three questions:
//!
//! - is a value *tracked*, i.e. does it participate in numeric
//!   reasoning at the current precision level,
//! - which [`SymbolName`] does a tracked definition map to, and
//! - what [`LinearExpr`] does an operand evaluate to, if any.
//!
//! `lookup` is total but partial in its answer: untracked values,
//! `undef`, and malformed boolean constants yield `None`, and callers
//! over-approximate (usually by emitting nothing or a havoc).

use num_traits::{One, Zero};

use crate::cfg::{LinearExpr, SymbolName, VarKind};
use crate::ir::{
    DataLayout, Function, FunctionId, GlobalId, Instr, Module, Operand, Ty, ValueId, ValueRef,
};
use crate::translate::{
    ArrayId, MemoryOracle, SymbolKey, TrackLevel, TranslateOptions, VariableFactory,
};

/// The translation context: module, current function, factory, oracle
/// and options, bundled so the lowering passes share one borrow.
pub struct SymEval<'a> {
    pub(crate) module: &'a Module,
    pub(crate) func: &'a Function,
    pub(crate) func_id: FunctionId,
    pub(crate) vfac: &'a mut VariableFactory,
    pub(crate) mem: &'a dyn MemoryOracle,
    pub(crate) opts: &'a TranslateOptions,
}

impl<'a> SymEval<'a> {
    /// Creates an evaluation context for one function.
    pub fn new(
        module: &'a Module,
        func_id: FunctionId,
        vfac: &'a mut VariableFactory,
        mem: &'a dyn MemoryOracle,
        opts: &'a TranslateOptions,
    ) -> Self {
        Self {
            module,
            func: module.function(func_id),
            func_id,
            vfac,
            mem,
            opts,
        }
    }

    /// The current function.
    #[must_use]
    pub fn func(&self) -> &'a Function {
        self.func
    }

    /// The module's data layout.
    #[must_use]
    pub fn layout(&self) -> &'a DataLayout {
        &self.module.data_layout
    }

    /// Classifies a type for declarations and call sites.
    #[must_use]
    pub fn kind_of(&self, ty: &Ty) -> VarKind {
        match ty {
            Ty::Int(_) => VarKind::Int,
            Ty::Ptr => VarKind::Ptr,
            _ => VarKind::Unknown,
        }
    }

    /// Whether values of this type participate in numeric reasoning:
    /// integers always, pointers when the oracle tracks at least
    /// registers.
    #[must_use]
    pub fn is_tracked_ty(&self, ty: &Ty) -> bool {
        match ty {
            Ty::Int(_) => true,
            Ty::Ptr => self.mem.track_level() >= TrackLevel::Registers,
            _ => false,
        }
    }

    /// Whether an operand is tracked.
    #[must_use]
    pub fn is_tracked(&self, operand: &Operand) -> bool {
        self.is_tracked_ty(&self.func.operand_ty(operand))
    }

    /// The symbol of a local definition.
    pub fn sym_value(&mut self, value: ValueId) -> SymbolName {
        let func = self.func;
        self.vfac
            .symbol(SymbolKey::Local(self.func_id, value), || {
                match func.value_name(value) {
                    Some(name) => name.to_string(),
                    None => format!("v{}", value.index()),
                }
            })
    }

    /// The symbol of a global.
    pub fn sym_global(&mut self, global: GlobalId) -> SymbolName {
        let module = self.module;
        self.vfac.symbol(SymbolKey::Global(global), || {
            format!("@{}", module.global(global).name)
        })
    }

    /// The symbol of a local-or-global reference.
    pub fn sym_ref(&mut self, value: ValueRef) -> SymbolName {
        match value {
            ValueRef::Local(id) => self.sym_value(id),
            ValueRef::Global(id) => self.sym_global(id),
        }
    }

    /// The symbol of an operand, when the operand names a definition.
    pub fn sym_operand(&mut self, operand: &Operand) -> Option<SymbolName> {
        match operand {
            Operand::Value(id) => Some(self.sym_value(*id)),
            Operand::Global(id) => Some(self.sym_global(*id)),
            Operand::Const(_) | Operand::Undef(_) => None,
        }
    }

    /// The summary symbol of a memory region.
    pub fn sym_array(&mut self, array: ArrayId) -> SymbolName {
        self.vfac
            .symbol(SymbolKey::Array(array), || format!("arr{}", array.index()))
    }

    /// The symbol of a function defined in the module.
    pub fn sym_function(&mut self, id: FunctionId) -> SymbolName {
        let module = self.module;
        self.vfac.symbol(SymbolKey::Function(id), || {
            module.function(id).name().to_string()
        })
    }

    /// The symbol of a callee name, whether defined here or external.
    pub fn sym_callee(&mut self, name: &str) -> SymbolName {
        match self.module.function_by_name(name) {
            Some((id, _)) => self.sym_function(id),
            None => self
                .vfac
                .symbol(SymbolKey::Extern(name.to_string()), || name.to_string()),
        }
    }

    /// A fresh anonymous symbol.
    pub fn fresh(&mut self) -> SymbolName {
        self.vfac.fresh()
    }

    /// Evaluates an operand to a linear expression.
    ///
    /// Integer constants become constant expressions — except boolean
    /// constants outside `{0, 1}`, which are refused. Tracked
    /// definitions become variable expressions. Everything else —
    /// `undef`, untracked values — yields `None`.
    pub fn lookup(&mut self, operand: &Operand) -> Option<LinearExpr> {
        match operand {
            Operand::Const(c) => {
                if c.bits() == 1 && !(c.value().is_zero() || c.value().is_one()) {
                    return None;
                }
                Some(LinearExpr::constant(c.value().clone()))
            }
            Operand::Undef(_) => None,
            Operand::Value(_) | Operand::Global(_) => {
                if self.is_tracked(operand) {
                    let sym = self.sym_operand(operand)?;
                    Some(LinearExpr::var(sym))
                } else {
                    None
                }
            }
        }
    }

    /// Whether an expression is a single variable with unit coefficient
    /// and no constant part.
    #[must_use]
    pub fn is_var(expr: &LinearExpr) -> bool {
        expr.as_variable().is_some()
    }

    /// The instruction defining an operand, when the operand is a value
    /// with an instruction definition site.
    #[must_use]
    pub fn def_instr(&self, operand: &Operand) -> Option<&'a Instr> {
        self.func.def_instr(operand.as_value()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ConstInt, FunctionBuilder};
    use crate::translate::RegisterModel;

    fn with_ctx<R>(level: TrackLevel, run: impl FnOnce(&mut SymEval<'_>) -> R) -> R {
        let mut module = Module::default();
        let mut f = FunctionBuilder::new("f", Ty::Void);
        f.param("x", Ty::I32);
        f.param("p", Ty::Ptr);
        f.block("entry").unwrap();
        f.ret(None).unwrap();
        let func_id = module.add_function(f.finish().unwrap());
        let mut vfac = VariableFactory::new();
        let mem = RegisterModel::new(level);
        let opts = TranslateOptions::default();
        let mut ctx = SymEval::new(&module, func_id, &mut vfac, &mem, &opts);
        run(&mut ctx)
    }

    #[test]
    fn test_tracking_depends_on_level() {
        with_ctx(TrackLevel::None, |ctx| {
            let x = Operand::Value(ctx.func().params()[0].value);
            let p = Operand::Value(ctx.func().params()[1].value);
            assert!(ctx.is_tracked(&x));
            assert!(!ctx.is_tracked(&p));
        });
        with_ctx(TrackLevel::Registers, |ctx| {
            let p = Operand::Value(ctx.func().params()[1].value);
            assert!(ctx.is_tracked(&p));
        });
    }

    #[test]
    fn test_lookup_constants() {
        with_ctx(TrackLevel::Registers, |ctx| {
            let c = ctx.lookup(&Operand::const_int(7, 32)).unwrap();
            assert_eq!(c.constant_value().map(|v| v.to_string()).as_deref(), Some("7"));
            // Well-formed boolean constants pass, malformed are refused.
            assert!(ctx.lookup(&Operand::const_int(1, 1)).is_some());
            assert!(ctx
                .lookup(&Operand::Const(ConstInt::new(2, 1)))
                .is_none());
            assert!(ctx.lookup(&Operand::Undef(Ty::I32)).is_none());
        });
    }

    #[test]
    fn test_lookup_tracked_value_is_var() {
        with_ctx(TrackLevel::Registers, |ctx| {
            let x = Operand::Value(ctx.func().params()[0].value);
            let e = ctx.lookup(&x).unwrap();
            assert!(SymEval::is_var(&e));
            assert_eq!(e.as_variable().unwrap().text(), "x");
        });
    }

    #[test]
    fn test_sym_var_is_stable() {
        with_ctx(TrackLevel::Registers, |ctx| {
            let x = ctx.func().params()[0].value;
            assert_eq!(ctx.sym_value(x), ctx.sym_value(x));
        });
    }
}
