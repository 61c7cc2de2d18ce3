//! Per-function translation orchestration.
//!
//! [`CfgBuilder`] allocates one CFG node per input block, lowers
//! straight-line instructions, materializes conditional branches as
//! synthetic edge blocks carrying the branch constraints, lowers
//! successor phis onto each edge, unifies multiple returns behind a
//! single exit, and installs the entry preludes (ref-array formal
//! bindings, global initializers, new-region hooks). Optional CFG
//! simplification and printing run after translation.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::cfg::{Cfg, CfgBlock, FunctionDecl, Label, LinearExpr, Statement, VarKind};
use crate::ir::{BlockId, Function, FunctionId, GlobalInit, Module, Operand, Terminator};
use crate::translate::{
    cond, instr, phi, MemoryOracle, SymEval, TrackLevel, TranslateOptions, VariableFactory,
    ENTRY_FUNCTION,
};
use crate::{Error, Result};

/// Translates every function of a module, in declaration order, against
/// one shared factory so region and function symbols agree across the
/// resulting CFGs.
pub fn translate_module(
    module: &Module,
    vfac: &mut VariableFactory,
    mem: &dyn MemoryOracle,
    opts: &TranslateOptions,
) -> Result<Vec<Cfg>> {
    let mut cfgs = Vec::new();
    for (id, _) in module.functions() {
        cfgs.push(translate_function(module, id, vfac, mem, opts)?);
    }
    Ok(cfgs)
}

/// Translates a single function.
pub fn translate_function(
    module: &Module,
    func_id: FunctionId,
    vfac: &mut VariableFactory,
    mem: &dyn MemoryOracle,
    opts: &TranslateOptions,
) -> Result<Cfg> {
    CfgBuilder::new(module, func_id, vfac, mem, opts).build()
}

/// Builds the CFG of one function.
pub struct CfgBuilder<'a> {
    ctx: SymEval<'a>,
    next_synth: u32,
}

impl<'a> CfgBuilder<'a> {
    /// Creates a builder for the given function.
    pub fn new(
        module: &'a Module,
        func_id: FunctionId,
        vfac: &'a mut VariableFactory,
        mem: &'a dyn MemoryOracle,
        opts: &'a TranslateOptions,
    ) -> Self {
        Self {
            ctx: SymEval::new(module, func_id, vfac, mem, opts),
            next_synth: 0,
        }
    }

    /// Runs the translation and returns the finished CFG.
    ///
    /// # Errors
    ///
    /// Only CFG bookkeeping failures surface as errors; semantic
    /// translation never fails. Violated internal invariants that
    /// upstream passes must rule out (a variadic function in
    /// inter-procedural mode, a non-constant struct index) abort.
    pub fn build(mut self) -> Result<Cfg> {
        let func = self.ctx.func();

        let entry_label = block_label(func, func.entry());
        let mut cfg = Cfg::new(entry_label);
        for block_idx in 1..func.blocks().len() {
            cfg.insert(block_label(func, BlockId::from_index(block_idx as u32)))?;
        }

        let mut rets: Vec<Label> = Vec::new();
        for (block_idx, block) in func.blocks().iter().enumerate() {
            let block_id = BlockId::from_index(block_idx as u32);
            let label = block_label(func, block_id);

            instr::lower_block_instrs(&mut self.ctx, node_mut(&mut cfg, &label)?, block_id);

            match &block.terminator {
                Terminator::Ret { value } => {
                    instr::lower_ret(&mut self.ctx, node_mut(&mut cfg, &label)?, value.as_ref());
                    rets.push(label);
                }
                Terminator::Unreachable => {}
                Terminator::Br { dest } => {
                    let dest_label = block_label(func, *dest);
                    cfg.add_edge(&label, &dest_label)?;
                    // Unconditional edges need no extra block; the phi
                    // assignments go straight into the predecessor.
                    phi::lower_phis(&mut self.ctx, node_mut(&mut cfg, &label)?, *dest, block_id);
                }
                Terminator::CondBr {
                    cond,
                    then_dest,
                    else_dest,
                } => {
                    for dest in [*then_dest, *else_dest] {
                        let edge_label = self.edge_block(&mut cfg, &label, &block_label(func, dest))?;
                        let node = node_mut(&mut cfg, &edge_label)?;
                        if let Some(c) = cond.as_const() {
                            let incompatible = (c.is_one() && dest != *then_dest)
                                || (c.is_zero() && dest != *else_dest);
                            if incompatible {
                                node.unreachable();
                            }
                        } else {
                            cond::lower_branch_cond(&mut self.ctx, node, cond, dest == *else_dest);
                        }
                        phi::lower_phis(&mut self.ctx, node, dest, block_id);
                    }
                }
            }
        }

        self.unify_returns(&mut cfg, rets)?;

        let mut prelude: Vec<Statement> = Vec::new();
        if self.ctx.opts.inter_proc {
            self.install_decl(&mut cfg, &mut prelude);
        }
        if self.ctx.mem.track_level() == TrackLevel::Arrays {
            if func.name() == ENTRY_FUNCTION {
                self.global_initializers(&mut prelude);
            }
            self.new_region_hooks(&mut prelude);
        }
        if !prelude.is_empty() {
            let entry = cfg.entry().clone();
            node_mut(&mut cfg, &entry)?.splice_front(prelude);
        }

        if self.ctx.opts.simplify_cfg {
            cfg.simplify();
        }
        if self.ctx.opts.print_cfg {
            println!("{cfg}");
        }
        Ok(cfg)
    }

    /// Materializes the synthetic block carrying one conditional-branch
    /// edge: `src → edge → dst`.
    fn edge_block(&mut self, cfg: &mut Cfg, src: &Label, dst: &Label) -> Result<Label> {
        let edge = Label::Synthetic(self.next_synth);
        self.next_synth += 1;
        cfg.insert(edge.clone())?;
        cfg.remove_edge(src, dst);
        cfg.add_edge(src, &edge)?;
        cfg.add_edge(&edge, dst)?;
        Ok(edge)
    }

    fn unify_returns(&mut self, cfg: &mut Cfg, rets: Vec<Label>) -> Result<()> {
        match rets.as_slice() {
            [] => Ok(()),
            [only] => cfg.set_exit(only.clone()),
            _ => {
                let exit = Label::Synthetic(self.next_synth);
                self.next_synth += 1;
                cfg.insert(exit.clone())?;
                for ret in &rets {
                    cfg.add_edge(ret, &exit)?;
                }
                cfg.set_exit(exit)
            }
        }
    }

    /// Emits the function declaration and the ref-array formal
    /// bindings: each ref array `a` gets a fresh input snapshot `a_in`
    /// bound by `a := a_in` at the entry, so the body's stores always
    /// overwrite the output version.
    fn install_decl(&mut self, cfg: &mut Cfg, prelude: &mut Vec<Statement>) {
        let func = self.ctx.func();
        assert!(
            !func.is_variadic(),
            "cannot translate a variadic function '{}'",
            func.name()
        );

        let mut formals: Vec<(_, VarKind)> = Vec::new();
        for param in func.params() {
            if !self.ctx.is_tracked(&Operand::Value(param.value)) {
                continue;
            }
            if self.ctx.opts.disable_pointer_arith && !param.ty.is_int() {
                continue;
            }
            let kind = self.ctx.kind_of(&param.ty);
            formals.push((self.ctx.sym_value(param.value), kind));
        }

        if self.ctx.mem.track_level() == TrackLevel::Arrays && func.name() != ENTRY_FUNCTION {
            let sets = self.ctx.mem.function_regions(func);
            for array in &sets.refs {
                let arr = self.ctx.sym_array(*array);
                let arr_in = self.ctx.fresh();
                prelude.push(Statement::Assign {
                    dst: arr,
                    src: LinearExpr::var(arr_in.clone()),
                });
                formals.push((arr_in, VarKind::Arr));
            }
            for array in &sets.refs {
                formals.push((self.ctx.sym_array(*array), VarKind::Arr));
            }
            for array in &sets.news {
                formals.push((self.ctx.sym_array(*array), VarKind::Arr));
            }
        }

        let ret = if !self.ctx.opts.disable_pointer_arith || func.ret_ty().is_int() {
            self.ctx.kind_of(func.ret_ty())
        } else {
            VarKind::Unknown
        };
        let name = self.ctx.sym_function(self.ctx.func_id);
        cfg.set_decl(FunctionDecl { name, ret, formals });
    }

    /// Prepends the initial contents of global regions: zero fills for
    /// zeroed aggregates and literal sequences for integer data.
    /// Scalar globals are skipped — they are lowered to registers.
    fn global_initializers(&mut self, prelude: &mut Vec<Statement>) {
        let func = self.ctx.func();
        let module = self.ctx.module;
        for (global, _) in module.globals() {
            let Some(init) = module.resolve_init(global) else {
                continue;
            };
            let Some(array) = self.ctx.mem.array_id(func, &Operand::Global(global)) else {
                continue;
            };
            let arr = self.ctx.sym_array(array);
            match init {
                GlobalInit::Zero => prelude.push(Statement::AssumeArray {
                    array: arr,
                    value: BigInt::zero(),
                }),
                GlobalInit::Scalar(_) => {}
                GlobalInit::IntArray(values) => prelude.push(Statement::ArrayInit {
                    array: arr,
                    values: values.iter().map(|c| c.value().clone()).collect(),
                }),
                // resolve_init follows alias chains to their target.
                GlobalInit::Alias(_) => unreachable!(),
            }
        }
    }

    /// Prepends the initialization hook for every region this function
    /// allocates.
    fn new_region_hooks(&mut self, prelude: &mut Vec<Statement>) {
        let sets = self.ctx.mem.function_regions(self.ctx.func());
        for array in &sets.news {
            let arr = self.ctx.sym_array(*array);
            prelude.push(Statement::AssumeArray {
                array: arr,
                value: BigInt::zero(),
            });
        }
    }
}

fn block_label(func: &Function, block: BlockId) -> Label {
    Label::named(func.block(block).label.clone())
}

fn node_mut<'c>(cfg: &'c mut Cfg, label: &Label) -> Result<&'c mut CfgBlock> {
    cfg.node_mut(label)
        .ok_or_else(|| Error::GraphError(format!("missing CFG node '{label}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, FunctionBuilder, IcmpPred, Ty};
    use crate::translate::RegisterModel;

    fn build(f: FunctionBuilder, opts: &TranslateOptions) -> Cfg {
        let mut module = Module::default();
        let id = module.add_function(f.finish().unwrap());
        let mut vfac = VariableFactory::new();
        let mem = RegisterModel::default();
        translate_function(&module, id, &mut vfac, &mem, opts).unwrap()
    }

    #[test]
    fn test_single_return_is_exit() {
        let mut f = FunctionBuilder::new("f", Ty::I32);
        let x = f.param("x", Ty::I32);
        f.block("entry").unwrap();
        let r = f
            .binary(BinOp::Add, "r", Ty::I32, x, Operand::const_int(1, 32))
            .unwrap();
        f.ret(Some(r)).unwrap();
        let cfg = build(f, &TranslateOptions::default());
        assert_eq!(cfg.exit().unwrap().to_string(), "entry");
        assert_eq!(cfg.nodes().len(), 1);
    }

    #[test]
    fn test_multiple_returns_are_unified() {
        let mut f = FunctionBuilder::new("f", Ty::I32);
        let c = f.param("c", Ty::BOOL);
        f.block("entry").unwrap();
        f.cond_branch(c, "a", "b").unwrap();
        f.block("a").unwrap();
        f.ret(Some(Operand::const_int(1, 32))).unwrap();
        f.block("b").unwrap();
        f.ret(Some(Operand::const_int(2, 32))).unwrap();
        let cfg = build(f, &TranslateOptions::default());

        let exit = cfg.exit().unwrap().clone();
        assert!(exit.is_synthetic());
        let preds = cfg.predecessors();
        let mut incoming = preds[&exit]
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        incoming.sort();
        assert_eq!(incoming, ["a", "b"]);
    }

    #[test]
    fn test_conditional_branch_gets_edge_blocks() {
        let mut f = FunctionBuilder::new("f", Ty::Void);
        let a = f.param("a", Ty::I32);
        f.block("entry").unwrap();
        let c = f
            .icmp(IcmpPred::Slt, "c", a, Operand::const_int(0, 32))
            .unwrap();
        f.cond_branch(c, "neg", "pos").unwrap();
        f.block("neg").unwrap();
        f.ret(None).unwrap();
        f.block("pos").unwrap();
        f.ret(None).unwrap();
        let cfg = build(f, &TranslateOptions::default());

        // entry has two synthetic successors, each leading to one
        // destination; there is no direct entry→neg / entry→pos edge.
        let entry = cfg.node(&Label::named("entry")).unwrap();
        assert_eq!(entry.successors().len(), 2);
        for succ in entry.successors() {
            assert!(succ.is_synthetic());
            let edge = cfg.node(succ).unwrap();
            assert_eq!(edge.successors().len(), 1);
            assert!(!edge.successors()[0].is_synthetic());
        }
    }

    #[test]
    fn test_constant_branch_marks_dead_edge_unreachable() {
        let mut f = FunctionBuilder::new("f", Ty::Void);
        f.block("entry").unwrap();
        f.cond_branch(Operand::const_int(1, 1), "t", "e").unwrap();
        f.block("t").unwrap();
        f.ret(None).unwrap();
        f.block("e").unwrap();
        f.ret(None).unwrap();
        let cfg = build(f, &TranslateOptions::default());

        let entry = cfg.node(&Label::named("entry")).unwrap();
        let live = cfg.node(&entry.successors()[0]).unwrap();
        let dead = cfg.node(&entry.successors()[1]).unwrap();
        assert!(live.statements().is_empty());
        assert_eq!(dead.statements(), &[Statement::Unreachable]);
    }

    #[test]
    fn test_boolean_parameter_branch_pins_value() {
        let mut f = FunctionBuilder::new("f", Ty::Void);
        let c = f.param("c", Ty::BOOL);
        f.block("entry").unwrap();
        f.cond_branch(c, "t", "e").unwrap();
        f.block("t").unwrap();
        f.ret(None).unwrap();
        f.block("e").unwrap();
        f.ret(None).unwrap();
        let cfg = build(f, &TranslateOptions::default());

        let entry = cfg.node(&Label::named("entry")).unwrap();
        let on_true = cfg.node(&entry.successors()[0]).unwrap();
        let on_false = cfg.node(&entry.successors()[1]).unwrap();
        assert_eq!(on_true.statements()[0].to_string(), "assume(c = 1)");
        assert_eq!(on_false.statements()[0].to_string(), "assume(c = 0)");
    }
}
