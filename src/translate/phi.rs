//! Lowering phi nodes to parallel assignments on predecessor edges.
//!
//! All phis of a block are evaluated simultaneously: if phi `p1` takes
//! its value from phi `p2` of the same block, it must read `p2`'s value
//! from *before* the edge was taken, not the freshly assigned one. The
//! lowering runs two passes over the successor's phi list:
//!
//! 1. for every phi whose incoming value is another same-block phi with
//!    a known expression, snapshot that expression into a fresh "old
//!    value" name;
//! 2. assign each phi's symbol from the snapshot when one exists, from
//!    the incoming value otherwise, and havoc when neither resolves.
//!
//! Snapshots precede assignments; within each pass the phi declaration
//! order is preserved.

use rustc_hash::FxHashMap;

use crate::cfg::{CfgBlock, LinearExpr};
use crate::ir::{BlockId, Operand, ValueId};
use crate::translate::SymEval;

/// Appends assignments to `bb` realizing the phis of `succ` for the
/// edge coming from `pred`. `bb` is the edge block of a conditional
/// branch or the predecessor itself for an unconditional one.
pub fn lower_phis(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, succ: BlockId, pred: BlockId) {
    let block = ctx.func().block(succ);
    if block.phis.is_empty() {
        return;
    }

    let mut old_values: FxHashMap<ValueId, LinearExpr> = FxHashMap::default();

    for phi in &block.phis {
        let Some(incoming) = phi.incoming_for(pred) else {
            continue;
        };
        if !ctx.is_tracked(incoming) {
            continue;
        }
        if ctx.opts.disable_pointer_arith && !ctx.func().value_ty(phi.result).is_int() {
            continue;
        }
        let Some(incoming_id) = incoming.as_value() else {
            continue;
        };
        let same_block_phi = ctx
            .func()
            .def_phi(incoming_id)
            .is_some_and(|(def_block, _)| def_block == succ);
        if !same_block_phi || old_values.contains_key(&incoming_id) {
            continue;
        }
        if let Some(expr) = ctx.lookup(incoming) {
            let old = ctx.fresh();
            bb.assign(old.clone(), expr);
            old_values.insert(incoming_id, LinearExpr::var(old));
        }
    }

    for phi in &block.phis {
        let result_op = Operand::Value(phi.result);
        if !ctx.is_tracked(&result_op) {
            continue;
        }
        if ctx.opts.disable_pointer_arith && !ctx.func().value_ty(phi.result).is_int() {
            continue;
        }
        let lhs = ctx.sym_value(phi.result);
        let snapshot = phi
            .incoming_for(pred)
            .and_then(|incoming| incoming.as_value())
            .and_then(|id| old_values.get(&id).cloned());
        if let Some(expr) = snapshot {
            bb.assign(lhs, expr);
        } else if let Some(expr) = phi
            .incoming_for(pred)
            .and_then(|incoming| ctx.lookup(incoming))
        {
            bb.assign(lhs, expr);
        } else {
            bb.havoc(lhs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{Label, Statement};
    use crate::ir::{FunctionBuilder, Module, Ty, ValueId};
    use crate::translate::{RegisterModel, TranslateOptions, VariableFactory};

    /// Two phis swapping each other's values through an edge.
    #[test]
    fn test_phi_swap_uses_snapshots() {
        let mut module = Module::default();
        let mut f = FunctionBuilder::new("swap", Ty::Void);
        let u = f.param("u", Ty::I32);
        let v = f.param("v", Ty::I32);
        f.block("entry").unwrap();
        f.branch("loop").unwrap();
        f.block("loop").unwrap();
        let p1 = f
            .phi("p1", Ty::I32, &[(u, "entry"), (Operand::Value(ValueId::from_index(3)), "loop")])
            .unwrap();
        let p2 = f
            .phi("p2", Ty::I32, &[(v, "entry"), (p1.clone(), "loop")])
            .unwrap();
        assert_eq!(p2.as_value(), Some(ValueId::from_index(3)));
        f.branch("loop").unwrap();
        let id = module.add_function(f.finish().unwrap());

        let mut vfac = VariableFactory::new();
        let mem = RegisterModel::default();
        let opts = TranslateOptions::default();
        let mut ctx = SymEval::new(&module, id, &mut vfac, &mem, &opts);

        let mut bb = CfgBlock::new(Label::Synthetic(0));
        let loop_id = BlockId::from_index(1);
        lower_phis(&mut ctx, &mut bb, loop_id, loop_id);

        // Two snapshots, then two assignments reading the snapshots.
        let stmts = bb.statements();
        assert_eq!(stmts.len(), 4);
        let (t0, t1) = match (&stmts[0], &stmts[1]) {
            (Statement::Assign { dst: a, src: sa }, Statement::Assign { dst: b, src: sb }) => {
                assert_eq!(sa.as_variable().unwrap().text(), "p2");
                assert_eq!(sb.as_variable().unwrap().text(), "p1");
                (a.clone(), b.clone())
            }
            other => panic!("expected snapshot assignments, got {other:?}"),
        };
        match (&stmts[2], &stmts[3]) {
            (Statement::Assign { dst: a, src: sa }, Statement::Assign { dst: b, src: sb }) => {
                assert_eq!(a.text(), "p1");
                assert_eq!(sa.as_variable(), Some(&t0));
                assert_eq!(b.text(), "p2");
                assert_eq!(sb.as_variable(), Some(&t1));
            }
            other => panic!("expected phi assignments, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_edge_assigns_directly() {
        let mut module = Module::default();
        let mut f = FunctionBuilder::new("merge", Ty::Void);
        let u = f.param("u", Ty::I32);
        f.block("entry").unwrap();
        f.branch("join").unwrap();
        f.block("join").unwrap();
        f.phi("p", Ty::I32, &[(u, "entry")]).unwrap();
        f.ret(None).unwrap();
        let id = module.add_function(f.finish().unwrap());

        let mut vfac = VariableFactory::new();
        let mem = RegisterModel::default();
        let opts = TranslateOptions::default();
        let mut ctx = SymEval::new(&module, id, &mut vfac, &mem, &opts);

        let mut bb = CfgBlock::new(Label::named("entry"));
        lower_phis(&mut ctx, &mut bb, BlockId::from_index(1), BlockId::from_index(0));
        assert_eq!(bb.statements().len(), 1);
        match &bb.statements()[0] {
            Statement::Assign { dst, src } => {
                assert_eq!(dst.text(), "p");
                assert_eq!(src.as_variable().unwrap().text(), "u");
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolvable_incoming_havocs() {
        let mut module = Module::default();
        let mut f = FunctionBuilder::new("m", Ty::Void);
        f.block("entry").unwrap();
        f.branch("join").unwrap();
        f.block("join").unwrap();
        f.phi("p", Ty::I32, &[(Operand::Undef(Ty::I32), "entry")])
            .unwrap();
        f.ret(None).unwrap();
        let id = module.add_function(f.finish().unwrap());

        let mut vfac = VariableFactory::new();
        let mem = RegisterModel::default();
        let opts = TranslateOptions::default();
        let mut ctx = SymEval::new(&module, id, &mut vfac, &mem, &opts);

        let mut bb = CfgBlock::new(Label::named("entry"));
        lower_phis(&mut ctx, &mut bb, BlockId::from_index(1), BlockId::from_index(0));
        assert!(matches!(&bb.statements()[0], Statement::Havoc { var } if var.text() == "p"));
    }
}
