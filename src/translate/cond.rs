//! Lowering boolean conditions to assume statements.
//!
//! Given the instruction producing a branch condition and a polarity
//! (negated on the false edge), this module appends to the target edge
//! block a set of linear constraints equivalent to the condition —
//! restricted to the conjunctive fragment the statement language can
//! express. Conditions that do not fit become empty constraint sets: a
//! sound over-approximation, never an error.
//!
//! Unsigned comparisons additionally pin their variable operands to be
//! non-negative, in both polarities; the signed constraints for the
//! requested polarity follow. Downstream domains treat the conjunction
//! soundly since the extra bounds only tighten.

use crate::cfg::{CfgBlock, LinearConstraint, LinearExpr};
use crate::ir::{BinOp, DefSite, IcmpPred, Instr, Operand, ValueId};
use crate::translate::SymEval;

/// Rewrites a strict-greater or not-less predicate by swapping
/// operands, leaving only `EQ`, `NE`, `ULT/SLT`, `ULE/SLE`.
/// Idempotent.
#[must_use]
pub fn normalize_cmp<'o>(
    pred: IcmpPred,
    lhs: &'o Operand,
    rhs: &'o Operand,
) -> (IcmpPred, &'o Operand, &'o Operand) {
    match pred {
        IcmpPred::Ugt => (IcmpPred::Ult, rhs, lhs),
        IcmpPred::Uge => (IcmpPred::Ule, rhs, lhs),
        IcmpPred::Sgt => (IcmpPred::Slt, rhs, lhs),
        IcmpPred::Sge => (IcmpPred::Sle, rhs, lhs),
        _ => (pred, lhs, rhs),
    }
}

/// Generates the constraint set for one comparison under a polarity.
///
/// Both operands must evaluate to linear expressions; otherwise the
/// result is empty.
#[must_use]
pub fn cmp_constraints(
    ctx: &mut SymEval<'_>,
    pred: IcmpPred,
    lhs: &Operand,
    rhs: &Operand,
    negated: bool,
) -> Vec<LinearConstraint> {
    let (pred, lhs, rhs) = normalize_cmp(pred, lhs, rhs);
    let mut res = Vec::new();
    let (Some(op1), Some(op2)) = (ctx.lookup(lhs), ctx.lookup(rhs)) else {
        return res;
    };
    let zero = LinearExpr::constant(0);
    match pred {
        IcmpPred::Eq => res.push(if negated {
            LinearConstraint::ne(op1, &op2)
        } else {
            LinearConstraint::eq(op1, &op2)
        }),
        IcmpPred::Ne => res.push(if negated {
            LinearConstraint::eq(op1, &op2)
        } else {
            LinearConstraint::ne(op1, &op2)
        }),
        IcmpPred::Ult | IcmpPred::Slt => {
            if pred == IcmpPred::Ult {
                if SymEval::is_var(&op1) {
                    res.push(LinearConstraint::ge(op1.clone(), &zero));
                }
                if SymEval::is_var(&op2) {
                    res.push(LinearConstraint::ge(op2.clone(), &zero));
                }
            }
            res.push(if negated {
                LinearConstraint::ge(op1, &op2)
            } else {
                LinearConstraint::le(op1, &op2.plus_const(-1))
            });
        }
        IcmpPred::Ule | IcmpPred::Sle => {
            if pred == IcmpPred::Ule {
                if SymEval::is_var(&op1) {
                    res.push(LinearConstraint::ge(op1.clone(), &zero));
                }
                if SymEval::is_var(&op2) {
                    res.push(LinearConstraint::ge(op2.clone(), &zero));
                }
            }
            res.push(if negated {
                LinearConstraint::ge(op1, &op2.plus_const(1))
            } else {
                LinearConstraint::le(op1, &op2)
            });
        }
        // Removed by normalization.
        IcmpPred::Ugt | IcmpPred::Uge | IcmpPred::Sgt | IcmpPred::Sge => unreachable!(),
    }
    res
}

fn as_cmp<'f>(
    ctx: &SymEval<'f>,
    operand: &Operand,
) -> Option<(ValueId, IcmpPred, &'f Operand, &'f Operand)> {
    match ctx.def_instr(operand) {
        Some(Instr::Icmp {
            result,
            pred,
            lhs,
            rhs,
        }) => Some((*result, *pred, lhs, rhs)),
        _ => None,
    }
}

fn assume_bool_value(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, sym_source: &Operand, negated: bool) {
    if let Some(sym) = ctx.sym_operand(sym_source) {
        let bit = LinearExpr::constant(i64::from(!negated));
        bb.assume(LinearConstraint::eq(LinearExpr::var(sym), &bit));
    }
}

/// Lowers a condition-producing instruction into `bb` under a polarity.
///
/// Handles comparisons and the decomposable short-circuit patterns
/// (`AND` on the true edge, `OR` on the false edge, when both operands
/// are themselves comparisons). Anything else is modeled conservatively:
/// when the boolean is tracked and feeds more than the branch, its
/// symbol is pinned to the polarity's truth value.
pub fn lower_cond_instr(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, instr: &Instr, negated: bool) {
    match instr {
        Instr::Icmp {
            result,
            pred,
            lhs,
            rhs,
        } => {
            if ctx.opts.disable_pointer_arith
                && (!ctx.func().operand_ty(lhs).is_int() || !ctx.func().operand_ty(rhs).is_int())
            {
                return;
            }
            for cst in cmp_constraints(ctx, *pred, lhs, rhs, negated) {
                bb.assume(cst);
            }
            // The compare already drives this branch; only pin its
            // boolean when something else reads it too.
            if ctx.func().use_count(*result) >= 2 {
                assume_bool_value(ctx, bb, &Operand::Value(*result), negated);
            }
        }
        Instr::Binary {
            result,
            op,
            lhs,
            rhs,
        } => {
            let decomposable = matches!((*op, negated), (BinOp::And, false) | (BinOp::Or, true));
            if decomposable {
                if let (Some((v1, p1, l1, r1)), Some((v2, p2, l2, r2))) =
                    (as_cmp(ctx, lhs), as_cmp(ctx, rhs))
                {
                    // Each sub-compare gets the same treatment a
                    // standalone branch compare would: its constraints,
                    // and its boolean pinned when anything beyond this
                    // combination reads it.
                    for cst in cmp_constraints(ctx, p1, l1, r1, negated) {
                        bb.assume(cst);
                    }
                    if ctx.func().use_count(v1) >= 2 {
                        assume_bool_value(ctx, bb, &Operand::Value(v1), negated);
                    }
                    for cst in cmp_constraints(ctx, p2, l2, r2, negated) {
                        bb.assume(cst);
                    }
                    if ctx.func().use_count(v2) >= 2 {
                        assume_bool_value(ctx, bb, &Operand::Value(v2), negated);
                    }
                    return;
                }
            }
            let result_op = Operand::Value(*result);
            if ctx.is_tracked(&result_op) && ctx.func().use_count(*result) >= 2 {
                assume_bool_value(ctx, bb, &result_op, negated);
            }
        }
        _ => {}
    }
}

/// Lowers a branch condition operand into `bb` under a polarity.
///
/// Dispatches to [`lower_cond_instr`] when the condition is an
/// instruction result. A boolean passed straight through a parameter is
/// pinned to the polarity's truth value; a phi-defined boolean yields no
/// constraint.
pub fn lower_branch_cond(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, cond: &Operand, negated: bool) {
    if let Some(instr) = ctx.def_instr(cond) {
        lower_cond_instr(ctx, bb, instr, negated);
        return;
    }
    if let Operand::Value(id) = cond {
        if matches!(ctx.func().def_site(*id), DefSite::Param(_)) {
            assume_bool_value(ctx, bb, cond, negated);
        }
    }
}
