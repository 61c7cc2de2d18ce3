//! Per-instruction lowering into CFG statements.
//!
//! One entry point per block ([`lower_block_instrs`]) walks the
//! instruction list and appends the numeric shadow of each instruction
//! to the target block. Phis and branches are handled elsewhere;
//! compares are lowered only where they drive a branch, a select, or a
//! decomposable boolean guard. Whatever cannot be expressed precisely
//! degrades to a havoc of the destination — sound, never an error.

use log::warn;
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

use crate::cfg::{ArithOp, BitwiseOp, CfgBlock, LinearConstraint, LinearExpr, SelectCond, SymbolName, VarKind};
use crate::ir::{
    BinOp, BlockId, Callee, CastOp, GepIndex, GepStep, Instr, Operand, UseSite, ValueId,
};
use crate::translate::{
    cond, CallSiteRef, RegionSets, SymEval, TrackLevel, DEBUG_INTRINSIC_PREFIX, ENTRY_FUNCTION,
    FN_ENTRY_MARKER, SHADOW_MEM_PREFIX,
};

/// Lowers every non-terminator instruction of `block_id` into `bb`.
pub fn lower_block_instrs(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, block_id: BlockId) {
    let block = ctx.func().block(block_id);
    for (index, instr) in block.instrs.iter().enumerate() {
        let site = CallSiteRef {
            block: block_id,
            index,
        };
        lower_instr(ctx, bb, site, instr);
    }
}

fn lower_instr<'f>(ctx: &mut SymEval<'f>, bb: &mut CfgBlock, site: CallSiteRef, instr: &'f Instr) {
    match instr {
        Instr::Binary {
            result,
            op,
            lhs,
            rhs,
        } => lower_binary(ctx, bb, *result, *op, lhs, rhs),
        // Compares are translated only where they feed a branch, a
        // select, or a decomposable boolean guard.
        Instr::Icmp { .. } => {}
        Instr::Cast { result, op, src } => lower_cast(ctx, bb, *result, *op, src),
        Instr::Gep {
            result,
            base,
            indices,
        } => lower_gep(ctx, bb, *result, base, indices),
        Instr::Load { result, ptr } => lower_load(ctx, bb, *result, ptr),
        Instr::Store { value, ptr } => lower_store(ctx, bb, value, ptr),
        Instr::Alloca { result, .. } => lower_alloca(ctx, bb, *result),
        Instr::Select {
            result,
            cond,
            on_true,
            on_false,
        } => lower_select(ctx, bb, *result, cond, on_true, on_false),
        Instr::Call {
            result,
            callee,
            args,
            variadic,
        } => lower_call(ctx, bb, site, *result, callee, args, *variadic),
        Instr::Other { result, .. } => havoc_result(ctx, bb, *result),
    }
}

/// Emits the return statement of an inter-procedural function.
pub(crate) fn lower_ret(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, value: Option<&Operand>) {
    if !ctx.opts.inter_proc {
        return;
    }
    // The entry function's return value is not modeled.
    if ctx.func().name() == ENTRY_FUNCTION {
        return;
    }
    let Some(value) = value else { return };
    if !ctx.is_tracked(value) {
        return;
    }
    let ty = ctx.func().operand_ty(value);
    if ctx.opts.disable_pointer_arith && !ty.is_int() {
        return;
    }
    let kind = ctx.kind_of(&ty);
    if let Some(sym) = ctx.sym_operand(value) {
        bb.ret(sym, kind);
    } else if let Some(expr) = ctx.lookup(value) {
        // Constant return value: bind it to a name first.
        let tmp = ctx.fresh();
        bb.assign(tmp.clone(), expr);
        bb.ret(tmp, kind);
    }
}

// ---------------------------------------------------------------------------
// Binary operations
// ---------------------------------------------------------------------------

fn lower_binary(
    ctx: &mut SymEval<'_>,
    bb: &mut CfgBlock,
    result: ValueId,
    op: BinOp,
    lhs: &Operand,
    rhs: &Operand,
) {
    if !ctx.is_tracked(&Operand::Value(result)) {
        return;
    }
    let dst = ctx.sym_value(result);
    match op {
        BinOp::Add
        | BinOp::Sub
        | BinOp::Mul
        | BinOp::SDiv
        | BinOp::UDiv
        | BinOp::SRem
        | BinOp::URem
        | BinOp::Shl
        | BinOp::AShr => lower_arith(ctx, bb, dst, op, lhs, rhs),
        BinOp::And | BinOp::Or | BinOp::Xor => lower_bitwise(ctx, bb, dst, op, lhs, rhs),
        BinOp::LShr => {
            if ctx.opts.include_havoc {
                bb.havoc(dst);
            }
        }
    }
}

fn lower_arith(
    ctx: &mut SymEval<'_>,
    bb: &mut CfgBlock,
    dst: SymbolName,
    op: BinOp,
    lhs: &Operand,
    rhs: &Operand,
) {
    let (Some(op1), Some(op2)) = (ctx.lookup(lhs), ctx.lookup(rhs)) else {
        if ctx.opts.include_havoc {
            bb.havoc(dst);
        }
        return;
    };
    match op {
        BinOp::Add => bb.arith(ArithOp::Add, dst, op1, op2),
        BinOp::Mul => bb.arith(ArithOp::Mul, dst, op1, op2),
        BinOp::Sub => emit_const_left_normalized(bb, ArithOp::Sub, dst, op1, op2),
        BinOp::SDiv => emit_const_left_normalized(bb, ArithOp::SDiv, dst, op1, op2),
        BinOp::SRem => emit_const_left_normalized(bb, ArithOp::SRem, dst, op1, op2),
        BinOp::UDiv | BinOp::URem => {
            let aop = if op == BinOp::UDiv {
                ArithOp::UDiv
            } else {
                ArithOp::URem
            };
            if op1.is_constant() && op2.is_constant() {
                // The statement language has no unsigned primitive over
                // two constants; a constant folder upstream should have
                // removed this.
                warn!("ignored {aop} with both constant operands");
                if ctx.opts.include_havoc {
                    bb.havoc(dst);
                }
            } else {
                emit_const_left_normalized(bb, aop, dst, op1, op2);
            }
        }
        BinOp::Shl | BinOp::AShr => {
            if let Some(amount) = op2.constant_value() {
                let shift = amount
                    .to_usize()
                    .unwrap_or_else(|| panic!("negative or oversized shift amount {amount}"));
                let factor = BigInt::one() << shift;
                let aop = if op == BinOp::Shl {
                    ArithOp::Mul
                } else {
                    ArithOp::SDiv
                };
                bb.arith(aop, dst, op1, LinearExpr::constant(factor));
            } else if ctx.opts.include_havoc {
                bb.havoc(dst);
            }
        }
        BinOp::And | BinOp::Or | BinOp::Xor | BinOp::LShr => unreachable!(),
    }
}

/// The division-like primitives cannot take a bare constant as their
/// left operand; route it through the destination first.
fn emit_const_left_normalized(
    bb: &mut CfgBlock,
    op: ArithOp,
    dst: SymbolName,
    op1: LinearExpr,
    op2: LinearExpr,
) {
    if op1.is_constant() {
        bb.assign(dst.clone(), op1);
        bb.arith(op, dst.clone(), LinearExpr::var(dst), op2);
    } else {
        bb.arith(op, dst, op1, op2);
    }
}

fn lower_bitwise(
    ctx: &mut SymEval<'_>,
    bb: &mut CfgBlock,
    dst: SymbolName,
    op: BinOp,
    lhs: &Operand,
    rhs: &Operand,
) {
    let (Some(op1), Some(op2)) = (ctx.lookup(lhs), ctx.lookup(rhs)) else {
        if ctx.opts.include_havoc {
            bb.havoc(dst);
        }
        return;
    };
    let bop = match op {
        BinOp::And => BitwiseOp::And,
        BinOp::Or => BitwiseOp::Or,
        BinOp::Xor => BitwiseOp::Xor,
        _ => unreachable!(),
    };
    bb.bitwise(bop, dst, op1, op2);
}

// ---------------------------------------------------------------------------
// Casts
// ---------------------------------------------------------------------------

fn lower_cast(
    ctx: &mut SymEval<'_>,
    bb: &mut CfgBlock,
    result: ValueId,
    op: CastOp,
    src: &Operand,
) {
    // Widening casts consumed exclusively as address indices are
    // elided; address lowering strips them itself. Fewer names, less
    // pressure on the numeric domain.
    if matches!(op, CastOp::ZExt | CastOp::SExt) && all_uses_are_gep(ctx, result) {
        return;
    }
    if !ctx.is_tracked(&Operand::Value(result)) {
        return;
    }
    if ctx.opts.disable_pointer_arith && !ctx.func().value_ty(result).is_int() {
        return;
    }
    if all_uses_non_track_mem(ctx, result) {
        return;
    }
    let dst = ctx.sym_value(result);
    if let Some(expr) = ctx.lookup(src) {
        bb.assign(dst, expr);
    } else if ctx.func().operand_ty(src).is_bool() {
        // The source is an untranslated boolean; its widened image
        // still lies in {0, 1}.
        let zero = LinearExpr::constant(0);
        let one = LinearExpr::constant(1);
        bb.assume(LinearConstraint::ge(LinearExpr::var(dst.clone()), &zero));
        bb.assume(LinearConstraint::le(LinearExpr::var(dst), &one));
    } else if ctx.opts.include_havoc {
        bb.havoc(dst);
    }
}

fn all_uses_are_gep(ctx: &SymEval<'_>, value: ValueId) -> bool {
    ctx.func().uses(value).iter().all(|site| match site {
        UseSite::Instr(block, index) => matches!(
            ctx.func().block(*block).instrs[*index],
            Instr::Gep { .. }
        ),
        _ => false,
    })
}

/// True iff every use of `value` is memory traffic the translation will
/// never model: non-integer loads and stores, shadow or debug calls,
/// and casts all of whose uses satisfy the same property.
fn all_uses_non_track_mem(ctx: &SymEval<'_>, value: ValueId) -> bool {
    ctx.func().uses(value).iter().all(|site| {
        let UseSite::Instr(block, index) = site else {
            return false;
        };
        match &ctx.func().block(*block).instrs[*index] {
            Instr::Store { value: stored, .. } => !ctx.func().operand_ty(stored).is_int(),
            Instr::Load { result, .. } => !ctx.func().value_ty(*result).is_int(),
            Instr::Call {
                callee: Callee::Direct(name),
                ..
            } => name.starts_with(DEBUG_INTRINSIC_PREFIX) || name.starts_with(SHADOW_MEM_PREFIX),
            Instr::Cast { result, .. } => all_uses_non_track_mem(ctx, *result),
            _ => false,
        }
    })
}

// ---------------------------------------------------------------------------
// Address computation
// ---------------------------------------------------------------------------

fn lower_gep<'f>(
    ctx: &mut SymEval<'f>,
    bb: &mut CfgBlock,
    result: ValueId,
    base: &Operand,
    indices: &'f [GepIndex],
) {
    if !ctx.is_tracked(&Operand::Value(result)) {
        return;
    }
    if ctx.opts.disable_pointer_arith || all_uses_non_track_mem(ctx, result) {
        havoc_result(ctx, bb, Some(result));
        return;
    }
    let Some(ptr) = ctx.lookup(base) else {
        havoc_result(ctx, bb, Some(result));
        return;
    };
    let res = ctx.sym_value(result);

    if let Some(offset) = constant_offset(ctx, indices) {
        bb.arith(ArithOp::Add, res, ptr, LinearExpr::constant(offset));
        return;
    }

    bb.assign(res.clone(), ptr);
    for index in indices {
        match &index.step {
            GepStep::Field(fields) => {
                // Upstream type checking guarantees struct indices are
                // constants.
                let field = index
                    .operand
                    .as_const()
                    .and_then(|c| c.value().to_usize())
                    .unwrap_or_else(|| panic!("non-constant struct field index"));
                let offset = ctx.layout().struct_field_offset(fields, field);
                bb.arith(
                    ArithOp::Add,
                    res.clone(),
                    LinearExpr::var(res.clone()),
                    LinearExpr::constant(offset),
                );
            }
            GepStep::Element(elem) => {
                let operand = strip_ext(ctx, &index.operand);
                let expr = ctx
                    .lookup(operand)
                    .unwrap_or_else(|| panic!("untranslatable address index"));
                let stride = ctx.layout().store_size(elem);
                let offset = ctx.fresh();
                bb.arith(
                    ArithOp::Mul,
                    offset.clone(),
                    expr,
                    LinearExpr::constant(stride),
                );
                bb.arith(
                    ArithOp::Add,
                    res.clone(),
                    LinearExpr::var(res.clone()),
                    LinearExpr::var(offset),
                );
            }
        }
    }
}

fn constant_offset(ctx: &SymEval<'_>, indices: &[GepIndex]) -> Option<BigInt> {
    let mut total = BigInt::zero();
    for index in indices {
        let c = index.operand.as_const()?;
        match &index.step {
            GepStep::Field(fields) => {
                let field = c.value().to_usize()?;
                total += BigInt::from(ctx.layout().struct_field_offset(fields, field));
            }
            GepStep::Element(elem) => {
                total += c.value() * BigInt::from(ctx.layout().alloc_size(elem));
            }
        }
    }
    Some(total)
}

/// Looks through a single widening cast on an address index.
fn strip_ext<'f>(ctx: &SymEval<'f>, operand: &'f Operand) -> &'f Operand {
    match ctx.def_instr(operand) {
        Some(Instr::Cast {
            op: CastOp::ZExt | CastOp::SExt,
            src,
            ..
        }) => src,
        _ => operand,
    }
}

// ---------------------------------------------------------------------------
// Memory access
// ---------------------------------------------------------------------------

fn lower_load(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, result: ValueId, ptr: &Operand) {
    let ty = ctx.func().value_ty(result).clone();
    // Only integer cells are modeled, and only when memory is tracked.
    if ty.is_int() && ctx.mem.track_level() == TrackLevel::Arrays {
        if let Some(array) = ctx.mem.array_id(ctx.func(), ptr) {
            if let Some(index) = ctx.lookup(ptr) {
                if let Some(cell) = ctx.mem.singleton(array) {
                    let dst = ctx.sym_value(result);
                    let src = ctx.sym_ref(cell);
                    bb.assign(dst, LinearExpr::var(src));
                } else {
                    let dst = ctx.sym_value(result);
                    let arr = ctx.sym_array(array);
                    let elem_size = ctx.layout().alloc_size(&ty);
                    bb.array_load(dst, arr, index, elem_size);
                }
                return;
            }
        }
    }
    havoc_result(ctx, bb, Some(result));
}

fn lower_store(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, value: &Operand, ptr: &Operand) {
    let ty = ctx.func().operand_ty(value);
    if !ty.is_int() || ctx.mem.track_level() != TrackLevel::Arrays {
        return;
    }
    let Some(array) = ctx.mem.array_id(ctx.func(), ptr) else {
        return;
    };
    let (Some(index), Some(val)) = (ctx.lookup(ptr), ctx.lookup(value)) else {
        // The cell written cannot be identified; the whole region loses
        // its contents. Unconditional: region summaries are mutable,
        // unlike SSA names.
        let arr = ctx.sym_array(array);
        bb.havoc(arr);
        return;
    };
    if let Some(cell) = ctx.mem.singleton(array) {
        let dst = ctx.sym_ref(cell);
        bb.assign(dst, val);
    } else {
        let arr = ctx.sym_array(array);
        let elem_size = ctx.layout().alloc_size(&ty);
        bb.array_store(arr, index, val, elem_size);
    }
}

fn lower_alloca(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, result: ValueId) {
    if ctx.mem.track_level() != TrackLevel::Arrays {
        return;
    }
    let Some(array) = ctx.mem.array_id(ctx.func(), &Operand::Value(result)) else {
        return;
    };
    // Initialization hook: fresh regions start undefined; assuming a
    // zero fill keeps the smashing domain from starting at top. Under
    // undefined behaviour any value is permissible, but this does hide
    // uninitialized-read bugs from downstream analyses.
    let arr = ctx.sym_array(array);
    bb.assume_array(arr, 0);
}

// ---------------------------------------------------------------------------
// Select
// ---------------------------------------------------------------------------

fn lower_select(
    ctx: &mut SymEval<'_>,
    bb: &mut CfgBlock,
    result: ValueId,
    cond_op: &Operand,
    on_true: &Operand,
    on_false: &Operand,
) {
    if !ctx.is_tracked(&Operand::Value(result)) {
        return;
    }
    if ctx.opts.disable_pointer_arith
        && (!ctx.func().operand_ty(on_true).is_int() || !ctx.func().operand_ty(on_false).is_int())
    {
        return;
    }
    let (Some(op0), Some(op1)) = (ctx.lookup(on_true), ctx.lookup(on_false)) else {
        return;
    };
    let dst = ctx.sym_value(result);

    if let Some(c) = cond_op.as_const() {
        if c.is_one() {
            bb.assign(dst, op0);
            return;
        }
        if c.is_zero() {
            bb.assign(dst, op1);
            return;
        }
    }

    if let Some(Instr::Icmp { pred, lhs, rhs, .. }) = ctx.def_instr(cond_op) {
        let mut csts = cond::cmp_constraints(ctx, *pred, lhs, rhs, false);
        // A single constraint has a native conditional move; a
        // conjunction would force the analysis to negate it.
        if csts.len() == 1 {
            bb.select(dst, SelectCond::Constraint(csts.remove(0)), op0, op1);
            return;
        }
    }

    if let Some(sym) = ctx.sym_operand(cond_op) {
        bb.select(dst, SelectCond::Var(sym), op0, op1);
    } else if ctx.opts.include_havoc {
        bb.havoc(dst);
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

fn is_alloc_name(name: &str) -> bool {
    matches!(name, "malloc" | "calloc" | "valloc" | "palloc")
}

fn is_intrinsic_name(name: &str) -> bool {
    name.starts_with("llvm.")
}

fn is_memset_name(name: &str) -> bool {
    name == "memset" || name.starts_with("llvm.memset")
}

fn is_memcpy_name(name: &str) -> bool {
    name == "memcpy" || name.starts_with("llvm.memcpy")
}

fn is_memmove_name(name: &str) -> bool {
    name == "memmove" || name.starts_with("llvm.memmove")
}

fn havoc_result(ctx: &mut SymEval<'_>, bb: &mut CfgBlock, result: Option<ValueId>) {
    let Some(result) = result else { return };
    if ctx.is_tracked(&Operand::Value(result)) && ctx.opts.include_havoc {
        let sym = ctx.sym_value(result);
        bb.havoc(sym);
    }
}

#[allow(clippy::too_many_arguments)]
fn lower_call<'f>(
    ctx: &mut SymEval<'f>,
    bb: &mut CfgBlock,
    site: CallSiteRef,
    result: Option<ValueId>,
    callee: &'f Callee,
    args: &'f [Operand],
    variadic: bool,
) {
    let name = match callee {
        // An unresolved target: all we know is the result is gone.
        Callee::Indirect(_) => {
            havoc_result(ctx, bb, result);
            return;
        }
        Callee::Direct(name) => name.as_str(),
    };

    if name.starts_with(SHADOW_MEM_PREFIX) || name == FN_ENTRY_MARKER {
        return;
    }

    let is_declaration = ctx.module.function_by_name(name).is_none();
    if is_declaration && ctx.func().name() == ENTRY_FUNCTION && is_alloc_name(name) {
        if let Some(result) = result {
            if let Some(array) = ctx.mem.array_id(ctx.func(), &Operand::Value(result)) {
                // Initialization hook, same as for stack allocations.
                let arr = ctx.sym_array(array);
                bb.assume_array(arr, 0);
            }
        }
        return;
    }

    if is_memset_name(name) {
        if let [ptr, val, ..] = args {
            if let Some(array) = ctx.mem.array_id(ctx.func(), ptr) {
                if let Some(expr) = ctx.lookup(val) {
                    if let Some(fill) = expr.constant_value() {
                        let arr = ctx.sym_array(array);
                        bb.havoc(arr.clone());
                        bb.assume_array(arr, fill.clone());
                    }
                }
            }
        }
        return;
    }

    if is_memcpy_name(name) {
        if let [dst, src, ..] = args {
            let dst_array = ctx.mem.array_id(ctx.func(), dst);
            let src_array = ctx.mem.array_id(ctx.func(), src);
            if let (Some(dst_array), Some(src_array)) = (dst_array, src_array) {
                let darr = ctx.sym_array(dst_array);
                let sarr = ctx.sym_array(src_array);
                bb.havoc(darr.clone());
                bb.assign(darr, LinearExpr::var(sarr));
            }
        }
        return;
    }

    // memmove permits overlap between source and destination, which the
    // smashed-array copy above cannot express soundly.
    if is_memmove_name(name) {
        return;
    }

    if name == "verifier.assume" || name == "verifier.assume.not" {
        let negated = name.ends_with(".not");
        if let Some(cond_arg) = args.first() {
            let cond_arg = strip_ext(ctx, cond_arg);
            if let Some(instr) = ctx.def_instr(cond_arg) {
                cond::lower_cond_instr(ctx, bb, instr, negated);
            }
        }
        return;
    }

    // Remaining intrinsics carry no numeric semantics.
    if is_intrinsic_name(name) {
        return;
    }

    // A callee with no body to translate is as opaque as an indirect
    // target; marshalling actuals against it would pair them with a
    // declaration that never exists.
    if !ctx.opts.inter_proc || variadic || is_declaration {
        havoc_result(ctx, bb, result);
        // Whatever the callee wrote is gone.
        if ctx.mem.track_level() == TrackLevel::Arrays {
            let sets = ctx.mem.callsite_regions(ctx.func(), site);
            for array in sets.mods {
                let arr = ctx.sym_array(array);
                bb.havoc(arr);
            }
        }
        return;
    }

    // Inter-procedural call site: scalar actuals in argument order,
    // then ref-array input snapshots, the ref arrays themselves, and
    // the new arrays. The callee's declaration builds its formals in
    // the same order from the same oracle, which is what matches them
    // up positionally.
    let mut actuals: Vec<(SymbolName, VarKind)> = Vec::new();
    for arg in args {
        if !ctx.is_tracked(arg) {
            continue;
        }
        if ctx.opts.disable_pointer_arith && !ctx.func().operand_ty(arg).is_int() {
            continue;
        }
        actuals.push(normalize_param(ctx, bb, arg));
    }

    let mut sets = RegionSets::default();
    if ctx.mem.track_level() == TrackLevel::Arrays {
        sets = ctx.mem.callsite_regions(ctx.func(), site);
        for array in &sets.refs {
            let arr = ctx.sym_array(*array);
            let arr_in = ctx.fresh();
            bb.assign(arr_in.clone(), LinearExpr::var(arr.clone()));
            bb.havoc(arr);
            actuals.push((arr_in, VarKind::Arr));
        }
        for array in &sets.refs {
            actuals.push((ctx.sym_array(*array), VarKind::Arr));
        }
        for array in &sets.news {
            actuals.push((ctx.sym_array(*array), VarKind::Arr));
        }
    }

    let callee_sym = ctx.sym_callee(name);
    let binding = result.and_then(|result| {
        let ty = ctx.func().value_ty(result).clone();
        let kind = ctx.kind_of(&ty);
        if kind == VarKind::Unknown || !ctx.is_tracked_ty(&ty) {
            return None;
        }
        if ctx.opts.disable_pointer_arith && !ty.is_int() {
            return None;
        }
        Some((ctx.sym_value(result), kind))
    });
    bb.callsite(binding, callee_sym, actuals);

    // A region the callee writes without it being marshalled above
    // would keep stale contents past the call.
    if ctx.mem.track_level() == TrackLevel::Arrays {
        for array in &sets.mods {
            if !sets.refs.contains(array) && !sets.news.contains(array) {
                let arr = ctx.sym_array(*array);
                bb.havoc(arr);
            }
        }
    }
}

/// Turns an actual argument into a `(symbol, kind)` pair, routing
/// immediates through fresh names.
fn normalize_param(
    ctx: &mut SymEval<'_>,
    bb: &mut CfgBlock,
    arg: &Operand,
) -> (SymbolName, VarKind) {
    match arg {
        Operand::Const(_) | Operand::Undef(_) => {
            let tmp = ctx.fresh();
            if let Some(expr) = arg.as_const().and_then(|_| ctx.lookup(arg)) {
                bb.assign(tmp.clone(), expr);
                (tmp, VarKind::Int)
            } else {
                bb.havoc(tmp.clone());
                (tmp, VarKind::Unknown)
            }
        }
        Operand::Value(id) => {
            let kind = ctx.kind_of(&ctx.func().value_ty(*id).clone());
            (ctx.sym_value(*id), kind)
        }
        Operand::Global(id) => (ctx.sym_global(*id), VarKind::Ptr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{Label, Statement};
    use crate::ir::{FunctionBuilder, IcmpPred, Module, Ty};
    use crate::translate::{RegisterModel, TranslateOptions, VariableFactory};

    fn lower_entry(
        build: impl FnOnce(&mut FunctionBuilder),
        opts: TranslateOptions,
    ) -> Vec<Statement> {
        let mut module = Module::default();
        let mut f = FunctionBuilder::new("f", Ty::Void);
        build(&mut f);
        f.ret(None).unwrap();
        let id = module.add_function(f.finish().unwrap());
        let mut vfac = VariableFactory::new();
        let mem = RegisterModel::default();
        let mut ctx = SymEval::new(&module, id, &mut vfac, &mem, &opts);
        let mut bb = CfgBlock::new(Label::named("entry"));
        lower_block_instrs(&mut ctx, &mut bb, BlockId::from_index(0));
        bb.statements().to_vec()
    }

    #[test]
    fn test_add_with_constant() {
        let stmts = lower_entry(
            |f| {
                let x = f.param("x", Ty::I32);
                f.block("entry").unwrap();
                f.binary(BinOp::Add, "r", Ty::I32, x, Operand::const_int(3, 32))
                    .unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].to_string(), "r = add(x, 3)");
    }

    #[test]
    fn test_sub_constant_left_is_normalized() {
        let stmts = lower_entry(
            |f| {
                let x = f.param("x", Ty::I32);
                f.block("entry").unwrap();
                f.binary(BinOp::Sub, "r", Ty::I32, Operand::const_int(5, 32), x)
                    .unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].to_string(), "r = 5");
        assert_eq!(stmts[1].to_string(), "r = sub(r, x)");
    }

    #[test]
    fn test_shl_by_constant_becomes_multiplication() {
        let stmts = lower_entry(
            |f| {
                let x = f.param("x", Ty::I32);
                f.block("entry").unwrap();
                f.binary(BinOp::Shl, "r", Ty::I32, x, Operand::const_int(3, 32))
                    .unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts[0].to_string(), "r = mul(x, 8)");
    }

    #[test]
    fn test_ashr_by_constant_becomes_division() {
        let stmts = lower_entry(
            |f| {
                let x = f.param("x", Ty::I32);
                f.block("entry").unwrap();
                f.binary(BinOp::AShr, "r", Ty::I32, x, Operand::const_int(2, 32))
                    .unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts[0].to_string(), "r = sdiv(x, 4)");
    }

    #[test]
    fn test_udiv_of_two_constants_havocs() {
        let stmts = lower_entry(
            |f| {
                f.block("entry").unwrap();
                f.binary(
                    BinOp::UDiv,
                    "r",
                    Ty::I32,
                    Operand::const_int(10, 32),
                    Operand::const_int(2, 32),
                )
                .unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts.len(), 1);
        assert!(matches!(&stmts[0], Statement::Havoc { var } if var.text() == "r"));
    }

    #[test]
    fn test_lshr_havocs() {
        let stmts = lower_entry(
            |f| {
                let x = f.param("x", Ty::I32);
                f.block("entry").unwrap();
                let s = f.param("s", Ty::I32);
                f.binary(BinOp::LShr, "r", Ty::I32, x, s).unwrap();
            },
            TranslateOptions::default(),
        );
        assert!(matches!(&stmts[0], Statement::Havoc { var } if var.text() == "r"));

        // Without include_havoc the destination is simply left alone.
        let stmts = lower_entry(
            |f| {
                let x = f.param("x", Ty::I32);
                f.block("entry").unwrap();
                let s = f.param("s", Ty::I32);
                f.binary(BinOp::LShr, "r", Ty::I32, x, s).unwrap();
            },
            TranslateOptions {
                include_havoc: false,
                ..TranslateOptions::default()
            },
        );
        assert!(stmts.is_empty());
    }

    #[test]
    fn test_bitwise_lowering() {
        let stmts = lower_entry(
            |f| {
                let x = f.param("x", Ty::I32);
                let y = f.param("y", Ty::I32);
                f.block("entry").unwrap();
                f.binary(BinOp::Xor, "r", Ty::I32, x, y).unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts[0].to_string(), "r = xor(x, y)");
    }

    #[test]
    fn test_cast_of_untranslatable_bool_source_is_bounded() {
        let stmts = lower_entry(
            |f| {
                f.block("entry").unwrap();
                // The widened image of a boolean still lies in {0, 1}
                // even when the source itself cannot be evaluated.
                let w = f
                    .cast(CastOp::ZExt, "w", Ty::I32, Operand::Undef(Ty::BOOL))
                    .unwrap();
                f.binary(BinOp::Add, "z", Ty::I32, w, Operand::const_int(0, 32))
                    .unwrap();
            },
            TranslateOptions::default(),
        );
        let rendered: Vec<String> = stmts.iter().map(ToString::to_string).collect();
        assert!(rendered.contains(&"assume(w >= 0)".to_string()), "{rendered:?}");
        assert!(rendered.contains(&"assume(w <= 1)".to_string()), "{rendered:?}");
    }

    #[test]
    fn test_zext_used_only_by_address_computation_is_elided() {
        let stmts = lower_entry(
            |f| {
                let i = f.param("i", Ty::I8);
                let p = f.param("p", Ty::Ptr);
                f.block("entry").unwrap();
                let w = f.cast(CastOp::ZExt, "w", Ty::I32, i).unwrap();
                f.gep(
                    "q",
                    p,
                    vec![GepIndex {
                        step: GepStep::Element(Ty::I8),
                        operand: w,
                    }],
                )
                .unwrap();
            },
            TranslateOptions::default(),
        );
        // No statement mentions w: the cast is skipped and the address
        // lowering reads through it to the original index.
        let rendered: Vec<String> = stmts.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["q = p", "__t0 = mul(i, 1)", "q = add(q, __t0)"]
        );
    }

    #[test]
    fn test_gep_constant_offset_fast_path() {
        let stmts = lower_entry(
            |f| {
                let p = f.param("p", Ty::Ptr);
                f.block("entry").unwrap();
                // Field 2 of {i32, i32, i64} sits at offset 8.
                f.gep(
                    "q",
                    p,
                    vec![GepIndex {
                        step: GepStep::Field(vec![Ty::I32, Ty::I32, Ty::I64]),
                        operand: Operand::const_int(2, 32),
                    }],
                )
                .unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].to_string(), "q = add(p, 8)");
    }

    #[test]
    fn test_gep_symbolic_index_scales_by_stride() {
        let stmts = lower_entry(
            |f| {
                let p = f.param("p", Ty::Ptr);
                let i = f.param("i", Ty::I32);
                f.block("entry").unwrap();
                f.gep(
                    "q",
                    p,
                    vec![GepIndex {
                        step: GepStep::Element(Ty::I64),
                        operand: i,
                    }],
                )
                .unwrap();
            },
            TranslateOptions::default(),
        );
        let rendered: Vec<String> = stmts.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["q = p", "__t0 = mul(i, 8)", "q = add(q, __t0)"]
        );
    }

    #[test]
    fn test_gep_disabled_pointer_arith_havocs() {
        let stmts = lower_entry(
            |f| {
                let p = f.param("p", Ty::Ptr);
                f.block("entry").unwrap();
                f.gep(
                    "q",
                    p,
                    vec![GepIndex {
                        step: GepStep::Element(Ty::I32),
                        operand: Operand::const_int(1, 32),
                    }],
                )
                .unwrap();
            },
            TranslateOptions {
                disable_pointer_arith: true,
                ..TranslateOptions::default()
            },
        );
        assert!(matches!(&stmts[0], Statement::Havoc { var } if var.text() == "q"));
    }

    #[test]
    fn test_select_folds_constant_condition() {
        let stmts = lower_entry(
            |f| {
                let a = f.param("a", Ty::I32);
                let b = f.param("b", Ty::I32);
                f.block("entry").unwrap();
                f.select("r", Ty::I32, Operand::const_int(1, 1), a, b)
                    .unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts[0].to_string(), "r = a");
    }

    #[test]
    fn test_select_on_single_constraint_compare() {
        let stmts = lower_entry(
            |f| {
                let a = f.param("a", Ty::I32);
                let b = f.param("b", Ty::I32);
                f.block("entry").unwrap();
                let c = f.icmp(IcmpPred::Slt, "c", a.clone(), b.clone()).unwrap();
                f.select("r", Ty::I32, c, a, b).unwrap();
            },
            TranslateOptions::default(),
        );
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].to_string(), "r = ite(a - b <= -1, a, b)");
    }
}
