//! CFG nodes: labels and statement blocks.

use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::cfg::{
    ArithOp, BitwiseOp, LinearConstraint, LinearExpr, SelectCond, Statement, SymbolName, VarKind,
};

/// A CFG node label.
///
/// Labels of nodes translated 1:1 from input blocks are [`Label::Named`]
/// and reuse the input name; edge blocks and the unified exit are
/// [`Label::Synthetic`] and can never collide with input names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// A label carried over from the input program.
    Named(Arc<str>),
    /// A label minted during translation.
    Synthetic(u32),
}

impl Label {
    /// Creates a named label.
    #[must_use]
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Label::Named(name.into())
    }

    /// Returns `true` for synthetic labels.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        matches!(self, Label::Synthetic(_))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Named(name) => write!(f, "{name}"),
            Label::Synthetic(n) => write!(f, "__bb{n}"),
        }
    }
}

/// A CFG node: a label, an ordered statement sequence, and the ordered
/// successor list.
#[derive(Debug, Clone)]
pub struct CfgBlock {
    label: Label,
    stmts: Vec<Statement>,
    succs: Vec<Label>,
}

impl CfgBlock {
    /// Creates an empty block with the given label.
    #[must_use]
    pub fn new(label: Label) -> Self {
        Self {
            label,
            stmts: Vec::new(),
            succs: Vec::new(),
        }
    }

    /// The block's label.
    #[must_use]
    pub const fn label(&self) -> &Label {
        &self.label
    }

    /// The statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.stmts
    }

    /// The ordered successor labels.
    #[must_use]
    pub fn successors(&self) -> &[Label] {
        &self.succs
    }

    /// Appends a statement.
    pub fn push(&mut self, stmt: Statement) {
        self.stmts.push(stmt);
    }

    /// Splices a statement sequence at the front of the block, ahead of
    /// everything already emitted. Used for entry preludes.
    pub fn splice_front(&mut self, stmts: Vec<Statement>) {
        self.stmts.splice(0..0, stmts);
    }

    pub(crate) fn add_successor(&mut self, dst: Label) {
        if !self.succs.contains(&dst) {
            self.succs.push(dst);
        }
    }

    pub(crate) fn remove_successor(&mut self, dst: &Label) {
        self.succs.retain(|s| s != dst);
    }

    pub(crate) fn take_statements(&mut self) -> Vec<Statement> {
        std::mem::take(&mut self.stmts)
    }

    pub(crate) fn take_successors(&mut self) -> Vec<Label> {
        std::mem::take(&mut self.succs)
    }

    // ------------------------------------------------------------------
    // Emitters. These keep the translator code close to the statement
    // language; each appends exactly one statement.
    // ------------------------------------------------------------------

    /// Emits `dst = src`.
    pub fn assign(&mut self, dst: SymbolName, src: LinearExpr) {
        self.push(Statement::Assign { dst, src });
    }

    /// Emits an arithmetic statement.
    pub fn arith(&mut self, op: ArithOp, dst: SymbolName, lhs: LinearExpr, rhs: LinearExpr) {
        self.push(Statement::Arith { op, dst, lhs, rhs });
    }

    /// Emits a bitwise statement.
    pub fn bitwise(&mut self, op: BitwiseOp, dst: SymbolName, lhs: LinearExpr, rhs: LinearExpr) {
        self.push(Statement::Bitwise { op, dst, lhs, rhs });
    }

    /// Emits `havoc(var)`.
    pub fn havoc(&mut self, var: SymbolName) {
        self.push(Statement::Havoc { var });
    }

    /// Emits `assume(cst)`.
    pub fn assume(&mut self, cst: LinearConstraint) {
        self.push(Statement::Assume { cst });
    }

    /// Emits a conditional move.
    pub fn select(
        &mut self,
        dst: SymbolName,
        cond: SelectCond,
        on_true: LinearExpr,
        on_false: LinearExpr,
    ) {
        self.push(Statement::Select {
            dst,
            cond,
            on_true,
            on_false,
        });
    }

    /// Emits an array read.
    pub fn array_load(
        &mut self,
        dst: SymbolName,
        array: SymbolName,
        index: LinearExpr,
        elem_size: u64,
    ) {
        self.push(Statement::ArrayLoad {
            dst,
            array,
            index,
            elem_size,
        });
    }

    /// Emits an array write.
    pub fn array_store(
        &mut self,
        array: SymbolName,
        index: LinearExpr,
        value: LinearExpr,
        elem_size: u64,
    ) {
        self.push(Statement::ArrayStore {
            array,
            index,
            value,
            elem_size,
        });
    }

    /// Emits `assume_array(array, value)`.
    pub fn assume_array(&mut self, array: SymbolName, value: impl Into<BigInt>) {
        self.push(Statement::AssumeArray {
            array,
            value: value.into(),
        });
    }

    /// Emits `array_init(array, values)`.
    pub fn array_init(&mut self, array: SymbolName, values: Vec<BigInt>) {
        self.push(Statement::ArrayInit { array, values });
    }

    /// Emits a call site.
    pub fn callsite(
        &mut self,
        result: Option<(SymbolName, VarKind)>,
        callee: SymbolName,
        args: Vec<(SymbolName, VarKind)>,
    ) {
        self.push(Statement::CallSite {
            result,
            callee,
            args,
        });
    }

    /// Emits `ret(value)`.
    pub fn ret(&mut self, value: SymbolName, kind: VarKind) {
        self.push(Statement::Ret { value, kind });
    }

    /// Emits `unreachable`.
    pub fn unreachable(&mut self) {
        self.push(Statement::Unreachable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let a = Label::named("entry");
        let b = Label::Synthetic(0);
        assert!(!a.is_synthetic());
        assert!(b.is_synthetic());
        assert_eq!(a.to_string(), "entry");
        assert_eq!(b.to_string(), "__bb0");
        assert_ne!(a, Label::named("exit"));
    }

    #[test]
    fn test_splice_front_precedes_existing() {
        let x = SymbolName::new(0, "x");
        let y = SymbolName::new(1, "y");
        let mut bb = CfgBlock::new(Label::named("entry"));
        bb.havoc(x.clone());
        bb.splice_front(vec![
            Statement::Havoc { var: y.clone() },
            Statement::Unreachable,
        ]);
        assert_eq!(bb.statements().len(), 3);
        assert_eq!(bb.statements()[0], Statement::Havoc { var: y });
        assert_eq!(bb.statements()[2], Statement::Havoc { var: x });
    }

    #[test]
    fn test_successor_dedup() {
        let mut bb = CfgBlock::new(Label::named("a"));
        bb.add_successor(Label::named("b"));
        bb.add_successor(Label::named("b"));
        assert_eq!(bb.successors().len(), 1);
        bb.remove_successor(&Label::named("b"));
        assert!(bb.successors().is_empty());
    }
}
