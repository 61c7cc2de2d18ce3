//! The CFG statement language.
//!
//! A small, closed set of tagged variants an abstract interpreter can
//! pattern-match on directly — no visitor hierarchy. Statements are
//! appended once during translation and never mutated.
//!
//! # Conventions
//!
//! - `dst` is always a symbolic variable, never an expression
//! - Arithmetic right-hand sides are linear expressions; the translator
//!   guarantees the left operand of a division-like primitive is never
//!   a bare constant (it normalizes through an assignment first)
//! - Array statements name the smashed region summary variable

use std::fmt;

use num_bigint::BigInt;

use crate::cfg::{LinearConstraint, LinearExpr, SymbolName, VarKind};

/// Arithmetic opcodes of the statement language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::SDiv => "sdiv",
            ArithOp::UDiv => "udiv",
            ArithOp::SRem => "srem",
            ArithOp::URem => "urem",
        };
        write!(f, "{s}")
    }
}

/// Bitwise opcodes of the statement language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
}

impl fmt::Display for BitwiseOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BitwiseOp::And => "and",
            BitwiseOp::Or => "or",
            BitwiseOp::Xor => "xor",
        };
        write!(f, "{s}")
    }
}

/// The condition of a conditional-move statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectCond {
    /// A single linear constraint.
    Constraint(LinearConstraint),
    /// A boolean variable tested against one.
    Var(SymbolName),
}

impl fmt::Display for SelectCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectCond::Constraint(c) => write!(f, "{c}"),
            SelectCond::Var(v) => write!(f, "{v}"),
        }
    }
}

/// A CFG statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    // ========================================================================
    // Scalar statements
    // ========================================================================
    /// `dst = src`.
    Assign {
        /// Assigned variable.
        dst: SymbolName,
        /// Assigned expression.
        src: LinearExpr,
    },

    /// `dst = op(lhs, rhs)`.
    Arith {
        /// Opcode.
        op: ArithOp,
        /// Destination variable.
        dst: SymbolName,
        /// Left operand.
        lhs: LinearExpr,
        /// Right operand.
        rhs: LinearExpr,
    },

    /// `dst = op(lhs, rhs)` over bit vectors.
    Bitwise {
        /// Opcode.
        op: BitwiseOp,
        /// Destination variable.
        dst: SymbolName,
        /// Left operand.
        lhs: LinearExpr,
        /// Right operand.
        rhs: LinearExpr,
    },

    /// Forget everything known about a variable.
    Havoc {
        /// The variable reset to "any value".
        var: SymbolName,
    },

    /// Restrict the state with a linear constraint.
    Assume {
        /// The constraint that holds past this point.
        cst: LinearConstraint,
    },

    /// `dst = cond ? on_true : on_false`.
    Select {
        /// Destination variable.
        dst: SymbolName,
        /// Condition, either a native constraint or a boolean variable.
        cond: SelectCond,
        /// Value when the condition holds.
        on_true: LinearExpr,
        /// Value when it does not.
        on_false: LinearExpr,
    },

    // ========================================================================
    // Array statements
    // ========================================================================
    /// `dst = array[index]`, elements of `elem_size` bytes.
    ArrayLoad {
        /// Destination variable.
        dst: SymbolName,
        /// The smashed array summary.
        array: SymbolName,
        /// Byte index expression.
        index: LinearExpr,
        /// Element width in bytes.
        elem_size: u64,
    },

    /// `array[index] = value`, elements of `elem_size` bytes.
    ArrayStore {
        /// The smashed array summary.
        array: SymbolName,
        /// Byte index expression.
        index: LinearExpr,
        /// Stored expression.
        value: LinearExpr,
        /// Element width in bytes.
        elem_size: u64,
    },

    /// Assume every cell of the array holds `value`.
    AssumeArray {
        /// The smashed array summary.
        array: SymbolName,
        /// The assumed cell contents.
        value: BigInt,
    },

    /// Initialize the array from a literal sequence.
    ArrayInit {
        /// The smashed array summary.
        array: SymbolName,
        /// Cell contents in order.
        values: Vec<BigInt>,
    },

    // ========================================================================
    // Inter-procedural statements
    // ========================================================================
    /// A call site with marshalled actuals.
    CallSite {
        /// Result binding, absent when the call's value is untracked.
        result: Option<(SymbolName, VarKind)>,
        /// The callee's symbol.
        callee: SymbolName,
        /// Actuals: scalars, then ref-array input snapshots, then ref
        /// arrays, then new arrays.
        args: Vec<(SymbolName, VarKind)>,
    },

    /// Function return value.
    Ret {
        /// The returned symbol.
        value: SymbolName,
        /// Its kind.
        kind: VarKind,
    },

    /// Control cannot reach past this statement.
    Unreachable,
}

impl Statement {
    /// Returns `true` for statements that constrain rather than define.
    #[must_use]
    pub const fn is_assume(&self) -> bool {
        matches!(
            self,
            Statement::Assume { .. } | Statement::AssumeArray { .. }
        )
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { dst, src } => write!(f, "{dst} = {src}"),
            Statement::Arith { op, dst, lhs, rhs } => {
                write!(f, "{dst} = {op}({lhs}, {rhs})")
            }
            Statement::Bitwise { op, dst, lhs, rhs } => {
                write!(f, "{dst} = {op}({lhs}, {rhs})")
            }
            Statement::Havoc { var } => write!(f, "havoc({var})"),
            Statement::Assume { cst } => write!(f, "assume({cst})"),
            Statement::Select {
                dst,
                cond,
                on_true,
                on_false,
            } => write!(f, "{dst} = ite({cond}, {on_true}, {on_false})"),
            Statement::ArrayLoad {
                dst,
                array,
                index,
                elem_size,
            } => write!(f, "{dst} = array_load({array}, {index}, sz={elem_size})"),
            Statement::ArrayStore {
                array,
                index,
                value,
                elem_size,
            } => write!(
                f,
                "array_store({array}, {index}, {value}, sz={elem_size})"
            ),
            Statement::AssumeArray { array, value } => {
                write!(f, "assume_array({array}, {value})")
            }
            Statement::ArrayInit { array, values } => {
                write!(f, "array_init({array}, [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "])")
            }
            Statement::CallSite {
                result,
                callee,
                args,
            } => {
                if let Some((dst, kind)) = result {
                    write!(f, "{dst}:{kind} = ")?;
                }
                write!(f, "call {callee}(")?;
                for (i, (arg, kind)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}:{kind}")?;
                }
                write!(f, ")")
            }
            Statement::Ret { value, kind } => write!(f, "ret({value}:{kind})"),
            Statement::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(id: u32, text: &str) -> SymbolName {
        SymbolName::new(id, text)
    }

    #[test]
    fn test_display_scalar() {
        let r = sym(0, "r");
        let x = sym(1, "x");
        let s = Statement::Arith {
            op: ArithOp::Add,
            dst: r.clone(),
            lhs: LinearExpr::var(x),
            rhs: LinearExpr::constant(3),
        };
        assert_eq!(s.to_string(), "r = add(x, 3)");
        assert_eq!(Statement::Havoc { var: r }.to_string(), "havoc(r)");
        assert_eq!(Statement::Unreachable.to_string(), "unreachable");
    }

    #[test]
    fn test_display_arrays() {
        let a = sym(0, "arr0");
        let d = sym(1, "d");
        let s = Statement::ArrayLoad {
            dst: d,
            array: a.clone(),
            index: LinearExpr::constant(8),
            elem_size: 4,
        };
        assert_eq!(s.to_string(), "d = array_load(arr0, 8, sz=4)");
        let init = Statement::ArrayInit {
            array: a,
            values: vec![BigInt::from(1), BigInt::from(2)],
        };
        assert_eq!(init.to_string(), "array_init(arr0, [1, 2])");
    }

    #[test]
    fn test_display_callsite() {
        let r = sym(0, "r");
        let callee = sym(1, "foo");
        let x = sym(2, "x");
        let s = Statement::CallSite {
            result: Some((r, VarKind::Int)),
            callee,
            args: vec![(x, VarKind::Int)],
        };
        assert_eq!(s.to_string(), "r:int = call foo(x:int)");
    }

    #[test]
    fn test_assume_classification() {
        let a = sym(0, "a");
        assert!(Statement::AssumeArray {
            array: a.clone(),
            value: BigInt::from(0)
        }
        .is_assume());
        assert!(!Statement::Havoc { var: a }.is_assume());
    }
}
