//! Linear expressions and constraints.
//!
//! A [`LinearExpr`] is a sparse form `Σ kᵢ·vᵢ + c` with
//! arbitrary-precision coefficients, kept canonical: terms sorted by
//! symbol, zero coefficients dropped. A [`LinearConstraint`] relates an
//! expression to zero with one of `= ≠ ≤ ≥ < >`; negation is an
//! involution, which branch lowering depends on when it splits a
//! condition across the two edges of a conditional branch.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::cfg::SymbolName;

/// A linear expression over symbolic variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinearExpr {
    /// `(variable, coefficient)` terms, sorted by variable, coefficients
    /// nonzero.
    terms: Vec<(SymbolName, BigInt)>,
    constant: BigInt,
}

impl LinearExpr {
    /// The constant expression `c`.
    #[must_use]
    pub fn constant(c: impl Into<BigInt>) -> Self {
        Self {
            terms: Vec::new(),
            constant: c.into(),
        }
    }

    /// The expression `1·v`.
    #[must_use]
    pub fn var(v: SymbolName) -> Self {
        Self::term(BigInt::one(), v)
    }

    /// The expression `k·v`.
    #[must_use]
    pub fn term(k: impl Into<BigInt>, v: SymbolName) -> Self {
        let k = k.into();
        let terms = if k.is_zero() { Vec::new() } else { vec![(v, k)] };
        Self {
            terms,
            constant: BigInt::zero(),
        }
    }

    /// Returns `true` when the expression has no variable terms.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// The constant value, when the expression is constant.
    #[must_use]
    pub fn constant_value(&self) -> Option<&BigInt> {
        if self.is_constant() {
            Some(&self.constant)
        } else {
            None
        }
    }

    /// The single variable, when the expression is exactly `1·v + 0`.
    #[must_use]
    pub fn as_variable(&self) -> Option<&SymbolName> {
        match self.terms.as_slice() {
            [(v, k)] if k.is_one() && self.constant.is_zero() => Some(v),
            _ => None,
        }
    }

    /// The terms of the expression.
    #[must_use]
    pub fn terms(&self) -> &[(SymbolName, BigInt)] {
        &self.terms
    }

    /// The constant part of the expression.
    #[must_use]
    pub const fn constant_part(&self) -> &BigInt {
        &self.constant
    }

    /// Adds a constant in place.
    #[must_use]
    pub fn plus_const(mut self, c: impl Into<BigInt>) -> Self {
        self.constant += c.into();
        self
    }

    /// Multiplies the whole expression by a constant.
    #[must_use]
    pub fn scaled(mut self, k: impl Into<BigInt>) -> Self {
        let k = k.into();
        if k.is_zero() {
            return Self::constant(0);
        }
        for (_, coeff) in &mut self.terms {
            *coeff *= &k;
        }
        self.constant *= k;
        self
    }

    fn combine(mut self, other: &Self, negate_other: bool) -> Self {
        for (v, k) in &other.terms {
            let k = if negate_other { -k } else { k.clone() };
            match self.terms.binary_search_by(|(sv, _)| sv.cmp(v)) {
                Ok(idx) => {
                    self.terms[idx].1 += k;
                    if self.terms[idx].1.is_zero() {
                        self.terms.remove(idx);
                    }
                }
                Err(idx) => {
                    if !k.is_zero() {
                        self.terms.insert(idx, (v.clone(), k));
                    }
                }
            }
        }
        if negate_other {
            self.constant -= &other.constant;
        } else {
            self.constant += &other.constant;
        }
        self
    }
}

impl Add<&LinearExpr> for LinearExpr {
    type Output = LinearExpr;

    fn add(self, rhs: &LinearExpr) -> LinearExpr {
        self.combine(rhs, false)
    }
}

impl Sub<&LinearExpr> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: &LinearExpr) -> LinearExpr {
        self.combine(rhs, true)
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        LinearExpr::constant(0).combine(&self, true)
    }
}

impl From<&SymbolName> for LinearExpr {
    fn from(v: &SymbolName) -> Self {
        LinearExpr::var(v.clone())
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "{}", self.constant);
        }
        for (idx, (v, k)) in self.terms.iter().enumerate() {
            if idx == 0 {
                if k.is_one() {
                    write!(f, "{v}")?;
                } else if (-k).is_one() {
                    write!(f, "-{v}")?;
                } else {
                    write!(f, "{k}*{v}")?;
                }
            } else {
                let sign = if k.is_negative() { '-' } else { '+' };
                let mag = k.abs();
                if mag.is_one() {
                    write!(f, " {sign} {v}")?;
                } else {
                    write!(f, " {sign} {mag}*{v}")?;
                }
            }
        }
        if !self.constant.is_zero() {
            let sign = if self.constant.is_negative() { '-' } else { '+' };
            write!(f, " {sign} {}", self.constant.abs())?;
        }
        Ok(())
    }
}

/// The relation of a constraint to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Relation {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl Relation {
    /// The logically opposite relation.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Relation::Eq => Relation::Ne,
            Relation::Ne => Relation::Eq,
            Relation::Le => Relation::Gt,
            Relation::Gt => Relation::Le,
            Relation::Ge => Relation::Lt,
            Relation::Lt => Relation::Ge,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relation::Eq => "=",
            Relation::Ne => "!=",
            Relation::Le => "<=",
            Relation::Ge => ">=",
            Relation::Lt => "<",
            Relation::Gt => ">",
        };
        write!(f, "{s}")
    }
}

/// A linear constraint `expr ⊙ 0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinearConstraint {
    expr: LinearExpr,
    rel: Relation,
}

impl LinearConstraint {
    /// `lhs = rhs`.
    #[must_use]
    pub fn eq(lhs: LinearExpr, rhs: &LinearExpr) -> Self {
        Self {
            expr: lhs - rhs,
            rel: Relation::Eq,
        }
    }

    /// `lhs ≠ rhs`.
    #[must_use]
    pub fn ne(lhs: LinearExpr, rhs: &LinearExpr) -> Self {
        Self {
            expr: lhs - rhs,
            rel: Relation::Ne,
        }
    }

    /// `lhs ≤ rhs`.
    #[must_use]
    pub fn le(lhs: LinearExpr, rhs: &LinearExpr) -> Self {
        Self {
            expr: lhs - rhs,
            rel: Relation::Le,
        }
    }

    /// `lhs ≥ rhs`.
    #[must_use]
    pub fn ge(lhs: LinearExpr, rhs: &LinearExpr) -> Self {
        Self {
            expr: lhs - rhs,
            rel: Relation::Ge,
        }
    }

    /// The underlying expression, related to zero.
    #[must_use]
    pub const fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    /// The relation.
    #[must_use]
    pub const fn relation(&self) -> Relation {
        self.rel
    }

    /// The negated constraint. An involution.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            rel: self.rel.negate(),
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Print with the constant moved to the right-hand side.
        let lhs = LinearExpr {
            terms: self.expr.terms.clone(),
            constant: BigInt::zero(),
        };
        let rhs = -self.expr.constant.clone();
        write!(f, "{lhs} {} {rhs}", self.rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(id: u32, text: &str) -> SymbolName {
        SymbolName::new(id, text)
    }

    #[test]
    fn test_terms_merge_and_cancel() {
        let x = sym(0, "x");
        let y = sym(1, "y");
        let e = LinearExpr::var(x.clone()) + &LinearExpr::term(2, y.clone());
        let e = e + &LinearExpr::term(-1, x.clone());
        // x cancelled out, 2y remains.
        assert_eq!(e.terms().len(), 1);
        assert_eq!(e.terms()[0].0, y);
        assert!(e.as_variable().is_none());
        assert!(!e.is_constant());
    }

    #[test]
    fn test_as_variable() {
        let x = sym(0, "x");
        assert_eq!(LinearExpr::var(x.clone()).as_variable(), Some(&x));
        assert!(LinearExpr::var(x.clone()).plus_const(1).as_variable().is_none());
        assert!(LinearExpr::term(2, x).as_variable().is_none());
        assert!(LinearExpr::constant(0).as_variable().is_none());
    }

    #[test]
    fn test_scaling() {
        let x = sym(0, "x");
        let e = LinearExpr::var(x).plus_const(3).scaled(4);
        assert_eq!(e.constant_part(), &BigInt::from(12));
        assert_eq!(e.terms()[0].1, BigInt::from(4));
        assert!(e.clone().scaled(0).is_constant());
    }

    #[test]
    fn test_negate_is_involution() {
        let x = sym(0, "x");
        let y = sym(1, "y");
        let c = LinearConstraint::le(LinearExpr::var(x), &LinearExpr::var(y).plus_const(-1));
        assert_eq!(c.negate().negate(), c);
        assert_eq!(c.negate().relation(), Relation::Gt);
    }

    #[test]
    fn test_relation_duality() {
        for rel in [
            Relation::Eq,
            Relation::Ne,
            Relation::Le,
            Relation::Ge,
            Relation::Lt,
            Relation::Gt,
        ] {
            assert_eq!(rel.negate().negate(), rel);
            assert_ne!(rel.negate(), rel);
        }
    }

    #[test]
    fn test_display() {
        let x = sym(0, "x");
        let y = sym(1, "y");
        let e = LinearExpr::term(2, x.clone()) + &LinearExpr::term(-1, y.clone());
        assert_eq!(e.to_string(), "2*x - y");
        assert_eq!(LinearExpr::constant(-7).to_string(), "-7");

        // x <= y - 1 renders with the constant on the right.
        let c = LinearConstraint::le(LinearExpr::var(x), &LinearExpr::var(y).plus_const(-1));
        assert_eq!(c.to_string(), "x - y <= -1");
    }
}
