//! Basic blocks, phi nodes and terminators.
//!
//! Phi nodes sit ahead of the instruction list and are evaluated
//! simultaneously at block entry: if one phi reads another phi of the
//! same block, it reads the value from *before* the block was entered.
//! The translator relies on that snapshot semantics when it lowers phis
//! to assignments on predecessor edges.

use std::fmt;

use crate::ir::{Instr, Operand, ValueId};

/// Index of a basic block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    /// Creates a block id from a raw index.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// A phi node merging one value per predecessor edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Phi {
    /// The value this phi defines.
    pub result: ValueId,
    /// `(value, predecessor)` pairs, one per incoming edge.
    pub incomings: Vec<(Operand, BlockId)>,
}

impl Phi {
    /// Returns the incoming value for the given predecessor block.
    #[must_use]
    pub fn incoming_for(&self, pred: BlockId) -> Option<&Operand> {
        self.incomings
            .iter()
            .find(|(_, block)| *block == pred)
            .map(|(value, _)| value)
    }
}

/// A block terminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    /// Unconditional branch.
    Br {
        /// Destination block.
        dest: BlockId,
    },
    /// Two-way conditional branch.
    CondBr {
        /// Boolean condition.
        cond: Operand,
        /// Destination when the condition holds.
        then_dest: BlockId,
        /// Destination when it does not.
        else_dest: BlockId,
    },
    /// Function return.
    Ret {
        /// Returned value, absent for void returns.
        value: Option<Operand>,
    },
    /// Control never reaches past this point.
    Unreachable,
}

impl Terminator {
    /// Successor blocks in branch order (true successor first).
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br { dest } => vec![*dest],
            Terminator::CondBr {
                then_dest,
                else_dest,
                ..
            } => vec![*then_dest, *else_dest],
            Terminator::Ret { .. } | Terminator::Unreachable => Vec::new(),
        }
    }

    /// Returns `true` for a return terminator.
    #[must_use]
    pub const fn is_ret(&self) -> bool {
        matches!(self, Terminator::Ret { .. })
    }
}

/// A basic block: leading phis, straight-line instructions, terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// The block's label, unique within its function.
    pub label: String,
    /// Phi nodes in declaration order.
    pub phis: Vec<Phi>,
    /// Non-terminator instructions in execution order.
    pub instrs: Vec<Instr>,
    /// The terminator.
    pub terminator: Terminator,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phi_incoming_lookup() {
        let phi = Phi {
            result: ValueId::from_index(5),
            incomings: vec![
                (Operand::const_int(1, 32), BlockId::from_index(0)),
                (Operand::const_int(2, 32), BlockId::from_index(1)),
            ],
        };
        assert_eq!(
            phi.incoming_for(BlockId::from_index(1)),
            Some(&Operand::const_int(2, 32))
        );
        assert!(phi.incoming_for(BlockId::from_index(9)).is_none());
    }

    #[test]
    fn test_successor_order() {
        let t = Terminator::CondBr {
            cond: Operand::const_int(1, 1),
            then_dest: BlockId::from_index(3),
            else_dest: BlockId::from_index(7),
        };
        assert_eq!(
            t.successors(),
            vec![BlockId::from_index(3), BlockId::from_index(7)]
        );
        assert!(Terminator::Unreachable.successors().is_empty());
        assert!(Terminator::Ret { value: None }.is_ret());
    }
}
