//! The output control-flow graph language.
//!
//! A translated function is a [`Cfg`]: nodes of straight-line
//! [`Statement`] sequences, directed edges, an entry label, an exit
//! label once determined, and — in inter-procedural mode — a
//! [`FunctionDecl`]. The statement language is the narrow waist between
//! translation and abstract interpretation: linear arithmetic,
//! constraints, havoc, smashed-array access, call sites and returns.

mod block;
mod expr;
mod graph;
mod statement;
mod symbol;

pub use block::{CfgBlock, Label};
pub use expr::{LinearConstraint, LinearExpr, Relation};
pub use graph::{Cfg, FunctionDecl};
pub use statement::{ArithOp, BitwiseOp, SelectCond, Statement};
pub use symbol::{SymbolName, VarKind};
