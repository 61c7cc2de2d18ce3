//! The input SSA intermediate representation.
//!
//! This module defines the low-level program form the translator
//! consumes: typed values defined exactly once, basic blocks with
//! leading phi nodes, explicit terminators, and a module wrapper
//! carrying globals and data layout. It deliberately models only what
//! numeric reasoning downstream can use — integer arithmetic, pointers
//! as opaque addresses, loads/stores, address computation, calls — and
//! collapses everything else into an opaque fallback instruction.
//!
//! # Construction
//!
//! Inputs are assembled programmatically through [`FunctionBuilder`]:
//!
//! ```rust
//! use numflow::ir::{BinOp, FunctionBuilder, Operand, Ty};
//!
//! let mut f = FunctionBuilder::new("inc", Ty::I32);
//! let x = f.param("x", Ty::I32);
//! f.block("entry")?;
//! let r = f.binary(BinOp::Add, "r", Ty::I32, x, Operand::const_int(1, 32))?;
//! f.ret(Some(r))?;
//! let function = f.finish()?;
//! assert_eq!(function.blocks().len(), 1);
//! # Ok::<(), numflow::Error>(())
//! ```

mod block;
mod function;
mod instruction;
mod types;
mod value;

pub use block::{BasicBlock, BlockId, Phi, Terminator};
pub use function::{
    DefSite, Function, FunctionBuilder, FunctionId, Global, GlobalInit, Module, Param, UseSite,
};
pub use instruction::{BinOp, Callee, CastOp, GepIndex, GepStep, IcmpPred, Instr};
pub use types::{DataLayout, Ty};
pub use value::{ConstInt, GlobalId, Operand, ValueId, ValueRef};
