//! # numflow Prelude
//!
//! Convenient re-exports of the types most translations touch: build an
//! [`ir::Module`](crate::ir::Module), pick a memory oracle, translate,
//! inspect the resulting [`Cfg`].

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all numflow operations
pub use crate::Error;

/// The result type used throughout numflow
pub use crate::Result;

// ================================================================================================
// Input IR
// ================================================================================================

/// Programmatic construction of input functions
pub use crate::ir::{FunctionBuilder, Module};

/// Core IR vocabulary
pub use crate::ir::{BinOp, CastOp, DataLayout, GlobalInit, IcmpPred, Operand, Ty};

// ================================================================================================
// Translation
// ================================================================================================

/// Entry points for whole-module and per-function translation
pub use crate::translate::{translate_function, translate_module, CfgBuilder};

/// Memory abstraction seam and the bundled oracles
pub use crate::translate::{MemoryOracle, RegionModel, RegisterModel, TrackLevel};

/// Symbol issuance and configuration
pub use crate::translate::{TranslateOptions, VariableFactory};

// ================================================================================================
// Output CFG
// ================================================================================================

/// The translated graph and its statement language
pub use crate::cfg::{Cfg, CfgBlock, Label, LinearConstraint, LinearExpr, Statement};
