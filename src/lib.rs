// Copyright 2025-2026 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # numflow
//!
//! A front-end adapter for numerical abstract interpretation: numflow
//! translates a low-level SSA intermediate representation into a
//! simplified control-flow graph whose statement language — linear
//! arithmetic, constraints, havoc, smashed-array access, call sites —
//! is directly consumable by fixpoint engines deriving numeric and
//! array invariants.
//!
//! The translation deliberately discards what numeric reasoning cannot
//! use (floating point, pointer layouts that cannot be proved
//! well-typed and aligned) and keeps just enough semantics to be a
//! sound over-approximation of the input program.
//!
//! # Architecture
//!
//! - [`ir`] — the input form: typed SSA values, basic blocks with
//!   leading phi nodes, explicit terminators, globals and data layout,
//!   assembled programmatically through [`ir::FunctionBuilder`]
//! - [`cfg`] — the output form: statement blocks, edges, entry/exit
//!   marking, linear expressions and constraints
//! - [`translate`] — the translator: symbolic evaluation, condition
//!   and phi lowering, per-instruction translation, and the
//!   [`translate::CfgBuilder`] orchestration, parameterized by a
//!   [`translate::MemoryOracle`] region analysis
//!
//! # Usage
//!
//! ```rust
//! use numflow::ir::{FunctionBuilder, IcmpPred, Module, Operand, Ty};
//! use numflow::translate::{translate_function, RegisterModel, TranslateOptions, VariableFactory};
//!
//! // if (x < 0) r = 0 else r = x; return r
//! let mut module = Module::default();
//! let mut f = FunctionBuilder::new("clamp", Ty::I32);
//! let x = f.param("x", Ty::I32);
//! f.block("entry")?;
//! let c = f.icmp(IcmpPred::Slt, "c", x.clone(), Operand::const_int(0, 32))?;
//! f.cond_branch(c, "neg", "join")?;
//! f.block("neg")?;
//! f.branch("join")?;
//! f.block("join")?;
//! let r = f.phi("r", Ty::I32, &[(Operand::const_int(0, 32), "neg"), (x, "entry")])?;
//! f.ret(Some(r))?;
//! let id = module.add_function(f.finish()?);
//!
//! let mut vfac = VariableFactory::new();
//! let cfg = translate_function(
//!     &module,
//!     id,
//!     &mut vfac,
//!     &RegisterModel::default(),
//!     &TranslateOptions::default(),
//! )?;
//!
//! // The branch constraints live on synthetic edge blocks, the phi
//! // became assignments on its incoming edges, and the single return
//! // is the exit.
//! assert_eq!(cfg.exit().map(ToString::to_string).as_deref(), Some("join"));
//! # Ok::<(), numflow::Error>(())
//! ```
//!
//! # Soundness model
//!
//! Translation never fails on strange input: constructs outside the
//! numeric fragment degrade to `havoc` (forget everything about a
//! name), unsound constant patterns are logged through the [`log`]
//! facade and havocked, and dead constant branches surface as
//! `unreachable` statements a downstream analysis may exploit. The few
//! invariants the translator does insist on — struct indices are
//! constants, inter-procedural functions are not variadic — are
//! guaranteed by upstream passes, and violating them aborts.

pub mod cfg;
pub mod ir;
pub mod prelude;
pub mod translate;

mod error;

pub use error::Error;

/// The result type used throughout numflow.
pub type Result<T> = std::result::Result<T, Error>;
