use thiserror::Error;

/// The generic Error type covering every failure this library can return.
///
/// Errors are produced only by the *construction* surfaces: building IR
/// functions and maintaining CFG edge bookkeeping. The translation pass
/// itself never returns a recoverable error — unrepresentable constructs
/// are over-approximated, unsound constant patterns are logged and
/// havocked, and violated internal invariants (which upstream passes are
/// required to rule out) abort.
///
/// # Examples
///
/// ```rust
/// use numflow::ir::{FunctionBuilder, Ty};
///
/// let mut f = FunctionBuilder::new("f", Ty::Void);
/// f.block("entry").unwrap();
/// f.branch("nowhere").unwrap();
/// // The branch target never received a body, so finishing fails.
/// assert!(f.finish().is_err());
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A basic-block label was declared twice within one function.
    #[error("duplicate block label '{0}'")]
    DuplicateLabel(String),

    /// A branch or phi referred to a block label that does not exist.
    #[error("unknown block label '{0}'")]
    UnknownLabel(String),

    /// An instruction used a value id that no definition produced.
    #[error("use of undefined value v{0}")]
    UndefinedValue(u32),

    /// A function was finalized without any basic block.
    #[error("function '{0}' has no basic blocks")]
    EmptyFunction(String),

    /// A basic block was left without a terminator.
    #[error("block '{0}' has no terminator")]
    MissingTerminator(String),

    /// CFG node or edge bookkeeping failed.
    #[error("{0}")]
    GraphError(String),
}
