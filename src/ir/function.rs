//! Functions, modules and the construction API.
//!
//! A [`Function`] owns its blocks and a value table recording, for every
//! SSA definition, its type, optional name and definition site. Use
//! lists are derived once at construction time by [`FunctionBuilder`];
//! the translator consults them for the handful of use-shape questions
//! it asks (does a compare feed anything besides its branch, are all
//! uses of a cast memory traffic it will never model, and so on).
//!
//! Functions are immutable once built. There is no parser here — inputs
//! are assembled programmatically, typically by a front end that walks
//! some other compiler's in-memory IR.

use rustc_hash::FxHashMap;

use crate::ir::{
    BasicBlock, BlockId, Callee, ConstInt, DataLayout, GepIndex, Instr, Operand, Phi, Terminator,
    Ty, ValueId,
};
use crate::{Error, Result};

/// Where a value is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefSite {
    /// The n-th formal parameter.
    Param(usize),
    /// A phi node: block and phi index within the block.
    Phi(BlockId, usize),
    /// An instruction: block and instruction index within the block.
    Instr(BlockId, usize),
}

/// One use of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseSite {
    /// Used by an instruction: block and instruction index.
    Instr(BlockId, usize),
    /// Used as a phi incoming value: block and phi index.
    Phi(BlockId, usize),
    /// Used by a block terminator (branch condition or return value).
    Terminator(BlockId),
}

#[derive(Debug, Clone)]
struct ValueInfo {
    ty: Ty,
    name: Option<String>,
    def: DefSite,
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The value the parameter defines.
    pub value: ValueId,
    /// The parameter's type.
    pub ty: Ty,
}

/// Identifier of a function within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u32);

impl FunctionId {
    /// Creates a function id from a raw index.
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

/// An SSA function: parameters, blocks and the value table.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    ret_ty: Ty,
    variadic: bool,
    params: Vec<Param>,
    blocks: Vec<BasicBlock>,
    values: Vec<ValueInfo>,
    uses: Vec<Vec<UseSite>>,
}

impl Function {
    /// The function's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared return type.
    #[must_use]
    pub const fn ret_ty(&self) -> &Ty {
        &self.ret_ty
    }

    /// Whether the signature is variadic.
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// The formal parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The basic blocks in declaration order. The first block is the
    /// entry.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the block with the given id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// The entry block id.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        BlockId::from_index(0)
    }

    /// The type of a defined value.
    #[must_use]
    pub fn value_ty(&self, value: ValueId) -> &Ty {
        &self.values[value.index() as usize].ty
    }

    /// The source-level name of a value, if it has one.
    #[must_use]
    pub fn value_name(&self, value: ValueId) -> Option<&str> {
        self.values[value.index() as usize].name.as_deref()
    }

    /// Where the value is defined.
    #[must_use]
    pub fn def_site(&self, value: ValueId) -> DefSite {
        self.values[value.index() as usize].def
    }

    /// The instruction defining `value`, when its definition site is an
    /// instruction.
    #[must_use]
    pub fn def_instr(&self, value: ValueId) -> Option<&Instr> {
        match self.def_site(value) {
            DefSite::Instr(block, idx) => Some(&self.blocks[block.index()].instrs[idx]),
            _ => None,
        }
    }

    /// The phi defining `value`, when its definition site is a phi.
    #[must_use]
    pub fn def_phi(&self, value: ValueId) -> Option<(BlockId, &Phi)> {
        match self.def_site(value) {
            DefSite::Phi(block, idx) => Some((block, &self.blocks[block.index()].phis[idx])),
            _ => None,
        }
    }

    /// All uses of a value.
    #[must_use]
    pub fn uses(&self, value: ValueId) -> &[UseSite] {
        &self.uses[value.index() as usize]
    }

    /// Number of uses of a value.
    #[must_use]
    pub fn use_count(&self, value: ValueId) -> usize {
        self.uses[value.index() as usize].len()
    }

    /// The type of an arbitrary operand.
    #[must_use]
    pub fn operand_ty(&self, operand: &Operand) -> Ty {
        match operand {
            Operand::Const(c) => Ty::Int(c.bits()),
            Operand::Undef(ty) => ty.clone(),
            Operand::Value(id) => self.value_ty(*id).clone(),
            Operand::Global(_) => Ty::Ptr,
        }
    }

    /// Predecessors of each block, in declaration order of the sources.
    #[must_use]
    pub fn predecessors(&self) -> Vec<Vec<BlockId>> {
        let mut preds = vec![Vec::new(); self.blocks.len()];
        for (idx, block) in self.blocks.iter().enumerate() {
            let src = BlockId::from_index(idx as u32);
            for succ in block.terminator.successors() {
                preds[succ.index()].push(src);
            }
        }
        preds
    }
}

/// Incremental builder for a [`Function`].
///
/// Blocks are opened with [`block`](Self::block); definitions append to
/// the open block and return an [`Operand`] referencing the new value.
/// Labels may be referenced before they are declared; `finish` verifies
/// that every referenced label received a body and that every block is
/// terminated.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    ret_ty: Ty,
    variadic: bool,
    params: Vec<Param>,
    blocks: Vec<PendingBlock>,
    labels: FxHashMap<String, BlockId>,
    values: Vec<ValueInfo>,
    current: Option<BlockId>,
}

#[derive(Debug)]
struct PendingBlock {
    label: String,
    declared: bool,
    phis: Vec<Phi>,
    instrs: Vec<Instr>,
    terminator: Option<Terminator>,
}

impl FunctionBuilder {
    /// Starts building a function with the given name and return type.
    #[must_use]
    pub fn new(name: impl Into<String>, ret_ty: Ty) -> Self {
        Self {
            name: name.into(),
            ret_ty,
            variadic: false,
            params: Vec::new(),
            blocks: Vec::new(),
            labels: FxHashMap::default(),
            values: Vec::new(),
            current: None,
        }
    }

    /// Marks the signature variadic.
    pub fn set_variadic(&mut self, variadic: bool) {
        self.variadic = variadic;
    }

    /// Declares a formal parameter and returns an operand for it.
    pub fn param(&mut self, name: &str, ty: Ty) -> Operand {
        let index = self.params.len();
        let value = self.new_value(name, ty.clone(), DefSite::Param(index));
        self.params.push(Param { value, ty });
        Operand::Value(value)
    }

    /// Opens a block with the given label and makes it current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLabel`] if a body for this label was
    /// already opened.
    pub fn block(&mut self, label: &str) -> Result<BlockId> {
        let id = self.intern_label(label);
        let pending = &mut self.blocks[id.index()];
        if pending.declared {
            return Err(Error::DuplicateLabel(label.to_string()));
        }
        pending.declared = true;
        self.current = Some(id);
        Ok(id)
    }

    /// Appends a phi node to the current block.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn phi(&mut self, name: &str, ty: Ty, incomings: &[(Operand, &str)]) -> Result<Operand> {
        let incomings: Vec<(Operand, BlockId)> = incomings
            .iter()
            .map(|(value, label)| (value.clone(), self.intern_label(label)))
            .collect();
        let block = self.open_block()?;
        let index = self.blocks[block.index()].phis.len();
        let result = self.new_value(name, ty, DefSite::Phi(block, index));
        self.blocks[block.index()].phis.push(Phi { result, incomings });
        Ok(Operand::Value(result))
    }

    /// Appends a binary operation.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn binary(
        &mut self,
        op: super::BinOp,
        name: &str,
        ty: Ty,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<Operand> {
        self.instr_with_result(name, ty, |result| Instr::Binary {
            result,
            op,
            lhs,
            rhs,
        })
    }

    /// Appends an integer comparison. The result type is `i1`.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn icmp(
        &mut self,
        pred: super::IcmpPred,
        name: &str,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<Operand> {
        self.instr_with_result(name, Ty::BOOL, |result| Instr::Icmp {
            result,
            pred,
            lhs,
            rhs,
        })
    }

    /// Appends a cast to `dst_ty`.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn cast(
        &mut self,
        op: super::CastOp,
        name: &str,
        dst_ty: Ty,
        src: Operand,
    ) -> Result<Operand> {
        self.instr_with_result(name, dst_ty, |result| Instr::Cast { result, op, src })
    }

    /// Appends an address computation.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn gep(&mut self, name: &str, base: Operand, indices: Vec<GepIndex>) -> Result<Operand> {
        self.instr_with_result(name, Ty::Ptr, |result| Instr::Gep {
            result,
            base,
            indices,
        })
    }

    /// Appends a load producing a value of `ty`.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn load(&mut self, name: &str, ty: Ty, ptr: Operand) -> Result<Operand> {
        self.instr_with_result(name, ty, |result| Instr::Load { result, ptr })
    }

    /// Appends a store.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn store(&mut self, value: Operand, ptr: Operand) -> Result<()> {
        self.push_instr(Instr::Store { value, ptr })
    }

    /// Appends a stack allocation.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn alloca(&mut self, name: &str, allocated: Ty) -> Result<Operand> {
        self.instr_with_result(name, Ty::Ptr, |result| Instr::Alloca { result, allocated })
    }

    /// Appends a conditional move.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn select(
        &mut self,
        name: &str,
        ty: Ty,
        cond: Operand,
        on_true: Operand,
        on_false: Operand,
    ) -> Result<Operand> {
        self.instr_with_result(name, ty, |result| Instr::Select {
            result,
            cond,
            on_true,
            on_false,
        })
    }

    /// Appends a call. Passing [`Ty::Void`] as `ret_ty` produces a call
    /// with no result; otherwise the returned operand references the
    /// call's value.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn call(
        &mut self,
        name: &str,
        ret_ty: Ty,
        callee: Callee,
        args: Vec<Operand>,
        variadic: bool,
    ) -> Result<Option<Operand>> {
        if ret_ty.is_void() {
            self.push_instr(Instr::Call {
                result: None,
                callee,
                args,
                variadic,
            })?;
            Ok(None)
        } else {
            let out = self.instr_with_result(name, ret_ty, |result| Instr::Call {
                result: Some(result),
                callee,
                args,
                variadic,
            })?;
            Ok(Some(out))
        }
    }

    /// Appends an opaque instruction.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn other(&mut self, name: &str, ty: Option<Ty>, mnemonic: &str) -> Result<Option<Operand>> {
        match ty {
            Some(ty) => {
                let out = self.instr_with_result(name, ty, |result| Instr::Other {
                    result: Some(result),
                    mnemonic: mnemonic.to_string(),
                })?;
                Ok(Some(out))
            }
            None => {
                self.push_instr(Instr::Other {
                    result: None,
                    mnemonic: mnemonic.to_string(),
                })?;
                Ok(None)
            }
        }
    }

    /// Terminates the current block with an unconditional branch.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn branch(&mut self, dest: &str) -> Result<()> {
        let dest = self.intern_label(dest);
        self.terminate(Terminator::Br { dest })
    }

    /// Terminates the current block with a conditional branch.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn cond_branch(&mut self, cond: Operand, then_dest: &str, else_dest: &str) -> Result<()> {
        let then_dest = self.intern_label(then_dest);
        let else_dest = self.intern_label(else_dest);
        self.terminate(Terminator::CondBr {
            cond,
            then_dest,
            else_dest,
        })
    }

    /// Terminates the current block with a return.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn ret(&mut self, value: Option<Operand>) -> Result<()> {
        self.terminate(Terminator::Ret { value })
    }

    /// Terminates the current block as unreachable.
    ///
    /// # Errors
    ///
    /// Fails when no block is open.
    pub fn unreachable(&mut self) -> Result<()> {
        self.terminate(Terminator::Unreachable)
    }

    /// Validates and produces the finished function.
    ///
    /// # Errors
    ///
    /// Returns an error if the function has no blocks, a referenced
    /// label never received a body, a block is unterminated, or an
    /// operand references a value that nothing defines.
    pub fn finish(self) -> Result<Function> {
        if self.blocks.is_empty() {
            return Err(Error::EmptyFunction(self.name));
        }
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for pending in self.blocks {
            if !pending.declared {
                return Err(Error::UnknownLabel(pending.label));
            }
            let Some(terminator) = pending.terminator else {
                return Err(Error::MissingTerminator(pending.label));
            };
            blocks.push(BasicBlock {
                label: pending.label,
                phis: pending.phis,
                instrs: pending.instrs,
                terminator,
            });
        }

        let mut uses: Vec<Vec<UseSite>> = vec![Vec::new(); self.values.len()];
        let value_count = self.values.len() as u32;
        let mut record = |operand: &Operand, site: UseSite| -> Result<()> {
            if let Operand::Value(id) = operand {
                if id.index() >= value_count {
                    return Err(Error::UndefinedValue(id.index()));
                }
                uses[id.index() as usize].push(site);
            }
            Ok(())
        };
        for (block_idx, block) in blocks.iter().enumerate() {
            let block_id = BlockId::from_index(block_idx as u32);
            for (phi_idx, phi) in block.phis.iter().enumerate() {
                for (value, _) in &phi.incomings {
                    record(value, UseSite::Phi(block_id, phi_idx))?;
                }
            }
            for (instr_idx, instr) in block.instrs.iter().enumerate() {
                let mut err = Ok(());
                instr.for_each_operand(|operand| {
                    if err.is_ok() {
                        err = record(operand, UseSite::Instr(block_id, instr_idx));
                    }
                });
                err?;
            }
            match &block.terminator {
                Terminator::CondBr { cond, .. } => {
                    record(cond, UseSite::Terminator(block_id))?;
                }
                Terminator::Ret { value: Some(value) } => {
                    record(value, UseSite::Terminator(block_id))?;
                }
                _ => {}
            }
        }

        Ok(Function {
            name: self.name,
            ret_ty: self.ret_ty,
            variadic: self.variadic,
            params: self.params,
            blocks,
            values: self.values,
            uses,
        })
    }

    fn intern_label(&mut self, label: &str) -> BlockId {
        if let Some(&id) = self.labels.get(label) {
            return id;
        }
        let id = BlockId::from_index(self.blocks.len() as u32);
        self.blocks.push(PendingBlock {
            label: label.to_string(),
            declared: false,
            phis: Vec::new(),
            instrs: Vec::new(),
            terminator: None,
        });
        self.labels.insert(label.to_string(), id);
        id
    }

    fn open_block(&mut self) -> Result<BlockId> {
        self.current
            .ok_or_else(|| Error::GraphError("no block is open".to_string()))
    }

    fn new_value(&mut self, name: &str, ty: Ty, def: DefSite) -> ValueId {
        let id = ValueId::from_index(self.values.len() as u32);
        self.values.push(ValueInfo {
            ty,
            name: if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            },
            def,
        });
        id
    }

    fn instr_with_result(
        &mut self,
        name: &str,
        ty: Ty,
        make: impl FnOnce(ValueId) -> Instr,
    ) -> Result<Operand> {
        let block = self.open_block()?;
        let index = self.blocks[block.index()].instrs.len();
        let result = self.new_value(name, ty, DefSite::Instr(block, index));
        self.blocks[block.index()].instrs.push(make(result));
        Ok(Operand::Value(result))
    }

    fn push_instr(&mut self, instr: Instr) -> Result<()> {
        let block = self.open_block()?;
        self.blocks[block.index()].instrs.push(instr);
        Ok(())
    }

    fn terminate(&mut self, terminator: Terminator) -> Result<()> {
        let block = self.open_block()?;
        self.blocks[block.index()].terminator = Some(terminator);
        self.current = None;
        Ok(())
    }
}

/// A module-level global variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    /// The global's name.
    pub name: String,
    /// Type of the pointed-to object.
    pub ty: Ty,
    /// Static initializer, if any.
    pub init: Option<GlobalInit>,
}

/// A global's static initializer, reduced to the shapes the translator
/// models.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    /// An aggregate with every element zero.
    Zero,
    /// A single integer scalar.
    Scalar(ConstInt),
    /// A sequence of integer constants.
    IntArray(Vec<ConstInt>),
    /// An alias for another global; initializer resolution follows the
    /// chain.
    Alias(super::GlobalId),
}

/// A module: data layout, globals and functions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Layout used for sizing and offset computation.
    pub data_layout: DataLayout,
    globals: Vec<Global>,
    functions: Vec<Function>,
}

impl Module {
    /// Creates an empty module with the given data layout.
    #[must_use]
    pub fn new(data_layout: DataLayout) -> Self {
        Self {
            data_layout,
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Adds a global and returns its id.
    pub fn add_global(
        &mut self,
        name: impl Into<String>,
        ty: Ty,
        init: Option<GlobalInit>,
    ) -> super::GlobalId {
        let id = super::GlobalId::from_index(self.globals.len() as u32);
        self.globals.push(Global {
            name: name.into(),
            ty,
            init,
        });
        id
    }

    /// Adds a function and returns its id.
    pub fn add_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId::from_index(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    /// The globals with their ids, in declaration order.
    pub fn globals(&self) -> impl Iterator<Item = (super::GlobalId, &Global)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(idx, g)| (super::GlobalId::from_index(idx as u32), g))
    }

    /// Returns a global by id.
    #[must_use]
    pub fn global(&self, id: super::GlobalId) -> &Global {
        &self.globals[id.index() as usize]
    }

    /// The functions with their ids, in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(idx, f)| (FunctionId::from_index(idx as u32), f))
    }

    /// Returns a function by id.
    #[must_use]
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    /// Looks a function up by name. `None` means the name is an
    /// external declaration.
    #[must_use]
    pub fn function_by_name(&self, name: &str) -> Option<(FunctionId, &Function)> {
        self.functions()
            .find(|(_, function)| function.name() == name)
    }

    /// Resolves a global's initializer, following alias chains.
    #[must_use]
    pub fn resolve_init(&self, global: super::GlobalId) -> Option<&GlobalInit> {
        let mut init = self.global(global).init.as_ref()?;
        while let GlobalInit::Alias(target) = init {
            init = self.global(*target).init.as_ref()?;
        }
        Some(init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, IcmpPred};

    fn simple_add() -> Function {
        let mut f = FunctionBuilder::new("add3", Ty::I32);
        let x = f.param("x", Ty::I32);
        f.block("entry").unwrap();
        let r = f
            .binary(BinOp::Add, "r", Ty::I32, x.clone(), Operand::const_int(3, 32))
            .unwrap();
        f.ret(Some(r)).unwrap();
        f.finish().unwrap()
    }

    #[test]
    fn test_builder_produces_blocks_and_values() {
        let f = simple_add();
        assert_eq!(f.name(), "add3");
        assert_eq!(f.blocks().len(), 1);
        assert_eq!(f.params().len(), 1);
        let x = f.params()[0].value;
        assert_eq!(f.value_name(x), Some("x"));
        assert_eq!(*f.value_ty(x), Ty::I32);
        assert_eq!(f.def_site(x), DefSite::Param(0));
    }

    #[test]
    fn test_use_lists() {
        let f = simple_add();
        let x = f.params()[0].value;
        // x is used once, by the add.
        assert_eq!(f.use_count(x), 1);
        assert!(matches!(f.uses(x)[0], UseSite::Instr(_, 0)));
        // r is used once, by the return terminator.
        let r = f.blocks()[0].instrs[0].result().unwrap();
        assert!(matches!(f.uses(r)[0], UseSite::Terminator(_)));
    }

    #[test]
    fn test_forward_label_reference() {
        let mut f = FunctionBuilder::new("loop", Ty::Void);
        let n = f.param("n", Ty::I32);
        f.block("entry").unwrap();
        f.branch("header").unwrap();
        f.block("header").unwrap();
        let c = f
            .icmp(IcmpPred::Slt, "c", n, Operand::const_int(10, 32))
            .unwrap();
        f.cond_branch(c, "header", "exit").unwrap();
        f.block("exit").unwrap();
        f.ret(None).unwrap();
        let f = f.finish().unwrap();
        assert_eq!(f.blocks().len(), 3);
        let preds = f.predecessors();
        // header's predecessors: entry and itself.
        assert_eq!(preds[1].len(), 2);
    }

    #[test]
    fn test_missing_body_is_rejected() {
        let mut f = FunctionBuilder::new("bad", Ty::Void);
        f.block("entry").unwrap();
        f.branch("nowhere").unwrap();
        assert!(matches!(f.finish(), Err(Error::UnknownLabel(l)) if l == "nowhere"));
    }

    #[test]
    fn test_unterminated_block_is_rejected() {
        let mut f = FunctionBuilder::new("bad", Ty::Void);
        f.block("entry").unwrap();
        assert!(matches!(f.finish(), Err(Error::MissingTerminator(_))));
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let mut f = FunctionBuilder::new("bad", Ty::Void);
        f.block("entry").unwrap();
        f.ret(None).unwrap();
        assert!(matches!(
            f.block("entry"),
            Err(Error::DuplicateLabel(l)) if l == "entry"
        ));
    }

    #[test]
    fn test_module_alias_resolution() {
        let mut m = Module::default();
        let base = m.add_global(
            "base",
            Ty::Array {
                elem: Box::new(Ty::I32),
                len: 4,
            },
            Some(GlobalInit::Zero),
        );
        let alias = m.add_global("alias", Ty::Ptr, Some(GlobalInit::Alias(base)));
        assert_eq!(m.resolve_init(alias), Some(&GlobalInit::Zero));
    }
}
