//! The control-flow graph owning nodes, edges and exit marking.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::cfg::{CfgBlock, Label, SymbolName, VarKind};
use crate::{Error, Result};

/// Declaration of the translated function for inter-procedural
/// analysis: name, return kind, and the formal list — scalar formals
/// first, then ref-array input snapshots, ref arrays, and new arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// The function's symbol.
    pub name: SymbolName,
    /// The return kind.
    pub ret: VarKind,
    /// The formals in marshalling order.
    pub formals: Vec<(SymbolName, VarKind)>,
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl {}(", self.name)?;
        for (i, (formal, kind)) in self.formals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{formal}:{kind}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A translated control-flow graph.
///
/// Owns its nodes and statements. Nodes are kept in insertion order,
/// which makes the [`Display`](fmt::Display) printout — and therefore
/// the whole translation — deterministic for identical inputs.
#[derive(Debug, Clone)]
pub struct Cfg {
    nodes: Vec<CfgBlock>,
    index: FxHashMap<Label, usize>,
    entry: Label,
    exit: Option<Label>,
    decl: Option<FunctionDecl>,
}

impl Cfg {
    /// Creates a graph containing only the entry node.
    #[must_use]
    pub fn new(entry: Label) -> Self {
        let mut index = FxHashMap::default();
        index.insert(entry.clone(), 0);
        Self {
            nodes: vec![CfgBlock::new(entry.clone())],
            index,
            entry,
            exit: None,
            decl: None,
        }
    }

    /// The entry label.
    #[must_use]
    pub const fn entry(&self) -> &Label {
        &self.entry
    }

    /// The exit label, when one was determined.
    #[must_use]
    pub const fn exit(&self) -> Option<&Label> {
        self.exit.as_ref()
    }

    /// The function declaration, in inter-procedural mode.
    #[must_use]
    pub const fn decl(&self) -> Option<&FunctionDecl> {
        self.decl.as_ref()
    }

    /// Sets the function declaration.
    pub fn set_decl(&mut self, decl: FunctionDecl) {
        self.decl = Some(decl);
    }

    /// The nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[CfgBlock] {
        &self.nodes
    }

    /// Inserts a new empty node.
    ///
    /// # Errors
    ///
    /// Fails when the label is already present.
    pub fn insert(&mut self, label: Label) -> Result<()> {
        if self.index.contains_key(&label) {
            return Err(Error::GraphError(format!("duplicate CFG node '{label}'")));
        }
        self.index.insert(label.clone(), self.nodes.len());
        self.nodes.push(CfgBlock::new(label));
        Ok(())
    }

    /// Returns the node with the given label.
    #[must_use]
    pub fn node(&self, label: &Label) -> Option<&CfgBlock> {
        self.index.get(label).map(|&idx| &self.nodes[idx])
    }

    /// Returns the node with the given label, mutably.
    pub fn node_mut(&mut self, label: &Label) -> Option<&mut CfgBlock> {
        match self.index.get(label) {
            Some(&idx) => Some(&mut self.nodes[idx]),
            None => None,
        }
    }

    /// Adds the edge `src → dst`.
    ///
    /// # Errors
    ///
    /// Fails when either endpoint is missing.
    pub fn add_edge(&mut self, src: &Label, dst: &Label) -> Result<()> {
        if !self.index.contains_key(dst) {
            return Err(Error::GraphError(format!("unknown edge target '{dst}'")));
        }
        let src = self
            .node_mut(src)
            .ok_or_else(|| Error::GraphError(format!("unknown edge source '{src}'")))?;
        src.add_successor(dst.clone());
        Ok(())
    }

    /// Removes the edge `src → dst` if present.
    pub fn remove_edge(&mut self, src: &Label, dst: &Label) {
        if let Some(node) = self.node_mut(src) {
            node.remove_successor(dst);
        }
    }

    /// Marks the exit node.
    ///
    /// # Errors
    ///
    /// Fails when the label is missing.
    pub fn set_exit(&mut self, label: Label) -> Result<()> {
        if !self.index.contains_key(&label) {
            return Err(Error::GraphError(format!("unknown exit label '{label}'")));
        }
        self.exit = Some(label);
        Ok(())
    }

    /// Predecessor labels of every node, in node insertion order.
    #[must_use]
    pub fn predecessors(&self) -> FxHashMap<Label, Vec<Label>> {
        let mut preds: FxHashMap<Label, Vec<Label>> = FxHashMap::default();
        for node in &self.nodes {
            preds.entry(node.label().clone()).or_default();
        }
        for node in &self.nodes {
            for succ in node.successors() {
                preds
                    .entry(succ.clone())
                    .or_default()
                    .push(node.label().clone());
            }
        }
        preds
    }

    /// Merges straight-line chains: a node with a single successor
    /// absorbs that successor when the successor has no other
    /// predecessor and is neither the entry nor already absorbed. Exit
    /// marking follows the absorbed node. Statement sequences observed
    /// along any path are unchanged.
    pub fn simplify(&mut self) {
        loop {
            let preds = self.predecessors();
            let mut candidate = None;
            for node in &self.nodes {
                if node.successors().len() != 1 {
                    continue;
                }
                let succ = node.successors()[0].clone();
                if succ == self.entry || succ == *node.label() {
                    continue;
                }
                if preds.get(&succ).map(Vec::len) != Some(1) {
                    continue;
                }
                candidate = Some((node.label().clone(), succ));
                break;
            }
            let Some((src, dst)) = candidate else {
                return;
            };
            let dst_idx = self.index[&dst];
            let stmts = self.nodes[dst_idx].take_statements();
            let succs = self.nodes[dst_idx].take_successors();
            let src_idx = self.index[&src];
            let src_node = &mut self.nodes[src_idx];
            src_node.remove_successor(&dst);
            for stmt in stmts {
                src_node.push(stmt);
            }
            for succ in succs {
                src_node.add_successor(succ);
            }
            if self.exit.as_ref() == Some(&dst) {
                self.exit = Some(src);
            }
            self.nodes.remove(dst_idx);
            self.index = self
                .nodes
                .iter()
                .enumerate()
                .map(|(idx, node)| (node.label().clone(), idx))
                .collect();
        }
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(decl) = &self.decl {
            writeln!(f, "{decl}")?;
        }
        writeln!(f, "entry: {}", self.entry)?;
        if let Some(exit) = &self.exit {
            writeln!(f, "exit: {exit}")?;
        }
        for node in &self.nodes {
            writeln!(f, "{}:", node.label())?;
            for stmt in node.statements() {
                writeln!(f, "  {stmt}")?;
            }
            if !node.successors().is_empty() {
                write!(f, "  -->")?;
                for (i, succ) in node.successors().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {succ}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
