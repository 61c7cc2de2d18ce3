//! The memory-region oracle consumed by the translator.
//!
//! The translator is deliberately decoupled from any particular
//! points-to or region analysis: it consumes the narrow capability set
//! in [`MemoryOracle`] and nothing else. Alternative memory
//! abstractions (type-based, unification-based, region-based) plug in
//! by implementing the trait.
//!
//! All orderings returned by an oracle must be deterministic and — for
//! inter-procedural translation — identical between a call site and the
//! callee's own region query, because formal/actual array parameters
//! are matched positionally.

use rustc_hash::FxHashMap;

use crate::ir::{BlockId, Function, Operand, ValueRef};

/// How much of memory the translation models.
///
/// Ordered: every level includes the capabilities of the levels below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrackLevel {
    /// Only integer registers.
    None,
    /// Integer and pointer registers.
    Registers,
    /// Registers plus memory contents through smashed arrays.
    Arrays,
}

/// Handle identifying a memory region within an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayId(u32);

impl ArrayId {
    /// Creates an array id from a raw index.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// The regions a function or call site may read, write, or allocate.
///
/// Each sequence is stably ordered by the oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSets {
    /// Regions the callee may read.
    pub refs: Vec<ArrayId>,
    /// Regions the callee may write.
    pub mods: Vec<ArrayId>,
    /// Regions the callee may allocate.
    pub news: Vec<ArrayId>,
}

/// Position of a call instruction within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSiteRef {
    /// The block containing the call.
    pub block: BlockId,
    /// The instruction index within the block.
    pub index: usize,
}

/// The capability set the translator needs from a memory analysis.
pub trait MemoryOracle {
    /// The precision level of this oracle.
    fn track_level(&self) -> TrackLevel;

    /// The region a pointer value points into within `function`, or
    /// `None` when the pointer escapes the abstraction.
    fn array_id(&self, function: &Function, ptr: &Operand) -> Option<ArrayId>;

    /// When the region holds exactly one scalar cell, the value backing
    /// that cell; such regions are treated as plain variables.
    fn singleton(&self, array: ArrayId) -> Option<ValueRef>;

    /// Ref/mod/new region sets for a call site.
    fn callsite_regions(&self, function: &Function, site: CallSiteRef) -> RegionSets;

    /// Ref/mod/new region sets for a whole function. The `news`
    /// component lists regions the function allocates, except for the
    /// program entry function.
    fn function_regions(&self, function: &Function) -> RegionSets;
}

/// An oracle that models no memory at all: registers only, no regions.
#[derive(Debug, Clone, Copy)]
pub struct RegisterModel {
    level: TrackLevel,
}

impl RegisterModel {
    /// Creates a register-only oracle at the given level, which must
    /// not be [`TrackLevel::Arrays`] — there are no arrays to supply.
    #[must_use]
    pub fn new(level: TrackLevel) -> Self {
        assert!(
            level < TrackLevel::Arrays,
            "RegisterModel cannot supply array regions"
        );
        Self { level }
    }
}

impl Default for RegisterModel {
    fn default() -> Self {
        Self {
            level: TrackLevel::Registers,
        }
    }
}

impl MemoryOracle for RegisterModel {
    fn track_level(&self) -> TrackLevel {
        self.level
    }

    fn array_id(&self, _function: &Function, _ptr: &Operand) -> Option<ArrayId> {
        None
    }

    fn singleton(&self, _array: ArrayId) -> Option<ValueRef> {
        None
    }

    fn callsite_regions(&self, _function: &Function, _site: CallSiteRef) -> RegionSets {
        RegionSets::default()
    }

    fn function_regions(&self, _function: &Function) -> RegionSets {
        RegionSets::default()
    }
}

/// A table-backed oracle.
///
/// Suitable for tests and for clients whose region analysis runs ahead
/// of translation and can dump its results into maps. Keys functions by
/// name, which the IR requires to be unique within a module.
#[derive(Debug, Default)]
pub struct RegionModel {
    points_to: FxHashMap<(String, Operand), ArrayId>,
    singletons: FxHashMap<ArrayId, ValueRef>,
    call_regions: FxHashMap<(String, CallSiteRef), RegionSets>,
    fn_regions: FxHashMap<String, RegionSets>,
}

impl RegionModel {
    /// Creates an empty model at [`TrackLevel::Arrays`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `ptr` inside `function` points into `array`.
    pub fn map_pointer(&mut self, function: &str, ptr: Operand, array: ArrayId) {
        self.points_to.insert((function.to_string(), ptr), array);
    }

    /// Marks `array` as a singleton backed by `cell`.
    pub fn set_singleton(&mut self, array: ArrayId, cell: ValueRef) {
        self.singletons.insert(array, cell);
    }

    /// Records the region sets of a call site.
    pub fn set_callsite_regions(&mut self, function: &str, site: CallSiteRef, sets: RegionSets) {
        self.call_regions.insert((function.to_string(), site), sets);
    }

    /// Records the region sets of a function.
    pub fn set_function_regions(&mut self, function: &str, sets: RegionSets) {
        self.fn_regions.insert(function.to_string(), sets);
    }
}

impl MemoryOracle for RegionModel {
    fn track_level(&self) -> TrackLevel {
        TrackLevel::Arrays
    }

    fn array_id(&self, function: &Function, ptr: &Operand) -> Option<ArrayId> {
        self.points_to
            .get(&(function.name().to_string(), ptr.clone()))
            .copied()
    }

    fn singleton(&self, array: ArrayId) -> Option<ValueRef> {
        self.singletons.get(&array).copied()
    }

    fn callsite_regions(&self, function: &Function, site: CallSiteRef) -> RegionSets {
        self.call_regions
            .get(&(function.name().to_string(), site))
            .cloned()
            .unwrap_or_default()
    }

    fn function_regions(&self, function: &Function) -> RegionSets {
        self.fn_regions
            .get(function.name())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Ty, ValueId};

    fn dummy_function() -> Function {
        let mut f = FunctionBuilder::new("f", Ty::Void);
        f.block("entry").unwrap();
        f.ret(None).unwrap();
        f.finish().unwrap()
    }

    #[test]
    fn test_track_level_ordering() {
        assert!(TrackLevel::None < TrackLevel::Registers);
        assert!(TrackLevel::Registers < TrackLevel::Arrays);
    }

    #[test]
    #[should_panic(expected = "cannot supply array regions")]
    fn test_register_model_rejects_arrays() {
        let _ = RegisterModel::new(TrackLevel::Arrays);
    }

    #[test]
    fn test_region_model_lookup() {
        let f = dummy_function();
        let mut model = RegionModel::new();
        let ptr = Operand::Value(ValueId::from_index(0));
        let a = ArrayId::from_index(0);
        model.map_pointer("f", ptr.clone(), a);
        model.set_singleton(a, ValueRef::Local(ValueId::from_index(1)));

        assert_eq!(model.array_id(&f, &ptr), Some(a));
        assert_eq!(model.array_id(&f, &Operand::const_int(0, 32)), None);
        assert_eq!(
            model.singleton(a),
            Some(ValueRef::Local(ValueId::from_index(1)))
        );
        assert!(model.function_regions(&f).refs.is_empty());
    }
}
