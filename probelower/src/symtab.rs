//! Symbol Table & Struct Registry (C3).
//!
//! [`SymbolTable`] is reset at the start of every probe; [`StructRegistry`]
//! is owned by the single pass instance and persists across probes within
//! one program assembly.

use std::fmt::{Formatter, Result as FmtResult};

use derivative::Derivative;
use fxhash::FxHashMap;

use crate::error::LowerError;
use crate::ir::Struct;
use crate::scalar::ScalarType;

/// Per-probe mapping from variable name to its scalar type.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SymbolTable {
	#[derivative(Debug(format_with = "fmt_vars"))]
	vars: FxHashMap<String, ScalarType>,
}

impl SymbolTable {
	pub fn new() -> Self {
		Self { vars: FxHashMap::default() }
	}

	/// Records that `name` now has type `ty`. Overwriting an existing
	/// name is allowed — the lowerer never re-emits a name it has already
	/// used except through the decoration scheme in [`crate::lower`],
	/// which guarantees uniqueness within a probe.
	pub fn define(&mut self, name: impl Into<String>, ty: ScalarType) {
		self.vars.insert(name.into(), ty);
	}

	pub fn get(&self, name: &str) -> Option<ScalarType> {
		self.vars.get(name).copied()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.vars.contains_key(name)
	}

	/// Resets all per-probe state. Implicit columns are not special-cased
	/// here: C4 re-synthesizes them at the head of every probe, so they
	/// are valid again by the time anything else runs.
	pub fn clear(&mut self) {
		self.vars.clear();
	}
}

impl Default for SymbolTable {
	fn default() -> Self {
		Self::new()
	}
}

fn fmt_vars(vars: &FxHashMap<String, ScalarType>, f: &mut Formatter) -> FmtResult {
	let mut dbg = f.debug_map();
	for (name, ty) in vars {
		dbg.entry(name, ty);
	}
	dbg.finish()
}

/// Program-wide mapping from struct type name to its definition. Exactly
/// one struct schema exists per map/output name.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct StructRegistry {
	#[derivative(Debug(format_with = "fmt_structs"))]
	structs: FxHashMap<String, Struct>,
}

impl StructRegistry {
	pub fn new() -> Self {
		Self { structs: FxHashMap::default() }
	}

	/// Registers `s`. If a struct with the same name already exists, its
	/// shape must match exactly (field names, types, and order) or this
	/// is an [`LowerError::InvariantViolation`].
	pub fn register(&mut self, s: Struct) -> Result<(), LowerError> {
		match self.structs.get(&s.name) {
			None => {
				self.structs.insert(s.name.clone(), s);
				Ok(())
			},
			Some(existing) if existing.fields == s.fields => Ok(()),
			Some(existing) => Err(LowerError::InvariantViolation(format!(
				"struct `{}` redefined with a different shape: {:?} vs {:?}",
				s.name, existing.fields, s.fields
			))),
		}
	}

	pub fn get(&self, name: &str) -> Option<&Struct> {
		self.structs.get(name)
	}

	pub fn into_structs(self) -> Vec<Struct> {
		let mut structs: Vec<_> = self.structs.into_values().collect();
		structs.sort_by(|a, b| a.name.cmp(&b.name));
		structs
	}
}

impl Default for StructRegistry {
	fn default() -> Self {
		Self::new()
	}
}

fn fmt_structs(structs: &FxHashMap<String, Struct>, f: &mut Formatter) -> FmtResult {
	let mut dbg = f.debug_map();
	for (name, s) in structs {
		dbg.entry(name, &s.fields);
	}
	dbg.finish()
}
