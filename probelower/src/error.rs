//! Error kinds.
//!
//! The pass is fail-fast: the first error aborts assembly and is returned
//! verbatim to the caller, carrying enough context (probe name, map/output
//! name, variable id) to be useful on its own. No error is recovered
//! locally and no partial [`crate::program::PhysicalProgram`] is ever
//! returned.

use std::fmt::{self, Display, Formatter};

use crate::dwarf::{DwarfError, DwarfKind};
use crate::language::Language;

/// Every fallible operation in the crate returns `Result<T, LowerError>`.
#[derive(Debug)]
pub enum LowerError {
	/// Malformed input: empty expression, wrong tracepoint count, a
	/// return index that doesn't parse, an output arity mismatch.
	InvalidArgument(String),

	/// An argument expression's root doesn't name a DWARF-known argument.
	UnknownArgument { probe: String, name: String },

	/// A struct member lookup failed at some hop of an expression.
	UnknownField { probe: String, type_name: String, field: String },

	/// A variable id was referenced that isn't in the probe's symbol table.
	UnknownVariable { probe: String, name: String },

	/// A map reference names a map the deployment didn't declare.
	UnknownMap { probe: String, map: String },

	/// An output reference names an output the deployment didn't declare.
	UnknownOutput { probe: String, output: String },

	/// C1 rejected a DWARF `(kind, type_name)` pair.
	TypeUnsupported { language: Language, kind: DwarfKind, type_name: String },

	/// Surfaced verbatim from the DWARF adapter (C2).
	DwarfError(DwarfError),

	/// Internal consistency failure: a non-base leaf escaped C1, a struct
	/// or map got redefined with an incompatible shape, an output's
	/// struct type was set twice with different names, and so on.
	InvariantViolation(String),

	/// Return-value lowering for a language other than Go/C/C++, a C/C++
	/// return index other than `0`, or a void C/C++ return with a
	/// return-value request.
	Unimplemented(String),
}

impl Display for LowerError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
			Self::UnknownArgument { probe, name } => {
				write!(f, "probe `{probe}`: unknown argument `{name}`")
			},
			Self::UnknownField { probe, type_name, field } => {
				write!(f, "probe `{probe}`: type `{type_name}` has no field `{field}`")
			},
			Self::UnknownVariable { probe, name } => {
				write!(f, "probe `{probe}`: variable `{name}` is not defined yet")
			},
			Self::UnknownMap { probe, map } => write!(f, "probe `{probe}`: unknown map `{map}`"),
			Self::UnknownOutput { probe, output } => {
				write!(f, "probe `{probe}`: unknown output `{output}`")
			},
			Self::TypeUnsupported { language, kind, type_name } => {
				write!(f, "unsupported {language:?} type for {kind:?}: `{type_name}`")
			},
			Self::DwarfError(err) => write!(f, "dwarf error: {err}"),
			Self::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
			Self::Unimplemented(msg) => write!(f, "unimplemented: {msg}"),
		}
	}
}

impl std::error::Error for LowerError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::DwarfError(err) => Some(err),
			_ => None,
		}
	}
}

impl From<DwarfError> for LowerError {
	fn from(value: DwarfError) -> Self {
		Self::DwarfError(value)
	}
}
