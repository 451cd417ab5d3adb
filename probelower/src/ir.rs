//! The physical IR data model.
//!
//! Variables refer to each other by name, not by pointer — an ordered
//! append-only list plus a name→type map (see [`crate::symtab`]), rather
//! than a pointer graph. This sidesteps the ownership cycles a graph of
//! `Rc`/`&`-linked nodes would introduce and makes every [`PhysicalProbe`]
//! trivially serializable.

use crate::scalar::ScalarType;

/// Where in the traced binary a probe fires.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TracepointKind {
	Entry,
	Return,
}

/// Location of a probe: a binary symbol plus entry/return.
#[derive(Debug, Clone)]
pub struct Tracepoint {
	pub symbol: String,
	pub kind: TracepointKind,
}

/// A machine register a [`Variable::Register`] can be bound to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RegisterKind {
	StackPointer,
	ReturnValue,
}

/// A fixed helper exposed by the probe runtime.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BuiltinKind {
	Tgid,
	TgidPid,
	TgidStartTime,
	Ktime,
	Goid,
}

/// Binary operator for a [`Variable::BinaryExpr`]. Only `Sub` is ever
/// emitted today (latency = `time_ - start_ktime_ns`); the variant exists
/// so the IR isn't hand-tied to that one use.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinOp {
	Sub,
}

/// A literal value for a [`Variable::Constant`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
	Int(i64),
	UInt(u64),
	Float(f64),
	Bool(bool),
	String(String),
}

/// One emitted variable. Modeled as a tagged variant rather than a class
/// hierarchy so the downstream generator's match over variable kind is
/// exhaustive by construction.
#[derive(Debug, Clone)]
pub enum Variable {
	/// Bound to a named machine register (stack pointer or return-value
	/// register).
	Register { name: String, register: RegisterKind, ty: ScalarType },

	/// Bound to a runtime helper (thread-group id, kernel time, …).
	Builtin { name: String, builtin: BuiltinKind, ty: ScalarType },

	/// A literal of a declared scalar type.
	Constant { name: String, ty: ScalarType, value: ConstantValue },

	/// Defined by `(base, offset)`: `base` names a previously-defined
	/// variable in the same probe; `offset` is a byte displacement from
	/// it.
	Memory { name: String, base: String, offset: i64, ty: ScalarType },

	/// A pointer into a map's value struct, keyed by a named variable.
	MapLookup { name: String, map: String, key_var: String },

	/// Field extraction from a named struct variable.
	Member { name: String, source: String, field: String, pointer_based: bool, ty: ScalarType },

	/// A stack-allocated aggregate of a named struct type, with fields
	/// assigned from named variables (in struct field order).
	Struct { name: String, type_name: String, field_values: Vec<String> },

	/// `name = lhs <op> rhs` over two named variables.
	BinaryExpr { name: String, op: BinOp, lhs: String, rhs: String, ty: ScalarType },
}

impl Variable {
	/// The name this variable is emitted and referenced under.
	pub fn name(&self) -> &str {
		match self {
			Variable::Register { name, .. }
			| Variable::Builtin { name, .. }
			| Variable::Constant { name, .. }
			| Variable::Memory { name, .. }
			| Variable::MapLookup { name, .. }
			| Variable::Member { name, .. }
			| Variable::Struct { name, .. }
			| Variable::BinaryExpr { name, .. } => name,
		}
	}

	/// The scalar type of this variable, if it carries one. `MapLookup`
	/// and `Struct` don't resolve to a single [`ScalarType`] (they're a
	/// pointer into a struct, or the struct itself).
	pub fn scalar_type(&self) -> Option<ScalarType> {
		match self {
			Variable::Register { ty, .. }
			| Variable::Builtin { ty, .. }
			| Variable::Constant { ty, .. }
			| Variable::Memory { ty, .. }
			| Variable::Member { ty, .. }
			| Variable::BinaryExpr { ty, .. } => Some(*ty),
			Variable::MapLookup { .. } | Variable::Struct { .. } => None,
		}
	}

	/// The name of a variable this one's definition depends on (its
	/// `base`, for `Memory` variables). Callers can walk a probe's variable
	/// list in order, checking each dependency was already defined, to
	/// confirm the list is topologically sound.
	pub fn depends_on(&self) -> Option<&str> {
		match self {
			Variable::Memory { base, .. } => Some(base),
			_ => None,
		}
	}
}

/// A named, ordered struct schema. Content-addressed by name: once
/// registered it must not be redefined with a different shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
	pub name: String,
	pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
	pub name: String,
	pub ty: ScalarType,
}

/// An in-kernel associative array. Key/value type are set on first stash.
#[derive(Debug, Clone)]
pub struct Map {
	pub name: String,
	pub key_type: Option<ScalarType>,
	pub value_type: Option<String>,
}

/// A perf-buffer output. `fields` is the user-declared field-name list;
/// `struct_type` is set once the output's struct has been generated.
#[derive(Debug, Clone)]
pub struct Output {
	pub name: String,
	pub fields: Vec<String>,
	pub struct_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MapStashAction {
	pub map: String,
	pub key: String,
	pub value: String,
	pub condition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MapDeleteAction {
	pub map: String,
	pub key: String,
}

#[derive(Debug, Clone)]
pub struct OutputAction {
	pub output: String,
	pub variable: String,
}

#[derive(Debug, Clone)]
pub struct PrintDirective {
	pub format: String,
	pub args: Vec<String>,
}

/// A fully lowered probe: every variable carries an explicit memory-access
/// recipe, and every action references variables by name.
#[derive(Debug, Clone)]
pub struct PhysicalProbe {
	pub name: String,
	pub tracepoint: Tracepoint,
	pub variables: Vec<Variable>,
	pub stash_actions: Vec<MapStashAction>,
	pub delete_actions: Vec<MapDeleteAction>,
	pub output_actions: Vec<OutputAction>,
	pub prints: Vec<PrintDirective>,
	pub latency: Option<String>,
}
