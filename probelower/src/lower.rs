//! Expression Lowerer (C5).
//!
//! The hard engineering of the whole crate: translating a dotted path
//! against a DWARF-derived root into a chain of typed intermediate
//! dereference/offset variables, ending in a scalar-typed leaf named
//! exactly as the caller's id.

use crate::dwarf::{ArgInfo, DwarfKind, DwarfReader};
use crate::error::LowerError;
use crate::ir::Variable;
use crate::language::Language;
use crate::scalar::map_type;
use crate::symtab::SymbolTable;

/// Fixed +8 byte offset compensating for the disagreement between DWARF's
/// frame-base convention and the kernel-probe runtime's stack-pointer
/// register value.
pub const STACK_POINTER_BIAS: i64 = 8;

/// Name-decoration token for a dereference hop.
pub const DEREF_SUFFIX: &str = "_X_";
/// Name-decoration token for a struct-field hop.
pub const FIELD_PREFIX: &str = "_D_";

/// Running state of the lowering walk. Mutated step by step; each `deref`
/// call additionally appends an emitted [`Variable`] and registers it in
/// the symbol table.
struct Cursor {
	kind: DwarfKind,
	type_name: String,
	offset: i64,
	base: String,
	name: String,
}

impl Cursor {
	fn deref(&mut self, language: Language, emitted: &mut Vec<Variable>, symtab: &mut SymbolTable) -> Result<(), LowerError> {
		self.name.push_str(DEREF_SUFFIX);
		let ty = map_type(language, DwarfKind::Pointer, &self.type_name)?;
		let var = Variable::Memory {
			name: self.name.clone(),
			base: self.base.clone(),
			offset: self.offset,
			ty,
		};
		symtab.define(var.name().to_string(), ty);
		emitted.push(var);

		self.base = self.name.clone();
		self.offset = 0;
		// The pointee's real kind/type_name are only known once the next
		// `struct_member_info` call resolves them (or, if this is the
		// final hop, the forced base-kind coercion below handles it).
		self.kind = DwarfKind::Struct;
		Ok(())
	}
}

/// Lowers a dotted expression against a DWARF-resolved root.
///
/// - `root_name` is the user-facing name of the path's first component
///   (the argument name, or a synthesized return root); it seeds the
///   decorated intermediate names.
/// - `root_info` is the DWARF layout of that root, already resolved by
///   the caller (C6).
/// - `base` is the variable the root is offset from (`sp_` for arguments,
///   `rc_` for a C/C++ pointer return).
/// - `leaf_id` is the caller-supplied id the final variable is emitted
///   under.
/// - `fields` are the interior path components (everything after the
///   root).
///
/// Returns the emitted variables in definition order (intermediates, then
/// the leaf); also registers each of them in `symtab`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(dwarf, symtab), fields(probe = probe_name, leaf_id)))]
pub fn lower_expression(
	language: Language,
	dwarf: &dyn DwarfReader,
	probe_name: &str,
	root_name: &str,
	root_info: &ArgInfo,
	base: &str,
	leaf_id: &str,
	fields: &[String],
	symtab: &mut SymbolTable,
) -> Result<Vec<Variable>, LowerError> {
	let mut emitted = Vec::new();
	let mut cursor = Cursor {
		kind: root_info.kind,
		type_name: root_info.type_name.clone(),
		offset: STACK_POINTER_BIAS + root_info.offset_from_frame_base,
		base: base.to_string(),
		name: root_name.to_string(),
	};

	for field in fields {
		if cursor.kind == DwarfKind::Pointer {
			cursor.deref(language, &mut emitted, symtab)?;
		}

		let member = dwarf
			.struct_member_info(&cursor.type_name, field)
			.map_err(|_| LowerError::UnknownField {
				probe: probe_name.to_string(),
				type_name: cursor.type_name.clone(),
				field: field.clone(),
			})?;

		cursor.offset += member.byte_offset_within_parent;
		cursor.kind = member.kind;
		cursor.type_name = member.type_name;
		cursor.name.push_str(FIELD_PREFIX);
		cursor.name.push_str(field);

		#[cfg(feature = "tracing")]
		tracing::trace!(hop = %cursor.name, offset = cursor.offset, "resolved struct member");
	}

	if cursor.kind == DwarfKind::Pointer {
		cursor.deref(language, &mut emitted, symtab)?;
		cursor.kind = DwarfKind::Base;
	}

	let leaf_ty = map_type(language, cursor.kind, &cursor.type_name)?;
	let leaf = Variable::Memory {
		name: leaf_id.to_string(),
		base: cursor.base.clone(),
		offset: cursor.offset,
		ty: leaf_ty,
	};
	symtab.define(leaf.name().to_string(), leaf_ty);
	emitted.push(leaf);

	Ok(emitted)
}
