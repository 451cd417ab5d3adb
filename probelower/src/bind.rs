//! Argument / Return Binder (C6).
//!
//! Parses an expression string, locates its root in the DWARF argument map
//! (or synthesizes a Go-style `~rN` root for a return value), and
//! delegates the remaining path to [`crate::lower::lower_expression`].
//! Enforces each source language's own return-value conventions.

use fxhash::FxHashMap;

use crate::dwarf::{ArgInfo, DwarfKind, DwarfReader};
use crate::error::LowerError;
use crate::ir::{RegisterKind, Variable};
use crate::language::Language;
use crate::lower::lower_expression;
use crate::scalar::map_type;
use crate::symtab::SymbolTable;

/// Lowers an argument expression such as `arg1.inner.field`.
///
/// The first dot-separated component must name an entry in `args` (the
/// DWARF argument map for the probed symbol); the rest is delegated to C5
/// rooted at `sp_`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(dwarf, args, symtab), fields(probe = probe_name)))]
pub fn lower_argument_expression(
	language: Language,
	dwarf: &dyn DwarfReader,
	probe_name: &str,
	args: &FxHashMap<String, ArgInfo>,
	expression: &str,
	leaf_id: &str,
	symtab: &mut SymbolTable,
) -> Result<Vec<Variable>, LowerError> {
	let components = split_expression(expression)?;
	let root_name = &components[0];

	let root_info = args.get(root_name).ok_or_else(|| LowerError::UnknownArgument {
		probe: probe_name.to_string(),
		name: root_name.clone(),
	})?;

	lower_expression(language, dwarf, probe_name, root_name, root_info, crate::special::SP, leaf_id, &components[1..], symtab)
}

/// Lowers a return-value expression such as `$0.result`.
///
/// `$<index>` selects which return value is referenced. Go return values
/// live in the argument frame under a synthesized `~rN` name, indexed in
/// DWARF's own order (formal parameters included, the method receiver
/// excluded — callers must account for this themselves; named returns are
/// not yet supported). C/C++ only support index `0`, dispatched on the
/// function's DWARF return kind.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(dwarf, symtab), fields(probe = probe_name)))]
pub fn lower_return_expression(
	language: Language,
	dwarf: &dyn DwarfReader,
	probe_name: &str,
	symbol: &str,
	expression: &str,
	leaf_id: &str,
	symtab: &mut SymbolTable,
) -> Result<Vec<Variable>, LowerError> {
	let components = split_expression(expression)?;
	let index = parse_return_index(probe_name, &components[0])?;

	match language {
		Language::Go => {
			let root_name = format!("~r{index}");
			let args = dwarf.function_arg_info(symbol)?;
			let root_info = args.get(&root_name).ok_or_else(|| LowerError::UnknownArgument {
				probe: probe_name.to_string(),
				name: root_name.clone(),
			})?;
			lower_expression(language, dwarf, probe_name, &root_name, root_info, crate::special::SP, leaf_id, &components[1..], symtab)
		},
		Language::C | Language::Cpp => {
			if index != 0 {
				return Err(LowerError::Unimplemented(format!(
					"probe `{probe_name}`: C/C++ only supports return index 0, got {index}"
				)));
			}

			let ret = dwarf.function_ret_info(symbol)?;
			match ret.kind {
				DwarfKind::Base => {
					let ty = map_type(language, DwarfKind::Base, &ret.type_name)?;
					let var = Variable::Register { name: leaf_id.to_string(), register: RegisterKind::ReturnValue, ty };
					symtab.define(var.name().to_string(), ty);
					Ok(vec![var])
				},
				DwarfKind::Pointer => {
					let root_info = ArgInfo { kind: DwarfKind::Pointer, type_name: ret.type_name, offset_from_frame_base: 0 };
					lower_expression(language, dwarf, probe_name, "$0", &root_info, crate::special::RC, leaf_id, &components[1..], symtab)
				},
				DwarfKind::Void => Err(LowerError::Unimplemented(format!(
					"probe `{probe_name}`: void return has no value to bind"
				))),
				DwarfKind::Struct | DwarfKind::Other => Err(LowerError::TypeUnsupported {
					language,
					kind: ret.kind,
					type_name: ret.type_name,
				}),
			}
		},
	}
}

fn split_expression(expression: &str) -> Result<Vec<String>, LowerError> {
	if expression.is_empty() {
		return Err(LowerError::InvalidArgument("expression must not be empty".to_string()));
	}
	Ok(expression.split('.').map(str::to_string).collect())
}

fn parse_return_index(probe_name: &str, component: &str) -> Result<u32, LowerError> {
	let digits = component.strip_prefix('$').ok_or_else(|| {
		LowerError::InvalidArgument(format!("probe `{probe_name}`: return expression must start with `$<index>`, got `{component}`"))
	})?;
	digits
		.parse::<u32>()
		.map_err(|_| LowerError::InvalidArgument(format!("probe `{probe_name}`: invalid return index `{component}`")))
}
