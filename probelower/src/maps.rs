//! Map Access / Update / Delete (C7).

use fxhash::FxHashMap;

use crate::error::LowerError;
use crate::ir::{BuiltinKind, Map, MapDeleteAction, MapStashAction, Struct, StructField, Variable};
use crate::scalar::ScalarType;
use crate::symtab::SymbolTable;
use crate::symtab::StructRegistry;

/// Resolves a built-in helper name to the variable it is bound under by
/// [`crate::special::inject`].
pub fn builtin_variable_name(builtin: BuiltinKind) -> &'static str {
	match builtin {
		BuiltinKind::Goid => crate::special::GOID,
		BuiltinKind::Tgid => crate::special::TGID,
		BuiltinKind::TgidPid => crate::special::TGID_PID,
		BuiltinKind::TgidStartTime => crate::special::TGID_START_TIME,
		BuiltinKind::Ktime => crate::special::TIME,
	}
}

/// Reads a map's stashed value.
///
/// Emits a `MapLookup` pointer into the map's value struct, then a
/// `Member` extraction per requested output id, in declared order. The
/// number of requested ids must not exceed the struct's field count.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(maps, structs, symtab), fields(probe = probe_name)))]
pub fn lower_map_read(
	probe_name: &str,
	maps: &FxHashMap<String, Map>,
	structs: &StructRegistry,
	map_name: &str,
	key_builtin: BuiltinKind,
	value_ids: &[String],
	symtab: &mut SymbolTable,
) -> Result<Vec<Variable>, LowerError> {
	let map = maps.get(map_name).ok_or_else(|| LowerError::UnknownMap {
		probe: probe_name.to_string(),
		map: map_name.to_string(),
	})?;

	let value_struct_name = map.value_type.as_ref().ok_or_else(|| {
		LowerError::InvariantViolation(format!("probe `{probe_name}`: map `{map_name}` has no value struct yet"))
	})?;
	let value_struct = structs.get(value_struct_name).ok_or_else(|| {
		LowerError::InvariantViolation(format!("probe `{probe_name}`: struct `{value_struct_name}` is not registered"))
	})?;

	if value_ids.len() > value_struct.fields.len() {
		return Err(LowerError::InvariantViolation(format!(
			"probe `{probe_name}`: map `{map_name}` read requests {} values but its struct only has {} fields",
			value_ids.len(),
			value_struct.fields.len()
		)));
	}

	let mut emitted = Vec::with_capacity(1 + value_ids.len());

	let ptr_name = format!("{map_name}_ptr");
	let key_var = builtin_variable_name(key_builtin).to_string();
	let lookup = Variable::MapLookup { name: ptr_name.clone(), map: map_name.to_string(), key_var };
	emitted.push(lookup);

	for (i, id) in value_ids.iter().enumerate() {
		let field = &value_struct.fields[i];
		let member = Variable::Member {
			name: id.clone(),
			source: ptr_name.clone(),
			field: field.name.clone(),
			pointer_based: true,
			ty: field.ty,
		};
		symtab.define(member.name().to_string(), field.ty);
		emitted.push(member);
	}

	Ok(emitted)
}

/// Stashes a value into a map.
///
/// Builds (and registers) `<map>_value_t` with one field per source
/// variable id, sets the map's key type to `UINT64` and its value type to
/// that struct, then emits the `Struct` assignment and the
/// `MapStashAction` itself.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(maps, structs, symtab), fields(probe = probe_name)))]
pub fn lower_map_stash(
	probe_name: &str,
	maps: &mut FxHashMap<String, Map>,
	structs: &mut StructRegistry,
	map_name: &str,
	key_builtin: BuiltinKind,
	source_ids: &[String],
	condition: Option<String>,
	symtab: &SymbolTable,
) -> Result<(Vec<Variable>, MapStashAction), LowerError> {
	let map = maps.get_mut(map_name).ok_or_else(|| LowerError::UnknownMap {
		probe: probe_name.to_string(),
		map: map_name.to_string(),
	})?;

	let struct_name = format!("{map_name}_value_t");
	let mut fields = Vec::with_capacity(source_ids.len());
	for id in source_ids {
		let ty = symtab.get(id).ok_or_else(|| LowerError::UnknownVariable {
			probe: probe_name.to_string(),
			name: id.clone(),
		})?;
		fields.push(StructField { name: id.clone(), ty });
	}

	structs.register(Struct { name: struct_name.clone(), fields })?;

	map.key_type = Some(ScalarType::UInt64);
	map.value_type = Some(struct_name.clone());

	let value_name = format!("{map_name}_value");
	let value_var = Variable::Struct {
		name: value_name.clone(),
		type_name: struct_name,
		field_values: source_ids.to_vec(),
	};

	let key = builtin_variable_name(key_builtin).to_string();
	let action = MapStashAction { map: map_name.to_string(), key, value: value_name, condition };

	Ok((vec![value_var], action))
}

/// Deletes a map entry.
pub fn lower_map_delete(probe_name: &str, maps: &FxHashMap<String, Map>, map_name: &str, key_builtin: BuiltinKind) -> Result<MapDeleteAction, LowerError> {
	if !maps.contains_key(map_name) {
		return Err(LowerError::UnknownMap { probe: probe_name.to_string(), map: map_name.to_string() });
	}
	let key = builtin_variable_name(key_builtin).to_string();
	Ok(MapDeleteAction { map: map_name.to_string(), key })
}
