//! Output Record Emitter (C8).

use fxhash::FxHashMap;

use crate::error::LowerError;
use crate::ir::{Output, OutputAction, Struct, StructField, Variable};
use crate::symtab::{StructRegistry, SymbolTable};

/// Emits one output record for output `output_name`.
///
/// Builds `<output_name>_value_t` with the implicit columns first (in
/// `implicit_columns` order) followed by the declared output fields,
/// resolved against `symtab`; registers the struct; sets the output's
/// struct type; and emits the `Struct` assignment plus the
/// `OutputAction` itself.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(outputs, structs, symtab), fields(probe = probe_name)))]
pub fn lower_output(
	probe_name: &str,
	outputs: &mut FxHashMap<String, Output>,
	structs: &mut StructRegistry,
	implicit_columns: &[String],
	output_name: &str,
	source_ids: &[String],
	symtab: &SymbolTable,
) -> Result<(Vec<Variable>, OutputAction), LowerError> {
	let output = outputs.get_mut(output_name).ok_or_else(|| LowerError::UnknownOutput {
		probe: probe_name.to_string(),
		output: output_name.to_string(),
	})?;

	if source_ids.len() != output.fields.len() {
		return Err(LowerError::InvalidArgument(format!(
			"probe `{probe_name}`: output `{output_name}` declares {} fields but {} source variables were given",
			output.fields.len(),
			source_ids.len()
		)));
	}

	let struct_name = format!("{output_name}_value_t");
	let mut fields = Vec::with_capacity(implicit_columns.len() + output.fields.len());
	let mut assignments = Vec::with_capacity(fields.capacity());

	for name in implicit_columns {
		let ty = symtab.get(name).ok_or_else(|| LowerError::UnknownVariable {
			probe: probe_name.to_string(),
			name: name.clone(),
		})?;
		fields.push(StructField { name: name.clone(), ty });
		assignments.push(name.clone());
	}

	for (field_name, source_id) in output.fields.iter().zip(source_ids) {
		let ty = symtab.get(source_id).ok_or_else(|| LowerError::UnknownVariable {
			probe: probe_name.to_string(),
			name: source_id.clone(),
		})?;
		fields.push(StructField { name: field_name.clone(), ty });
		assignments.push(source_id.clone());
	}

	structs.register(Struct { name: struct_name.clone(), fields })?;

	match &output.struct_type {
		None => output.struct_type = Some(struct_name.clone()),
		Some(existing) if existing == &struct_name => {},
		Some(existing) => {
			return Err(LowerError::InvariantViolation(format!(
				"probe `{probe_name}`: output `{output_name}` already has struct type `{existing}`, cannot set `{struct_name}`"
			)));
		},
	}

	let value_name = format!("{output_name}_value");
	let value_var = Variable::Struct { name: value_name.clone(), type_name: struct_name, field_values: assignments };
	let action = OutputAction { output: output_name.to_string(), variable: value_name };

	Ok((vec![value_var], action))
}
