//! Program Assembler (C9) and the logical/physical program data model.

use fxhash::FxHashMap;

use crate::bind::{lower_argument_expression, lower_return_expression};
use crate::dwarf::{DwarfReader, DwarfReaderFactory};
use crate::error::LowerError;
use crate::ir::{BinOp, ConstantValue, Map, MapDeleteAction, Output, PhysicalProbe, PrintDirective, Struct, Tracepoint, Variable};
use crate::language::Language;
use crate::maps::{lower_map_delete, lower_map_read, lower_map_stash};
use crate::output::lower_output;
use crate::scalar::ScalarType;
use crate::special;
use crate::symtab::{StructRegistry, SymbolTable};

/// The source variable the latency `BinaryExpr` subtracts from `time_`.
/// Populated, by convention, by an earlier map lookup of a stashed start
/// timestamp.
pub const LATENCY_START_VAR: &str = "start_ktime_ns";

/// One named, bound constant.
#[derive(Debug, Clone)]
pub struct LogicalConstant {
	pub id: String,
	pub ty: ScalarType,
	pub value: ConstantValue,
}

/// An argument or return-value expression request (C6 input).
#[derive(Debug, Clone)]
pub struct LogicalExpr {
	pub id: String,
	pub expression: String,
}

/// A map-value read request (C7 input).
#[derive(Debug, Clone)]
pub struct LogicalMapRead {
	pub map: String,
	pub key: crate::ir::BuiltinKind,
	pub value_ids: Vec<String>,
}

/// A map-stash request (C7 input).
#[derive(Debug, Clone)]
pub struct LogicalMapStash {
	pub map: String,
	pub key: crate::ir::BuiltinKind,
	pub source_ids: Vec<String>,
	pub condition: Option<String>,
}

/// A map-delete request (C7 input).
#[derive(Debug, Clone)]
pub struct LogicalMapDelete {
	pub map: String,
	pub key: crate::ir::BuiltinKind,
}

/// An output-record request (C8 input).
#[derive(Debug, Clone)]
pub struct LogicalOutputAction {
	pub output: String,
	pub source_ids: Vec<String>,
}

/// One logical probe: where to attach, and what to materialize.
#[derive(Debug, Clone)]
pub struct LogicalProbe {
	pub name: String,
	pub tracepoint: Tracepoint,
	pub constants: Vec<LogicalConstant>,
	pub arg_exprs: Vec<LogicalExpr>,
	pub ret_exprs: Vec<LogicalExpr>,
	pub map_reads: Vec<LogicalMapRead>,
	/// Function-latency request id, if any.
	pub latency: Option<String>,
	pub stash_actions: Vec<LogicalMapStash>,
	pub delete_actions: Vec<LogicalMapDelete>,
	pub output_actions: Vec<LogicalOutputAction>,
	pub prints: Vec<PrintDirective>,
}

/// An output's declared name and field list, before its struct has been
/// generated.
#[derive(Debug, Clone)]
pub struct LogicalOutputDecl {
	pub name: String,
	pub fields: Vec<String>,
}

/// The program body of a single logical deployment "tracepoint" — a
/// top-level deployment unit, not to be confused with [`Tracepoint`], the
/// per-probe entry/return attach point.
#[derive(Debug, Clone)]
pub struct LogicalProgram {
	pub language: Language,
	pub maps: Vec<String>,
	pub outputs: Vec<LogicalOutputDecl>,
	pub probes: Vec<LogicalProbe>,
}

/// The top-level input to the lowering pass.
#[derive(Debug, Clone)]
pub struct LogicalDeployment {
	pub binary_path: String,
	/// Must contain exactly one element; anything else is rejected with
	/// [`LowerError::InvalidArgument`] before any DWARF I/O happens.
	pub tracepoints: Vec<LogicalProgram>,
}

/// The fully lowered output of one assembly.
#[derive(Debug, Clone)]
pub struct PhysicalProgram {
	pub binary_path: String,
	pub language: Language,
	pub maps: FxHashMap<String, Map>,
	pub outputs: FxHashMap<String, Output>,
	pub structs: Vec<Struct>,
	pub probes: Vec<PhysicalProbe>,
}

/// Lowers a [`LogicalDeployment`] into a [`PhysicalProgram`].
///
/// Fail-fast: the first error aborts assembly and is returned verbatim; no
/// partial program is ever produced. The DWARF reader is acquired here and
/// dropped (with it, released) when this function returns, on every path.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(deployment, dwarf_factory)))]
pub fn lower(deployment: &LogicalDeployment, dwarf_factory: &dyn DwarfReaderFactory) -> Result<PhysicalProgram, LowerError> {
	if deployment.tracepoints.len() != 1 {
		return Err(LowerError::InvalidArgument(format!(
			"a deployment must contain exactly one tracepoint, found {}",
			deployment.tracepoints.len()
		)));
	}
	let program = &deployment.tracepoints[0];
	let language = program.language;

	let mut maps: FxHashMap<String, Map> = program
		.maps
		.iter()
		.map(|name| (name.clone(), Map { name: name.clone(), key_type: None, value_type: None }))
		.collect();
	let mut outputs: FxHashMap<String, Output> = program
		.outputs
		.iter()
		.map(|o| (o.name.clone(), Output { name: o.name.clone(), fields: o.fields.clone(), struct_type: None }))
		.collect();
	let mut structs = StructRegistry::new();

	let dwarf = dwarf_factory.open(&deployment.binary_path)?;
	let implicit_columns = special::implicit_columns(language);

	let mut probes = Vec::with_capacity(program.probes.len());
	for logical_probe in &program.probes {
		let physical = lower_probe(language, dwarf.as_ref(), logical_probe, &mut maps, &mut outputs, &mut structs, &implicit_columns)?;
		probes.push(physical);
	}

	Ok(PhysicalProgram {
		binary_path: deployment.binary_path.clone(),
		language,
		maps,
		outputs,
		structs: structs.into_structs(),
		probes,
	})
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(dwarf, probe, maps, outputs, structs, implicit_columns), fields(probe = %probe.name)))]
fn lower_probe(
	language: Language,
	dwarf: &dyn DwarfReader,
	probe: &LogicalProbe,
	maps: &mut FxHashMap<String, Map>,
	outputs: &mut FxHashMap<String, Output>,
	structs: &mut StructRegistry,
	implicit_columns: &[String],
) -> Result<PhysicalProbe, LowerError> {
	let mut symtab = SymbolTable::new();
	let mut variables = special::inject(language, &probe.tracepoint, &mut symtab);

	let args = dwarf.function_arg_info(&probe.tracepoint.symbol)?;

	for constant in &probe.constants {
		let var = Variable::Constant { name: constant.id.clone(), ty: constant.ty, value: constant.value.clone() };
		symtab.define(var.name().to_string(), constant.ty);
		variables.push(var);
	}

	for arg in &probe.arg_exprs {
		let vars = lower_argument_expression(language, dwarf, &probe.name, &args, &arg.expression, &arg.id, &mut symtab)?;
		variables.extend(vars);
	}

	for ret in &probe.ret_exprs {
		let vars = lower_return_expression(language, dwarf, &probe.name, &probe.tracepoint.symbol, &ret.expression, &ret.id, &mut symtab)?;
		variables.extend(vars);
	}

	for read in &probe.map_reads {
		let vars = lower_map_read(&probe.name, maps, structs, &read.map, read.key, &read.value_ids, &mut symtab)?;
		variables.extend(vars);
	}

	let mut latency = None;
	if let Some(id) = &probe.latency {
		if !symtab.contains(LATENCY_START_VAR) {
			return Err(LowerError::UnknownVariable { probe: probe.name.clone(), name: LATENCY_START_VAR.to_string() });
		}
		let var = Variable::BinaryExpr {
			name: id.clone(),
			op: BinOp::Sub,
			lhs: special::TIME.to_string(),
			rhs: LATENCY_START_VAR.to_string(),
			ty: ScalarType::Int64,
		};
		symtab.define(var.name().to_string(), ScalarType::Int64);
		variables.push(var);
		latency = Some(id.clone());
	}

	let mut stash_actions = Vec::with_capacity(probe.stash_actions.len());
	for stash in &probe.stash_actions {
		let (vars, action) = lower_map_stash(&probe.name, maps, structs, &stash.map, stash.key, &stash.source_ids, stash.condition.clone(), &symtab)?;
		variables.extend(vars);
		stash_actions.push(action);
	}

	let mut delete_actions: Vec<MapDeleteAction> = Vec::with_capacity(probe.delete_actions.len());
	for delete in &probe.delete_actions {
		delete_actions.push(lower_map_delete(&probe.name, maps, &delete.map, delete.key)?);
	}

	let mut output_actions = Vec::with_capacity(probe.output_actions.len());
	for out in &probe.output_actions {
		let (vars, action) = lower_output(&probe.name, outputs, structs, implicit_columns, &out.output, &out.source_ids, &symtab)?;
		variables.extend(vars);
		output_actions.push(action);
	}

	check_topological_order(&probe.name, &variables)?;

	Ok(PhysicalProbe {
		name: probe.name.clone(),
		tracepoint: probe.tracepoint.clone(),
		variables,
		stash_actions,
		delete_actions,
		output_actions,
		prints: probe.prints.clone(),
		latency,
	})
}

/// Confirms every `Memory` variable's `base` names a variable that was
/// defined strictly earlier in `variables`. The lowerer is built to
/// guarantee this by construction; this walk is the one place that
/// actually checks it, rather than trusting the construction silently.
fn check_topological_order(probe_name: &str, variables: &[Variable]) -> Result<(), LowerError> {
	let mut defined: fxhash::FxHashSet<&str> = fxhash::FxHashSet::default();
	for var in variables {
		if let Some(base) = var.depends_on() {
			if !defined.contains(base) {
				return Err(LowerError::InvariantViolation(format!(
					"probe `{probe_name}`: variable `{}` depends on `{base}`, which is not yet defined",
					var.name()
				)));
			}
		}
		defined.insert(var.name());
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_zero_tracepoints() {
		let deployment = LogicalDeployment { binary_path: "a.out".into(), tracepoints: vec![] };
		struct NeverOpen;
		impl DwarfReaderFactory for NeverOpen {
			fn open(&self, _: &str) -> Result<Box<dyn DwarfReader>, crate::dwarf::DwarfError> {
				panic!("should not be called when tracepoint count is wrong")
			}
		}
		let err = lower(&deployment, &NeverOpen).unwrap_err();
		assert!(matches!(err, LowerError::InvalidArgument(_)));
	}

	#[test]
	fn topological_order_rejects_forward_reference() {
		let vars = vec![Variable::Memory { name: "b".into(), base: "a".into(), offset: 0, ty: ScalarType::Int }];
		let err = check_topological_order("p", &vars).unwrap_err();
		assert!(matches!(err, LowerError::InvariantViolation(_)));
	}

	#[test]
	fn topological_order_accepts_forward_defined_chain() {
		let vars = vec![
			Variable::Register { name: "sp_".into(), register: crate::ir::RegisterKind::StackPointer, ty: ScalarType::VoidPointer },
			Variable::Memory { name: "a".into(), base: "sp_".into(), offset: 0, ty: ScalarType::Int },
		];
		check_topological_order("p", &vars).unwrap();
	}
}
