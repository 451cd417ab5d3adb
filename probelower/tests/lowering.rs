//! End-to-end scenarios from the component spec's testable-properties list,
//! driven entirely through the public [`probelower::lower`] entry point
//! against a small in-memory DWARF fake.

use fxhash::FxHashMap;

use probelower::dwarf::{ArgInfo, DwarfError, DwarfKind, DwarfReader, DwarfReaderFactory, MemberInfo, RetInfo};
use probelower::ir::{BuiltinKind, Tracepoint, TracepointKind};
use probelower::program::{LogicalConstant, LogicalDeployment, LogicalExpr, LogicalMapDelete, LogicalMapRead, LogicalMapStash, LogicalOutputAction, LogicalOutputDecl, LogicalProbe, LogicalProgram};
use probelower::{Language, LowerError, ScalarType, Variable};

#[derive(Default)]
struct FakeDwarf {
	args: FxHashMap<String, FxHashMap<String, ArgInfo>>,
	rets: FxHashMap<String, RetInfo>,
	members: FxHashMap<(String, String), MemberInfo>,
}

impl DwarfReader for FakeDwarf {
	fn function_arg_info(&self, symbol: &str) -> Result<FxHashMap<String, ArgInfo>, DwarfError> {
		self.args.get(symbol).cloned().ok_or_else(|| DwarfError(format!("no such symbol {symbol}")))
	}

	fn function_ret_info(&self, symbol: &str) -> Result<RetInfo, DwarfError> {
		self.rets.get(symbol).cloned().ok_or_else(|| DwarfError(format!("no return info for {symbol}")))
	}

	fn struct_member_info(&self, type_name: &str, field_name: &str) -> Result<MemberInfo, DwarfError> {
		self.members
			.get(&(type_name.to_string(), field_name.to_string()))
			.cloned()
			.ok_or_else(|| DwarfError(format!("no such member {type_name}.{field_name}")))
	}
}

struct FakeFactory(FakeDwarf);

impl DwarfReaderFactory for FakeFactory {
	fn open(&self, _binary_path: &str) -> Result<Box<dyn DwarfReader>, DwarfError> {
		Ok(Box::new(FakeDwarf {
			args: self.0.args.clone(),
			rets: self.0.rets.clone(),
			members: self.0.members.clone(),
		}))
	}
}

fn entry(symbol: &str) -> Tracepoint {
	Tracepoint { symbol: symbol.to_string(), kind: TracepointKind::Entry }
}

fn ret(symbol: &str) -> Tracepoint {
	Tracepoint { symbol: symbol.to_string(), kind: TracepointKind::Return }
}

fn bare_probe(name: &str, tracepoint: Tracepoint) -> LogicalProbe {
	LogicalProbe {
		name: name.to_string(),
		tracepoint,
		constants: vec![],
		arg_exprs: vec![],
		ret_exprs: vec![],
		map_reads: vec![],
		latency: None,
		stash_actions: vec![],
		delete_actions: vec![],
		output_actions: vec![],
		prints: vec![],
	}
}

/// Scenario 1: Go base argument.
#[test]
fn scenario_1_go_base_argument() {
	let mut args = FxHashMap::default();
	let mut add_args = FxHashMap::default();
	add_args.insert("a".to_string(), ArgInfo { kind: DwarfKind::Base, type_name: "int".into(), offset_from_frame_base: 0 });
	add_args.insert("b".to_string(), ArgInfo { kind: DwarfKind::Base, type_name: "int".into(), offset_from_frame_base: 8 });
	args.insert("pkg.Add".to_string(), add_args);
	let factory = FakeFactory(FakeDwarf { args, ..Default::default() });

	let mut probe = bare_probe("add_entry", entry("pkg.Add"));
	probe.arg_exprs.push(LogicalExpr { id: "A".to_string(), expression: "a".to_string() });

	let deployment = LogicalDeployment {
		binary_path: "bin".to_string(),
		tracepoints: vec![LogicalProgram { language: Language::Go, maps: vec![], outputs: vec![], probes: vec![probe] }],
	};

	let program = probelower::lower(&deployment, &factory).unwrap();
	let vars = &program.probes[0].variables;
	let leaf = vars.iter().find(|v| v.name() == "A").unwrap();
	match leaf {
		Variable::Memory { base, offset, ty, .. } => {
			assert_eq!(base, "sp_");
			assert_eq!(*offset, 8);
			assert_eq!(*ty, ScalarType::Int);
		},
		_ => panic!("expected a Memory leaf"),
	}
}

/// Scenario 3: C return value.
#[test]
fn scenario_3_c_return_value() {
	let mut args = FxHashMap::default();
	args.insert("f".to_string(), FxHashMap::default());
	let mut rets = FxHashMap::default();
	rets.insert("f".to_string(), RetInfo { kind: DwarfKind::Base, type_name: "int".into() });
	let factory = FakeFactory(FakeDwarf { args, rets, ..Default::default() });

	let mut probe = bare_probe("f_return", ret("f"));
	probe.ret_exprs.push(LogicalExpr { id: "R".to_string(), expression: "$0".to_string() });

	let deployment = LogicalDeployment {
		binary_path: "bin".to_string(),
		tracepoints: vec![LogicalProgram { language: Language::C, maps: vec![], outputs: vec![], probes: vec![probe] }],
	};

	let program = probelower::lower(&deployment, &factory).unwrap();
	let leaf = program.probes[0].variables.iter().find(|v| v.name() == "R").unwrap();
	match leaf {
		Variable::Register { register, ty, .. } => {
			assert_eq!(*register, probelower::RegisterKind::ReturnValue);
			assert_eq!(*ty, ScalarType::Int);
		},
		_ => panic!("expected a Register leaf"),
	}
}

/// Scenario 4: C++ pointer return.
#[test]
fn scenario_4_cpp_pointer_return() {
	let mut args = FxHashMap::default();
	args.insert("g".to_string(), FxHashMap::default());
	let mut rets = FxHashMap::default();
	rets.insert("g".to_string(), RetInfo { kind: DwarfKind::Pointer, type_name: "S".into() });
	let mut members = FxHashMap::default();
	members.insert(("S".to_string(), "k".to_string()), MemberInfo { kind: DwarfKind::Base, type_name: "int".into(), byte_offset_within_parent: 0 });
	let factory = FakeFactory(FakeDwarf { args, rets, members });

	let mut probe = bare_probe("g_return", ret("g"));
	probe.ret_exprs.push(LogicalExpr { id: "K".to_string(), expression: "$0.k".to_string() });

	let deployment = LogicalDeployment {
		binary_path: "bin".to_string(),
		tracepoints: vec![LogicalProgram { language: Language::Cpp, maps: vec![], outputs: vec![], probes: vec![probe] }],
	};

	let program = probelower::lower(&deployment, &factory).unwrap();
	let vars = &program.probes[0].variables;
	assert!(vars.iter().any(|v| matches!(v, Variable::Memory { base, .. } if base == "rc_")));
	let leaf = vars.iter().find(|v| v.name() == "K").unwrap();
	assert_eq!(leaf.scalar_type(), Some(ScalarType::Int));
}

/// Scenarios 5 & 6 together: a stash in one probe is read (and turned into
/// a latency) by a second probe sharing the program's struct registry.
#[test]
fn scenario_5_and_6_map_stash_read_and_latency() {
	let mut args = FxHashMap::default();
	args.insert("pkg.Enter".to_string(), FxHashMap::default());
	let factory = FakeFactory(FakeDwarf { args, ..Default::default() });

	let mut stash_probe = bare_probe("enter", entry("pkg.Enter"));
	stash_probe.stash_actions.push(LogicalMapStash {
		map: "M".to_string(),
		key: BuiltinKind::TgidPid,
		source_ids: vec!["time_".to_string()],
		condition: None,
	});

	let mut read_probe = bare_probe("exit", ret("pkg.Enter"));
	read_probe.map_reads.push(LogicalMapRead {
		map: "M".to_string(),
		key: BuiltinKind::TgidPid,
		value_ids: vec!["start_ktime_ns".to_string()],
	});
	read_probe.latency = Some("lat".to_string());

	let deployment = LogicalDeployment {
		binary_path: "bin".to_string(),
		tracepoints: vec![LogicalProgram {
			language: Language::C,
			maps: vec!["M".to_string()],
			outputs: vec![],
			probes: vec![stash_probe, read_probe],
		}],
	};

	let program = probelower::lower(&deployment, &factory).unwrap();

	let map = &program.maps["M"];
	assert_eq!(map.key_type, Some(ScalarType::UInt64));
	let value_struct_name = map.value_type.as_ref().unwrap();
	let value_struct = program.structs.iter().find(|s| &s.name == value_struct_name).unwrap();
	assert_eq!(value_struct.fields.len(), 1);
	assert_eq!(value_struct.fields[0].ty, ScalarType::UInt64);

	let read_vars = &program.probes[1].variables;
	assert!(read_vars.iter().any(|v| v.name() == "M_ptr"));
	let start = read_vars.iter().find(|v| v.name() == "start_ktime_ns").unwrap();
	assert_eq!(start.scalar_type(), Some(ScalarType::UInt64));

	let lat = read_vars.iter().find(|v| v.name() == "lat").unwrap();
	match lat {
		Variable::BinaryExpr { op, lhs, rhs, ty, .. } => {
			assert_eq!(*op, probelower::BinOp::Sub);
			assert_eq!(lhs, "time_");
			assert_eq!(rhs, "start_ktime_ns");
			assert_eq!(*ty, ScalarType::Int64);
		},
		_ => panic!("expected a BinaryExpr"),
	}
	assert_eq!(program.probes[1].latency.as_deref(), Some("lat"));
}

/// P6: a deployment with zero or more than one tracepoint is rejected
/// before any DWARF I/O happens.
#[test]
fn p6_rejects_wrong_tracepoint_count() {
	let factory = FakeFactory(FakeDwarf::default());

	let empty = LogicalDeployment { binary_path: "bin".to_string(), tracepoints: vec![] };
	assert!(matches!(probelower::lower(&empty, &factory), Err(LowerError::InvalidArgument(_))));

	let program = LogicalProgram { language: Language::Go, maps: vec![], outputs: vec![], probes: vec![] };
	let doubled = LogicalDeployment { binary_path: "bin".to_string(), tracepoints: vec![program.clone(), program] };
	assert!(matches!(probelower::lower(&doubled, &factory), Err(LowerError::InvalidArgument(_))));
}

/// P3: every output struct's leading fields are exactly the implicit
/// columns, in order.
#[test]
fn p3_implicit_columns_prefix_output_struct() {
	let mut args = FxHashMap::default();
	args.insert("pkg.Emit".to_string(), FxHashMap::default());
	let factory = FakeFactory(FakeDwarf { args, ..Default::default() });

	let mut probe = bare_probe("emit", entry("pkg.Emit"));
	probe.constants.push(LogicalConstant { id: "one".to_string(), ty: ScalarType::Int32, value: probelower::ConstantValue::Int(1) });
	probe.output_actions.push(LogicalOutputAction { output: "events".to_string(), source_ids: vec!["one".to_string()] });

	let deployment = LogicalDeployment {
		binary_path: "bin".to_string(),
		tracepoints: vec![LogicalProgram {
			language: Language::Go,
			maps: vec![],
			outputs: vec![LogicalOutputDecl { name: "events".to_string(), fields: vec!["one".to_string()] }],
			probes: vec![probe],
		}],
	};

	let program = probelower::lower(&deployment, &factory).unwrap();
	let struct_name = program.outputs["events"].struct_type.clone().unwrap();
	let s = program.structs.iter().find(|s| s.name == struct_name).unwrap();
	let prefix: Vec<_> = s.fields[..4].iter().map(|f| f.name.as_str()).collect();
	assert_eq!(prefix, ["tgid_", "tgid_start_time_", "time_", "goid_"]);
	assert_eq!(s.fields[4].name, "one");
}

/// Map delete does not require the map to have a value struct yet.
#[test]
fn map_delete_only_requires_map_existence() {
	let mut args = FxHashMap::default();
	args.insert("pkg.Clear".to_string(), FxHashMap::default());
	let factory = FakeFactory(FakeDwarf { args, ..Default::default() });

	let mut probe = bare_probe("clear", entry("pkg.Clear"));
	probe.delete_actions.push(LogicalMapDelete { map: "M".to_string(), key: BuiltinKind::Tgid });

	let deployment = LogicalDeployment {
		binary_path: "bin".to_string(),
		tracepoints: vec![LogicalProgram { language: Language::Go, maps: vec!["M".to_string()], outputs: vec![], probes: vec![probe] }],
	};

	let program = probelower::lower(&deployment, &factory).unwrap();
	assert_eq!(program.probes[0].delete_actions.len(), 1);
	assert_eq!(program.probes[0].delete_actions[0].key, "tgid_");
}

/// Latency lowering checks its precondition: `start_ktime_ns` must already
/// be in the symbol table (open question (a) in the component design).
#[test]
fn latency_without_start_time_is_rejected() {
	let mut args = FxHashMap::default();
	args.insert("pkg.Enter".to_string(), FxHashMap::default());
	let factory = FakeFactory(FakeDwarf { args, ..Default::default() });

	let mut probe = bare_probe("enter", entry("pkg.Enter"));
	probe.latency = Some("lat".to_string());

	let deployment = LogicalDeployment {
		binary_path: "bin".to_string(),
		tracepoints: vec![LogicalProgram { language: Language::Go, maps: vec![], outputs: vec![], probes: vec![probe] }],
	};

	let err = probelower::lower(&deployment, &factory).unwrap_err();
	assert!(matches!(err, LowerError::UnknownVariable { .. }));
}
