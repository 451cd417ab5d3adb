use fxhash::FxHashMap;
use tracing_subscriber::EnvFilter;

use probelower::dwarf::{ArgInfo, DwarfError, DwarfKind, DwarfReader, DwarfReaderFactory, MemberInfo, RetInfo};
use probelower::ir::{BuiltinKind, Tracepoint, TracepointKind};
use probelower::program::{LogicalDeployment, LogicalExpr, LogicalMapStash, LogicalOutputAction, LogicalOutputDecl, LogicalProbe, LogicalProgram};
use probelower::Language;

/// A DWARF reader fixed to one toy Go binary: `func Work(x *S)` where
/// `type S struct { i int32; j int64 }`.
struct ToyBinary;

impl DwarfReader for ToyBinary {
	fn function_arg_info(&self, symbol: &str) -> Result<FxHashMap<String, ArgInfo>, DwarfError> {
		if symbol != "main.Work" {
			return Err(DwarfError(format!("no such function {symbol}")));
		}
		let mut args = FxHashMap::default();
		args.insert("x".to_string(), ArgInfo { kind: DwarfKind::Pointer, type_name: "main.S".to_string(), offset_from_frame_base: 0 });
		Ok(args)
	}

	fn function_ret_info(&self, symbol: &str) -> Result<RetInfo, DwarfError> {
		Err(DwarfError(format!("{symbol} has no return value traced in this demo")))
	}

	fn struct_member_info(&self, type_name: &str, field_name: &str) -> Result<MemberInfo, DwarfError> {
		match (type_name, field_name) {
			("main.S", "i") => Ok(MemberInfo { kind: DwarfKind::Base, type_name: "int32".into(), byte_offset_within_parent: 0 }),
			("main.S", "j") => Ok(MemberInfo { kind: DwarfKind::Base, type_name: "int64".into(), byte_offset_within_parent: 8 }),
			_ => Err(DwarfError(format!("no such member {type_name}.{field_name}"))),
		}
	}
}

impl DwarfReaderFactory for ToyBinary {
	fn open(&self, _binary_path: &str) -> Result<Box<dyn DwarfReader>, DwarfError> {
		Ok(Box::new(ToyBinary))
	}
}

fn toy_deployment() -> LogicalDeployment {
	let probe = LogicalProbe {
		name: "work_entry".to_string(),
		tracepoint: Tracepoint { symbol: "main.Work".to_string(), kind: TracepointKind::Entry },
		constants: vec![],
		arg_exprs: vec![LogicalExpr { id: "j_value".to_string(), expression: "x.j".to_string() }],
		ret_exprs: vec![],
		map_reads: vec![],
		latency: None,
		stash_actions: vec![LogicalMapStash {
			map: "last_seen".to_string(),
			key: BuiltinKind::Tgid,
			source_ids: vec!["j_value".to_string()],
			condition: None,
		}],
		delete_actions: vec![],
		output_actions: vec![LogicalOutputAction { output: "events".to_string(), source_ids: vec!["j_value".to_string()] }],
		prints: vec![],
	};

	let program = LogicalProgram {
		language: Language::Go,
		maps: vec!["last_seen".to_string()],
		outputs: vec![LogicalOutputDecl { name: "events".to_string(), fields: vec!["j_value".to_string()] }],
		probes: vec![probe],
	};

	LogicalDeployment { binary_path: "./toy-binary".to_string(), tracepoints: vec![program] }
}

fn main() {
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let deployment = toy_deployment();
	let program = probelower::lower(&deployment, &ToyBinary).expect("toy deployment should lower cleanly");

	println!("probes: {}", program.probes.len());
	for probe in &program.probes {
		println!("  {} ({} variables)", probe.name, probe.variables.len());
	}
	println!("structs: {}", program.structs.len());
	for s in &program.structs {
		println!("  {} ({} fields)", s.name, s.fields.len());
	}
}
