//! Special-Variable Injector (C4).
//!
//! Emitted unconditionally at the head of every probe, before anything
//! from the logical probe's own expressions runs. The exact names below
//! are part of the crate's external interface — `time_` in particular is
//! relied on by the downstream query engine as the time column and must
//! never be renamed.

use crate::ir::{BuiltinKind, RegisterKind, Tracepoint, TracepointKind, Variable};
use crate::language::Language;
use crate::scalar::ScalarType;
use crate::symtab::SymbolTable;

pub const SP: &str = "sp_";
pub const TGID: &str = "tgid_";
pub const TGID_PID: &str = "tgid_pid_";
pub const TGID_START_TIME: &str = "tgid_start_time_";
pub const TIME: &str = "time_";
pub const GOID: &str = "goid_";
pub const RC: &str = "rc_";

/// The fixed prefix of every output record, in order. Extended with
/// `goid_` for Go. Does not include `sp_`/`rc_`, which are plumbing
/// variables rather than output columns.
pub fn implicit_columns(language: Language) -> Vec<String> {
	let mut cols = vec![TGID.to_string(), TGID_START_TIME.to_string(), TIME.to_string()];
	if language == Language::Go {
		cols.push(GOID.to_string());
	}
	cols
}

/// Emits the special variables for one probe and registers them in
/// `symtab`. Returns the emitted variables in the order they must appear
/// in the probe's variable list.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(symtab)))]
pub fn inject(language: Language, tracepoint: &Tracepoint, symtab: &mut SymbolTable) -> Vec<Variable> {
	let mut vars = Vec::new();

	let mut emit = |vars: &mut Vec<Variable>, symtab: &mut SymbolTable, var: Variable| {
		symtab.define(var.name().to_string(), var.scalar_type().expect("special variable always has a scalar type"));
		vars.push(var);
	};

	emit(&mut vars, symtab, Variable::Register {
		name: SP.to_string(),
		register: RegisterKind::StackPointer,
		ty: ScalarType::VoidPointer,
	});
	emit(&mut vars, symtab, Variable::Builtin {
		name: TGID.to_string(),
		builtin: BuiltinKind::Tgid,
		ty: ScalarType::Int32,
	});
	emit(&mut vars, symtab, Variable::Builtin {
		name: TGID_PID.to_string(),
		builtin: BuiltinKind::TgidPid,
		ty: ScalarType::UInt64,
	});
	emit(&mut vars, symtab, Variable::Builtin {
		name: TGID_START_TIME.to_string(),
		builtin: BuiltinKind::TgidStartTime,
		ty: ScalarType::UInt64,
	});
	emit(&mut vars, symtab, Variable::Builtin {
		name: TIME.to_string(),
		builtin: BuiltinKind::Ktime,
		ty: ScalarType::UInt64,
	});

	if language == Language::Go {
		emit(&mut vars, symtab, Variable::Builtin {
			name: GOID.to_string(),
			builtin: BuiltinKind::Goid,
			ty: ScalarType::Int64,
		});
	}

	if tracepoint.kind == TracepointKind::Return && matches!(language, Language::C | Language::Cpp) {
		emit(&mut vars, symtab, Variable::Register {
			name: RC.to_string(),
			register: RegisterKind::ReturnValue,
			ty: ScalarType::VoidPointer,
		});
	}

	vars
}
