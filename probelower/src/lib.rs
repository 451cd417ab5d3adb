//! Lowers a logical kernel-probe tracing deployment into a physical probe
//! program: every variable gets an explicit memory-access recipe, and
//! every map/output gets a concrete, scalar-typed struct schema.
//!
//! The crate never touches DWARF itself. Callers supply a
//! [`dwarf::DwarfReaderFactory`] (backed by, say, `gimli` or a debugger's
//! own symbol index) and get back a [`program::PhysicalProgram`] ready for
//! a downstream code generator.
//!
//! ```ignore
//! let program = probelower::lower(&deployment, &my_dwarf_factory)?;
//! ```

pub mod bind;
pub mod dwarf;
pub mod error;
pub mod ir;
pub mod language;
pub mod lower;
pub mod maps;
pub mod output;
pub mod program;
pub mod scalar;
pub mod special;
pub mod symtab;

pub use dwarf::{DwarfError, DwarfReader, DwarfReaderFactory};
pub use error::LowerError;
pub use ir::{
	BinOp, BuiltinKind, ConstantValue, Map, MapDeleteAction, MapStashAction, Output, OutputAction, PhysicalProbe, PrintDirective, RegisterKind, Struct,
	StructField, Tracepoint, TracepointKind, Variable,
};
pub use language::Language;
pub use program::{
	lower, LogicalConstant, LogicalDeployment, LogicalExpr, LogicalMapDelete, LogicalMapRead, LogicalMapStash, LogicalOutputAction, LogicalOutputDecl,
	LogicalProbe, LogicalProgram, PhysicalProgram,
};
pub use scalar::{map_type, ScalarType};
