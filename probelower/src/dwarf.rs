//! DWARF Adapter (C2) — a thin, narrow interface over an external DWARF
//! reader.
//!
//! This crate never parses DWARF itself; a real implementation of
//! [`DwarfReader`]/[`DwarfReaderFactory`] lives outside this crate and is
//! handed to [`crate::lower`] by the caller. Tests in `tests/` substitute
//! a deterministic in-memory fake for it.

use std::fmt::{self, Display, Formatter};

use fxhash::FxHashMap;

/// The shape of a DWARF type, as far as this crate cares.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DwarfKind {
	Base,
	Pointer,
	Struct,
	Void,
	/// Anything the adapter can report that isn't one of the above
	/// (arrays, unions, bitfields, …) — always rejected by C1.
	Other,
}

/// Layout of one function argument: its DWARF kind/type name, and its byte
/// offset from the function's frame base.
#[derive(Debug, Clone)]
pub struct ArgInfo {
	pub kind: DwarfKind,
	pub type_name: String,
	pub offset_from_frame_base: i64,
}

/// Layout of a function's return value. Return values have no frame-base
/// offset of their own — C/C++ returns live in a register, Go returns live
/// in the argument frame and are looked up via a synthesized `~rN` name.
#[derive(Debug, Clone)]
pub struct RetInfo {
	pub kind: DwarfKind,
	pub type_name: String,
}

/// Layout of one struct field, relative to the start of its parent.
#[derive(Debug, Clone)]
pub struct MemberInfo {
	pub kind: DwarfKind,
	pub type_name: String,
	pub byte_offset_within_parent: i64,
}

/// Opaque failure from the external DWARF reader. The crate never
/// inspects its contents beyond `Display`/`Error`.
#[derive(Debug)]
pub struct DwarfError(pub String);

impl Display for DwarfError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::error::Error for DwarfError {}

/// A DWARF reader already opened on one binary.
pub trait DwarfReader {
	/// Ordered, named argument layout for a function symbol.
	fn function_arg_info(&self, symbol: &str) -> Result<FxHashMap<String, ArgInfo>, DwarfError>;

	/// Return-value layout for a function symbol.
	fn function_ret_info(&self, symbol: &str) -> Result<RetInfo, DwarfError>;

	/// Field layout for `field_name` within `type_name`.
	fn struct_member_info(&self, type_name: &str, field_name: &str) -> Result<MemberInfo, DwarfError>;
}

/// Opens a [`DwarfReader`] scoped to one binary. Acquired on entry to the
/// program assembler (C9) and released when assembly completes (or on any
/// error path, since the returned `Box` is simply dropped).
pub trait DwarfReaderFactory {
	fn open(&self, binary_path: &str) -> Result<Box<dyn DwarfReader>, DwarfError>;
}
