//! Scalar type system (C1 — Type Mapper).
//!
//! [`ScalarType`] is the closed set of leaf types a traced expression can
//! resolve to. [`map_type`] implements the per-language mapping from a
//! DWARF `(kind, type name)` pair to a [`ScalarType`]; it is the only place
//! in the crate that knows what DWARF spells a primitive as.

use std::fmt::{self, Debug, Display, Formatter};

use crate::dwarf::DwarfKind;
use crate::error::LowerError;
use crate::language::Language;

/// The closed set of types a traced leaf variable, map field, or output
/// field can carry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarType {
	Bool,
	Int8,
	Int16,
	Int32,
	Int64,
	UInt8,
	UInt16,
	UInt32,
	UInt64,
	Int,
	UInt,
	Short,
	UShort,
	Long,
	ULong,
	LongLong,
	ULongLong,
	Char,
	UChar,
	Float,
	Double,
	VoidPointer,
	String,
	ByteArray,
}

impl Display for ScalarType {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Debug::fmt(self, f)
	}
}

/// Maps a DWARF `(kind, type_name)` pair, under the given source language,
/// to a [`ScalarType`].
///
/// Rules:
/// - `Pointer` always maps to [`ScalarType::VoidPointer`], regardless of
///   pointee or language.
/// - `Base` is looked up in a language-specific name table.
/// - `Struct` is only resolvable for Go's two built-in leaf shapes
///   (`string`, `[]uint8`/`[]byte`); every other struct kind fails here,
///   since structs may only appear as interior nodes of an expression.
/// - `Void`/anything else always fails.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace"))]
pub fn map_type(language: Language, kind: DwarfKind, type_name: &str) -> Result<ScalarType, LowerError> {
	match kind {
		DwarfKind::Pointer => Ok(ScalarType::VoidPointer),
		DwarfKind::Base => map_base(language, type_name),
		DwarfKind::Struct => map_struct_leaf(language, type_name),
		DwarfKind::Void | DwarfKind::Other => Err(LowerError::TypeUnsupported {
			language,
			kind,
			type_name: type_name.to_string(),
		}),
	}
}

fn map_base(language: Language, type_name: &str) -> Result<ScalarType, LowerError> {
	let mapped = match language {
		Language::Go => match type_name {
			"bool" => Some(ScalarType::Bool),
			"int" => Some(ScalarType::Int),
			"int8" => Some(ScalarType::Int8),
			"int16" => Some(ScalarType::Int16),
			"int32" => Some(ScalarType::Int32),
			"int64" => Some(ScalarType::Int64),
			"uint" => Some(ScalarType::UInt),
			"uint8" | "byte" => Some(ScalarType::UInt8),
			"uint16" => Some(ScalarType::UInt16),
			"uint32" => Some(ScalarType::UInt32),
			"uint64" => Some(ScalarType::UInt64),
			"float32" => Some(ScalarType::Float),
			"float64" => Some(ScalarType::Double),
			_ => None,
		},
		Language::C | Language::Cpp => match type_name {
			"_Bool" | "bool" => Some(ScalarType::Bool),
			"char" => Some(ScalarType::Char),
			"signed char" => Some(ScalarType::Char),
			"unsigned char" => Some(ScalarType::UChar),
			"short int" | "short" => Some(ScalarType::Short),
			"short unsigned int" | "unsigned short" => Some(ScalarType::UShort),
			"int" => Some(ScalarType::Int),
			"unsigned int" => Some(ScalarType::UInt),
			"long int" | "long" => Some(ScalarType::Long),
			"long unsigned int" | "unsigned long" => Some(ScalarType::ULong),
			"long long int" | "long long" => Some(ScalarType::LongLong),
			"long long unsigned int" | "unsigned long long" => Some(ScalarType::ULongLong),
			"float" => Some(ScalarType::Float),
			"double" => Some(ScalarType::Double),
			_ => None,
		},
	};

	mapped.ok_or_else(|| LowerError::TypeUnsupported {
		language,
		kind: DwarfKind::Base,
		type_name: type_name.to_string(),
	})
}

fn map_struct_leaf(language: Language, type_name: &str) -> Result<ScalarType, LowerError> {
	if language == Language::Go {
		match type_name {
			"string" => return Ok(ScalarType::String),
			"[]uint8" | "[]byte" => return Ok(ScalarType::ByteArray),
			_ => {}
		}
	}

	Err(LowerError::TypeUnsupported {
		language,
		kind: DwarfKind::Struct,
		type_name: type_name.to_string(),
	})
}
