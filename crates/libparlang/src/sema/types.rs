//! Type references and layout entries for the Parlang type system.
//!
//! The dialect has exactly eight primitive types, all with a natural
//! alignment equal to their size, mapped one-to-one onto the typed view
//! arrays of the flat buffer. User-defined types are referenced through
//! [`DefnLocation`] indices into the translation context's definition table.

use std::str::FromStr;

use indexmap::IndexMap;
use strum_macros::{EnumIs, EnumIter, EnumString, IntoStaticStr};

use crate::sema::context::DefnLocation;

/// The primitive types of the dialect
///
/// Sizes are 1, 2, 4 and 8 bytes; alignment always equals size. The six
/// integer widths are atomic (they may carry `atomic`/`synchronic`
/// qualifiers and participate in read-modify-write expansion); the float
/// widths are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveType {
    /// 8-bit signed integer
    Int8,
    /// 8-bit unsigned integer
    Uint8,
    /// 16-bit signed integer
    Int16,
    /// 16-bit unsigned integer
    Uint16,
    /// 32-bit signed integer (also the representation of object pointers)
    Int32,
    /// 32-bit unsigned integer
    Uint32,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
}

impl PrimitiveType {
    /// Looks a primitive up by its dialect name (`int8`, `float64`, …)
    pub fn by_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    /// The dialect name of this primitive
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Size in bytes
    pub fn size(&self) -> u32 {
        match self {
            PrimitiveType::Int8 | PrimitiveType::Uint8 => 1,
            PrimitiveType::Int16 | PrimitiveType::Uint16 => 2,
            PrimitiveType::Int32 | PrimitiveType::Uint32 | PrimitiveType::Float32 => 4,
            PrimitiveType::Float64 => 8,
        }
    }

    /// Alignment in bytes, equal to the size
    pub fn align(&self) -> u32 {
        self.size()
    }

    /// True for the integer widths, which support atomic access
    pub fn is_atomic(&self) -> bool {
        !matches!(self, PrimitiveType::Float32 | PrimitiveType::Float64)
    }

    /// The typed view array symbol the emitted code indexes for this type
    pub fn view(&self) -> &'static str {
        match self {
            PrimitiveType::Int8 => "_mem_int8",
            PrimitiveType::Uint8 => "_mem_uint8",
            PrimitiveType::Int16 => "_mem_int16",
            PrimitiveType::Uint16 => "_mem_uint16",
            PrimitiveType::Int32 => "_mem_int32",
            PrimitiveType::Uint32 => "_mem_uint32",
            PrimitiveType::Float32 => "_mem_float32",
            PrimitiveType::Float64 => "_mem_float64",
        }
    }

    /// log2 of the size: the shift applied to byte offsets when indexing the
    /// typed view
    pub fn shift(&self) -> u32 {
        match self.size() {
            1 => 0,
            2 => 1,
            4 => 2,
            _ => 3,
        }
    }
}

/// A resolved type reference: a primitive or a user definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum TypeRef {
    /// One of the eight primitives
    Primitive(PrimitiveType),
    /// A user class or struct, by location in the definition table
    Defn(DefnLocation),
}

/// One entry of a field map
///
/// `expand` is true for leaf slots (primitives and pointers) and false for
/// embedded struct aggregates; embedded structs additionally contribute
/// composite `p_x` leaf entries at biased offsets.
#[derive(Debug, Clone)]
pub struct MapEntry {
    /// Field name, composite (`p_x`) for inlined struct leaves
    pub name: String,
    /// True when this entry names a directly accessible slot
    pub expand: bool,
    /// Byte offset within the enclosing layout
    pub offset: u32,
    /// The slot's type (pointer slots record `int32`)
    pub ty: TypeRef,
}

/// Field name → layout entry, in declaration order
pub type FieldMap = IndexMap<String, MapEntry>;

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::PrimitiveType;

    #[rstest]
    #[case("int8", PrimitiveType::Int8, 1, true)]
    #[case("uint16", PrimitiveType::Uint16, 2, true)]
    #[case("int32", PrimitiveType::Int32, 4, true)]
    #[case("float32", PrimitiveType::Float32, 4, false)]
    #[case("float64", PrimitiveType::Float64, 8, false)]
    fn primitive_descriptors(#[case] name: &str, #[case] ty: PrimitiveType, #[case] size: u32, #[case] atomic: bool) {
        let parsed = PrimitiveType::by_name(name).unwrap();
        assert_eq!(parsed, ty);
        assert_eq!(parsed.size(), size);
        assert_eq!(parsed.align(), size);
        assert_eq!(parsed.is_atomic(), atomic);
        assert_eq!(parsed.name(), name);
    }

    #[test]
    fn views_follow_names() {
        for ty in PrimitiveType::iter() {
            assert_eq!(ty.view(), format!("_mem_{}", ty.name()));
            assert_eq!(1u32 << ty.shift(), ty.size());
        }
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert!(PrimitiveType::by_name("int64").is_none());
        assert!(PrimitiveType::by_name("Point").is_none());
    }
}
