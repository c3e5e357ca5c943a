//! Type and identifier definitions shared by the analyzer and the generator.
//!
//! The language has a deliberately small nominal type set: five scalar types,
//! `void` for procedures, and one level of array-of-T.

use std::fmt;

/// A nominal type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Bool,
    Char,
    String,
    Void,
    /// Array of a scalar element type.
    Array(Box<Type>),
    /// The type of an expression that already produced a diagnostic.
    /// Compatible with everything so one fault yields one report.
    Unknown,
}

impl Type {
    /// Parse a type name such as `int`, `float` or `char[]`.
    pub fn parse(name: &str) -> Option<Type> {
        let name = name.trim();
        if let Some(base) = name.strip_suffix("[]") {
            return match Type::parse(base)? {
                Type::Array(_) | Type::Void | Type::Unknown => None,
                element => Some(Type::array_of(element)),
            };
        }
        match name {
            "int" => Some(Type::Int),
            "float" => Some(Type::Float),
            "bool" => Some(Type::Bool),
            "char" => Some(Type::Char),
            "string" => Some(Type::String),
            "void" => Some(Type::Void),
            _ => None,
        }
    }

    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// The element type of an array, `None` for scalars.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Array(element) => write!(f, "{}[]", element),
            Type::Unknown => write!(f, "unknown"),
        }
    }
}

/// Largest array, in words, whose byte size still fits a signed 32-bit
/// frame offset.
pub const MAX_ARRAY_WORDS: u32 = i32::MAX as u32 / 4;

/// Words occupied by an array with these dimensions. An array declared
/// without dimensions occupies a single word.
pub fn array_words(dimensions: &[u32]) -> Option<u32> {
    dimensions
        .iter()
        .try_fold(1u32, |words, &d| words.checked_mul(d))
        .filter(|&words| words <= MAX_ARRAY_WORDS)
        .map(|words| words.max(1))
}

/// A resolved `Type` node: the declared type plus any array dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub ty: Type,
    pub dimensions: Vec<u32>,
}

impl TypeSpec {
    pub fn scalar(ty: Type) -> Self {
        Self { ty, dimensions: Vec::new() }
    }

    /// Number of 4-byte words the declaration occupies, or `None` when an
    /// array exceeds [`MAX_ARRAY_WORDS`].
    pub fn word_count(&self) -> Option<u32> {
        if self.ty.is_array() {
            array_words(&self.dimensions)
        } else {
            Some(1)
        }
    }

    /// Dimensions rendered the way the symbol table records them (`10x20`).
    pub fn dimensions_text(&self) -> String {
        self.dimensions
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("x")
    }
}

bitflags::bitflags! {
    /// Attributes recorded on a symbol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SymbolFlags: u8 {
        const NONE        = 0;
        const INITIALIZED = 1 << 0;
        const ARRAY       = 1 << 1;
        const CONSTANT    = 1 << 2;
    }
}

/// Symbol ID for referencing symbols by their declaration order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const INVALID: SymbolId = SymbolId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Scope ID for referencing scopes in the table of record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(Type::parse("int"), Some(Type::Int));
        assert_eq!(Type::parse("float"), Some(Type::Float));
        assert_eq!(Type::parse("bool"), Some(Type::Bool));
        assert_eq!(Type::parse("char"), Some(Type::Char));
        assert_eq!(Type::parse("string"), Some(Type::String));
        assert_eq!(Type::parse("void"), Some(Type::Void));
        assert_eq!(Type::parse("double"), None);
    }

    #[test]
    fn test_parse_one_level_of_array() {
        assert_eq!(Type::parse("int[]"), Some(Type::array_of(Type::Int)));
        assert_eq!(Type::parse("int[][]"), None);
        assert_eq!(Type::parse("void[]"), None);
    }

    #[test]
    fn test_display_round_trips_names() {
        for name in ["int", "float", "bool", "char", "string", "void", "char[]"] {
            assert_eq!(Type::parse(name).map(|t| t.to_string()).as_deref(), Some(name));
        }
    }

    #[test]
    fn test_word_count() {
        let spec = TypeSpec { ty: Type::array_of(Type::Int), dimensions: vec![10, 20] };
        assert_eq!(spec.word_count(), Some(200));
        assert_eq!(spec.dimensions_text(), "10x20");
        assert_eq!(TypeSpec::scalar(Type::Float).word_count(), Some(1));
        let open = TypeSpec { ty: Type::array_of(Type::Char), dimensions: vec![] };
        assert_eq!(open.word_count(), Some(1));
    }

    #[test]
    fn test_oversized_arrays_have_no_word_count() {
        assert_eq!(array_words(&[70000, 70000]), None);
        assert_eq!(array_words(&[u32::MAX, 2]), None);
        assert_eq!(array_words(&[MAX_ARRAY_WORDS]), Some(MAX_ARRAY_WORDS));
        assert_eq!(array_words(&[MAX_ARRAY_WORDS, 2]), None);
        let spec = TypeSpec { ty: Type::array_of(Type::Int), dimensions: vec![1 << 16, 1 << 16] };
        assert_eq!(spec.word_count(), None);
        // Scalars ignore stray dimensions.
        let scalar = TypeSpec { ty: Type::Int, dimensions: vec![u32::MAX, u32::MAX] };
        assert_eq!(scalar.word_count(), Some(1));
    }
}
