//! Typing rules shared by declarations, assignments, calls and operators.

use kestrel_ast::Type;

/// Whether a value of type `src` may be stored into a location of type
/// `dest`: identical types, `int` widened to `float`, or arrays with the same
/// element type. `Unknown` on either side is accepted so an expression that
/// already failed is not reported again.
pub fn assignable(dest: &Type, src: &Type) -> bool {
    match (dest, src) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::Float, Type::Int) => true,
        (Type::Array(dest_elem), Type::Array(src_elem)) => dest_elem == src_elem,
        _ => dest == src,
    }
}

/// Result of an arithmetic operator over two numeric operands: the left
/// operand's type, promoted to `float` if either side is `float`.
pub fn arithmetic_result(left: &Type, right: &Type) -> Type {
    if *left == Type::Float || *right == Type::Float {
        Type::Float
    } else {
        left.clone()
    }
}

/// Operand types as they appear in an operator diagnostic.
pub(crate) fn describe_operands(types: &[&Type]) -> String {
    types
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(" and ")
}
