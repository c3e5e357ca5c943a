//! Node factory.
//!
//! Builds well-shaped trees in code, following the child-order contract the
//! external parser uses. Used by tests, benchmarks and embedders that
//! synthesize programs without going through the parser.

use crate::node::{Node, NodeKind};

pub fn program(sections: Vec<Node>) -> Node {
    Node::new(NodeKind::Program).children(sections)
}

pub fn globals(decls: Vec<Node>) -> Node {
    Node::new(NodeKind::GlobalsBlock).children(decls)
}

pub fn global_decl(name: &str, ty: Node, init: Option<Node>) -> Node {
    Node::with_value(NodeKind::GlobalDecl, name)
        .child(ty)
        .children(init)
}

pub fn local_decl(name: &str, ty: Node, init: Option<Node>) -> Node {
    Node::with_value(NodeKind::LocalDecl, name)
        .child(ty)
        .children(init)
}

pub fn ty(name: &str) -> Node {
    Node::with_value(NodeKind::Type, name)
}

pub fn array_ty(element: &str, dimensions: &[u32]) -> Node {
    Node::with_value(NodeKind::Type, element)
        .children(dimensions.iter().map(|d| int(i64::from(*d))))
}

pub fn functions(fns: Vec<Node>) -> Node {
    Node::new(NodeKind::FunctionsBlock).children(fns)
}

pub fn function(name: &str, return_type: Node, params: Vec<Node>, body: Node) -> Node {
    Node::with_value(NodeKind::Function, name)
        .child(return_type)
        .child(Node::new(NodeKind::Params).children(params))
        .child(body)
}

pub fn param(name: &str, ty: Node) -> Node {
    Node::with_value(NodeKind::Param, name).child(ty)
}

pub fn main(body: Node) -> Node {
    Node::new(NodeKind::Main).child(body)
}

pub fn block(statements: Vec<Node>) -> Node {
    Node::new(NodeKind::Block).children(statements)
}

pub fn statement_list(statements: Vec<Node>) -> Node {
    Node::new(NodeKind::StatementList).children(statements)
}

pub fn assign(name: &str, value: Node) -> Node {
    Node::with_value(NodeKind::Assignment, name).child(value)
}

pub fn array_assign(name: &str, index: Node, value: Node) -> Node {
    Node::with_value(NodeKind::ArrayAssignment, name)
        .child(index)
        .child(value)
}

pub fn binary(op: &str, left: Node, right: Node) -> Node {
    Node::with_value(NodeKind::Operation, op).child(left).child(right)
}

pub fn unary(op: &str, operand: Node) -> Node {
    Node::with_value(NodeKind::Operation, op).child(operand)
}

pub fn int(value: i64) -> Node {
    Node::with_value(NodeKind::IntLiteral, value.to_string())
}

pub fn float(text: &str) -> Node {
    Node::with_value(NodeKind::FloatLiteral, text)
}

pub fn boolean(value: bool) -> Node {
    Node::with_value(NodeKind::BoolLiteral, value.to_string())
}

pub fn char_lit(value: char) -> Node {
    Node::with_value(NodeKind::CharLiteral, value.to_string())
}

pub fn string_lit(text: &str) -> Node {
    Node::with_value(NodeKind::StringLiteral, text)
}

pub fn ident(name: &str) -> Node {
    Node::with_value(NodeKind::Identifier, name)
}

pub fn call(name: &str, args: Vec<Node>) -> Node {
    Node::with_value(NodeKind::Call, name).children(args)
}

pub fn index(name: &str, idx: Node) -> Node {
    Node::with_value(NodeKind::ArrayAccess, name).child(idx)
}

/// A switch over guarded cases, with an optional fallback body.
pub fn switch(cases: Vec<Node>, otherwise: Option<Node>) -> Node {
    Node::new(NodeKind::Switch)
        .child(Node::new(NodeKind::Cases).children(cases))
        .children(otherwise.map(|body| Node::new(NodeKind::Else).child(body)))
}

pub fn case(guard: Node, body: Node) -> Node {
    Node::new(NodeKind::Case).child(guard).child(body)
}

pub fn indefinite_loop(body: Vec<Node>) -> Node {
    Node::new(NodeKind::IndefiniteLoop).children(body)
}

pub fn exit_when(condition: Node) -> Node {
    Node::new(NodeKind::Exit).child(condition)
}

pub fn counting_loop(init: Node, condition: Node, increment: Node, body: Node) -> Node {
    Node::new(NodeKind::CountingLoop)
        .child(init)
        .child(condition)
        .child(increment)
        .child(body)
}

pub fn ret(value: Option<Node>) -> Node {
    Node::new(NodeKind::Return).children(value)
}

pub fn brk() -> Node {
    Node::new(NodeKind::Break)
}
