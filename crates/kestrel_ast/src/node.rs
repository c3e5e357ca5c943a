//! Syntax tree nodes.
//!
//! Each node owns its children; there are no parent links. Child order is
//! part of the contract (a declaration's first child is its type, a counting
//! loop's four children are init, condition, increment and body).

use crate::types::{Type, TypeSpec};
use kestrel_core::text::Position;
use serde::Deserialize;
use std::fmt;

/// The closed set of grammar productions the back end understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum NodeKind {
    Program,
    GlobalsBlock,
    GlobalDecl,
    FunctionsBlock,
    Function,
    Params,
    Param,
    Main,
    Block,
    StatementList,
    LocalDecl,
    Type,
    Assignment,
    ArrayAssignment,
    /// A unary or binary operator application; `value` holds the operator.
    Operation,
    IntLiteral,
    FloatLiteral,
    BoolLiteral,
    CharLiteral,
    StringLiteral,
    Identifier,
    Call,
    ArrayAccess,
    Switch,
    Cases,
    Case,
    Else,
    IndefiniteLoop,
    Exit,
    CountingLoop,
    Return,
    Break,
}

impl NodeKind {
    /// Whether a node of this kind produces a value.
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeKind::Operation
                | NodeKind::IntLiteral
                | NodeKind::FloatLiteral
                | NodeKind::BoolLiteral
                | NodeKind::CharLiteral
                | NodeKind::StringLiteral
                | NodeKind::Identifier
                | NodeKind::Call
                | NodeKind::ArrayAccess
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One grammar production instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawNode")]
pub struct Node {
    pub kind: NodeKind,
    /// Identifier name, operator symbol or literal text.
    pub value: Option<String>,
    pub children: Vec<Node>,
    pub position: Option<Position>,
}

/// The JSON shape emitted by the external parser.
#[derive(Deserialize)]
struct RawNode {
    kind: NodeKind,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    children: Vec<RawNode>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        Node {
            kind: raw.kind,
            value: raw.value,
            children: raw.children.into_iter().map(Node::from).collect(),
            position: Position::from_parts(raw.line, raw.column),
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            value: None,
            children: Vec::new(),
            position: None,
        }
    }

    pub fn with_value(kind: NodeKind, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(kind)
        }
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Stamp a source position on this node.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.position = Some(Position::new(line, column));
        self
    }

    /// The payload, or an empty string when absent.
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn nth(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// The first child of the given kind.
    pub fn find(&self, kind: NodeKind) -> Option<&Node> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Children with `StatementList` grouping nodes flattened away.
    pub fn statements(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        collect_statements(&self.children, &mut out);
        out
    }

    /// Resolve a `Type` node. Returns `None` for an unknown type name.
    /// Dimension children make the type an array even without a `[]` suffix.
    pub fn type_spec(&self) -> Option<TypeSpec> {
        debug_assert_eq!(self.kind, NodeKind::Type);
        let base = Type::parse(self.text())?;
        let dimensions: Vec<u32> = self
            .children
            .iter()
            .filter(|c| c.kind == NodeKind::IntLiteral)
            // Out-of-range dimensions saturate so the size check rejects them.
            .map(|c| c.text().parse().unwrap_or(u32::MAX))
            .collect();
        let ty = match base {
            Type::Array(element) => Type::Array(element),
            Type::Void if !dimensions.is_empty() => return None,
            scalar if !dimensions.is_empty() => Type::array_of(scalar),
            scalar => scalar,
        };
        Some(TypeSpec { ty, dimensions })
    }

    // ========================================================================
    // Shape accessors
    // ========================================================================

    /// Split a `Function` into return type, parameters and body.
    pub fn function_parts(&self) -> Option<FunctionParts<'_>> {
        let (return_type, rest) = self.children.split_first()?;
        let (body, middle) = rest.split_last()?;
        if return_type.kind != NodeKind::Type || body.kind != NodeKind::Block {
            return None;
        }
        let params = match middle {
            [] => Vec::new(),
            [params] if params.kind == NodeKind::Params => params.children.iter().collect(),
            _ => return None,
        };
        Some(FunctionParts { return_type, params, body })
    }

    /// Split a `GlobalDecl` or `LocalDecl` into its type and initializer.
    pub fn declaration_parts(&self) -> Option<(&Node, Option<&Node>)> {
        match self.children.as_slice() {
            [ty] if ty.kind == NodeKind::Type => Some((ty, None)),
            [ty, init] if ty.kind == NodeKind::Type => Some((ty, Some(init))),
            _ => None,
        }
    }

    /// Split a `Switch` into its `Cases` and optional `Else`.
    pub fn switch_parts(&self) -> Option<(&Node, Option<&Node>)> {
        match self.children.as_slice() {
            [cases] if cases.kind == NodeKind::Cases => Some((cases, None)),
            [cases, otherwise] if cases.kind == NodeKind::Cases && otherwise.kind == NodeKind::Else => {
                Some((cases, Some(otherwise)))
            }
            _ => None,
        }
    }

    /// `[init, condition, increment, body]` of a `CountingLoop`.
    pub fn counting_loop_parts(&self) -> Option<[&Node; 4]> {
        match self.children.as_slice() {
            [init, condition, increment, body] => Some([init, condition, increment, body]),
            _ => None,
        }
    }

    // ========================================================================
    // Literal decoding
    // ========================================================================

    pub fn int_value(&self) -> Option<i32> {
        self.text().trim().parse().ok()
    }

    pub fn float_value(&self) -> Option<f64> {
        self.text().trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn bool_value(&self) -> Option<bool> {
        match self.text().trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// A char literal's value. Surrounding single quotes are optional and a
    /// backslash escape (`\n`, `\t`, `\0`, `\\`, `\'`) is decoded.
    pub fn char_value(&self) -> Option<char> {
        let text = self.text();
        let inner = text
            .strip_prefix('\'')
            .and_then(|t| t.strip_suffix('\''))
            .unwrap_or(text);
        let mut chars = inner.chars();
        let value = match chars.next()? {
            '\\' => match chars.next()? {
                'n' => '\n',
                't' => '\t',
                '0' => '\0',
                '\\' => '\\',
                '\'' => '\'',
                _ => return None,
            },
            c => c,
        };
        chars.next().is_none().then_some(value)
    }

    /// A string literal's contents without surrounding double quotes.
    pub fn string_value(&self) -> &str {
        let text = self.text();
        text.strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text)
    }
}

/// The pieces of a `Function` node.
#[derive(Debug, Clone)]
pub struct FunctionParts<'a> {
    pub return_type: &'a Node,
    /// The `Param` children, in declaration order.
    pub params: Vec<&'a Node>,
    pub body: &'a Node,
}

fn collect_statements<'a>(nodes: &'a [Node], out: &mut Vec<&'a Node>) {
    for node in nodes {
        if node.kind == NodeKind::StatementList {
            collect_statements(&node.children, out);
        } else {
            out.push(node);
        }
    }
}
