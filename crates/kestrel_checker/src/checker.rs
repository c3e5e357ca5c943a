//! The semantic analyzer implementation.
//!
//! A single depth-first, left-to-right walk. Every subtree is visited exactly
//! once regardless of earlier failures; an expression whose type could not be
//! determined is typed `Unknown`, which the rules accept everywhere so one
//! fault produces one diagnostic.

use crate::types::{arithmetic_result, assignable, describe_operands};
use kestrel_ast::{Node, NodeKind, Operator, OperatorClass, Type, TypeSpec, MAX_ARRAY_WORDS};
use kestrel_binder::{DeclareError, ScopeKind, Symbol, SymbolTable};
use kestrel_diagnostics::{messages, Diagnostic, DiagnosticCollection, DiagnosticMessage};

/// Name of the scope opened for the entry block.
pub const MAIN_SCOPE_NAME: &str = "main";

/// An enclosing construct that `break` or `exit` can leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
    CountingLoop,
    IndefiniteLoop,
    Switch,
}

/// The outcome of analyzing one tree.
#[derive(Debug)]
pub struct Analysis {
    pub diagnostics: DiagnosticCollection,
    /// The populated table; the generator reads its global scope.
    pub symbols: SymbolTable,
}

/// Analyze `program` with a fresh checker.
pub fn analyze(program: &Node) -> Analysis {
    let mut checker = Checker::new();
    checker.check_program(program);
    checker.into_analysis()
}

/// The semantic analyzer. One instance per compilation.
pub struct Checker {
    symbols: SymbolTable,
    diagnostics: DiagnosticCollection,
    /// Enclosing loops and switches, innermost last.
    constructs: Vec<Construct>,
    /// Numbers the anonymous scopes opened for blocks and loops.
    scope_counter: u32,
    seen_main: bool,
}

impl Checker {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            diagnostics: DiagnosticCollection::new(),
            constructs: Vec::new(),
            scope_counter: 0,
            seen_main: false,
        }
    }

    pub fn diagnostics(&self) -> &DiagnosticCollection {
        &self.diagnostics
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_analysis(self) -> Analysis {
        Analysis {
            diagnostics: self.diagnostics,
            symbols: self.symbols,
        }
    }

    fn error(&mut self, node: &Node, message: &DiagnosticMessage, args: &[&str]) {
        self.diagnostics.add(Diagnostic::at(node.position, message, args));
    }

    fn malformed(&mut self, node: &Node, detail: &str) {
        let kind = node.kind.to_string();
        self.error(node, &messages::MALFORMED_TREE, &[&kind, detail]);
    }

    fn next_scope_name(&mut self, prefix: &str) -> String {
        let name = format!("{}#{}", prefix, self.scope_counter);
        self.scope_counter += 1;
        name
    }

    // ========================================================================
    // Program structure
    // ========================================================================

    /// Check a whole `Program`. Function signatures are declared up front so
    /// bodies and `main` may call functions defined later in the tree.
    pub fn check_program(&mut self, program: &Node) {
        if program.kind != NodeKind::Program {
            self.malformed(program, "expected a Program root");
            return;
        }

        for section in &program.children {
            match section.kind {
                NodeKind::FunctionsBlock => {
                    for function in section.children.iter().filter(|f| f.kind == NodeKind::Function) {
                        self.declare_function(function);
                    }
                }
                NodeKind::Function => self.declare_function(section),
                _ => {}
            }
        }

        for section in &program.children {
            match section.kind {
                NodeKind::GlobalsBlock => {
                    for decl in &section.children {
                        if decl.kind == NodeKind::GlobalDecl {
                            self.check_declaration(decl);
                        } else {
                            self.malformed(decl, "expected GlobalDecl");
                        }
                    }
                }
                NodeKind::GlobalDecl => self.check_declaration(section),
                NodeKind::FunctionsBlock => {
                    for function in &section.children {
                        if function.kind == NodeKind::Function {
                            self.check_function(function);
                        } else {
                            self.malformed(function, "expected Function");
                        }
                    }
                }
                NodeKind::Function => self.check_function(section),
                NodeKind::Main => self.check_main(section),
                _ => self.malformed(section, "unexpected child of Program"),
            }
        }
    }

    fn declare_function(&mut self, function: &Node) {
        // Shape problems are reported when the body is checked.
        let Some(parts) = function.function_parts() else {
            return;
        };
        let return_type = self.resolve_type(parts.return_type, true).ty;
        let parameters = parts
            .params
            .iter()
            .map(|param| {
                param
                    .nth(0)
                    .filter(|t| t.kind == NodeKind::Type)
                    .and_then(Node::type_spec)
                    .filter(|spec| spec.ty != Type::Void)
                    .map_or(Type::Unknown, |spec| spec.ty)
            })
            .collect();
        let symbol = Symbol::function(function.text(), return_type, parameters).with_position(function.position);
        self.declare(function, symbol);
    }

    fn check_function(&mut self, function: &Node) {
        let Some(parts) = function.function_parts() else {
            self.malformed(function, "expected a return Type, optional Params and a Block body");
            return;
        };
        let name = function.text();
        self.symbols.enter_scope(name, ScopeKind::Parameter);
        for param in &parts.params {
            self.check_param(param);
        }
        self.check_block(parts.body, name, ScopeKind::Function);
        self.symbols.exit_scope();
    }

    fn check_param(&mut self, param: &Node) {
        let type_node = match (param.kind, param.children.as_slice()) {
            (NodeKind::Param, [ty]) if ty.kind == NodeKind::Type => ty,
            _ => {
                self.malformed(param, "expected a Param with one Type child");
                return;
            }
        };
        let spec = self.resolve_type(type_node, false);
        let symbol = Symbol::parameter(param.text(), spec).with_position(param.position);
        self.declare(param, symbol);
    }

    fn check_main(&mut self, main: &Node) {
        if self.seen_main {
            self.malformed(main, "a program has at most one Main");
        }
        self.seen_main = true;
        match main.children.as_slice() {
            [body] if body.kind == NodeKind::Block => self.check_block(body, MAIN_SCOPE_NAME, ScopeKind::Function),
            _ => self.malformed(main, "expected a single Block body"),
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Resolve a `Type` node, reporting an unknown type name or an array too
    /// large to address. `void` is only meaningful as a return type.
    fn resolve_type(&mut self, type_node: &Node, allow_void: bool) -> TypeSpec {
        match type_node.type_spec() {
            Some(spec) if spec.word_count().is_none() => {
                let (dimensions, limit) = (spec.dimensions_text(), MAX_ARRAY_WORDS.to_string());
                self.error(type_node, &messages::ARRAY_TOO_LARGE, &[&dimensions, &limit]);
                TypeSpec::scalar(Type::Unknown)
            }
            Some(spec) if allow_void || spec.ty != Type::Void => spec,
            _ => {
                self.error(type_node, &messages::UNKNOWN_TYPE, &[type_node.text()]);
                TypeSpec::scalar(Type::Unknown)
            }
        }
    }

    fn declare(&mut self, node: &Node, symbol: Symbol) {
        if let Err(DeclareError::Duplicate { name, scope, .. }) = self.symbols.declare(symbol) {
            self.error(node, &messages::DUPLICATE_DECLARATION, &[&name, &scope]);
        }
    }

    /// `GlobalDecl` and `LocalDecl`. The initializer is inferred before the
    /// name is declared, so it cannot refer to the variable itself.
    fn check_declaration(&mut self, decl: &Node) {
        let Some((type_node, init)) = decl.declaration_parts() else {
            self.malformed(decl, "expected a Type and an optional initializer");
            return;
        };
        let name = decl.text();
        if name.is_empty() {
            self.malformed(decl, "missing variable name");
            return;
        }

        let spec = self.resolve_type(type_node, false);
        if let Some(init) = init {
            let src = self.check_expression(init);
            if !assignable(&spec.ty, &src) {
                let (src, dest) = (src.to_string(), spec.ty.to_string());
                self.error(init, &messages::ASSIGNMENT_TYPE_ERROR, &[&src, name, &dest]);
            }
        }

        let symbol = Symbol::variable(name, spec)
            .initialized(init.is_some())
            .with_position(decl.position);
        self.declare(decl, symbol);
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn check_block(&mut self, block: &Node, scope_name: &str, kind: ScopeKind) {
        self.symbols.enter_scope(scope_name, kind);
        for statement in block.statements() {
            self.check_statement(statement);
        }
        self.symbols.exit_scope();
    }

    fn check_statement(&mut self, stmt: &Node) {
        match stmt.kind {
            NodeKind::LocalDecl => self.check_declaration(stmt),
            NodeKind::Assignment => self.check_assignment(stmt),
            NodeKind::ArrayAssignment => self.check_array_assignment(stmt),
            NodeKind::Block => {
                let name = self.next_scope_name("block");
                self.check_block(stmt, &name, ScopeKind::Block);
            }
            NodeKind::StatementList => {
                for s in stmt.statements() {
                    self.check_statement(s);
                }
            }
            NodeKind::Switch => self.check_switch(stmt),
            NodeKind::IndefiniteLoop => self.check_indefinite_loop(stmt),
            NodeKind::Exit => self.check_exit(stmt),
            NodeKind::CountingLoop => self.check_counting_loop(stmt),
            NodeKind::Return => match stmt.children.as_slice() {
                [] => {}
                [value] => {
                    self.check_expression(value);
                }
                _ => self.malformed(stmt, "expected at most one value"),
            },
            NodeKind::Break => {
                if self.constructs.is_empty() {
                    self.error(stmt, &messages::BREAK_OUTSIDE_CONSTRUCT, &[]);
                }
            }
            kind if kind.is_expression() => {
                self.check_expression(stmt);
            }
            _ => self.malformed(stmt, "not valid in statement position"),
        }
    }

    fn check_assignment(&mut self, stmt: &Node) {
        let [value] = stmt.children.as_slice() else {
            self.malformed(stmt, "expected exactly one value");
            return;
        };
        let src = self.check_expression(value);
        let name = stmt.text();
        let Some(dest) = self.variable_type(stmt, name) else {
            return;
        };
        if !assignable(&dest, &src) {
            let (src, dest) = (src.to_string(), dest.to_string());
            self.error(stmt, &messages::ASSIGNMENT_TYPE_ERROR, &[&src, name, &dest]);
        }
        if let Some(symbol) = self.symbols.lookup_mut(name) {
            symbol.mark_initialized();
        }
    }

    fn check_array_assignment(&mut self, stmt: &Node) {
        let [index, value] = stmt.children.as_slice() else {
            self.malformed(stmt, "expected an index and a value");
            return;
        };
        let index_type = self.check_expression(index);
        let src = self.check_expression(value);
        let element = self.check_indexing(stmt, &index_type);
        if !assignable(&element, &src) {
            let target = format!("{}[]", stmt.text());
            let (src, dest) = (src.to_string(), element.to_string());
            self.error(stmt, &messages::ASSIGNMENT_TYPE_ERROR, &[&src, &target, &dest]);
        }
    }

    fn check_switch(&mut self, stmt: &Node) {
        let Some((cases, otherwise)) = stmt.switch_parts() else {
            self.malformed(stmt, "expected Cases and an optional Else");
            return;
        };
        self.constructs.push(Construct::Switch);
        for case in &cases.children {
            match (case.kind, case.children.as_slice()) {
                (NodeKind::Case, [guard, body]) => {
                    self.check_expression(guard);
                    self.check_branch_body(case, body);
                }
                _ => self.malformed(case, "expected a Case with a guard and a body"),
            }
        }
        if let Some(otherwise) = otherwise {
            match otherwise.children.as_slice() {
                [body] => self.check_branch_body(otherwise, body),
                _ => self.malformed(otherwise, "expected a single body"),
            }
        }
        self.constructs.pop();
    }

    /// Case and Else bodies must be Blocks.
    fn check_branch_body(&mut self, branch: &Node, body: &Node) {
        if body.kind == NodeKind::Block {
            self.check_statement(body);
        } else {
            self.malformed(branch, "expected a Block body");
        }
    }

    fn check_indefinite_loop(&mut self, stmt: &Node) {
        self.constructs.push(Construct::IndefiniteLoop);
        let name = self.next_scope_name("loop");
        self.check_block(stmt, &name, ScopeKind::Block);
        self.constructs.pop();
    }

    fn check_exit(&mut self, stmt: &Node) {
        if !self.constructs.contains(&Construct::IndefiniteLoop) {
            self.error(stmt, &messages::EXIT_OUTSIDE_LOOP, &[]);
        }
        match stmt.children.as_slice() {
            [condition] => {
                self.check_expression(condition);
            }
            _ => self.malformed(stmt, "expected a single condition"),
        }
    }

    fn check_counting_loop(&mut self, stmt: &Node) {
        let Some([init, condition, increment, body]) = stmt.counting_loop_parts() else {
            self.malformed(stmt, "expected init, condition, increment and body");
            return;
        };
        let name = self.next_scope_name("for");
        self.symbols.enter_scope(&name, ScopeKind::Block);
        self.check_statement(init);
        self.check_expression(condition);
        self.check_statement(increment);
        self.constructs.push(Construct::CountingLoop);
        self.check_statement(body);
        self.constructs.pop();
        self.symbols.exit_scope();
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Infer the type of an expression, reporting problems found inside it.
    pub fn check_expression(&mut self, expr: &Node) -> Type {
        match expr.kind {
            NodeKind::IntLiteral => self.check_literal(expr, expr.int_value().is_some(), Type::Int),
            NodeKind::FloatLiteral => self.check_literal(expr, expr.float_value().is_some(), Type::Float),
            NodeKind::BoolLiteral => self.check_literal(expr, expr.bool_value().is_some(), Type::Bool),
            NodeKind::CharLiteral => self.check_literal(expr, expr.char_value().is_some(), Type::Char),
            NodeKind::StringLiteral => Type::String,
            NodeKind::Identifier => self.variable_type(expr, expr.text()).unwrap_or(Type::Unknown),
            NodeKind::Operation => self.check_operation(expr),
            NodeKind::Call => self.check_call(expr),
            NodeKind::ArrayAccess => match expr.children.as_slice() {
                [index] => {
                    let index_type = self.check_expression(index);
                    self.check_indexing(expr, &index_type)
                }
                _ => {
                    self.malformed(expr, "expected a single index");
                    Type::Unknown
                }
            },
            _ => {
                self.malformed(expr, "expected an expression");
                Type::Unknown
            }
        }
    }

    fn check_literal(&mut self, literal: &Node, valid: bool, ty: Type) -> Type {
        if valid {
            ty
        } else {
            let detail = format!("invalid literal '{}'", literal.text());
            self.malformed(literal, &detail);
            Type::Unknown
        }
    }

    /// The declared type of a variable, reporting it when undeclared.
    /// Function names are not variables.
    fn variable_type(&mut self, node: &Node, name: &str) -> Option<Type> {
        match self.symbols.lookup(name) {
            Some(symbol) if !symbol.is_function() => Some(symbol.declared_type.clone()),
            _ => {
                self.error(node, &messages::UNDECLARED_VARIABLE, &[name]);
                None
            }
        }
    }

    /// Validate `name[index]` and return the element type.
    fn check_indexing(&mut self, node: &Node, index_type: &Type) -> Type {
        if !index_type.is_unknown() && *index_type != Type::Int {
            let detail = format!("an index of type '{}'", index_type);
            self.error(node, &messages::OPERATOR_TYPE_ERROR, &["[]", &detail]);
        }
        let name = node.text();
        match self.variable_type(node, name) {
            Some(Type::Array(element)) => *element,
            Some(Type::Unknown) | None => Type::Unknown,
            Some(other) => {
                let detail = format!("'{}' of type '{}'", name, other);
                self.error(node, &messages::OPERATOR_TYPE_ERROR, &["[]", &detail]);
                Type::Unknown
            }
        }
    }

    fn check_call(&mut self, call: &Node) -> Type {
        let args: Vec<Type> = call.children.iter().map(|arg| self.check_expression(arg)).collect();
        let name = call.text();
        let (return_type, params) = match self.symbols.lookup_global(name) {
            Some(symbol) if symbol.is_function() => (symbol.declared_type.clone(), symbol.parameters.clone()),
            _ => {
                self.error(call, &messages::UNDECLARED_FUNCTION, &[name]);
                return Type::Unknown;
            }
        };

        if params.len() != args.len() {
            let (expected, received) = (params.len().to_string(), args.len().to_string());
            self.error(call, &messages::ARGUMENT_COUNT_MISMATCH, &[name, &expected, &received]);
            return return_type;
        }
        for (i, (param, arg)) in params.iter().zip(&args).enumerate() {
            if !assignable(param, arg) {
                let target = format!("argument {} of {}", i + 1, name);
                let (src, dest) = (arg.to_string(), param.to_string());
                self.error(&call.children[i], &messages::ASSIGNMENT_TYPE_ERROR, &[&src, &target, &dest]);
            }
        }
        return_type
    }

    fn check_operation(&mut self, expr: &Node) -> Type {
        let Some(op) = Operator::parse(expr.text(), expr.children.len()) else {
            for operand in &expr.children {
                self.check_expression(operand);
            }
            let detail = format!("unknown operator '{}' with {} operand(s)", expr.text(), expr.children.len());
            self.malformed(expr, &detail);
            return Type::Unknown;
        };

        if op.is_unary() {
            let operand = &expr.children[0];
            let ty = self.check_expression(operand);
            return self.check_unary(expr, op, operand, ty);
        }

        let left = self.check_expression(&expr.children[0]);
        let right = self.check_expression(&expr.children[1]);
        let known = !left.is_unknown() && !right.is_unknown();

        match op.class() {
            OperatorClass::Arithmetic => {
                if !known {
                    Type::Unknown
                } else if left.is_numeric() && right.is_numeric() {
                    arithmetic_result(&left, &right)
                } else {
                    self.operand_error(expr, op, &[&left, &right]);
                    Type::Unknown
                }
            }
            OperatorClass::Relational => {
                if known && left != right {
                    self.operand_error(expr, op, &[&left, &right]);
                }
                Type::Bool
            }
            OperatorClass::Equality => {
                if known && left != right {
                    let (l, r) = (left.to_string(), right.to_string());
                    self.error(expr, &messages::EQUALITY_TYPE_MISMATCH, &[op.symbol(), &l, &r]);
                }
                Type::Bool
            }
            OperatorClass::Logical => {
                if known && (left != Type::Bool || right != Type::Bool) {
                    self.operand_error(expr, op, &[&left, &right]);
                }
                Type::Bool
            }
            // Only produced for a single operand.
            OperatorClass::UnaryArithmetic => Type::Unknown,
        }
    }

    fn check_unary(&mut self, expr: &Node, op: Operator, operand: &Node, ty: Type) -> Type {
        if op.is_step() && operand.kind != NodeKind::Identifier {
            self.error(expr, &messages::OPERATOR_TYPE_ERROR, &[op.symbol(), "a non-variable operand"]);
            return Type::Unknown;
        }
        if ty.is_unknown() {
            return if op == Operator::Not { Type::Bool } else { Type::Unknown };
        }

        match op {
            Operator::Not => {
                if ty != Type::Bool {
                    self.operand_error(expr, op, &[&ty]);
                }
                Type::Bool
            }
            _ if ty.is_numeric() => ty,
            _ => {
                self.operand_error(expr, op, &[&ty]);
                Type::Unknown
            }
        }
    }

    fn operand_error(&mut self, expr: &Node, op: Operator, operands: &[&Type]) {
        let detail = describe_operands(operands);
        self.error(expr, &messages::OPERATOR_TYPE_ERROR, &[op.symbol(), &detail]);
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}
