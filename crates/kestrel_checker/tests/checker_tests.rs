//! Checker integration tests.
//!
//! Builds trees with the node factory, runs the analyzer and inspects the
//! diagnostics it accumulates.

use kestrel_ast::builder::*;
use kestrel_ast::Node;
use kestrel_checker::analyze;
use kestrel_diagnostics::{messages, DiagnosticCategory, DiagnosticMessage};

/// Helper: analyze and return the diagnostic codes in report order.
fn check(tree: &Node) -> Vec<u32> {
    analyze(tree).diagnostics.diagnostics().iter().map(|d| d.code).collect()
}

/// Helper: analyze a program whose only section is `main` with these statements.
fn check_main(statements: Vec<Node>) -> Vec<u32> {
    check(&program(vec![main(block(statements))]))
}

/// Helper: the message texts produced for a `main` body.
fn messages_of(statements: Vec<Node>) -> Vec<String> {
    analyze(&program(vec![main(block(statements))]))
        .diagnostics
        .into_diagnostics()
        .into_iter()
        .map(|d| d.message_text)
        .collect()
}

fn code(message: &DiagnosticMessage) -> u32 {
    message.code
}

// ============================================================================
// Valid Code (No Diagnostics Expected)
// ============================================================================

#[test]
fn test_valid_global_with_initializer() {
    let tree = program(vec![globals(vec![global_decl("x", ty("int"), Some(int(5)))])]);
    assert!(check(&tree).is_empty());
}

#[test]
fn test_int_widens_to_float() {
    let diags = check(&program(vec![
        globals(vec![global_decl("x", ty("int"), Some(int(1)))]),
        main(block(vec![local_decl("y", ty("float"), None), assign("y", ident("x"))])),
    ]));
    assert!(diags.is_empty());
}

#[test]
fn test_valid_complex_program() {
    let tree = program(vec![
        globals(vec![
            global_decl("total", ty("int"), Some(int(0))),
            global_decl("grid", array_ty("int", &[4, 4]), None),
        ]),
        functions(vec![function(
            "square",
            ty("int"),
            vec![param("n", ty("int"))],
            block(vec![ret(Some(binary("*", ident("n"), ident("n"))))]),
        )]),
        main(block(vec![
            counting_loop(
                local_decl("i", ty("int"), Some(int(0))),
                binary("<", ident("i"), int(4)),
                unary("++", ident("i")),
                block(vec![
                    array_assign("grid", ident("i"), call("square", vec![ident("i")])),
                    assign("total", binary("+", ident("total"), index("grid", ident("i")))),
                ]),
            ),
            indefinite_loop(vec![
                exit_when(binary(">=", ident("total"), int(100))),
                assign("total", binary("^", ident("total"), int(2))),
            ]),
            switch(
                vec![case(binary("==", ident("total"), int(0)), block(vec![brk()]))],
                Some(block(vec![ident("total")])),
            ),
            ret(None),
        ])),
    ]);
    assert!(check(&tree).is_empty());
}

#[test]
fn test_functions_are_hoisted() {
    let tree = program(vec![
        functions(vec![
            function("first", ty("int"), vec![], block(vec![ret(Some(call("second", vec![])))])),
            function("second", ty("int"), vec![], block(vec![ret(Some(int(2)))])),
        ]),
        main(block(vec![call("first", vec![])])),
    ]);
    assert!(check(&tree).is_empty());
}

#[test]
fn test_shadowing_in_nested_block_is_legal() {
    let diags = check_main(vec![
        local_decl("x", ty("int"), Some(int(1))),
        block(vec![local_decl("x", ty("bool"), Some(boolean(true))), assign("x", boolean(false))]),
        assign("x", int(3)),
    ]);
    assert!(diags.is_empty());
}

// ============================================================================
// Declarations and lookup
// ============================================================================

#[test]
fn test_undeclared_variable_reported_once() {
    assert_eq!(check_main(vec![ident("z")]), vec![code(&messages::UNDECLARED_VARIABLE)]);
}

#[test]
fn test_undeclared_inside_expression_does_not_cascade() {
    let diags = check_main(vec![
        local_decl("a", ty("int"), None),
        assign("a", binary("+", binary("*", ident("ghost"), int(2)), int(1))),
    ]);
    assert_eq!(diags, vec![code(&messages::UNDECLARED_VARIABLE)]);
}

#[test]
fn test_duplicate_in_same_scope() {
    let texts = messages_of(vec![local_decl("n", ty("int"), None), local_decl("n", ty("int"), None)]);
    assert_eq!(texts, vec!["'n' is already declared in scope 'main'.".to_string()]);
}

#[test]
fn test_global_and_function_share_a_namespace() {
    let tree = program(vec![
        globals(vec![global_decl("f", ty("int"), None)]),
        functions(vec![function("f", ty("void"), vec![], block(vec![]))]),
    ]);
    assert_eq!(check(&tree), vec![code(&messages::DUPLICATE_DECLARATION)]);
}

#[test]
fn test_initializer_cannot_see_its_own_variable() {
    assert_eq!(
        check_main(vec![local_decl("x", ty("int"), Some(ident("x")))]),
        vec![code(&messages::UNDECLARED_VARIABLE)]
    );
}

#[test]
fn test_block_locals_are_gone_after_block() {
    let diags = check_main(vec![block(vec![local_decl("t", ty("int"), None)]), assign("t", int(1))]);
    assert_eq!(diags, vec![code(&messages::UNDECLARED_VARIABLE)]);
}

#[test]
fn test_unknown_type_name() {
    let diags = check_main(vec![local_decl("q", ty("number"), Some(int(1))), assign("q", boolean(true))]);
    // The declaration is still recorded, typed unknown, so later uses are quiet.
    assert_eq!(diags, vec![code(&messages::UNKNOWN_TYPE)]);
}

#[test]
fn test_void_variable_is_unknown_type() {
    assert_eq!(check_main(vec![local_decl("v", ty("void"), None)]), vec![code(&messages::UNKNOWN_TYPE)]);
}

#[test]
fn test_oversized_array_is_reported_once() {
    let tree = program(vec![
        globals(vec![global_decl("g", array_ty("int", &[70000, 70000]), None)]),
        main(block(vec![array_assign("g", int(0), int(1)), index("g", int(2))])),
    ]);
    assert_eq!(check(&tree), vec![code(&messages::ARRAY_TOO_LARGE)]);

    let texts = messages_of(vec![local_decl("m", array_ty("char", &[65536, 65536]), None)]);
    assert_eq!(texts, vec!["Array dimensions '65536x65536' exceed the limit of 536870911 elements."]);
}

#[test]
fn test_largest_array_is_accepted() {
    assert!(check_main(vec![local_decl("m", array_ty("int", &[536870911]), None)]).is_empty());
}

// ============================================================================
// Assignment compatibility
// ============================================================================

#[test]
fn test_float_into_int_is_an_error() {
    let texts = messages_of(vec![local_decl("i", ty("int"), Some(float("1.5")))]);
    assert_eq!(texts, vec!["Cannot assign a value of type 'float' to 'i' of type 'int'.".to_string()]);
}

#[test]
fn test_assignment_type_error() {
    let diags = check_main(vec![local_decl("c", ty("char"), None), assign("c", string_lit("\"s\""))]);
    assert_eq!(diags, vec![code(&messages::ASSIGNMENT_TYPE_ERROR)]);
}

#[test]
fn test_array_element_assignment() {
    let ok = check_main(vec![
        local_decl("v", array_ty("float", &[3]), None),
        array_assign("v", int(0), int(7)),
    ]);
    assert!(ok.is_empty());

    let bad = check_main(vec![
        local_decl("v", array_ty("int", &[3]), None),
        array_assign("v", int(0), boolean(true)),
    ]);
    assert_eq!(bad, vec![code(&messages::ASSIGNMENT_TYPE_ERROR)]);
}

#[test]
fn test_array_index_and_target_checks() {
    let diags = check_main(vec![
        local_decl("v", array_ty("int", &[3]), None),
        local_decl("s", ty("int"), None),
        index("v", float("1.0")),
        index("s", int(0)),
    ]);
    assert_eq!(diags, vec![code(&messages::OPERATOR_TYPE_ERROR), code(&messages::OPERATOR_TYPE_ERROR)]);
}

#[test]
fn test_whole_arrays_with_same_element_are_assignable() {
    let diags = check_main(vec![
        local_decl("a", array_ty("int", &[2]), None),
        local_decl("b", array_ty("int", &[2]), None),
        assign("a", ident("b")),
    ]);
    assert!(diags.is_empty());
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_arithmetic_requires_numbers() {
    let texts = messages_of(vec![binary("+", int(1), boolean(true))]);
    assert_eq!(texts, vec!["Operator '+' cannot be applied to 'int' and 'bool'.".to_string()]);
}

#[test]
fn test_arithmetic_promotes_to_float() {
    let diags = check_main(vec![
        local_decl("f", ty("float"), Some(binary("*", int(2), float("0.5")))),
        local_decl("i", ty("int"), Some(binary("//", float("9.0"), int(2)))),
    ]);
    // The second result is promoted to float, which an int cannot hold.
    assert_eq!(diags, vec![code(&messages::ASSIGNMENT_TYPE_ERROR)]);
}

#[test]
fn test_relational_requires_identical_types() {
    assert!(check_main(vec![binary("<", int(1), int(2))]).is_empty());
    assert_eq!(
        check_main(vec![binary("<=", int(1), float("2.0"))]),
        vec![code(&messages::OPERATOR_TYPE_ERROR)]
    );
}

#[test]
fn test_equality_mismatch_is_a_warning() {
    let analysis = analyze(&program(vec![main(block(vec![binary("==", int(1), char_lit('a'))]))]));
    let diags = analysis.diagnostics.diagnostics();
    assert_eq!(diags.len(), 1);
    assert!(diags[0].is(&messages::EQUALITY_TYPE_MISMATCH));
    assert_eq!(diags[0].category, DiagnosticCategory::Warning);
    assert!(!analysis.diagnostics.has_errors());
}

#[test]
fn test_logical_requires_bools() {
    assert!(check_main(vec![binary("AND", boolean(true), unary("NOT", boolean(false)))]).is_empty());
    assert_eq!(
        check_main(vec![binary("OR", boolean(true), int(1))]),
        vec![code(&messages::OPERATOR_TYPE_ERROR)]
    );
    assert_eq!(check_main(vec![unary("NOT", int(1))]), vec![code(&messages::OPERATOR_TYPE_ERROR)]);
}

#[test]
fn test_step_requires_a_variable() {
    assert_eq!(check_main(vec![unary("++", int(1))]), vec![code(&messages::OPERATOR_TYPE_ERROR)]);
    assert!(check_main(vec![local_decl("k", ty("int"), None), unary("--", ident("k"))]).is_empty());
}

#[test]
fn test_negation_requires_a_number() {
    assert!(check_main(vec![unary("-", float("1.5"))]).is_empty());
    assert_eq!(check_main(vec![unary("-", boolean(true))]), vec![code(&messages::OPERATOR_TYPE_ERROR)]);
}

// ============================================================================
// Calls
// ============================================================================

fn with_add(statements: Vec<Node>) -> Vec<u32> {
    check(&program(vec![
        functions(vec![function(
            "add",
            ty("int"),
            vec![param("a", ty("int")), param("b", ty("float"))],
            block(vec![ret(Some(ident("a")))]),
        )]),
        main(block(statements)),
    ]))
}

#[test]
fn test_call_checks() {
    assert!(with_add(vec![call("add", vec![int(1), int(2)])]).is_empty());
    assert_eq!(with_add(vec![call("sub", vec![])]), vec![code(&messages::UNDECLARED_FUNCTION)]);
    assert_eq!(
        with_add(vec![call("add", vec![int(1)])]),
        vec![code(&messages::ARGUMENT_COUNT_MISMATCH)]
    );
    assert_eq!(
        with_add(vec![call("add", vec![float("1.0"), int(2)])]),
        vec![code(&messages::ASSIGNMENT_TYPE_ERROR)]
    );
}

#[test]
fn test_function_name_is_not_a_variable() {
    assert_eq!(with_add(vec![ident("add")]), vec![code(&messages::UNDECLARED_VARIABLE)]);
}

#[test]
fn test_call_result_type_is_return_type() {
    assert_eq!(
        with_add(vec![local_decl("flag", ty("bool"), Some(call("add", vec![int(1), int(2)])))]),
        vec![code(&messages::ASSIGNMENT_TYPE_ERROR)]
    );
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_break_outside_construct() {
    assert_eq!(check_main(vec![brk()]), vec![code(&messages::BREAK_OUTSIDE_CONSTRUCT)]);
}

#[test]
fn test_exit_outside_indefinite_loop() {
    let in_counting = counting_loop(
        local_decl("i", ty("int"), Some(int(0))),
        boolean(true),
        unary("++", ident("i")),
        block(vec![exit_when(boolean(true))]),
    );
    assert_eq!(check_main(vec![in_counting]), vec![code(&messages::EXIT_OUTSIDE_LOOP)]);
}

#[test]
fn test_exit_nested_inside_indefinite_loop() {
    let diags = check_main(vec![indefinite_loop(vec![switch(
        vec![case(boolean(true), block(vec![exit_when(boolean(true))]))],
        None,
    )])]);
    assert!(diags.is_empty());
}

#[test]
fn test_counting_loop_variable_is_scoped_to_loop() {
    let diags = check_main(vec![
        counting_loop(
            local_decl("i", ty("int"), Some(int(0))),
            binary("<", ident("i"), int(3)),
            unary("++", ident("i")),
            block(vec![]),
        ),
        ident("i"),
    ]);
    assert_eq!(diags, vec![code(&messages::UNDECLARED_VARIABLE)]);
}

#[test]
fn test_errors_in_sibling_subtrees_are_all_found() {
    let diags = check_main(vec![
        ident("a"),
        switch(vec![case(ident("b"), block(vec![ident("c")]))], Some(block(vec![ident("d")]))),
        indefinite_loop(vec![exit_when(ident("e"))]),
    ]);
    assert_eq!(diags.len(), 5);
    assert!(diags.iter().all(|c| *c == code(&messages::UNDECLARED_VARIABLE)));
}

// ============================================================================
// Malformed trees
// ============================================================================

#[test]
fn test_declaration_without_type_is_malformed() {
    let bad = Node::with_value(kestrel_ast::NodeKind::LocalDecl, "x").child(int(1));
    assert_eq!(check_main(vec![bad]), vec![code(&messages::MALFORMED_TREE)]);
}

#[test]
fn test_type_node_in_statement_position_is_malformed() {
    assert_eq!(check_main(vec![ty("int")]), vec![code(&messages::MALFORMED_TREE)]);
}

#[test]
fn test_bad_literal_is_malformed() {
    let bad = Node::with_value(kestrel_ast::NodeKind::BoolLiteral, "yes");
    assert_eq!(check_main(vec![bad]), vec![code(&messages::MALFORMED_TREE)]);
}

#[test]
fn test_case_and_else_bodies_must_be_blocks() {
    let bare_case = check_main(vec![switch(
        vec![case(boolean(true), local_decl("t", ty("int"), None))],
        None,
    )]);
    assert_eq!(bare_case, vec![code(&messages::MALFORMED_TREE)]);

    let bare_else = messages_of(vec![switch(
        vec![case(boolean(true), block(vec![]))],
        Some(local_decl("t", ty("int"), None)),
    )]);
    assert_eq!(bare_else, vec!["Malformed 'Else' node: expected a Block body."]);
}
