//! Integration tests for tarn-typeck: expressions, statements, and functions.

mod common;

use common::*;
use tarn_ir::{self as ir, Op, Type};
use tarn_syntax::build::*;
use tarn_syntax::{BinOp, UnaryOp};
use tarn_typeck::{CheckOptions, TypeChecker, TypeErrorKind};

fn body(e: tarn_syntax::Expr) -> tarn_syntax::Block {
    block(vec![expr_stmt(e)])
}

// ============================================================================
// Literals and operators
// ============================================================================

#[test]
fn test_typeck_literals() {
    for (value, expected) in [
        (int(42), Type::int()),
        (float(3.14), Type::float()),
        (boolean(true), Type::bool()),
        (string("hello"), Type::string()),
    ] {
        let checked = check_ok(vec![let_("x", value)]);
        assert_eq!(last_type(&checked), expected);
    }
}

#[test]
fn test_typeck_annotated_let_mismatch() {
    let err = check_err(vec![
        let_typed("x", ty("Int"), int(1)),
        let_typed("y", ty("Float"), ident("x")),
    ]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::float(),
            found: Type::int(),
        }
    );
}

#[test]
fn test_typeck_addition_lowers_to_builtin_with_dictionary() {
    let checked = check_ok(vec![let_("a", binary(BinOp::Add, int(1), int(2)))]);
    let (_, value) = last_let(&checked);
    assert_eq!(value.ty, Type::int());

    let ir::ExprKind::Builtin { op, args } = &value.kind else {
        panic!("expected a builtin, got {value:?}");
    };
    assert_eq!(*op, Op::Add);
    assert_eq!(args.len(), 3);
    assert!(matches!(
        &args[0].kind,
        ir::ExprKind::Builtin { op: Op::Dictionary { bound, ty }, .. } if bound == "Num" && ty == "Int"
    ));
}

#[test]
fn test_typeck_mixed_arithmetic_fails() {
    let err = check_err(vec![let_("a", binary(BinOp::Add, int(1), float(2.0)))]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::int(),
            found: Type::float(),
        }
    );
}

#[test]
fn test_typeck_string_addition_needs_num() {
    let err = check_err(vec![let_("a", binary(BinOp::Add, string("a"), string("b")))]);
    assert!(err.is_trait_failure(), "{err:?}");
}

#[test]
fn test_typeck_comparisons_and_logic() {
    let checked = check_ok(vec![
        let_("lt", binary(BinOp::Lt, int(1), int(2))),
        let_("eq", binary(BinOp::Eq, string("a"), string("b"))),
        let_("both", binary(BinOp::And, ident("lt"), ident("eq"))),
        let_("not", unary(UnaryOp::Not, ident("both"))),
        let_("neg", unary(UnaryOp::Neg, float(1.5))),
    ]);
    let types: Vec<_> = checked
        .stmts
        .iter()
        .map(|s| match s {
            ir::Stmt::Let { value, .. } => value.ty.clone(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        types,
        vec![Type::bool(), Type::bool(), Type::bool(), Type::bool(), Type::float()]
    );
}

#[test]
fn test_typeck_bool_ops_reject_ints() {
    let err = check_err(vec![let_("a", binary(BinOp::Or, int(1), boolean(true)))]);
    assert!(matches!(err, TypeErrorKind::TypeMismatch { .. }));
}

#[test]
fn test_typeck_print_builtins() {
    let checked = check_ok(vec![expr_stmt(call(ident("print_int"), vec![int(1)]))]);
    let ir::Stmt::Expr(e) = &checked.stmts[0] else {
        panic!("expected an expression statement");
    };
    assert!(matches!(&e.kind, ir::ExprKind::Builtin { op: Op::PrintInt, args } if args.len() == 1));
    assert!(e.ty.is_void());

    let err = check_err(vec![expr_stmt(call(ident("print_int"), vec![string("s")]))]);
    assert!(matches!(err, TypeErrorKind::TypeMismatch { .. }));
}

#[test]
fn test_typeck_show_requires_show() {
    let checked = check_ok(vec![let_("s", call(ident("show"), vec![float(1.0)]))]);
    assert_eq!(last_type(&checked), Type::string());

    let err = check_err(vec![let_("s", call(ident("show"), vec![tuple(vec![int(1)])]))]);
    assert!(err.is_trait_failure(), "{err:?}");
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_typeck_if_else_value() {
    let checked = check_ok(vec![let_(
        "v",
        if_else(boolean(true), body(int(1)), Some(body(int(2)))),
    )]);
    assert_eq!(last_type(&checked), Type::int());
}

#[test]
fn test_typeck_if_branches_disagree() {
    let err = check_err(vec![let_(
        "v",
        if_else(boolean(true), body(int(1)), Some(body(string("s")))),
    )]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::int(),
            found: Type::string(),
        }
    );
}

#[test]
fn test_typeck_if_without_else_is_void() {
    check_ok(vec![expr_stmt(if_else(
        boolean(true),
        body(call(ident("print_int"), vec![int(1)])),
        None,
    ))]);

    let err = check_err(vec![let_("v", if_else(boolean(true), body(int(1)), None))]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::int(),
            found: Type::void(),
        }
    );
}

#[test]
fn test_typeck_condition_must_be_bool() {
    let err = check_err(vec![expr_stmt(if_else(int(1), block(vec![]), None))]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::bool(),
            found: Type::int(),
        }
    );

    let err = check_err(vec![while_loop(string("s"), block(vec![]))]);
    assert!(matches!(err, TypeErrorKind::TypeMismatch { .. }));
}

#[test]
fn test_typeck_for_over_array() {
    let checked = check_ok(vec![for_loop(
        "x",
        array(vec![int(1), int(2), int(3)]),
        block(vec![expr_stmt(call(ident("print_int"), vec![ident("x")]))]),
    )]);
    assert!(matches!(&checked.stmts[0], ir::Stmt::For { .. }));

    let err = check_err(vec![for_loop("x", int(5), block(vec![]))]);
    assert_eq!(err, TypeErrorKind::NotIterable(Type::int()));
}

#[test]
fn test_typeck_return_outside_function() {
    let err = check_err(vec![ret(Some(int(1)))]);
    assert!(matches!(err, TypeErrorKind::InvalidContext(_)));
}

#[test]
fn test_typeck_do_block_value() {
    let checked = check_ok(vec![let_(
        "v",
        do_block(block(vec![let_("a", int(1)), expr_stmt(binary(BinOp::Mul, ident("a"), int(2)))])),
    )]);
    assert_eq!(last_type(&checked), Type::int());
}

// ============================================================================
// Bindings and scopes
// ============================================================================

#[test]
fn test_typeck_unknown_identifier() {
    let err = check_err(vec![let_("a", ident("b"))]);
    assert_eq!(err, TypeErrorKind::UnknownIdentifier("b".into()));
}

#[test]
fn test_typeck_shadowing_gets_fresh_bindings() {
    let checked = check_ok(vec![
        let_("x", int(1)),
        let_("x", string("s")),
        let_typed("y", ty("String"), ident("x")),
    ]);
    assert_ne!(let_binding(&checked, 0), let_binding(&checked, 1));

    let (_, value) = last_let(&checked);
    assert_eq!(value.kind, ir::ExprKind::Ident(let_binding(&checked, 1)));
}

#[test]
fn test_typeck_inner_scope_shadowing_is_popped() {
    let checked = check_ok(vec![
        let_("x", int(1)),
        let_("y", do_block(block(vec![let_("x", string("s")), expr_stmt(ident("x"))]))),
        let_typed("z", ty("Int"), ident("x")),
    ]);
    assert_eq!(last_type(&checked), Type::int());
}

#[test]
fn test_typeck_tuple_destructuring() {
    let checked = check_ok(vec![
        let_tuple(&["a", "b"], tuple(vec![int(1), string("s")])),
        let_typed("c", ty("String"), ident("b")),
    ]);
    // A hidden binding for the tuple, then one let per name.
    assert_eq!(checked.stmts.len(), 4);
    assert!(matches!(
        &checked.stmts[2],
        ir::Stmt::Let { value: ir::Expr { kind: ir::ExprKind::Field { index: 1, .. }, .. }, .. }
    ));
}

#[test]
fn test_typeck_tuple_destructuring_arity() {
    let err = check_err(vec![let_tuple(&["a", "b"], tuple(vec![int(1), int(2), int(3)]))]);
    assert_eq!(
        err,
        TypeErrorKind::ArityMismatch {
            what: "tuple elements",
            expected: 3,
            found: 2,
        }
    );

    let err = check_err(vec![let_tuple(&["a", "b"], int(1))]);
    assert!(matches!(err, TypeErrorKind::TypeMismatch { .. }));
}

#[test]
fn test_typeck_tuple_index() {
    let checked = check_ok(vec![
        let_("t", tuple(vec![int(1), string("a")])),
        let_("s", index(ident("t"), 1)),
    ]);
    assert_eq!(last_type(&checked), Type::string());

    let err = check_err(vec![
        let_("t", tuple(vec![int(1), string("a")])),
        let_("s", index(ident("t"), 2)),
    ]);
    assert_eq!(
        err,
        TypeErrorKind::IndexOutOfBounds {
            ty: Type::tuple(vec![Type::int(), Type::string()]),
            index: 2,
        }
    );
}

#[test]
fn test_typeck_arrays() {
    let checked = check_ok(vec![let_("xs", array(vec![int(1), int(2)])), let_("x", index(ident("xs"), 1))]);
    assert_eq!(last_type(&checked), Type::int());

    let err = check_err(vec![let_("xs", array(vec![int(1), string("a")]))]);
    assert!(matches!(err, TypeErrorKind::TypeMismatch { .. }));

    let err = check_err(vec![let_("xs", array(vec![int(1)])), let_("x", index(ident("xs"), 1))]);
    assert!(matches!(err, TypeErrorKind::IndexOutOfBounds { index: 1, .. }));

    let err = check_err(vec![
        let_("xs", array(vec![int(1)])),
        let_typed("ys", array_ty(ty("Int"), 2), ident("xs")),
    ]);
    assert!(matches!(err, TypeErrorKind::TypeMismatch { .. }));
}

// ============================================================================
// Functions
// ============================================================================

fn add_func() -> tarn_syntax::Stmt {
    func(
        "add",
        vec![("a", ty("Int")), ("b", ty("Int"))],
        Some(ty("Int")),
        body(binary(BinOp::Add, ident("a"), ident("b"))),
    )
    .into()
}

#[test]
fn test_typeck_simple_function() {
    let checked = check_ok(vec![add_func(), let_("r", call(ident("add"), vec![int(1), int(2)]))]);
    assert_eq!(last_type(&checked), Type::int());

    let add = func_named(&checked, "add");
    assert_eq!(add.params.len(), 2);
    assert!(add.captures.is_empty());
    assert!(matches!(add.body.stmts.last(), Some(ir::Stmt::Return(Some(_)))));
}

#[test]
fn test_typeck_call_arity() {
    let err = check_err(vec![add_func(), let_("r", call(ident("add"), vec![int(1)]))]);
    assert_eq!(
        err,
        TypeErrorKind::ArityMismatch {
            what: "arguments",
            expected: 2,
            found: 1,
        }
    );
}

#[test]
fn test_typeck_return_type_mismatch() {
    let err = check_err(vec![func("f", vec![], Some(ty("Int")), body(string("s"))).into()]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::int(),
            found: Type::string(),
        }
    );
}

#[test]
fn test_typeck_void_function() {
    let checked = check_ok(vec![
        func("log", vec![("n", ty("Int"))], None, body(call(ident("print_int"), vec![ident("n")]))).into(),
        let_("v", call(ident("log"), vec![int(1)])),
    ]);
    let (_, value) = last_let(&checked);
    assert!(value.ty.is_void());
    assert!(matches!(value.kind, ir::ExprKind::Call { has_value: false, .. }));

    let log = func_named(&checked, "log");
    assert!(matches!(
        log.body.stmts.as_slice(),
        [ir::Stmt::Expr(_), ir::Stmt::Return(None)]
    ));
}

#[test]
fn test_typeck_function_without_value_returns_void() {
    let checked = check_ok(vec![
        func("noop", vec![], None, block(vec![let_("a", int(1))])).into(),
        let_("v", call(ident("noop"), vec![])),
    ]);
    assert!(last_type(&checked).is_void());

    let err = check_err(vec![func("f", vec![], Some(ty("Int")), block(vec![let_("a", int(1))])).into()]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::int(),
            found: Type::void(),
        }
    );
}

#[test]
fn test_typeck_explicit_and_implicit_returns_agree() {
    let pick = |trailing| -> tarn_syntax::Stmt {
        func(
            "pick",
            vec![("c", ty("Bool"))],
            None,
            block(vec![
                expr_stmt(if_else(ident("c"), block(vec![ret(Some(int(1)))]), None)),
                expr_stmt(trailing),
            ]),
        )
        .into()
    };

    let checked = check_ok(vec![pick(int(2)), let_("r", call(ident("pick"), vec![boolean(true)]))]);
    assert_eq!(last_type(&checked), Type::int());

    let err = check_err(vec![pick(string("s"))]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::int(),
            found: Type::string(),
        }
    );
}

#[test]
fn test_typeck_generic_identity_instantiates_independently() {
    let checked = check_ok(vec![
        func("id", vec![("v", ty("T"))], Some(ty("T")), body(ident("v")))
            .with_generics(vec![generic("T", &[])])
            .into(),
        let_("a", call(ident("id"), vec![int(1)])),
        let_("b", call(ident("id"), vec![string("s")])),
    ]);

    let types: Vec<_> = checked.stmts[1..]
        .iter()
        .map(|s| match s {
            ir::Stmt::Let { value, .. } => value.ty.clone(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(types, vec![Type::int(), Type::string()]);
}

fn double_func() -> tarn_syntax::Stmt {
    func(
        "double",
        vec![("v", ty("T"))],
        Some(ty("T")),
        body(binary(BinOp::Add, ident("v"), ident("v"))),
    )
    .with_generics(vec![generic("T", &["Num"])])
    .into()
}

#[test]
fn test_typeck_bounded_generic_passes_dictionary() {
    let checked = check_ok(vec![double_func(), let_("d", call(ident("double"), vec![float(2.0)]))]);
    assert_eq!(last_type(&checked), Type::float());

    // The obligation parameter comes first.
    let double = func_named(&checked, "double");
    assert_eq!(double.params.len(), 2);

    let (_, value) = last_let(&checked);
    let ir::ExprKind::Call { args, has_value, .. } = &value.kind else {
        panic!("expected a call");
    };
    assert!(*has_value);
    assert_eq!(args.len(), 2);
    assert!(matches!(
        &args[0].kind,
        ir::ExprKind::Builtin { op: Op::Dictionary { bound, ty }, .. } if bound == "Num" && ty == "Float"
    ));
}

#[test]
fn test_typeck_bounded_generic_body_uses_its_parameter() {
    let checked = check_ok(vec![double_func()]);
    let double = func_named(&checked, "double");
    let dict = double.params[0];

    let Some(ir::Stmt::Return(Some(value))) = double.body.stmts.last() else {
        panic!("expected a return");
    };
    let ir::ExprKind::Builtin { op: Op::Add, args } = &value.kind else {
        panic!("expected an addition");
    };
    assert_eq!(args[0].kind, ir::ExprKind::Ident(dict));
}

#[test]
fn test_typeck_bounded_generic_rejects_unbounded_type() {
    let err = check_err(vec![double_func(), let_("d", call(ident("double"), vec![string("s")]))]);
    assert!(err.is_trait_failure(), "{err:?}");
}

#[test]
fn test_typeck_type_parameter_is_opaque_in_body() {
    let err = check_err(vec![
        func("bad", vec![("v", ty("T"))], Some(ty("Int")), body(ident("v")))
            .with_generics(vec![generic("T", &[])])
            .into(),
    ]);
    assert!(matches!(err, TypeErrorKind::TypeMismatch { expected, .. } if expected == Type::int()));

    let err = check_err(vec![
        func(
            "bad",
            vec![("v", ty("T"))],
            Some(ty("T")),
            body(binary(BinOp::Add, ident("v"), ident("v"))),
        )
        .with_generics(vec![generic("T", &[])])
        .into(),
    ]);
    assert!(err.is_trait_failure(), "{err:?}");
}

#[test]
fn test_typeck_unknown_bound() {
    let err = check_err(vec![
        func("f", vec![("v", ty("T"))], None, block(vec![]))
            .with_generics(vec![generic("T", &["Nope"])])
            .into(),
    ]);
    assert_eq!(err, TypeErrorKind::UnknownType("Nope".into()));
}

#[test]
fn test_typeck_recursive_function() {
    let fact = func(
        "fact",
        vec![("n", ty("Int"))],
        Some(ty("Int")),
        body(if_else(
            binary(BinOp::Lt, ident("n"), int(2)),
            body(int(1)),
            Some(body(binary(
                BinOp::Mul,
                ident("n"),
                call(ident("fact"), vec![binary(BinOp::Sub, ident("n"), int(1))]),
            ))),
        )),
    );
    let checked = check_ok(vec![fact.into(), let_("f", call(ident("fact"), vec![int(5)]))]);
    assert_eq!(last_type(&checked), Type::int());

    // The function reaches itself through its own binding.
    let binding = let_binding(&checked, 0);
    assert_eq!(func_named(&checked, "fact").captured(), vec![binding]);
}

#[test]
fn test_typeck_recursion_needs_return_annotation() {
    let err = check_err(vec![
        func("spin", vec![("n", ty("Int"))], None, body(call(ident("spin"), vec![ident("n")]))).into(),
    ]);
    assert!(matches!(err, TypeErrorKind::UnboundReturn(_)), "{err:?}");
}

#[test]
fn test_typeck_duplicate_parameter() {
    let err = check_err(vec![
        func("f", vec![("a", ty("Int")), ("a", ty("Int"))], None, block(vec![])).into(),
    ]);
    assert_eq!(err, TypeErrorKind::DuplicateDeclaration("a".into()));
}

#[test]
fn test_typeck_not_a_function() {
    let err = check_err(vec![let_("x", int(1)), let_("y", call(ident("x"), vec![int(2)]))]);
    assert_eq!(err, TypeErrorKind::NotAFunction(Type::int()));
}

#[test]
fn test_typeck_builtins_are_not_values() {
    let err = check_err(vec![let_("f", ident("print_int"))]);
    assert!(matches!(err, TypeErrorKind::InvalidContext(_)));
}

#[test]
fn test_typeck_function_value_can_be_passed() {
    let checked = check_ok(vec![
        add_func(),
        func(
            "apply",
            vec![
                ("f", func_ty(vec![ty("Int"), ty("Int")], ty("Int"))),
                ("v", ty("Int")),
            ],
            Some(ty("Int")),
            body(call(ident("f"), vec![ident("v"), ident("v")])),
        )
        .into(),
        let_("r", call(ident("apply"), vec![ident("add"), int(3)])),
    ]);
    assert_eq!(last_type(&checked), Type::int());
}

// ============================================================================
// Checker configuration
// ============================================================================

#[test]
fn test_typeck_without_prelude() {
    let mut checker = TypeChecker::without_prelude();
    let err = checker
        .check(&program(vec![let_("a", binary(BinOp::Add, int(1), int(2)))]))
        .unwrap_err();
    assert_eq!(err.kind, TypeErrorKind::UnknownIdentifier("+".into()));
}

#[test]
fn test_typeck_max_depth() {
    let mut nested = int(0);
    for _ in 0..20 {
        nested = binary(BinOp::Add, nested, int(1));
    }
    let prog = program(vec![let_("a", nested)]);

    assert!(tarn_typeck::check(&prog).is_ok());

    let err = tarn_typeck::check_with(&prog, CheckOptions::default().with_max_depth(10)).unwrap_err();
    assert!(matches!(err.kind, TypeErrorKind::InvalidContext(_)));
}

#[test]
fn test_typeck_checker_keeps_declarations() {
    let mut checker = TypeChecker::new();
    checker.check(&program(vec![add_func()])).unwrap();
    let checked = checker
        .check(&program(vec![let_("r", call(ident("add"), vec![int(1), int(2)]))]))
        .unwrap();
    assert_eq!(last_type(&checked), Type::int());
}
