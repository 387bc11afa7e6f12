//! Integration tests for user traits, impls, and dictionary resolution.

mod common;

use common::*;
use tarn_ir::{self as ir, Op, Type};
use tarn_syntax::build::*;
use tarn_syntax::{Block, Expr, Stmt};
use tarn_typeck::TypeErrorKind;

fn body(e: Expr) -> Block {
    block(vec![expr_stmt(e)])
}

fn point() -> Stmt {
    struct_decl("Point", vec![], vec![("x", ty("Int")), ("y", ty("Int"))])
}

fn new_point() -> Expr {
    construct("Point", vec![("x", int(1)), ("y", int(2))])
}

fn describe_trait() -> Stmt {
    trait_decl("Describe", vec![("describe", vec![ty("Self")], ty("String"))])
}

fn describe_method(ret: &str, value: Expr) -> tarn_syntax::FuncDecl {
    func("describe", vec![("p", ty("Point"))], Some(ty(ret)), body(value))
}

fn describe_impl() -> Stmt {
    impl_decl(
        "Describe",
        ty("Point"),
        vec![describe_method("String", call(ident("show"), vec![field(ident("p"), "x")]))],
    )
}

// ============================================================================
// Declaring and implementing traits
// ============================================================================

#[test]
fn test_traits_method_call_reads_dictionary() {
    let checked = check_ok(vec![
        point(),
        describe_trait(),
        describe_impl(),
        let_("s", call(ident("describe"), vec![new_point()])),
    ]);
    assert_eq!(last_type(&checked), Type::string());

    // The impl is a dictionary object holding its one method.
    let dict = let_binding(&checked, 0);
    let ir::Stmt::Let { value, .. } = &checked.stmts[0] else {
        panic!("expected the dictionary");
    };
    assert!(matches!(&value.kind, ir::ExprKind::Object { tag: None, fields } if fields.len() == 1));
    assert_eq!(value.ty, Type::named("Describe", vec![Type::named("Point", vec![])]));

    let (_, call) = last_let(&checked);
    let ir::ExprKind::Call { callee, args, .. } = &call.kind else {
        panic!("expected a call");
    };
    assert_eq!(args.len(), 1);
    let ir::ExprKind::Field { target, index: 0 } = &callee.kind else {
        panic!("expected a dictionary field, got {callee:?}");
    };
    assert_eq!(target.kind, ir::ExprKind::Ident(dict));
}

#[test]
fn test_traits_method_needs_impl() {
    let err = check_err(vec![
        point(),
        describe_trait(),
        describe_impl(),
        let_("s", call(ident("describe"), vec![int(1)])),
    ]);
    assert!(err.is_trait_failure(), "{err:?}");
}

#[test]
fn test_traits_duplicate_impl() {
    let err = check_err(vec![point(), describe_trait(), describe_impl(), describe_impl()]);
    assert_eq!(
        err,
        TypeErrorKind::DuplicateImpl {
            ty: Type::named("Point", vec![]),
            bound: ir::Trait::new("Describe"),
        }
    );
}

#[test]
fn test_traits_impl_method_errors() {
    let err = check_err(vec![point(), describe_trait(), impl_decl("Describe", ty("Point"), vec![])]);
    assert_eq!(
        err,
        TypeErrorKind::MissingMethod {
            bound: ir::Trait::new("Describe"),
            method: "describe".into(),
        }
    );

    let err = check_err(vec![
        point(),
        describe_trait(),
        impl_decl(
            "Describe",
            ty("Point"),
            vec![func("other", vec![], None, block(vec![]))],
        ),
    ]);
    assert_eq!(
        err,
        TypeErrorKind::UnknownMethod {
            bound: ir::Trait::new("Describe"),
            method: "other".into(),
        }
    );

    let err = check_err(vec![
        point(),
        describe_trait(),
        impl_decl("Describe", ty("Point"), vec![describe_method("Int", int(1))]),
    ]);
    assert_eq!(
        err,
        TypeErrorKind::TypeMismatch {
            expected: Type::string(),
            found: Type::int(),
        }
    );
}

#[test]
fn test_traits_unknown_trait() {
    let err = check_err(vec![point(), impl_decl("Nope", ty("Point"), vec![])]);
    assert_eq!(err, TypeErrorKind::UnknownType("Nope".into()));
}

#[test]
fn test_traits_duplicate_trait_method() {
    let err = check_err(vec![trait_decl(
        "Twice",
        vec![
            ("go", vec![ty("Self")], ty("Int")),
            ("go", vec![ty("Self")], ty("Int")),
        ],
    )]);
    assert_eq!(err, TypeErrorKind::DuplicateDeclaration("go".into()));
}

#[test]
fn test_traits_declarations_are_top_level_only() {
    let err = check_err(vec![
        point(),
        describe_trait(),
        func("f", vec![], None, block(vec![describe_impl()])).into(),
    ]);
    assert!(matches!(err, TypeErrorKind::InvalidContext(_)));
}

// ============================================================================
// Bounds on user traits
// ============================================================================

#[test]
fn test_traits_generic_bounded_by_user_trait() {
    let checked = check_ok(vec![
        point(),
        describe_trait(),
        describe_impl(),
        func(
            "label",
            vec![("v", ty("T"))],
            Some(ty("String")),
            body(call(ident("describe"), vec![ident("v")])),
        )
        .with_generics(vec![generic("T", &["Describe"])])
        .into(),
        let_("l", call(ident("label"), vec![new_point()])),
    ]);
    assert_eq!(last_type(&checked), Type::string());

    let dict = let_binding(&checked, 0);
    let (_, call) = last_let(&checked);
    let ir::ExprKind::Call { args, .. } = &call.kind else {
        panic!("expected a call");
    };
    assert_eq!(args.len(), 2);
    assert_eq!(args[0].kind, ir::ExprKind::Ident(dict));

    // Inside the body the method comes from the dictionary parameter.
    let label = func_named(&checked, "label");
    let Some(ir::Stmt::Return(Some(ret))) = label.body.stmts.last() else {
        panic!("expected a return");
    };
    let ir::ExprKind::Call { callee, .. } = &ret.kind else {
        panic!("expected a call");
    };
    assert!(matches!(
        &callee.kind,
        ir::ExprKind::Field { target, index: 0 } if target.kind == ir::ExprKind::Ident(label.params[0])
    ));
}

#[test]
fn test_traits_generic_bound_rejects_unimplemented_type() {
    let err = check_err(vec![
        point(),
        describe_trait(),
        func(
            "label",
            vec![("v", ty("T"))],
            Some(ty("String")),
            body(call(ident("describe"), vec![ident("v")])),
        )
        .with_generics(vec![generic("T", &["Describe"])])
        .into(),
        let_("l", call(ident("label"), vec![new_point()])),
    ]);
    assert!(err.is_trait_failure(), "{err:?}");
}

#[test]
fn test_traits_user_impl_of_builtin_trait() {
    let checked = check_ok(vec![
        point(),
        impl_decl("Show", ty("Point"), vec![]),
        let_("s", call(ident("show"), vec![new_point()])),
    ]);
    assert_eq!(last_type(&checked), Type::string());

    let dict = let_binding(&checked, 0);
    let (_, value) = last_let(&checked);
    let ir::ExprKind::Builtin { op: Op::Show, args } = &value.kind else {
        panic!("expected a builtin show");
    };
    assert_eq!(args[0].kind, ir::ExprKind::Ident(dict));
}

#[test]
fn test_traits_builtin_trait_without_impl() {
    let err = check_err(vec![point(), let_("s", call(ident("show"), vec![new_point()]))]);
    assert!(err.is_trait_failure(), "{err:?}");
}

// ============================================================================
// Impl targets
// ============================================================================

fn cell() -> Stmt {
    struct_decl("Cell", vec![generic("T", &[])], vec![("current", ty("T"))])
}

fn get_trait() -> Stmt {
    trait_decl("Get", vec![("get", vec![ty("Self")], ty("Int"))])
}

#[test]
fn test_traits_impl_for_instantiated_generic_is_rejected() {
    let err = check_err(vec![
        cell(),
        get_trait(),
        impl_decl(
            "Get",
            ty_args("Cell", vec![ty("Int")]),
            vec![func(
                "get",
                vec![("c", ty_args("Cell", vec![ty("Int")]))],
                Some(ty("Int")),
                body(field(ident("c"), "current")),
            )],
        ),
        let_typed(
            "n",
            ty("Int"),
            call(ident("get"), vec![construct("Cell", vec![("current", string("x"))])]),
        ),
    ]);
    assert!(matches!(err, TypeErrorKind::InvalidContext(_)), "{err:?}");
}

#[test]
fn test_traits_impl_for_compound_type_is_rejected() {
    let err = check_err(vec![
        get_trait(),
        impl_decl(
            "Get",
            tuple_ty(vec![ty("Int"), ty("Int")]),
            vec![func(
                "get",
                vec![("t", tuple_ty(vec![ty("Int"), ty("Int")]))],
                Some(ty("Int")),
                body(index(ident("t"), 0)),
            )],
        ),
    ]);
    assert!(matches!(err, TypeErrorKind::InvalidContext(_)), "{err:?}");
}
