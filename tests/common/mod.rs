//! Shared helpers for the integration tests.

#![allow(dead_code)]

use tarn_ir as ir;
use tarn_syntax::Stmt;
use tarn_syntax::build::program;
use tarn_typeck::TypeErrorKind;

pub fn check_ok(stmts: Vec<Stmt>) -> ir::Program {
    match tarn_typeck::check(&program(stmts)) {
        Ok(checked) => checked,
        Err(err) => panic!("unexpected type error: {err}"),
    }
}

pub fn check_err(stmts: Vec<Stmt>) -> TypeErrorKind {
    match tarn_typeck::check(&program(stmts)) {
        Ok(_) => panic!("expected a type error but checking succeeded"),
        Err(err) => err.kind,
    }
}

/// The binding and value of the last top-level `let`.
pub fn last_let(checked: &ir::Program) -> (ir::BindingId, &ir::Expr) {
    checked
        .stmts
        .iter()
        .rev()
        .find_map(|s| match s {
            ir::Stmt::Let { binding, value } => Some((*binding, value)),
            _ => None,
        })
        .expect("program has no let")
}

pub fn last_type(checked: &ir::Program) -> ir::Type {
    last_let(checked).1.ty.clone()
}

pub fn let_binding(checked: &ir::Program, index: usize) -> ir::BindingId {
    match &checked.stmts[index] {
        ir::Stmt::Let { binding, .. } => *binding,
        other => panic!("statement {index} is not a let: {other:?}"),
    }
}

pub fn func_named<'a>(checked: &'a ir::Program, name: &str) -> &'a ir::FuncExpr {
    checked
        .functions()
        .into_iter()
        .find(|f| f.name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("no function named `{name}`"))
}

/// Closures in walk order.
pub fn closures(checked: &ir::Program) -> Vec<&ir::FuncExpr> {
    checked.functions().into_iter().filter(|f| f.name.is_none()).collect()
}
