//! The prelude: primitive types, built-in traits, operators, and intrinsic
//! functions.
//! 预置环境：基本类型、内建特征、运算符与内建函数。

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tarn_ir::{BOOL, FLOAT, INT, Obligation, Op, STRING, Trait, Type, VOID};

use crate::errors::TypeErrorKind;
use crate::infer::InferContext;
use crate::scope::{Scope, ValueBinding, ValueKind};
use crate::traits::{Evidence, TraitInfo, TraitRegistry};

pub const NUM: &str = "Num";
pub const EQ: &str = "Eq";
pub const SHOW: &str = "Show";
pub const DEBUG: &str = "Debug";

/// Operators whose operands share one numeric type.
const ARITHMETIC: &[(&str, Op)] = &[
    ("+", Op::Add),
    ("-", Op::Sub),
    ("*", Op::Mul),
    ("/", Op::Div),
    ("%", Op::Rem),
];

const ORDERING: &[(&str, Op)] = &[("<", Op::Lt), (">", Op::Gt), ("<=", Op::Le), (">=", Op::Ge)];

const EQUALITY: &[(&str, Op)] = &[("==", Op::Eq), ("!=", Op::Ne)];

const PRINTERS: &[(&str, &str, Op)] = &[
    ("print_int", INT, Op::PrintInt),
    ("print_float", FLOAT, Op::PrintFloat),
    ("print_string", STRING, Op::PrintString),
    ("print_bool", BOOL, Op::PrintBool),
];

/// Which built-in types implement which built-in traits.
const EVIDENCE: &[(&str, &[&str])] = &[
    (NUM, &[INT, FLOAT]),
    (EQ, &[INT, FLOAT, STRING, BOOL]),
    (SHOW, &[INT, FLOAT, STRING, BOOL]),
    (DEBUG, &[INT, FLOAT, STRING, BOOL]),
];

/// Populate the root scope and the trait registry.
pub fn install(scope: &mut Scope, traits: &mut TraitRegistry, infer: &InferContext) -> Result<(), TypeErrorKind> {
    for name in [VOID, INT, FLOAT, STRING, BOOL] {
        scope.init_type(name, Type::named(name, vec![]));
    }

    for (bound, types) in EVIDENCE {
        traits.declare(TraitInfo {
            name: Trait::new(*bound),
            self_var: infer.fresh_tyvar("Self", bounds(bound)),
            methods: IndexMap::new(),
        })?;
        for ty in *types {
            traits.provide(&Type::named(ty, vec![]), Trait::new(*bound), Evidence::intrinsic(bound, ty))?;
        }
    }

    for (symbol, op) in ARITHMETIC {
        let t = infer.fresh_var("T", bounds(NUM));
        let ty = generic_func(&t, NUM, vec![t.clone(), t.clone()], t.clone());
        define(scope, symbol, op.clone(), ty, &t);
    }
    for (symbol, op) in ORDERING {
        let t = infer.fresh_var("T", bounds(NUM));
        let ty = generic_func(&t, NUM, vec![t.clone(), t.clone()], Type::bool());
        define(scope, symbol, op.clone(), ty, &t);
    }
    for (symbol, op) in EQUALITY {
        let t = infer.fresh_var("T", bounds(EQ));
        let ty = generic_func(&t, EQ, vec![t.clone(), t.clone()], Type::bool());
        define(scope, symbol, op.clone(), ty, &t);
    }

    let t = infer.fresh_var("T", bounds(NUM));
    let ty = generic_func(&t, NUM, vec![t.clone()], t.clone());
    define(scope, "neg", Op::Neg, ty, &t);

    define_mono(scope, "!", Op::Not, Type::func(vec![Type::bool()], Type::bool()));
    for (symbol, op) in [("&&", Op::And), ("||", Op::Or)] {
        define_mono(
            scope,
            symbol,
            op,
            Type::func(vec![Type::bool(), Type::bool()], Type::bool()),
        );
    }

    for (name, ty, op) in PRINTERS {
        define_mono(
            scope,
            name,
            op.clone(),
            Type::func(vec![Type::named(ty, vec![])], Type::void()),
        );
    }

    for (name, bound, op) in [("show", SHOW, Op::Show), ("debug", DEBUG, Op::Debug)] {
        let t = infer.fresh_var("T", bounds(bound));
        let ty = generic_func(&t, bound, vec![t.clone()], Type::string());
        define(scope, name, op, ty, &t);
    }

    Ok(())
}

fn bounds(name: &str) -> BTreeSet<Trait> {
    BTreeSet::from([Trait::new(name)])
}

fn generic_func(t: &Type, bound: &str, params: Vec<Type>, ret: Type) -> Type {
    Type::func_with(
        vec![Obligation {
            ty: t.clone(),
            bound: Trait::new(bound),
        }],
        params,
        ret,
    )
}

fn define(scope: &mut Scope, name: &str, op: Op, ty: Type, generic: &Type) {
    scope.init_value(
        name,
        ValueBinding {
            kind: ValueKind::Builtin(op),
            ty,
            generics: generic.as_var().cloned().into_iter().collect(),
        },
    );
}

fn define_mono(scope: &mut Scope, name: &str, op: Op, ty: Type) {
    scope.init_value(
        name,
        ValueBinding {
            kind: ValueKind::Builtin(op),
            ty,
            generics: Vec::new(),
        },
    );
}
