//! Type checking for Tarn.
//! Tarn 类型检查。
//!
//! This crate checks a Tarn syntax tree and lowers it to the typed IR the
//! bytecode compiler consumes.
//! 本 crate 检查 Tarn 语法树，并将其降级为字节码编译器使用的带类型 IR。
//!
//! ## Features 功能
//!
//! - Unification with trait-bounded type variables / 带特征约束的类型变量统一
//! - Generic functions checked once against tracer types / 使用追踪类型一次性检查泛型函数
//! - Dictionary passing for trait obligations / 以字典传递满足特征约束
//! - Upvalue capture for nested functions and closures / 嵌套函数与闭包的上值捕获
//! - Structs, enums, and exhaustive matching / 结构体、枚举与穷尽匹配

mod builtins;
mod check;
pub mod errors;
mod func;
mod impls;
mod infer;
mod obj;
mod scope;
mod traits;
mod unify;


pub use builtins::{DEBUG, EQ, NUM, SHOW};
pub use check::{CheckOptions, TypeChecker};
pub use errors::{Result, TypeError, TypeErrorKind};
pub use infer::InferContext;
pub use obj::{AdtInfo, AdtKind, AdtTable, FieldInfo, FieldMap, TagInfo};
pub use scope::{Scope, Upvalue, ValueBinding, ValueKind};
pub use traits::{Evidence, TraitInfo, TraitRegistry};
pub use unify::{Substitution, Unifier, substitute};

use tarn_syntax::Program;

/// Type check a program with the default options.
/// 使用默认选项对程序进行类型检查。
///
/// Stops at the first error.
pub fn check(program: &Program) -> Result<tarn_ir::Program> {
    TypeChecker::new().check(program)
}

/// Type check a program with custom options.
pub fn check_with(program: &Program, options: CheckOptions) -> Result<tarn_ir::Program> {
    TypeChecker::with_options(options).check(program)
}
