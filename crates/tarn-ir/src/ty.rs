//! The type model.
//! 类型模型。
//!
//! Pure data: variables, concrete types, and traits. All behavior lives in
//! the unifier.

use std::collections::BTreeSet;
use std::fmt;

pub const VOID: &str = "Void";
pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const STRING: &str = "String";
pub const BOOL: &str = "Bool";

/// Identity of a type variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// A trait, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Trait(pub String);

impl Trait {
    pub fn new(name: impl Into<String>) -> Self {
        Trait(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbolic identity of a type constructor. Two concrete types can only
/// unify when their constructors are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TyCon {
    /// Primitives and user structs/enums.
    Named(String),
    /// Tuple of the given arity.
    Tuple(usize),
    /// Function of the given arity; parameter 0 is the return type.
    Func(usize),
    Array,
    /// Stand-in for a type parameter while its function body is checked.
    /// Only unifies with itself.
    Tracer(u32, String),
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TyCon::Named(name) => f.write_str(name),
            TyCon::Tuple(n) => write!(f, "Tuple({n})"),
            TyCon::Func(n) => write!(f, "Func({n})"),
            TyCon::Array => f.write_str("Array"),
            TyCon::Tracer(_, name) => f.write_str(name),
        }
    }
}

/// An unresolved type with the traits it must satisfy once bound.
#[derive(Debug, Clone, PartialEq)]
pub struct TyVar {
    pub id: VarId,
    pub name: String,
    pub traits: BTreeSet<Trait>,
}

/// An implicit trait-obligation parameter of a function type: the caller
/// must supply evidence that `ty` implements `bound`.
#[derive(Debug, Clone, PartialEq)]
pub struct Obligation {
    pub ty: Type,
    pub bound: Trait,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Concrete {
    pub con: TyCon,
    pub params: Vec<Type>,
    /// Only populated for function types.
    pub obligations: Vec<Obligation>,
    /// Only meaningful for arrays.
    pub array_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Var(TyVar),
    Con(Concrete),
}

impl Type {
    pub fn variable(id: VarId, name: impl Into<String>, traits: BTreeSet<Trait>) -> Type {
        Type::Var(TyVar {
            id,
            name: name.into(),
            traits,
        })
    }

    pub fn concrete(con: TyCon, params: Vec<Type>) -> Type {
        Type::Con(Concrete {
            con,
            params,
            obligations: Vec::new(),
            array_size: 0,
        })
    }

    pub fn named(name: &str, params: Vec<Type>) -> Type {
        Type::concrete(TyCon::Named(name.to_string()), params)
    }

    pub fn void() -> Type {
        Type::named(VOID, vec![])
    }

    pub fn int() -> Type {
        Type::named(INT, vec![])
    }

    pub fn float() -> Type {
        Type::named(FLOAT, vec![])
    }

    pub fn string() -> Type {
        Type::named(STRING, vec![])
    }

    pub fn bool() -> Type {
        Type::named(BOOL, vec![])
    }

    pub fn tuple(elems: Vec<Type>) -> Type {
        Type::concrete(TyCon::Tuple(elems.len()), elems)
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Type {
        Type::func_with(Vec::new(), params, ret)
    }

    pub fn func_with(obligations: Vec<Obligation>, params: Vec<Type>, ret: Type) -> Type {
        let arity = params.len();
        let mut all = Vec::with_capacity(arity + 1);
        all.push(ret);
        all.extend(params);
        Type::Con(Concrete {
            con: TyCon::Func(arity),
            params: all,
            obligations,
            array_size: 0,
        })
    }

    pub fn array(elem: Type, size: usize) -> Type {
        Type::Con(Concrete {
            con: TyCon::Array,
            params: vec![elem],
            obligations: Vec::new(),
            array_size: size,
        })
    }

    pub fn tracer(id: u32, name: &str) -> Type {
        Type::concrete(TyCon::Tracer(id, name.to_string()), vec![])
    }

    pub fn as_var(&self) -> Option<&TyVar> {
        match self {
            Type::Var(v) => Some(v),
            Type::Con(_) => None,
        }
    }

    pub fn as_con(&self) -> Option<&Concrete> {
        match self {
            Type::Con(c) => Some(c),
            Type::Var(_) => None,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, Type::Con(Concrete { con: TyCon::Named(n), .. }) if n == name)
    }

    pub fn is_void(&self) -> bool {
        self.is_named(VOID)
    }

    /// Split a function type into `(obligations, params, return)`.
    pub fn as_func(&self) -> Option<(&[Obligation], &[Type], &Type)> {
        match self {
            Type::Con(Concrete {
                con: TyCon::Func(_),
                params,
                obligations,
                ..
            }) => Some((obligations, &params[1..], &params[0])),
            _ => None,
        }
    }

    /// Whether any variable remains anywhere inside this type.
    pub fn has_vars(&self) -> bool {
        match self {
            Type::Var(_) => true,
            Type::Con(c) => {
                c.params.iter().any(Type::has_vars)
                    || c.obligations.iter().any(|o| o.ty.has_vars())
            }
        }
    }

    /// Whether the variable `id` occurs inside this type.
    pub fn mentions(&self, id: VarId) -> bool {
        match self {
            Type::Var(v) => v.id == id,
            Type::Con(c) => {
                c.params.iter().any(|p| p.mentions(id))
                    || c.obligations.iter().any(|o| o.ty.mentions(id))
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Type]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Var(v) => write!(f, "?{}{}", v.name, v.id.0),
            Type::Con(c) => match &c.con {
                TyCon::Named(name) => {
                    f.write_str(name)?;
                    if !c.params.is_empty() {
                        f.write_str("<")?;
                        write_list(f, &c.params)?;
                        f.write_str(">")?;
                    }
                    Ok(())
                }
                TyCon::Tuple(_) => {
                    f.write_str("(")?;
                    write_list(f, &c.params)?;
                    f.write_str(")")
                }
                TyCon::Func(_) => {
                    f.write_str("Func(")?;
                    write_list(f, &c.params[1..])?;
                    write!(f, "): {}", c.params[0])
                }
                TyCon::Array => write!(f, "[{}; {}]", c.params[0], c.array_size),
                TyCon::Tracer(_, name) => f.write_str(name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_types() {
        assert_eq!(Type::int().to_string(), "Int");
        assert_eq!(Type::tuple(vec![Type::int(), Type::string()]).to_string(), "(Int, String)");
        assert_eq!(
            Type::func(vec![Type::int(), Type::float()], Type::bool()).to_string(),
            "Func(Int, Float): Bool"
        );
        assert_eq!(Type::array(Type::int(), 3).to_string(), "[Int; 3]");
        assert_eq!(Type::named("Cell", vec![Type::int()]).to_string(), "Cell<Int>");
    }

    #[test]
    fn test_func_layout_puts_return_first() {
        let f = Type::func(vec![Type::int()], Type::string());
        let (obligations, params, ret) = f.as_func().unwrap();
        assert!(obligations.is_empty());
        assert_eq!(params, &[Type::int()]);
        assert_eq!(ret, &Type::string());
        assert_eq!(f.as_con().unwrap().con, TyCon::Func(1));
    }

    #[test]
    fn test_mentions() {
        let v = Type::variable(VarId(7), "T", BTreeSet::new());
        let t = Type::array(Type::tuple(vec![v.clone(), Type::int()]), 2);
        assert!(t.mentions(VarId(7)));
        assert!(!t.mentions(VarId(8)));
        assert!(t.has_vars());
        assert!(!Type::int().has_vars());
    }
}
