//! Structs, enums, tuples, and arrays: declaration, construction, field
//! access, and pattern matching.
//! 结构体、枚举、元组与数组。
//!
//! An ADT's field types are written against its generic variables. Every
//! use instantiates those variables fresh and unifies the instance with the
//! value at hand, so field types follow the concrete type arguments.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tarn_common::Span;
use tarn_ir::{self as ir, Primitive, TyCon, TyVar, Type, VarId};
use tarn_syntax::{self as ast, FieldRef, Name, TypeExprKind};
use tracing::debug;

use crate::check::TypeChecker;
use crate::errors::{At, Result, TypeErrorKind};
use crate::unify::{Unifier, freshen, substitute};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub ty: Type,
    pub index: usize,
}

pub type FieldMap = IndexMap<String, FieldInfo>;

#[derive(Debug, Clone, PartialEq)]
pub struct TagInfo {
    pub index: usize,
    pub fields: FieldMap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdtKind {
    /// Declared but fields not yet checked.
    Pending,
    Struct(FieldMap),
    Enum(IndexMap<String, TagInfo>),
}

#[derive(Debug, Clone)]
pub struct AdtInfo {
    pub name: String,
    pub generics: Vec<TyVar>,
    pub kind: AdtKind,
}

impl AdtInfo {
    /// The declared type, over the ADT's own generic variables.
    pub fn ty(&self) -> Type {
        Type::named(&self.name, self.generics.iter().cloned().map(Type::Var).collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdtTable {
    adts: HashMap<String, AdtInfo>,
}

impl AdtTable {
    pub fn get(&self, name: &str) -> Option<&AdtInfo> {
        self.adts.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut AdtInfo> {
        self.adts.get_mut(name)
    }

    fn insert(&mut self, info: AdtInfo) {
        self.adts.insert(info.name.clone(), info);
    }
}

/// An ADT instantiated with fresh variables.
struct Instance {
    ty: Type,
    map: HashMap<VarId, Type>,
}

impl Instance {
    fn field_type(&self, field: &FieldInfo) -> Type {
        substitute(&field.ty, &self.map)
    }
}

impl TypeChecker {
    /// Make a struct or enum name visible before its fields are checked.
    pub(crate) fn declare_adt(&mut self, name: &Name, generics: &[ast::GenericParam]) -> Result<()> {
        if self.scope.declares_type(&name.node) || self.traits.is_declared(&name.node) {
            return Err(TypeErrorKind::DuplicateDeclaration(name.node.clone()).at(name.span));
        }
        let generics = self.declare_generics(generics)?;
        let info = AdtInfo {
            name: name.node.clone(),
            generics: generics.into_iter().map(|g| g.var).collect(),
            kind: AdtKind::Pending,
        };
        self.scope.init_type(&name.node, info.ty());
        self.adts.insert(info);
        Ok(())
    }

    fn pending_adt(&self, name: &Name) -> Result<AdtInfo> {
        match self.adts.get(&name.node) {
            Some(info) if info.kind == AdtKind::Pending => Ok(info.clone()),
            _ => Err(TypeErrorKind::DuplicateDeclaration(name.node.clone()).at(name.span)),
        }
    }

    /// Resolve field declarations with the ADT's generic names in scope.
    fn resolve_fields(&mut self, info: &AdtInfo, fields: &[ast::FieldDecl]) -> Result<FieldMap> {
        self.in_scope(|this| {
            for var in &info.generics {
                this.scope.init_type(&var.name, Type::Var(var.clone()));
            }
            let mut map = FieldMap::new();
            for (index, field) in fields.iter().enumerate() {
                if map.contains_key(&field.name.node) {
                    return Err(TypeErrorKind::DuplicateField(field.name.node.clone()).at(field.name.span));
                }
                let ty = this.resolve_type_expr(&field.ty)?;
                map.insert(field.name.node.clone(), FieldInfo { ty, index });
            }
            Ok(map)
        })
    }

    pub(crate) fn define_struct(&mut self, decl: &ast::StructDecl) -> Result<()> {
        let info = self.pending_adt(&decl.name)?;
        let fields = self.resolve_fields(&info, &decl.fields)?;
        debug!(name = %decl.name.node, fields = fields.len(), "declare struct");
        if let Some(adt) = self.adts.get_mut(&decl.name.node) {
            adt.kind = AdtKind::Struct(fields);
        }
        Ok(())
    }

    pub(crate) fn define_enum(&mut self, decl: &ast::EnumDecl) -> Result<()> {
        let info = self.pending_adt(&decl.name)?;
        let mut tags = IndexMap::new();
        for (index, tag) in decl.tags.iter().enumerate() {
            if tags.contains_key(&tag.name.node) {
                return Err(TypeErrorKind::DuplicateDeclaration(tag.name.node.clone()).at(tag.name.span));
            }
            let fields = self.resolve_fields(&info, &tag.fields)?;
            tags.insert(tag.name.node.clone(), TagInfo { index, fields });
        }
        debug!(name = %decl.name.node, tags = tags.len(), "declare enum");
        if let Some(adt) = self.adts.get_mut(&decl.name.node) {
            adt.kind = AdtKind::Enum(tags);
        }
        Ok(())
    }

    /// Turn a type expression into a type in the current scope.
    pub(crate) fn resolve_type_expr(&self, ty: &ast::TypeExpr) -> Result<Type> {
        match &ty.kind {
            TypeExprKind::Ident { name, args } => {
                let resolved = self
                    .scope
                    .get_type(name)
                    .cloned()
                    .ok_or_else(|| TypeErrorKind::UnknownType(name.clone()).at(ty.span))?;

                let adt = self.adts.get(name).filter(|_| resolved.is_named(name));
                let expected = adt.map_or(0, |a| a.generics.len());
                // Generic types are always written with all their arguments.
                match adt {
                    _ if args.len() != expected => Err(TypeErrorKind::ArityMismatch {
                        what: "type arguments",
                        expected,
                        found: args.len(),
                    }
                    .at(ty.span)),
                    Some(_) if expected > 0 => {
                        let args = args
                            .iter()
                            .map(|a| self.resolve_type_expr(a))
                            .collect::<Result<Vec<_>>>()?;
                        Ok(Type::named(name, args))
                    }
                    _ => Ok(resolved),
                }
            }
            TypeExprKind::Tuple(elems) => Ok(Type::tuple(
                elems
                    .iter()
                    .map(|e| self.resolve_type_expr(e))
                    .collect::<Result<Vec<_>>>()?,
            )),
            TypeExprKind::Func { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type_expr(p))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Type::func(params, self.resolve_type_expr(ret)?))
            }
            TypeExprKind::Array { elem, size } => Ok(Type::array(self.resolve_type_expr(elem)?, *size)),
        }
    }

    fn instantiate_adt(&self, adt: &AdtInfo) -> Instance {
        let map = freshen(&self.infer, &adt.generics);
        Instance {
            ty: substitute(&adt.ty(), &map),
            map,
        }
    }

    fn lookup_adt(&self, name: &Name) -> Result<AdtInfo> {
        self.adts
            .get(&name.node)
            .cloned()
            .ok_or_else(|| TypeErrorKind::UnknownType(name.node.clone()).at(name.span))
    }

    /// Build a struct, or an enum value when `tag` is given.
    pub(crate) fn check_construct(
        &mut self,
        ty: &Name,
        tag: Option<&Name>,
        fields: &[(Name, ast::Expr)],
        span: Span,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        let adt = self.lookup_adt(ty)?;
        let instance = self.instantiate_adt(&adt);

        let (tag_index, field_map) = match (&adt.kind, tag) {
            (AdtKind::Struct(map), None) => (None, map),
            (AdtKind::Enum(tags), Some(tag)) => {
                let info = tags.get(&tag.node).ok_or_else(|| {
                    TypeErrorKind::UnknownCaseTag {
                        ty: adt.name.clone(),
                        tag: tag.node.clone(),
                    }
                    .at(tag.span)
                })?;
                (Some(info.index), &info.fields)
            }
            (AdtKind::Struct(_), Some(tag)) => {
                return Err(TypeErrorKind::InvalidContext(format!(
                    "struct `{}` has no case `{}`",
                    adt.name, tag.node
                ))
                .at(tag.span));
            }
            (AdtKind::Enum(_), None) => {
                return Err(TypeErrorKind::InvalidContext(format!("enum `{}` needs a case tag", adt.name)).at(span));
            }
            (AdtKind::Pending, _) => {
                return Err(TypeErrorKind::InvalidContext(format!(
                    "`{}` cannot be constructed before it is declared",
                    adt.name
                ))
                .at(span));
            }
        };

        let mut slots: Vec<Option<ir::Expr>> = vec![None; field_map.len()];
        for (name, value) in fields {
            let Some(info) = field_map.get(&name.node) else {
                return Err(TypeErrorKind::UnknownField {
                    ty: u.resolve(&instance.ty),
                    field: name.node.clone(),
                }
                .at(name.span));
            };
            if slots[info.index].is_some() {
                return Err(TypeErrorKind::DuplicateField(name.node.clone()).at(name.span));
            }
            let field_ty = instance.field_type(info);
            let value_ir = self.check_expr(value, Some(&u.resolve(&field_ty)), u)?;
            u.unify(&self.traits, &field_ty, &value_ir.ty).at(value.span)?;
            slots[info.index] = Some(value_ir);
        }

        let mut values = Vec::with_capacity(slots.len());
        for (slot, (name, _)) in slots.into_iter().zip(field_map) {
            match slot {
                Some(value) => values.push(value),
                None => {
                    return Err(TypeErrorKind::MissingField {
                        ty: adt.name.clone(),
                        field: name.clone(),
                    }
                    .at(span));
                }
            }
        }

        let ty = u.resolve(&instance.ty);
        let kind = match tag_index {
            Some(index) if values.is_empty() => ir::ExprKind::Primitive(Primitive::Int(index as i64)),
            tag => ir::ExprKind::Object { tag, fields: values },
        };
        Ok(ir::Expr::new(kind, ty))
    }

    /// The type of `field` on a value of type `target`: instantiate the
    /// declaration fresh, unify it with the value's type, and read the
    /// field through the instance.
    fn field_of(
        &self,
        adt: &AdtInfo,
        fields: &FieldMap,
        target: &Type,
        field: &str,
        span: Span,
        u: &mut Unifier,
    ) -> Result<(usize, Type)> {
        let Some(info) = fields.get(field) else {
            return Err(TypeErrorKind::UnknownField {
                ty: u.resolve(target),
                field: field.to_string(),
            }
            .at(span));
        };
        let instance = self.instantiate_adt(adt);
        u.unify(&self.traits, &instance.ty, target).at(span)?;
        Ok((info.index, u.resolve(&instance.field_type(info))))
    }

    pub(crate) fn check_field(
        &mut self,
        target: &ast::Expr,
        field: &FieldRef,
        span: Span,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        let target_ir = self.check_expr(target, None, u)?;
        let ty = u.resolve(&target_ir.ty);
        let unknown = |ty: &Type| {
            let field = match field {
                FieldRef::Name(name) => name.clone(),
                FieldRef::Index(i) => i.to_string(),
            };
            TypeErrorKind::UnknownField { ty: ty.clone(), field }.at(span)
        };

        let (index, field_ty) = match (&ty, field) {
            (Type::Var(_), _) => return Err(TypeErrorKind::UnboundType(ty.clone()).at(target.span)),
            (Type::Con(c), FieldRef::Index(i)) if matches!(c.con, TyCon::Tuple(_)) => {
                let Some(elem) = c.params.get(*i) else {
                    return Err(TypeErrorKind::IndexOutOfBounds { ty: ty.clone(), index: *i }.at(span));
                };
                (*i, elem.clone())
            }
            (Type::Con(c), FieldRef::Index(i)) if c.con == TyCon::Array => {
                if *i >= c.array_size {
                    return Err(TypeErrorKind::IndexOutOfBounds { ty: ty.clone(), index: *i }.at(span));
                }
                (*i, c.params[0].clone())
            }
            (Type::Con(c), FieldRef::Name(name)) => {
                let TyCon::Named(adt_name) = &c.con else {
                    return Err(unknown(&ty));
                };
                let adt = self.adts.get(adt_name).cloned().ok_or_else(|| unknown(&ty))?;
                let AdtKind::Struct(fields) = &adt.kind else {
                    return Err(unknown(&ty));
                };
                self.field_of(&adt, fields, &ty, name, span, u)?
            }
            _ => return Err(unknown(&ty)),
        };

        Ok(ir::Expr::new(
            ir::ExprKind::Field {
                target: Box::new(target_ir),
                index,
            },
            field_ty,
        ))
    }

    /// Check a match over an enum value. Cases come out ordered by tag
    /// index, each starting with the lets that bind its fields.
    pub(crate) fn check_match(
        &mut self,
        target: &ast::Expr,
        cases: &[ast::MatchCase],
        expected: Option<&Type>,
        span: Span,
        u: &mut Unifier,
    ) -> Result<ir::Expr> {
        let target_ir = self.check_expr(target, None, u)?;
        let ty = u.resolve(&target_ir.ty);
        let adt = match &ty {
            Type::Con(c) => match &c.con {
                TyCon::Named(name) => self.adts.get(name).cloned(),
                _ => None,
            },
            Type::Var(_) => None,
        };
        let Some(adt) = adt else {
            return Err(TypeErrorKind::ExpectedEnum(ty).at(target.span));
        };
        let AdtKind::Enum(tags) = &adt.kind else {
            return Err(TypeErrorKind::ExpectedEnum(ty).at(target.span));
        };
        let tags = tags.clone();

        let scrutinee = self.scope.fresh_binding();
        let mut slots: Vec<Option<ir::Block>> = vec![None; tags.len()];
        let mut result: Option<Type> = None;

        for case in cases {
            let Some(tag) = tags.get(&case.tag.node) else {
                return Err(TypeErrorKind::UnknownCaseTag {
                    ty: adt.name.clone(),
                    tag: case.tag.node.clone(),
                }
                .at(case.tag.span));
            };
            if slots[tag.index].is_some() {
                return Err(TypeErrorKind::DuplicateCase(case.tag.node.clone()).at(case.span));
            }

            let block = self.in_scope(|this| {
                let mut stmts = Vec::with_capacity(case.bindings.len());
                let mut bound = HashSet::new();
                for binding in &case.bindings {
                    if !bound.insert(binding.binding.node.as_str()) {
                        return Err(
                            TypeErrorKind::DuplicateDeclaration(binding.binding.node.clone()).at(binding.binding.span)
                        );
                    }
                    let (index, field_ty) =
                        this.field_of(&adt, &tag.fields, &ty, &binding.field.node, binding.field.span, u)?;
                    let id = this.scope.init_local(&binding.binding.node, field_ty.clone());
                    let target = ir::Expr::new(ir::ExprKind::Ident(scrutinee), ty.clone());
                    stmts.push(ir::Stmt::Let {
                        binding: id,
                        value: ir::Expr::new(
                            ir::ExprKind::Field {
                                target: Box::new(target),
                                index,
                            },
                            field_ty,
                        ),
                    });
                }
                let mut body = this.check_stmts(&case.body.stmts, expected, u)?;
                stmts.append(&mut body.stmts);
                Ok(ir::Block { stmts, ty: body.ty })
            })?;

            result = Some(match result {
                Some(prev) => u.unify(&self.traits, &prev, &block.ty).at(case.body.span)?,
                None => block.ty.clone(),
            });
            slots[tag.index] = Some(block);
        }

        let mut blocks = Vec::with_capacity(slots.len());
        for (slot, (name, _)) in slots.into_iter().zip(&tags) {
            match slot {
                Some(block) => blocks.push(block),
                None => {
                    return Err(TypeErrorKind::IncompleteMatch {
                        ty: adt.name.clone(),
                        tag: name.clone(),
                    }
                    .at(span));
                }
            }
        }

        let result = result.map_or_else(Type::void, |r| u.resolve(&r));
        Ok(ir::Expr::new(
            ir::ExprKind::Match {
                scrutinee,
                target: Box::new(target_ir),
                cases: blocks,
            },
            result,
        ))
    }
}
