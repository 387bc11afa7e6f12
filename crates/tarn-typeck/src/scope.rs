//! Lexical scopes with upvalue tracking.
//! 词法作用域与上值追踪。
//!
//! Scopes form a stack of frames. A frame opened for a function body is a
//! function boundary: names resolved through it from an outer frame are
//! recorded as that function's upvalues.

use std::collections::HashMap;

use indexmap::IndexMap;
use tarn_ir::{BindingId, Op, Trait, TyVar, Type};

use crate::errors::TypeErrorKind;

/// What a value name refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Local(BindingId),
    Builtin(Op),
    /// Slot `index` of the dictionary for `bound`.
    Method { bound: Trait, index: usize },
}

#[derive(Debug, Clone)]
pub struct ValueBinding {
    pub kind: ValueKind,
    pub ty: Type,
    /// Variables replaced by fresh ones at every reference.
    pub generics: Vec<TyVar>,
}

impl ValueBinding {
    pub fn local(id: BindingId, ty: Type) -> Self {
        Self {
            kind: ValueKind::Local(id),
            ty,
            generics: Vec::new(),
        }
    }
}

/// A binding captured from an enclosing scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Upvalue {
    pub binding: BindingId,
    pub ty: Type,
    /// Frame index where the binding was declared.
    pub depth: usize,
}

#[derive(Debug, Default)]
struct Frame {
    values: HashMap<String, ValueBinding>,
    types: HashMap<String, Type>,
    upvalues: Option<IndexMap<BindingId, Upvalue>>,
}

#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
    next_binding: u32,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            next_binding: 0,
        }
    }

    /// Index of the innermost frame.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn is_root(&self) -> bool {
        self.frames.len() == 1
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn push_function(&mut self) {
        self.frames.push(Frame {
            upvalues: Some(IndexMap::new()),
            ..Frame::default()
        });
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Close a function frame and return its upvalues in first-use order.
    /// Upvalues declared outside the enclosing function are recorded there
    /// too, so the enclosing function can pass them on.
    pub fn pop_function(&mut self) -> Vec<Upvalue> {
        if self.frames.len() == 1 {
            return Vec::new();
        }
        let frame = self.frames.pop().unwrap_or_default();
        let upvalues: Vec<Upvalue> = frame.upvalues.unwrap_or_default().into_values().collect();

        if let Some(outer) = self.innermost_function_above(0) {
            for up in &upvalues {
                if up.depth < outer {
                    self.record(outer, up.clone());
                }
            }
        }
        upvalues
    }

    pub fn fresh_binding(&mut self) -> BindingId {
        let id = BindingId(self.next_binding);
        self.next_binding += 1;
        id
    }

    /// Bind a value in the innermost frame, shadowing any earlier binding.
    pub fn init_value(&mut self, name: &str, binding: ValueBinding) {
        if let Some(frame) = self.frames.last_mut() {
            frame.values.insert(name.to_string(), binding);
        }
    }

    pub fn init_local(&mut self, name: &str, ty: Type) -> BindingId {
        let id = self.fresh_binding();
        self.init_value(name, ValueBinding::local(id, ty));
        id
    }

    /// Bind a parameter; the name must be new to the innermost frame.
    pub fn init_param(&mut self, name: &str, ty: Type) -> Result<BindingId, TypeErrorKind> {
        if self.frames.last().is_some_and(|f| f.values.contains_key(name)) {
            return Err(TypeErrorKind::DuplicateDeclaration(name.to_string()));
        }
        Ok(self.init_local(name, ty))
    }

    /// Replace the type of a binding in the innermost frame.
    pub fn set_value_type(&mut self, name: &str, ty: Type) {
        if let Some(binding) = self.frames.last_mut().and_then(|f| f.values.get_mut(name)) {
            binding.ty = ty;
        }
    }

    /// Look up a value, recording an upvalue when the lookup crosses a
    /// function boundary.
    pub fn get_value(&mut self, name: &str) -> Option<ValueBinding> {
        let depth = self.frames.iter().rposition(|f| f.values.contains_key(name))?;
        let binding = self.frames[depth].values.get(name).cloned()?;

        if let ValueKind::Local(id) = binding.kind
            && let Some(function) = self.innermost_function_above(depth + 1)
        {
            self.record(
                function,
                Upvalue {
                    binding: id,
                    ty: binding.ty.clone(),
                    depth,
                },
            );
        }
        Some(binding)
    }

    /// Look up a value without recording captures.
    pub fn peek_value(&self, name: &str) -> Option<&ValueBinding> {
        self.frames.iter().rev().find_map(|f| f.values.get(name))
    }

    pub fn init_type(&mut self, name: &str, ty: Type) {
        if let Some(frame) = self.frames.last_mut() {
            frame.types.insert(name.to_string(), ty);
        }
    }

    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.frames.iter().rev().find_map(|f| f.types.get(name))
    }

    pub fn declares_type(&self, name: &str) -> bool {
        self.frames.last().is_some_and(|f| f.types.contains_key(name))
    }

    /// Upvalues recorded so far by the innermost function frame.
    pub fn current_upvalues(&self) -> Vec<Upvalue> {
        self.innermost_function_above(0)
            .and_then(|i| self.frames[i].upvalues.as_ref())
            .map(|ups| ups.values().cloned().collect())
            .unwrap_or_default()
    }

    fn innermost_function_above(&self, floor: usize) -> Option<usize> {
        (floor..self.frames.len())
            .rev()
            .find(|&i| self.frames[i].upvalues.is_some())
    }

    fn record(&mut self, frame: usize, upvalue: Upvalue) {
        if let Some(ups) = self.frames[frame].upvalues.as_mut() {
            ups.entry(upvalue.binding).or_insert(upvalue);
        }
    }
}
