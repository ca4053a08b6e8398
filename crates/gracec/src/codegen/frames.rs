//! Lowering symbol table and activation-frame bookkeeping.
//!
//! Every function gets one frame struct per call, allocated at entry:
//!
//! ```text
//! slot 0   static link: pointer to the frame of the enclosing function
//! slot 1.. parameters, in source order
//! slot k.. local variables, in source order
//! ```
//!
//! Slot 0 exists even in the program entry, where it holds a null pointer so
//! that slot numbering is uniform. Nested functions receive their parent's
//! frame pointer as a hidden first argument and reach outer locals by
//! loading slot 0 once per lexical level.
//!
//! The table mirrors the scope stack of the semantic pass: one scope per
//! function body, plus a synthetic `#runtime` scope at the bottom holding
//! the runtime library. Scope numbers index into that stack, and each bound
//! name remembers the scope and frame slot it lives in; both are fixed by
//! declaration order alone.

use std::collections::HashMap;

use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::values::{FunctionValue, PointerValue};

/// A name bound to a frame slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotEntry<'ctx> {
    /// Scope that owns the slot.
    pub scope_no: usize,
    /// Field index inside the owning frame struct.
    pub frame_slot: u32,
    /// The slot stores a pointer to the object rather than the object
    /// itself (by-reference and unknown-size parameters).
    pub is_ref: bool,
    /// The pointed-to array has an unspecified outer dimension; indexing
    /// advances the element pointer directly instead of stepping through an
    /// array type.
    pub unknown_size: bool,
    /// IR type stored in the slot.
    pub slot_ty: BasicTypeEnum<'ctx>,
    /// IR type of the object the name denotes; equals `slot_ty` unless the
    /// slot holds a pointer to the object.
    pub object_ty: BasicTypeEnum<'ctx>,
}

/// A name bound to an emitted function.
#[derive(Debug, Clone)]
pub struct FuncEntry<'ctx> {
    pub value: FunctionValue<'ctx>,
    /// Runtime-library functions take no static link.
    pub is_runtime: bool,
    /// Scope the function was declared in; its static link is that scope's
    /// frame.
    pub scope_no: usize,
    /// ABI types of the declared parameters, excluding the static link.
    pub param_types: Vec<BasicTypeEnum<'ctx>>,
}

#[derive(Debug, Clone)]
pub enum Entry<'ctx> {
    Slot(SlotEntry<'ctx>),
    Func(FuncEntry<'ctx>),
}

#[derive(Debug)]
struct Scope<'ctx> {
    func_name: String,
    entries: HashMap<String, Entry<'ctx>>,
    frame_ty: Option<StructType<'ctx>>,
    frame_ptr: Option<PointerValue<'ctx>>,
}

/// The scope stack used during lowering.
#[derive(Debug, Default)]
pub struct FrameTable<'ctx> {
    scopes: Vec<Scope<'ctx>>,
}

impl<'ctx> FrameTable<'ctx> {
    pub fn new() -> Self {
        FrameTable { scopes: Vec::new() }
    }

    pub fn push_scope(&mut self, func_name: &str) {
        self.scopes.push(Scope {
            func_name: func_name.to_string(),
            entries: HashMap::new(),
            frame_ty: None,
            frame_ptr: None,
        });
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Index of the innermost scope.
    pub fn current_scope_no(&self) -> usize {
        debug_assert!(!self.scopes.is_empty());
        self.scopes.len() - 1
    }

    pub fn insert(&mut self, name: &str, entry: Entry<'ctx>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.entries.insert(name.to_string(), entry);
        }
    }

    /// Innermost-outward lookup; entries are cheap to clone.
    pub fn lookup(&self, name: &str) -> Option<Entry<'ctx>> {
        for scope in self.scopes.iter().rev() {
            if let Some(e) = scope.entries.get(name) {
                return Some(e.clone());
            }
        }
        None
    }

    pub fn lookup_in_current(&self, name: &str) -> Option<Entry<'ctx>> {
        self.scopes
            .last()
            .and_then(|s| s.entries.get(name).cloned())
    }

    /// Records the synthesized frame of the innermost scope.
    pub fn set_frame(&mut self, ty: StructType<'ctx>, ptr: PointerValue<'ctx>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.frame_ty = Some(ty);
            scope.frame_ptr = Some(ptr);
        }
    }

    pub fn frame_ty(&self, scope_no: usize) -> Option<StructType<'ctx>> {
        self.scopes.get(scope_no).and_then(|s| s.frame_ty)
    }

    pub fn frame_ptr(&self, scope_no: usize) -> Option<PointerValue<'ctx>> {
        self.scopes.get(scope_no).and_then(|s| s.frame_ptr)
    }

    /// The dotted name of the current scope chain, used for emitted symbol
    /// names. Synthetic scopes (prefixed with `#`) do not contribute.
    pub fn scope_path(&self, sep: &str) -> String {
        let mut path = String::new();
        for scope in &self.scopes {
            if scope.func_name.starts_with('#') {
                continue;
            }
            if !path.is_empty() {
                path.push_str(sep);
            }
            path.push_str(&scope.func_name);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_path_skips_synthetic_scopes() {
        let mut t = FrameTable::new();
        t.push_scope("#runtime");
        assert_eq!(t.scope_path("."), "");
        t.push_scope("outer");
        t.push_scope("inner");
        assert_eq!(t.scope_path("."), "outer.inner");
        t.pop_scope();
        assert_eq!(t.scope_path("."), "outer");
    }

    #[test]
    fn slot_coordinates_are_stable() {
        let context = inkwell::context::Context::create();
        let i64_ty: BasicTypeEnum = context.i64_type().into();

        let mut t = FrameTable::new();
        t.push_scope("#runtime");
        t.push_scope("f");
        let entry = SlotEntry {
            scope_no: 1,
            frame_slot: 2,
            is_ref: false,
            unknown_size: false,
            slot_ty: i64_ty,
            object_ty: i64_ty,
        };
        t.insert("x", Entry::Slot(entry));
        match t.lookup("x") {
            Some(Entry::Slot(s)) => {
                assert_eq!(s.scope_no, 1);
                assert_eq!(s.frame_slot, 2);
            }
            other => panic!("unexpected entry {:?}", other),
        }
        // inner scopes see outer bindings, innermost wins
        t.push_scope("g");
        t.insert("x", Entry::Slot(SlotEntry { scope_no: 2, frame_slot: 1, ..entry }));
        match t.lookup("x") {
            Some(Entry::Slot(s)) => assert_eq!(s.scope_no, 2),
            other => panic!("unexpected entry {:?}", other),
        }
        assert!(t.lookup_in_current("missing").is_none());
    }
}
