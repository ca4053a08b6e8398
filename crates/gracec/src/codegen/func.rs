//! Function lowering.
//!
//! Each Grace function becomes one IR function whose first argument is the
//! static link (the program entry takes none and is forced to the external
//! symbol `main` returning `i64`). The frame struct is synthesized from the
//! parameter and local declarations, allocated at entry, and every incoming
//! argument is spilled into its slot before the body runs. Nested functions
//! are registered before any of their bodies is lowered so that forward
//! declarations between siblings resolve.

use inkwell::module::Linkage;
use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::AddressSpace;

use grace_ast::{FuncDef, Header, LocalDef};

use crate::diagnostics::{Diagnostic, DiagnosticResult};

use super::frames::{Entry, FuncEntry, SlotEntry};
use super::{CodeGen, FnCtx};

struct PendingSlot<'ctx> {
    name: String,
    slot_ty: BasicTypeEnum<'ctx>,
    object_ty: BasicTypeEnum<'ctx>,
    is_ref: bool,
    unknown_size: bool,
    /// Argument position of the incoming value to spill, if the slot is a
    /// parameter.
    arg_index: Option<u32>,
}

impl<'ctx> CodeGen<'ctx> {
    pub(crate) fn lower_function(&self, def: &FuncDef, outermost: bool) -> DiagnosticResult<()> {
        let function = if outermost {
            // the OS entry point: external, `i64 ()`, named `main`. It is
            // still callable by its source name and, having no static link,
            // binds like a runtime function.
            let fn_ty = self.i64_t.fn_type(&[], false);
            let value = self.module.add_function("main", fn_ty, None);
            self.frames.borrow_mut().insert(
                &def.header.name,
                Entry::Func(FuncEntry {
                    value,
                    is_runtime: true,
                    scope_no: 0,
                    param_types: Vec::new(),
                }),
            );
            value
        } else {
            match self.frames.borrow().lookup_in_current(&def.header.name) {
                Some(Entry::Func(f)) => f.value,
                _ => {
                    return Err(Diagnostic::bug(format!(
                        "nested function `{}` was never registered",
                        def.header.name
                    )))
                }
            }
        };

        self.frames.borrow_mut().push_scope(&def.header.name);

        // frame slots: parameters then locals, in source order
        let mut pending: Vec<PendingSlot<'ctx>> = Vec::new();
        let mut arg_index = 1u32;
        for param in &def.header.params {
            let abi = self.fpar_abi_type(&param.ty, param.by_ref);
            let object_ty = if abi.is_pointer_type() {
                self.fpar_elem_type(&param.ty)
            } else {
                abi
            };
            for name in &param.names {
                pending.push(PendingSlot {
                    name: name.clone(),
                    slot_ty: abi,
                    object_ty,
                    is_ref: abi.is_pointer_type(),
                    unknown_size: param.ty.unknown_first,
                    arg_index: Some(arg_index),
                });
                arg_index += 1;
            }
        }
        for local in &def.locals {
            if let LocalDef::Var(var) = local {
                let slot_ty = self.inline_type(&var.ty);
                for name in &var.names {
                    pending.push(PendingSlot {
                        name: name.clone(),
                        slot_ty,
                        object_ty: slot_ty,
                        is_ref: false,
                        unknown_size: false,
                        arg_index: None,
                    });
                }
            }
        }

        // synthesize the frame struct; slot 0 is the static link
        let (static_link_ty, path) = {
            let frames = self.frames.borrow();
            let parent = frames.current_scope_no() - 1;
            let ty: BasicTypeEnum<'ctx> = match frames.frame_ty(parent) {
                Some(t) => t.ptr_type(AddressSpace::default()).into(),
                None => self.i8ptr_t.into(),
            };
            (ty, frames.scope_path("."))
        };
        let mut slot_types: Vec<BasicTypeEnum<'ctx>> = Vec::with_capacity(pending.len() + 1);
        slot_types.push(static_link_ty);
        slot_types.extend(pending.iter().map(|p| p.slot_ty));
        let frame_ty = self.context.opaque_struct_type(&format!("{}.frame", path));
        frame_ty.set_body(&slot_types, false);

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);
        let frame_ptr = self.builder.build_alloca(frame_ty, "frame")?;
        self.frames.borrow_mut().set_frame(frame_ty, frame_ptr);

        let link_slot = self.builder.build_struct_gep(frame_ty, frame_ptr, 0, "frame.link")?;
        if outermost {
            self.builder.build_store(link_slot, self.i8ptr_t.const_null())?;
        } else {
            let link = function.get_nth_param(0).ok_or_else(|| {
                Diagnostic::bug(format!("`{}` has no static link argument", def.header.name))
            })?;
            self.builder.build_store(link_slot, link)?;
        }

        // spill incoming arguments and publish every binding
        let scope_no = self.frames.borrow().current_scope_no();
        for (i, p) in pending.iter().enumerate() {
            let frame_slot = (i + 1) as u32;
            if let Some(arg) = p.arg_index {
                let value = function.get_nth_param(arg).ok_or_else(|| {
                    Diagnostic::bug(format!("missing argument {} of `{}`", arg, def.header.name))
                })?;
                let slot = self
                    .builder
                    .build_struct_gep(frame_ty, frame_ptr, frame_slot, &p.name)?;
                self.builder.build_store(slot, value)?;
            }
            self.frames.borrow_mut().insert(
                &p.name,
                Entry::Slot(SlotEntry {
                    scope_no,
                    frame_slot,
                    is_ref: p.is_ref,
                    unknown_size: p.unknown_size,
                    slot_ty: p.slot_ty,
                    object_ty: p.object_ty,
                }),
            );
        }

        // first register every nested function, then lower the bodies
        for local in &def.locals {
            match local {
                LocalDef::Decl(header) => self.register_local_function(header, frame_ty)?,
                LocalDef::Func(inner) => self.register_local_function(&inner.header, frame_ty)?,
                LocalDef::Var(_) => {}
            }
        }
        for local in &def.locals {
            if let LocalDef::Func(inner) = local {
                let saved = self.builder.get_insert_block();
                self.lower_function(inner, false)?;
                if let Some(bb) = saved {
                    self.builder.position_at_end(bb);
                }
            }
        }

        let fcx = FnCtx { function, ret: def.header.ret, outermost };
        self.lower_block(&def.body, &fcx)?;

        if let Some(bb) = self.builder.get_insert_block() {
            if bb.get_terminator().is_none() {
                self.emit_default_return(&fcx)?;
            }
        }

        self.fpm.run_on(&function);
        self.frames.borrow_mut().pop_scope();
        Ok(())
    }

    /// Creates the IR function for a nested declaration or definition and
    /// binds it in the current scope. A definition that settles an earlier
    /// forward declaration reuses the already-created function.
    fn register_local_function(
        &self,
        header: &Header,
        parent_frame: StructType<'ctx>,
    ) -> DiagnosticResult<()> {
        if let Some(Entry::Func(_)) = self.frames.borrow().lookup_in_current(&header.name) {
            return Ok(());
        }

        let mut param_types = Vec::new();
        for param in &header.params {
            let abi = self.fpar_abi_type(&param.ty, param.by_ref);
            for _ in &param.names {
                param_types.push(abi);
            }
        }

        let mut abi_types: Vec<BasicTypeEnum<'ctx>> = Vec::with_capacity(param_types.len() + 1);
        abi_types.push(parent_frame.ptr_type(AddressSpace::default()).into());
        abi_types.extend(param_types.iter().copied());
        let fn_ty = self.function_type(&header.ret, &abi_types);

        let mangled = {
            let frames = self.frames.borrow();
            format!("{}.{}", frames.scope_path("."), header.name)
        };
        let value = self
            .module
            .add_function(&mangled, fn_ty, Some(Linkage::Internal));

        let scope_no = self.frames.borrow().current_scope_no();
        self.frames.borrow_mut().insert(
            &header.name,
            Entry::Func(FuncEntry { value, is_runtime: false, scope_no, param_types }),
        );
        Ok(())
    }
}
